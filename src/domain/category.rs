use serde::{Deserialize, Serialize};

/// Monitoring category. Each category is driven by its own periodic loop
/// with an independently configurable interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringCategory {
    Resource,
    Interface,
    Dhcp,
    Log,
    Connectivity,
    Cloud,
}

impl MonitoringCategory {
    pub const ALL: [MonitoringCategory; 6] = [
        MonitoringCategory::Resource,
        MonitoringCategory::Interface,
        MonitoringCategory::Dhcp,
        MonitoringCategory::Log,
        MonitoringCategory::Connectivity,
        MonitoringCategory::Cloud,
    ];

    /// Default polling interval in seconds
    pub fn default_interval_secs(&self) -> u64 {
        match self {
            Self::Resource => 5,
            Self::Interface => 1,
            Self::Dhcp => 30,
            Self::Log => 30,
            Self::Connectivity => 15,
            Self::Cloud => 60,
        }
    }

    /// Stable index into per-category counter arrays
    pub fn index(&self) -> usize {
        match self {
            Self::Resource => 0,
            Self::Interface => 1,
            Self::Dhcp => 2,
            Self::Log => 3,
            Self::Connectivity => 4,
            Self::Cloud => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Interface => "interface",
            Self::Dhcp => "dhcp",
            Self::Log => "log",
            Self::Connectivity => "connectivity",
            Self::Cloud => "cloud",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resource" => Some(Self::Resource),
            "interface" => Some(Self::Interface),
            "dhcp" => Some(Self::Dhcp),
            "log" => Some(Self::Log),
            "connectivity" => Some(Self::Connectivity),
            "cloud" => Some(Self::Cloud),
            _ => None,
        }
    }
}

impl std::fmt::Display for MonitoringCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for cat in MonitoringCategory::ALL {
            assert_eq!(MonitoringCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(MonitoringCategory::parse("bogus"), None);
    }

    #[test]
    fn test_indexes_are_distinct() {
        let mut seen = [false; 6];
        for cat in MonitoringCategory::ALL {
            assert!(!seen[cat.index()]);
            seen[cat.index()] = true;
        }
    }
}
