pub mod cloud_source;
pub mod device_source;

pub use cloud_source::{CloudDevice, CloudSource};
pub use device_source::{DeviceSource, SourceResult};
