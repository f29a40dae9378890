use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::MonitorEvent;

/// How many webhook targets are posted to at once
const POST_CONCURRENCY: usize = 4;

/// Forwards status-change and task-error events to configured webhook
/// URLs as JSON POSTs.
///
/// Delivery is fire-and-forget: a failing target is logged and skipped,
/// and a lagging event stream drops the missed events rather than backing
/// the scheduler up.
pub struct WebhookForwarder {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl WebhookForwarder {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
        }
    }

    pub fn spawn(self, mut rx: broadcast::Receiver<MonitorEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if matches!(
                            event,
                            MonitorEvent::StatusChanged { .. } | MonitorEvent::TaskError { .. }
                        ) {
                            self.deliver(&event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "webhook forwarder lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("webhook forwarder stopped");
        })
    }

    async fn deliver(&self, event: &MonitorEvent) {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize webhook payload");
                return;
            }
        };

        stream::iter(&self.urls)
            .for_each_concurrent(POST_CONCURRENCY, |url| {
                let payload = payload.clone();
                async move {
                    match self.client.post(url.as_str()).json(&payload).send().await {
                        Ok(response) if !response.status().is_success() => {
                            warn!(url = %url, status = %response.status(), "webhook rejected");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(url = %url, error = %e, "webhook delivery failed"),
                    }
                }
            })
            .await;
    }
}
