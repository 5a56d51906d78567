//! Request dispatch. Wires together the registry and the event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::connectors::{
    ConnectionRequest, ConnectionResult, Connector, Link, REASON_TIMEOUT,
    REASON_UNKNOWN_CONNECTOR, Status,
};
use crate::consts::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS};
use crate::events::{Event, EventBus};
use crate::registry::ConnectorRegistry;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upper bound on a single `connect` call. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Total tries per request while the connector keeps failing. Minimum 1.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            max_attempts: 1,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Route counters for the session summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub total: u64,
    pub connected: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    connected: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, status: Status) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match status {
            Status::Connected => self.connected.fetch_add(1, Ordering::Relaxed),
            Status::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> RouteStats {
        RouteStats {
            total: self.total.load(Ordering::Relaxed),
            connected: self.connected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Routes requests to named connectors. Never returns an error: every
/// failure comes back as a failed [`ConnectionResult`].
pub struct Gateway {
    registry: Arc<ConnectorRegistry>,
    events: EventBus,
    config: GatewayConfig,
    counters: Counters,
}

impl Gateway {
    pub fn new(registry: Arc<ConnectorRegistry>, events: EventBus, config: GatewayConfig) -> Self {
        Self {
            registry,
            events,
            config,
            counters: Counters::default(),
        }
    }

    pub async fn route(&self, request: &ConnectionRequest) -> ConnectionResult {
        let name = request.connector_name();
        let link = match self.registry.resolve(name) {
            Ok(connector) => self.connect_with_retry(connector.as_ref(), request).await,
            Err(e) => {
                tracing::debug!(error = %e, "route rejected");
                Link::failed(REASON_UNKNOWN_CONNECTOR)
            }
        };

        let result = ConnectionResult::new(name, link);
        self.counters.record(result.status());
        self.events.emit(Event::Connection {
            connector: name.to_string(),
            source: request.source_id().to_string(),
            destination: request.destination_id().to_string(),
            status: result.status(),
        });
        result
    }

    /// Route independent requests concurrently. Output order matches input.
    pub async fn route_many(&self, requests: &[ConnectionRequest]) -> Vec<ConnectionResult> {
        let futures: Vec<_> = requests.iter().map(|r| self.route(r)).collect();
        futures::future::join_all(futures).await
    }

    /// Fire-and-forget payload delivery, bounded by the same limit as `connect`.
    pub async fn send(&self, connector_name: &str, payload: &str) {
        match self.registry.resolve(connector_name) {
            Ok(connector) => {
                let fut = connector.process_data(payload);
                let Some(limit) = self.config.connect_timeout else {
                    return fut.await;
                };
                if tokio::time::timeout(limit, fut).await.is_err() {
                    tracing::warn!(connector = connector_name, "process_data timed out");
                    self.events.emit(Event::ProcessingFailed {
                        connector: connector_name.to_string(),
                        error: format!("timed out after {}ms", limit.as_millis()),
                    });
                }
            }
            Err(e) => {
                self.events.emit(Event::DataDropped {
                    connector: connector_name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn stats(&self) -> RouteStats {
        self.counters.snapshot()
    }

    async fn connect_with_retry(
        &self,
        connector: &dyn Connector,
        request: &ConnectionRequest,
    ) -> Link {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let link = self.connect_once(connector, request).await;
            if link.is_connected() || attempt >= max_attempts {
                return if attempt > 1 {
                    link.with("attempts", attempt.to_string())
                } else {
                    link
                };
            }
            tracing::debug!(
                connector = request.connector_name(),
                attempt,
                "connect failed, retrying"
            );
            attempt += 1;
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    async fn connect_once(&self, connector: &dyn Connector, request: &ConnectionRequest) -> Link {
        let fut = connector.connect(request.source_id(), request.destination_id());
        match self.config.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(link) => link,
                Err(_) => Link::failed(REASON_TIMEOUT)
                    .with("timeout_ms", limit.as_millis().to_string()),
            },
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::language::{Language, LanguageConnector};

    fn gateway_with_swift() -> Gateway {
        let events = EventBus::default();
        let mut registry = ConnectorRegistry::new();
        registry
            .register(
                "swift",
                Arc::new(LanguageConnector::new(Language::Swift, "swift", events.clone())),
            )
            .unwrap();
        Gateway::new(Arc::new(registry), events, GatewayConfig::default())
    }

    #[tokio::test]
    async fn stats_count_each_outcome() {
        let gateway = gateway_with_swift();

        gateway.route(&ConnectionRequest::new("A", "B", "swift")).await;
        gateway.route(&ConnectionRequest::new("A", "B", "missing")).await;
        gateway.route(&ConnectionRequest::new("", "B", "swift")).await;

        assert_eq!(
            gateway.stats(),
            RouteStats {
                total: 3,
                connected: 1,
                failed: 2,
            }
        );
    }

    #[tokio::test]
    async fn single_attempt_has_no_attempts_detail() {
        let gateway = gateway_with_swift();
        let result = gateway.route(&ConnectionRequest::new("A", "", "swift")).await;
        assert!(!result.detail().contains_key("attempts"));
    }
}
