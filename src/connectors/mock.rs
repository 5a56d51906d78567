use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Connector, Link};

/// A scripted connector for tests. Returns pre-defined links in order,
/// repeating the last one once the script runs out.
pub struct MockConnector {
    links: Vec<Link>,
    delay: Duration,
    calls: AtomicUsize,
    payloads: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(links: Vec<Link>) -> Self {
        Self {
            links,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Always connects.
    pub fn connected() -> Self {
        Self::new(vec![Link::connected()])
    }

    /// Sleep this long inside every `connect`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn kind(&self) -> &str {
        "mock"
    }

    async fn connect(&self, _source: &str, _destination: &str) -> Link {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.links
            .get(i)
            .or_else(|| self.links.last())
            .cloned()
            .unwrap_or_else(Link::connected)
    }

    async fn process_data(&self, payload: &str) {
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(payload.to_string());
        }
    }
}
