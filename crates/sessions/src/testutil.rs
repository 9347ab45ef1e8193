//! Shared test doubles: a scriptable adapter, its factory, and a
//! collecting inbound sink.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use zg_domain::error::{Error, Result};

use crate::adapter::{
    AdapterEvent, AdapterFactory, InboundMessage, InboundSink, OutboundMedia, SessionAdapter,
};

pub(crate) struct MockAdapter {
    events: Mutex<Option<mpsc::Sender<AdapterEvent>>>,
    pub init_calls: AtomicUsize,
    pub destroy_calls: AtomicUsize,
    pub fail_init: AtomicBool,
    pub fail_destroy: AtomicBool,
    pub fail_text: AtomicBool,
    pub fail_media: AtomicBool,
    pub resolve_to_none: AtomicBool,
    pub sent_texts: Mutex<Vec<(String, String)>>,
    pub sent_media: Mutex<Vec<(String, String)>>,
}

impl MockAdapter {
    fn new(events: Option<mpsc::Sender<AdapterEvent>>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            init_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            fail_init: AtomicBool::new(false),
            fail_destroy: AtomicBool::new(false),
            fail_text: AtomicBool::new(false),
            fail_media: AtomicBool::new(false),
            resolve_to_none: AtomicBool::new(false),
            sent_texts: Mutex::new(Vec::new()),
            sent_media: Mutex::new(Vec::new()),
        })
    }

    /// An adapter with no event channel, for tests that only need a
    /// `Session` object.
    pub fn detached() -> Arc<Self> {
        Self::new(None)
    }

    pub async fn emit(&self, event: AdapterEvent) {
        let sender = self.events.lock().clone();
        if let Some(tx) = sender {
            tx.send(event).await.expect("event channel closed");
        }
    }
}

#[async_trait]
impl SessionAdapter for MockAdapter {
    async fn initialize(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(Error::AdapterInit("mock init failure".into()));
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(Error::AdapterInit("mock teardown failure".into()));
        }
        Ok(())
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<()> {
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(Error::Http("mock text transport error".into()));
        }
        self.sent_texts
            .lock()
            .push((recipient.to_owned(), body.to_owned()));
        Ok(())
    }

    async fn send_media(&self, recipient: &str, media: &OutboundMedia) -> Result<()> {
        if self.fail_media.load(Ordering::SeqCst) {
            return Err(Error::Http("mock media transport error".into()));
        }
        self.sent_media
            .lock()
            .push((recipient.to_owned(), media.mime_type.clone()));
        Ok(())
    }

    async fn resolve_recipient(&self, address: &str) -> Result<Option<String>> {
        if self.resolve_to_none.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(address.to_owned()))
    }
}

/// Factory that records every adapter it builds so tests can drive events.
#[derive(Default)]
pub(crate) struct MockFactory {
    pub created: Mutex<Vec<Arc<MockAdapter>>>,
    /// One-shot: the next adapter built is born with `fail_init` raised.
    pub fail_next_init: AtomicBool,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn adapter(&self, index: usize) -> Arc<MockAdapter> {
        self.created.lock()[index].clone()
    }

    pub fn count(&self) -> usize {
        self.created.lock().len()
    }
}

impl AdapterFactory for MockFactory {
    fn create(&self, _name: &str, events: mpsc::Sender<AdapterEvent>) -> Arc<dyn SessionAdapter> {
        let adapter = MockAdapter::new(Some(events));
        if self.fail_next_init.swap(false, Ordering::SeqCst) {
            adapter.fail_init.store(true, Ordering::SeqCst);
        }
        self.created.lock().push(adapter.clone());
        adapter
    }
}

/// Sink that stores every forwarded message.
#[derive(Default)]
pub(crate) struct CollectingSink {
    pub messages: Mutex<Vec<(String, InboundMessage)>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl InboundSink for CollectingSink {
    fn forward(&self, instance: &str, message: InboundMessage) {
        self.messages.lock().push((instance.to_owned(), message));
    }
}

/// Poll `cond` every few milliseconds until it holds or `timeout` elapses.
pub(crate) async fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
