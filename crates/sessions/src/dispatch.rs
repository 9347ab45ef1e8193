//! Readiness-guarded outbound dispatch: normalize the recipient, resolve it
//! against the platform directory, send text then media as independent
//! calls, and report partial success distinctly from total failure.

use std::sync::Arc;

use zg_domain::error::{Error, Result};

use crate::adapter::OutboundMedia;
use crate::number::format_number;
use crate::registry::SessionRegistry;

/// One outbound send request.
#[derive(Debug)]
pub struct OutboundMessage {
    /// Raw recipient number as supplied by the caller.
    pub to: String,
    pub text: Option<String>,
    pub media: Option<OutboundMedia>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPart {
    Text,
    Media,
}

impl SendPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendPart::Text => "text",
            SendPart::Media => "media",
        }
    }
}

/// Result of a successful (or partially successful) dispatch.
#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Every requested part went out.
    Sent,
    /// One part went out, the other did not.
    Partial {
        delivered: SendPart,
        failed: SendPart,
        error: String,
    },
}

pub struct MessageDispatcher {
    registry: Arc<SessionRegistry>,
    country_code: String,
}

impl MessageDispatcher {
    pub fn new(registry: Arc<SessionRegistry>, country_code: String) -> Self {
        Self {
            registry,
            country_code,
        }
    }

    /// Send `message` through the named instance.
    ///
    /// Fails with `NotFound` / `NotReady` / `InvalidRecipient` /
    /// `UnregisteredRecipient` before anything is transmitted; once parts
    /// start going out, a mixed result comes back as
    /// [`SendOutcome::Partial`] and an all-parts failure as
    /// `Error::SendFailed`.
    pub async fn send(&self, name: &str, message: OutboundMessage) -> Result<SendOutcome> {
        let session = self
            .registry
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;

        if !session.is_ready() {
            // Kick a re-initialization in the background, as the legacy
            // behavior did; the send itself still fails.
            let adapter = session.adapter();
            let instance = name.to_owned();
            tokio::spawn(async move {
                if let Err(e) = adapter.initialize().await {
                    tracing::warn!(instance = %instance, error = %e, "opportunistic re-init failed");
                }
            });
            return Err(Error::NotReady(name.to_owned()));
        }

        if message.text.is_none() && message.media.is_none() {
            return Err(Error::Other("nothing to send".into()));
        }

        let address = format_number(&message.to, &self.country_code)?;
        let adapter = session.adapter();
        let recipient = adapter
            .resolve_recipient(&address)
            .await
            .map_err(|e| Error::SendFailed(format!("recipient resolution: {e}")))?
            .ok_or(Error::UnregisteredRecipient(address))?;

        let text_result = match &message.text {
            Some(body) => Some(adapter.send_text(&recipient, body).await),
            None => None,
        };
        let media_result = match &message.media {
            Some(media) => Some(adapter.send_media(&recipient, media).await),
            None => None,
        };

        match (text_result, media_result) {
            (Some(Ok(())), Some(Err(e))) => Ok(SendOutcome::Partial {
                delivered: SendPart::Text,
                failed: SendPart::Media,
                error: e.to_string(),
            }),
            (Some(Err(e)), Some(Ok(()))) => Ok(SendOutcome::Partial {
                delivered: SendPart::Media,
                failed: SendPart::Text,
                error: e.to_string(),
            }),
            (Some(Err(text_err)), Some(Err(media_err))) => Err(Error::SendFailed(format!(
                "text: {text_err}; media: {media_err}"
            ))),
            (Some(Err(e)), None) | (None, Some(Err(e))) => Err(Error::SendFailed(e.to_string())),
            _ => Ok(SendOutcome::Sent),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::adapter::AdapterEvent;
    use crate::manager::LifecycleManager;
    use crate::registry::AdmissionController;
    use crate::store::InstanceStore;
    use crate::testutil::{wait_for, CollectingSink, MockAdapter, MockFactory};

    struct Fixture {
        _dir: tempfile::TempDir,
        manager: std::sync::Arc<LifecycleManager>,
        factory: std::sync::Arc<MockFactory>,
        dispatcher: MessageDispatcher,
    }

    async fn connected_instance(name: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new());
        let factory = MockFactory::new();
        let manager = LifecycleManager::new(
            registry.clone(),
            Arc::new(InstanceStore::new(dir.path()).unwrap()),
            AdmissionController::new(4),
            factory.clone(),
            CollectingSink::new(),
            Duration::from_millis(30),
        );
        manager.create_session(name).await.unwrap();
        factory.adapter(0).emit(AdapterEvent::Ready).await;
        assert!(wait_for(Duration::from_secs(2), || manager.status(name) == Some(true)).await);

        let dispatcher = MessageDispatcher::new(registry, "55".into());
        Fixture {
            _dir: dir,
            manager,
            factory,
            dispatcher,
        }
    }

    fn adapter(fixture: &Fixture) -> std::sync::Arc<MockAdapter> {
        fixture.factory.adapter(0)
    }

    fn text_message(to: &str, body: &str) -> OutboundMessage {
        OutboundMessage {
            to: to.to_owned(),
            text: Some(body.to_owned()),
            media: None,
        }
    }

    fn media(mime: &str) -> OutboundMedia {
        OutboundMedia {
            mime_type: mime.to_owned(),
            filename: Some("photo.png".into()),
            data: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn unknown_instance_is_not_found() {
        let fixture = connected_instance("acme").await;
        match fixture.dispatcher.send("ghost", text_message("61991763642", "oi")).await {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_ready_fails_regardless_of_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new());
        let factory = MockFactory::new();
        let manager = LifecycleManager::new(
            registry.clone(),
            Arc::new(InstanceStore::new(dir.path()).unwrap()),
            AdmissionController::new(4),
            factory.clone(),
            CollectingSink::new(),
            Duration::from_millis(30),
        );
        // Still Creating — never signalled ready.
        manager.create_session("acme").await.unwrap();

        let dispatcher = MessageDispatcher::new(registry, "55".into());
        match dispatcher.send("acme", text_message("61991763642", "oi")).await {
            Err(Error::NotReady(_)) => {}
            other => panic!("expected NotReady, got {other:?}"),
        }
        // Even with a garbage recipient the guard comes first.
        match dispatcher.send("acme", text_message("", "oi")).await {
            Err(Error::NotReady(_)) => {}
            other => panic!("expected NotReady, got {other:?}"),
        }
        // The guard also kicks an opportunistic re-init.
        let adapter = factory.adapter(0);
        assert!(
            wait_for(Duration::from_secs(2), || {
                adapter.init_calls.load(Ordering::SeqCst) >= 2
            })
            .await
        );
    }

    #[tokio::test]
    async fn invalid_recipient_rejected_before_transport() {
        let fixture = connected_instance("acme").await;
        match fixture.dispatcher.send("acme", text_message("no digits", "oi")).await {
            Err(Error::InvalidRecipient(_)) => {}
            other => panic!("expected InvalidRecipient, got {other:?}"),
        }
        assert!(adapter(&fixture).sent_texts.lock().is_empty());
    }

    #[tokio::test]
    async fn unregistered_recipient_surfaces() {
        let fixture = connected_instance("acme").await;
        adapter(&fixture).resolve_to_none.store(true, Ordering::SeqCst);
        match fixture.dispatcher.send("acme", text_message("61991763642", "oi")).await {
            Err(Error::UnregisteredRecipient(address)) => {
                assert_eq!(address, "5561991763642@c.us");
            }
            other => panic!("expected UnregisteredRecipient, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_message_rejected() {
        let fixture = connected_instance("acme").await;
        let outcome = fixture
            .dispatcher
            .send(
                "acme",
                OutboundMessage {
                    to: "61991763642".into(),
                    text: None,
                    media: None,
                },
            )
            .await;
        match outcome {
            Err(Error::Other(_)) => {}
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_and_media_sent_in_order() {
        let fixture = connected_instance("acme").await;
        let outcome = fixture
            .dispatcher
            .send(
                "acme",
                OutboundMessage {
                    to: "(61) 99176-3642".into(),
                    text: Some("oi".into()),
                    media: Some(media("image/png")),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Sent);

        let texts = adapter(&fixture).sent_texts.lock().clone();
        let medias = adapter(&fixture).sent_media.lock().clone();
        assert_eq!(texts, vec![("5561991763642@c.us".to_owned(), "oi".to_owned())]);
        assert_eq!(
            medias,
            vec![("5561991763642@c.us".to_owned(), "image/png".to_owned())]
        );
    }

    #[tokio::test]
    async fn media_failure_after_text_is_partial() {
        let fixture = connected_instance("acme").await;
        adapter(&fixture).fail_media.store(true, Ordering::SeqCst);

        let outcome = fixture
            .dispatcher
            .send(
                "acme",
                OutboundMessage {
                    to: "61991763642".into(),
                    text: Some("oi".into()),
                    media: Some(media("image/png")),
                },
            )
            .await
            .unwrap();

        match outcome {
            SendOutcome::Partial {
                delivered: SendPart::Text,
                failed: SendPart::Media,
                ..
            } => {}
            other => panic!("expected text-delivered partial, got {other:?}"),
        }
        assert_eq!(adapter(&fixture).sent_texts.lock().len(), 1);
    }

    #[tokio::test]
    async fn both_parts_failing_is_send_failed() {
        let fixture = connected_instance("acme").await;
        adapter(&fixture).fail_text.store(true, Ordering::SeqCst);
        adapter(&fixture).fail_media.store(true, Ordering::SeqCst);

        let result = fixture
            .dispatcher
            .send(
                "acme",
                OutboundMessage {
                    to: "61991763642".into(),
                    text: Some("oi".into()),
                    media: Some(media("image/png")),
                },
            )
            .await;
        match result {
            Err(Error::SendFailed(cause)) => {
                assert!(cause.contains("text"), "cause should name both parts: {cause}");
                assert!(cause.contains("media"));
            }
            other => panic!("expected SendFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_part_failure_is_send_failed() {
        let fixture = connected_instance("acme").await;
        adapter(&fixture).fail_text.store(true, Ordering::SeqCst);

        match fixture.dispatcher.send("acme", text_message("61991763642", "oi")).await {
            Err(Error::SendFailed(_)) => {}
            other => panic!("expected SendFailed, got {other:?}"),
        }
        // Keep the manager alive so the event loop isn't torn down early.
        assert_eq!(fixture.manager.status("acme"), Some(true));
    }
}
