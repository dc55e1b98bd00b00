use imagegen_contracts::catalog::Capability;
use imagegen_contracts::events::{
    EventPayload, EventWriter, BACKEND_FAILED, BACKEND_SKIPPED, BACKEND_SUCCEEDED,
};
use imagegen_contracts::{AttemptRecord, GenerationRequest};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Text a multimodal backend returned next to the image.
    pub description: Option<String>,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            description: None,
        }
    }
}

pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;
    fn capability(&self) -> Capability;
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError>;
}

#[derive(Debug, Clone)]
pub struct ChainWinner {
    pub backend: String,
    pub image: GeneratedImage,
}

#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub winner: Option<ChainWinner>,
    pub attempts: Vec<AttemptRecord>,
    last_failure: Option<String>,
    last_skip: Option<String>,
}

impl ChainOutcome {
    /// Most recent real backend failure, or the last skip when every backend
    /// was unconfigured.
    pub fn last_error(&self) -> Option<&str> {
        self.last_failure
            .as_deref()
            .or(self.last_skip.as_deref())
    }
}

/// Backends tried strictly in insertion order until one yields an image.
#[derive(Default)]
pub struct FallbackChain {
    backends: Vec<Box<dyn ImageBackend>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<B: ImageBackend + 'static>(&mut self, backend: B) {
        self.backends.push(Box::new(backend));
    }

    pub fn push_boxed(&mut self, backend: Box<dyn ImageBackend>) {
        self.backends.push(backend);
    }

    pub fn names(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|backend| backend.name().to_string())
            .collect()
    }

    pub fn run(&self, request: &GenerationRequest, events: Option<&EventWriter>) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        for backend in &self.backends {
            let name = backend.name();
            debug!(
                backend = name,
                capability = backend.capability().as_str(),
                "trying backend"
            );
            let result = backend.generate(request).and_then(|image| {
                if image.bytes.is_empty() {
                    Err(BackendError::empty(name))
                } else {
                    Ok(image)
                }
            });

            match result {
                Ok(image) => {
                    info!(backend = name, bytes = image.bytes.len(), "backend produced image");
                    emit(
                        events,
                        BACKEND_SUCCEEDED,
                        json!({
                            "backend": name,
                            "mime_type": image.mime_type,
                            "bytes": image.bytes.len(),
                        }),
                    );
                    outcome.winner = Some(ChainWinner {
                        backend: name.to_string(),
                        image,
                    });
                    return outcome;
                }
                Err(err) => {
                    let message = err.summary();
                    if err.is_configuration() {
                        debug!(backend = name, reason = %message, "backend skipped");
                        emit(
                            events,
                            BACKEND_SKIPPED,
                            json!({ "backend": name, "reason": message }),
                        );
                        outcome.last_skip = Some(message.clone());
                    } else {
                        warn!(backend = name, error = %message, "backend failed");
                        emit(
                            events,
                            BACKEND_FAILED,
                            json!({ "backend": name, "error": message }),
                        );
                        outcome.last_failure = Some(message.clone());
                    }
                    outcome.attempts.push(AttemptRecord::new(name, message));
                }
            }
        }

        outcome
    }
}

pub(crate) fn emit(events: Option<&EventWriter>, event_type: &str, payload: Value) {
    let Some(events) = events else {
        return;
    };
    let payload: EventPayload = match payload {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    };
    if let Err(err) = events.emit(event_type, payload) {
        warn!(event = event_type, error = %err, "failed to write event");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;
    use imagegen_contracts::catalog::Capability;
    use imagegen_contracts::events::{event_types, EventWriter};
    use imagegen_contracts::GenerationRequest;

    use super::{FallbackChain, GeneratedImage, ImageBackend};
    use crate::error::{BackendError, ConfigurationError};

    #[derive(Clone, Copy)]
    pub(crate) enum Behavior {
        Succeed,
        Fail,
        Empty,
        Unconfigured,
    }

    pub(crate) struct FakeBackend {
        name: String,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        pub(crate) fn new(name: &str, behavior: Behavior) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name: name.to_string(),
                    behavior,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl ImageBackend for FakeBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn capability(&self) -> Capability {
            Capability::MultimodalImage
        }

        fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(GeneratedImage::new(
                    format!("image-from-{}", self.name).into_bytes(),
                    "image/png",
                )),
                Behavior::Fail => Err(anyhow!("{} exploded", self.name).into()),
                Behavior::Empty => Ok(GeneratedImage::new(Vec::new(), "image/png")),
                Behavior::Unconfigured => {
                    Err(ConfigurationError::new(self.name.clone(), &["FAKE_KEY"]).into())
                }
            }
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("a lighthouse", "16:9")
    }

    #[test]
    fn first_success_short_circuits_the_chain() {
        let (a, a_calls) = FakeBackend::new("a", Behavior::Fail);
        let (b, b_calls) = FakeBackend::new("b", Behavior::Succeed);
        let (c, c_calls) = FakeBackend::new("c", Behavior::Succeed);
        let mut chain = FallbackChain::new();
        chain.push(a);
        chain.push(b);
        chain.push(c);

        let outcome = chain.run(&request(), None);
        let winner = outcome.winner.clone().map(|winner| winner.backend);

        assert_eq!(winner.as_deref(), Some("b"));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.attempts[0].backend, "a");
        assert_eq!(outcome.attempts[0].error, "a exploded");
    }

    #[test]
    fn empty_payload_advances_to_next_backend() {
        let (a, _) = FakeBackend::new("a", Behavior::Empty);
        let (b, _) = FakeBackend::new("b", Behavior::Succeed);
        let mut chain = FallbackChain::new();
        chain.push(a);
        chain.push(b);

        let outcome = chain.run(&request(), None);
        assert_eq!(
            outcome.winner.map(|winner| winner.image.bytes),
            Some(b"image-from-b".to_vec())
        );
        assert_eq!(outcome.attempts[0].error, "a returned no image");
    }

    #[test]
    fn each_backend_is_tried_once_when_all_fail() {
        let (a, a_calls) = FakeBackend::new("a", Behavior::Fail);
        let (b, b_calls) = FakeBackend::new("b", Behavior::Unconfigured);
        let mut chain = FallbackChain::new();
        chain.push(a);
        chain.push(b);

        let outcome = chain.run(&request(), None);
        assert!(outcome.winner.is_none());
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome
                .attempts
                .iter()
                .map(|attempt| attempt.backend.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn last_error_prefers_real_failures_over_skips() {
        let (a, _) = FakeBackend::new("a", Behavior::Fail);
        let (b, _) = FakeBackend::new("b", Behavior::Unconfigured);
        let mut chain = FallbackChain::new();
        chain.push(a);
        chain.push(b);
        assert_eq!(chain.run(&request(), None).last_error(), Some("a exploded"));

        let (only_skip, _) = FakeBackend::new("z", Behavior::Unconfigured);
        let mut chain = FallbackChain::new();
        chain.push(only_skip);
        assert_eq!(
            chain.run(&request(), None).last_error(),
            Some("z unavailable: set FAKE_KEY")
        );

        assert_eq!(FallbackChain::new().run(&request(), None).last_error(), None);
    }

    #[test]
    fn run_records_events_per_attempt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let events = EventWriter::new(&path, "req-test");
        let (a, _) = FakeBackend::new("a", Behavior::Unconfigured);
        let (b, _) = FakeBackend::new("b", Behavior::Fail);
        let (c, _) = FakeBackend::new("c", Behavior::Succeed);
        let mut chain = FallbackChain::new();
        chain.push(a);
        chain.push(b);
        chain.push(c);

        chain.run(&request(), Some(&events));

        assert_eq!(
            event_types(&path)?,
            vec!["backend_skipped", "backend_failed", "backend_succeeded"]
        );
        Ok(())
    }
}
