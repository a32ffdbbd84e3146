//! Scripted provider for tests and offline development.

use super::{GenerationParams, GenerationResult, ProviderError, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What the mock answers with on every call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this text.
    Reply(String),
    /// Echo the prompt back as `Mock response for: <inputs>`.
    Echo,
    /// Succeed without any generated text.
    Empty,
    /// Fail with the given error.
    Fail(ProviderError),
    /// Panic inside the provider.
    Panic,
}

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub inputs: String,
    pub params: GenerationParams,
}

/// Mock text provider that records every call it receives.
pub struct MockTextProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
    recorded: Mutex<Vec<RecordedCall>>,
}

impl MockTextProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reply(text.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.recorded
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        model: &str,
        inputs: &str,
        params: &GenerationParams,
    ) -> Result<GenerationResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push(RecordedCall {
                model: model.to_string(),
                inputs: inputs.to_string(),
                params: params.clone(),
            });
        }

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(GenerationResult {
                generated_text: Some(text.clone()),
            }),
            MockBehavior::Echo => Ok(GenerationResult {
                generated_text: Some(format!("Mock response for: {}", inputs)),
            }),
            MockBehavior::Empty => Ok(GenerationResult::default()),
            MockBehavior::Fail(err) => Err(err.clone()),
            MockBehavior::Panic => panic!("mock provider panicked"),
        }
    }
}
