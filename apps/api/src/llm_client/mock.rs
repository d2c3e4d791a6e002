//! Scripted model client for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ModelClient, ModelError};

/// A canned outcome for one [`MockModelClient`] call.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    RateLimited,
    ServerError,
    Unauthorized,
}

impl MockReply {
    pub fn text(s: &str) -> Self {
        MockReply::Text(s.to_string())
    }

    fn into_result(self) -> Result<String, ModelError> {
        match self {
            MockReply::Text(s) => Ok(s),
            MockReply::RateLimited => Err(ModelError::RateLimited {
                message: "quota exceeded".to_string(),
            }),
            MockReply::ServerError => Err(ModelError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }),
            MockReply::Unauthorized => Err(ModelError::Unauthorized {
                status: 401,
                message: "bad key".to_string(),
            }),
        }
    }
}

/// Hand-rolled [`ModelClient`] that replays scripted replies.
///
/// Replies are consumed in call order; the last one repeats once the script
/// runs out. A responder function can be used instead when the reply depends
/// on the prompt.
pub struct MockModelClient {
    script: Mutex<Vec<MockReply>>,
    fallback: MockReply,
    responder: Option<Box<dyn Fn(&str) -> MockReply + Send + Sync>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModelClient {
    pub fn always(reply: MockReply) -> Self {
        Self::with_sequence(vec![reply])
    }

    pub fn with_sequence(mut replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");
        replies.reverse();
        let fallback = replies[0].clone();
        Self {
            script: Mutex::new(replies),
            fallback,
            responder: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply computed from the prompt text.
    pub fn responding(f: impl Fn(&str) -> MockReply + Send + Sync + 'static) -> Self {
        let mut mock = Self::always(MockReply::ServerError);
        mock.responder = Some(Box::new(f));
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn invoke(&self, prompt: &str, _system: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = match &self.responder {
            Some(f) => f(prompt),
            None => self
                .script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| self.fallback.clone()),
        };
        reply.into_result()
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
