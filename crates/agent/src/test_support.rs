//! Shared test helpers for orchestration tests.

use async_trait::async_trait;
use std::sync::Mutex;
use valet_core::error::ModelError;
use valet_core::model::{ModelClient, ModelRequest, ModelResponse, Usage};

/// A mock model client that returns a sequence of scripted outputs.
///
/// Each call to `complete` returns the next output in the queue and records
/// the request it received. Panics if more calls are made than outputs
/// provided.
pub struct SequentialMockClient {
    responses: Mutex<Vec<String>>,
    requests: Mutex<Vec<ModelRequest>>,
    call_count: Mutex<usize>,
}

impl SequentialMockClient {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            requests: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for SequentialMockClient {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request);

        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockClient: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let content = responses[*count].clone();
        *count += 1;

        Ok(ModelResponse {
            content,
            model: "mock-model".into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// A model client whose endpoint is always unreachable.
pub struct FailingMockClient;

#[async_trait]
impl ModelClient for FailingMockClient {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
        Err(ModelError::Network("connection refused".into()))
    }
}
