//! In-memory [`HttpBackend`] for unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use forkrpc_core::error::ErrorCause;

use crate::backend::HttpBackend;

type Handler = Box<dyn Fn(usize, &Value) -> Result<Value, ErrorCause> + Send + Sync>;

/// Records every body it receives and answers through `handler`, which
/// gets the zero-based call index and the request body.
pub(crate) struct MockBackend {
    handler: Handler,
    delay: Duration,
    calls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

impl MockBackend {
    pub(crate) fn new(
        handler: impl Fn(usize, &Value) -> Result<Value, ErrorCause> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request in the body with `result_for(method)`.
    pub(crate) fn echo(result_for: impl Fn(&str) -> Value + Send + Sync + 'static) -> Self {
        Self::new(move |_, body| Ok(map_requests(body, |req| ok(req, result_for(method_of(req))))))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpBackend for MockBackend {
    async fn post(&self, body: &Value) -> Result<Value, ErrorCause> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(index, body)
    }

    fn url(&self) -> &str {
        "http://mock.invalid"
    }
}

pub(crate) fn method_of(req: &Value) -> &str {
    req["method"].as_str().unwrap_or_default()
}

pub(crate) fn ok(req: &Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": req["id"], "result": result})
}

pub(crate) fn rpc_err(req: &Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": req["id"], "error": {"code": code, "message": message}})
}

/// Applies `f` to a single request object or to every element of a batch.
pub(crate) fn map_requests(body: &Value, f: impl Fn(&Value) -> Value) -> Value {
    match body {
        Value::Array(reqs) => Value::Array(reqs.iter().map(f).collect()),
        single => f(single),
    }
}
