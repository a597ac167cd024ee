//! Auto-batching engine: coalesce concurrent requests into one HTTP call.
//!
//! Callers enqueue a request and await a `oneshot` completion. A background
//! worker owns the queue's consuming side: once something is queued it waits
//! up to `wait` for more to arrive (or until `max_size` requests are queued),
//! drains at most `max_size` of them in arrival order, POSTs them as one JSON
//! array, and routes every response entry back to its caller by id.
//!
//! # Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use forkrpc_core::policy::RetryPolicy;
//! use forkrpc_http::{BatchConfig, BatchDispatcher, ReqwestBackend, TransportConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TransportConfig::new("https://rpc.example.com");
//! let backend = Arc::new(ReqwestBackend::new(&config)?);
//! let batch = BatchConfig::new(Duration::from_millis(5), 50);
//! let dispatcher = BatchDispatcher::spawn(backend, RetryPolicy::default(), batch);
//! let chain_id = dispatcher.request("eth_chainId", vec![]).await?;
//! dispatcher.shutdown().await;
//! # Ok(()) }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use forkrpc_core::error::{ErrorCause, TransportError};
use forkrpc_core::policy::RetryPolicy;
use forkrpc_core::request::JsonRpcResponse;
use forkrpc_core::transport::RpcTransport;

use crate::backend::HttpBackend;
use crate::config::BatchConfig;

type Completion = oneshot::Sender<Result<Value, TransportError>>;

/// A queued logical call.
struct PendingRequest {
    id: u64,
    method: String,
    params: Vec<Value>,
    completion: Completion,
}

impl PendingRequest {
    fn complete(self, result: Result<Value, ErrorCause>) {
        let result = result.map_err(|cause| cause.for_method(&self.method));
        if self.completion.send(result).is_err() {
            tracing::debug!(id = self.id, method = %self.method, "caller went away before completion");
        }
    }
}

/// Borrowed wire form of a queued call.
#[derive(Serialize)]
struct WireRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

struct QueueState {
    items: VecDeque<PendingRequest>,
    next_id: u64,
    /// Shutdown latch. Only ever goes `false -> true`.
    shutting_down: bool,
}

struct Shared {
    queue: Mutex<QueueState>,
    /// Wakes the worker: first arrival, `max_size` reached, or shutdown.
    trigger: Notify,
    max_size: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Something to send, or shutdown requested.
    fn has_work(&self) -> bool {
        let queue = self.lock();
        !queue.items.is_empty() || queue.shutting_down
    }

    /// A flush must not wait for the batch window any longer.
    fn must_flush(&self) -> bool {
        let queue = self.lock();
        queue.items.len() >= self.max_size || queue.shutting_down
    }

    /// Removes up to `max_size` items from the head of the queue.
    fn drain(&self) -> Vec<PendingRequest> {
        let mut queue = self.lock();
        let n = queue.items.len().min(self.max_size);
        queue.items.drain(..n).collect()
    }

    fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}

/// Completion handle for one enqueued request.
pub struct ResponseHandle {
    id: u64,
    method: String,
    rx: oneshot::Receiver<Result<Value, TransportError>>,
}

impl ResponseHandle {
    /// Correlation id assigned to this request.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the worker to settle this request.
    pub async fn wait(self) -> Result<Value, TransportError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(ErrorCause::Other("batch worker dropped the request".into())
                .for_method(self.method)),
        }
    }
}

/// Batching dispatcher: a request queue plus the worker task that drains it.
///
/// Must be created inside a Tokio runtime. Call [`BatchDispatcher::shutdown`]
/// to flush outstanding requests and stop the worker; dropping the dispatcher
/// asks the worker to do the same in the background.
pub struct BatchDispatcher {
    shared: Arc<Shared>,
    worker: AsyncMutex<Option<JoinHandle<()>>>,
    url: String,
}

impl BatchDispatcher {
    /// Start the worker task.
    ///
    /// A `max_size` of 0 is treated as 1; [`TransportConfig::validate`]
    /// rejects it before it gets here.
    ///
    /// [`TransportConfig::validate`]: crate::TransportConfig::validate
    pub fn spawn(backend: Arc<dyn HttpBackend>, retry: RetryPolicy, batch: BatchConfig) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState {
                items: VecDeque::new(),
                next_id: 1,
                shutting_down: false,
            }),
            trigger: Notify::new(),
            max_size: batch.max_size.max(1),
        });
        let url = backend.url().to_string();

        let worker = tokio::spawn(run_worker(shared.clone(), backend, retry, batch.wait()));

        Self {
            shared,
            worker: AsyncMutex::new(Some(worker)),
            url,
        }
    }

    /// Queue a request and return its completion handle.
    ///
    /// Fails immediately, without touching the queue, once shutdown began.
    pub fn enqueue(&self, method: &str, params: Vec<Value>) -> Result<ResponseHandle, TransportError> {
        let (tx, rx) = oneshot::channel();
        let (id, len) = {
            let mut queue = self.shared.lock();
            if queue.shutting_down {
                return Err(ErrorCause::ShuttingDown.for_method(method));
            }
            let id = queue.next_id;
            queue.next_id += 1;
            queue.items.push_back(PendingRequest {
                id,
                method: method.to_string(),
                params,
                completion: tx,
            });
            (id, queue.items.len())
        };

        if len == 1 || len >= self.shared.max_size {
            self.shared.trigger.notify_one();
        }

        Ok(ResponseHandle {
            id,
            method: method.to_string(),
            rx,
        })
    }

    /// Enqueue and wait for the result.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        self.enqueue(method, params)?.wait().await
    }

    /// Number of requests waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }

    /// Stop accepting requests, flush everything queued, and join the worker.
    ///
    /// Safe to call more than once, concurrently, or again after a cancelled
    /// call: every caller waits for the worker before the queue is closed.
    pub async fn shutdown(&self) {
        let first = {
            let mut queue = self.shared.lock();
            !std::mem::replace(&mut queue.shutting_down, true)
        };
        if first {
            tracing::info!(url = %self.url, queued = self.queued(), "batch transport shutting down");
        }
        self.shared.trigger.notify_one();

        {
            // Held across the join. The handle is only cleared once the worker
            // has finished, so a cancelled caller leaves it for the next one.
            let mut worker = self.worker.lock().await;
            if let Some(handle) = worker.as_mut() {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "batch worker terminated abnormally");
                }
                *worker = None;
            }
        }

        // Close the queue. The worker's final drain leaves it empty unless it
        // died mid-flight.
        let leftovers: Vec<PendingRequest> = self.shared.lock().items.drain(..).collect();
        for item in leftovers {
            item.complete(Err(ErrorCause::ShuttingDown));
        }
    }
}

impl Drop for BatchDispatcher {
    fn drop(&mut self) {
        self.shared.lock().shutting_down = true;
        self.shared.trigger.notify_one();
    }
}

#[async_trait]
impl RpcTransport for BatchDispatcher {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        BatchDispatcher::request(self, method, params).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Background flush loop. Exits after the final drain once shutdown is latched.
async fn run_worker(
    shared: Arc<Shared>,
    backend: Arc<dyn HttpBackend>,
    retry: RetryPolicy,
    wait: Duration,
) {
    loop {
        // Idle until the first request arrives.
        while !shared.has_work() {
            shared.trigger.notified().await;
        }

        // Batch window: give concurrent callers `wait` to join this batch.
        let deadline = Instant::now() + wait;
        while !shared.must_flush() {
            tokio::select! {
                _ = shared.trigger.notified() => {}
                _ = time::sleep_until(deadline) => break,
            }
        }

        let batch = shared.drain();
        if !batch.is_empty() {
            send_batch(backend.as_ref(), &retry, batch).await;
        }

        if shared.is_shutting_down() {
            loop {
                let batch = shared.drain();
                if batch.is_empty() {
                    break;
                }
                send_batch(backend.as_ref(), &retry, batch).await;
            }
            tracing::debug!("batch worker stopped");
            return;
        }
    }
}

/// POST one batch and settle every member's completion.
async fn send_batch(backend: &dyn HttpBackend, retry: &RetryPolicy, batch: Vec<PendingRequest>) {
    let body = {
        let wire: Vec<WireRequest<'_>> = batch
            .iter()
            .map(|p| WireRequest {
                jsonrpc: "2.0",
                id: p.id,
                method: &p.method,
                params: &p.params,
            })
            .collect();
        serde_json::to_value(&wire)
    };

    let size = batch.len();
    let first_id = batch.first().map(|p| p.id).unwrap_or_default();
    tracing::debug!(size, first_id, "flushing batch");

    let outcome = match body {
        Ok(body) => {
            let label = format!("batch[{first_id}..+{size}]");
            // Retries resend this exact body; the batch is never rebuilt.
            retry
                .run(&label, || async {
                    let raw = backend.post(&body).await?;
                    index_batch_response(raw)
                })
                .await
        }
        Err(e) => Err(ErrorCause::Decode(e.to_string())),
    };

    match outcome {
        Err(cause) => {
            tracing::warn!(size, first_id, error = %cause, "batch failed");
            for item in batch {
                item.complete(Err(cause.clone()));
            }
        }
        Ok(mut by_id) => {
            for item in batch {
                let result = match by_id.remove(&item.id) {
                    None => Err(ErrorCause::MissingResponse { id: item.id }),
                    Some(resp) => resp.into_result().map_err(ErrorCause::Rpc),
                };
                item.complete(result);
            }
        }
    }
}

/// Index a batch response body by correlation id.
///
/// A lone object instead of an array is a batch-level failure: the node
/// rejected the whole array.
fn index_batch_response(raw: Value) -> Result<HashMap<u64, JsonRpcResponse>, ErrorCause> {
    let entries = match raw {
        Value::Array(entries) => entries,
        Value::Object(_) => {
            let resp: JsonRpcResponse =
                serde_json::from_value(raw).map_err(|e| ErrorCause::Decode(e.to_string()))?;
            return Err(match resp.error {
                Some(err) => ErrorCause::Rpc(err),
                None => ErrorCause::Decode("expected a JSON array for a batch response".into()),
            });
        }
        other => {
            return Err(ErrorCause::Decode(format!(
                "expected a JSON array for a batch response, got {other}"
            )))
        }
    };

    let mut by_id = HashMap::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<JsonRpcResponse>(entry) {
            Ok(resp) => match resp.id.as_u64() {
                Some(id) => {
                    by_id.entry(id).or_insert(resp);
                }
                None => tracing::debug!(id = %resp.id, "ignoring batch entry without numeric id"),
            },
            Err(e) => tracing::debug!(error = %e, "ignoring malformed batch entry"),
        }
    }
    Ok(by_id)
}
