//! Mailbox handle: one serialized worker per agent.
//!
//! Queries are queued on a bounded channel. The worker takes them one at
//! a time, runs each on its own task, and sends the response (or typed
//! failure) back through a oneshot channel. Callers may wait with a
//! timeout; timing out does not cancel the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use assemble_core::error::{Error, Result};
use assemble_core::message::{Query, Response};
use assemble_memory::SharedMemory;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::agent::Agent;

/// Queued queries per agent by default.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

struct RunRequest {
    query: Query,
    response_tx: oneshot::Sender<Result<Response>>,
}

pub struct AgentHandle {
    request_tx: mpsc::Sender<RunRequest>,
    memory: SharedMemory,
    worker: JoinHandle<()>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("closed", &self.request_tx.is_closed())
            .finish()
    }
}

impl AgentHandle {
    /// Move `agent` onto a worker task. Must be called inside a Tokio runtime.
    pub fn spawn(agent: Agent) -> Self {
        Self::with_capacity(agent, DEFAULT_MAILBOX_CAPACITY)
    }

    pub fn with_capacity(agent: Agent, capacity: usize) -> Self {
        let memory = agent.memory();
        let agent = Arc::new(Mutex::new(agent));
        let (request_tx, mut request_rx) = mpsc::channel::<RunRequest>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let RunRequest { query, response_tx } = request;
                let started_at = Instant::now();

                let result = match tokio::spawn({
                    let agent = Arc::clone(&agent);
                    async move {
                        let mut agent = agent.lock().await;
                        agent.run(query).await.map(Response::from_steps)
                    }
                })
                .await
                {
                    Ok(result) => result,
                    Err(join_err) => {
                        error!(
                            error = ?join_err,
                            duration_ms = started_at.elapsed().as_millis() as u64,
                            "Agent run panicked"
                        );
                        Err(Error::Internal(format!("agent run panicked: {join_err}")))
                    }
                };

                if response_tx.send(result).is_err() {
                    debug!("Caller stopped waiting before the run finished");
                }
            }
        });

        Self {
            request_tx,
            memory,
            worker,
        }
    }

    /// Queue a query. Waits for mailbox space when the queue is full.
    pub async fn submit(&self, query: Query) -> Result<PendingResponse> {
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(RunRequest { query, response_tx })
            .await
            .map_err(|err| Error::Unavailable(err.to_string()))?;
        Ok(PendingResponse { response_rx })
    }

    /// Queue a query and wait for its response.
    pub async fn ask(&self, query: Query) -> Result<Response> {
        self.submit(query).await?.wait().await
    }

    /// The agent's memory, for inspection between or after runs.
    pub fn memory(&self) -> SharedMemory {
        Arc::clone(&self.memory)
    }

    /// Stop accepting queries, finish the queued ones, and stop the worker.
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            request_tx, worker, ..
        } = self;
        drop(request_tx);
        worker
            .await
            .map_err(|err| Error::Internal(format!("agent worker failed: {err}")))
    }
}

/// A response that will be delivered exactly once.
#[derive(Debug)]
pub struct PendingResponse {
    response_rx: oneshot::Receiver<Result<Response>>,
}

impl PendingResponse {
    pub async fn wait(self) -> Result<Response> {
        self.response_rx
            .await
            .map_err(|_| Error::Unavailable("agent worker stopped".into()))?
    }

    /// Wait at most `timeout`. The run keeps going if this times out.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<Response> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| Error::Timeout(format!("no response after {}ms", timeout.as_millis())))?
    }
}
