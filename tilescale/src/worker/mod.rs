//! Dedicated upscale worker thread.
//!
//! The worker owns a single-threaded tokio runtime and an
//! [`UpscaleOrchestrator`]. Jobs are queued over a channel and run one at a
//! time, so long inference never blocks the caller.
//!
//! ```text
//! caller thread                      tilescale-worker thread
//! ─────────────                      ───────────────────────
//! submit(WorkerRequest) ──command──► orchestrator.execute(...)
//! JobHandle::recv_blocking() ◄──────  WorkerResponse::Progress …
//!                            ◄──────  WorkerResponse::Done | Alert
//! JobHandle::cancel() ──token──────► checked between tiles
//! ```
//!
//! Pixel buffers are moved through the channels, never copied.

mod protocol;

pub use protocol::{WorkerRequest, WorkerResponse};

use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::orchestrator::{ProgressSink, UpscaleConfig, UpscaleOrchestrator};
use crate::registry::ModelResolver;

/// Errors starting or talking to the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker has stopped")]
    Stopped,
}

struct Command {
    request: WorkerRequest,
    responses: UnboundedSender<WorkerResponse>,
    cancel: CancellationToken,
}

/// Handle to a submitted job.
pub struct JobHandle {
    responses: UnboundedReceiver<WorkerResponse>,
    cancel: CancellationToken,
}

impl JobHandle {
    /// Ask the job to stop. It ends with `Alert("Upscaling cancelled")` at the
    /// next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this job, for wiring into signal handlers.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next response; `None` once the job is finished and drained.
    pub async fn recv(&mut self) -> Option<WorkerResponse> {
        self.responses.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for non-async callers.
    pub fn recv_blocking(&mut self) -> Option<WorkerResponse> {
        self.responses.blocking_recv()
    }
}

/// Owns the worker thread. Dropping it waits for queued jobs to finish.
pub struct UpscaleWorker {
    commands: Option<UnboundedSender<Command>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl UpscaleWorker {
    /// Start a worker around a resolver.
    pub fn spawn(
        resolver: Arc<dyn ModelResolver>,
        config: UpscaleConfig,
    ) -> Result<Self, WorkerError> {
        Self::with_orchestrator(UpscaleOrchestrator::new(resolver, config))
    }

    /// Start a worker around a prepared orchestrator.
    pub fn with_orchestrator(orchestrator: UpscaleOrchestrator) -> Result<Self, WorkerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let thread = thread::Builder::new()
            .name("tilescale-worker".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    debug!("Worker started");
                    while let Some(command) = rx.recv().await {
                        run_command(&orchestrator, command).await;
                    }
                    orchestrator.flush().await;
                    info!(telemetry = %orchestrator.metrics().snapshot(), "Worker stopped");
                });
            })?;

        Ok(Self {
            commands: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue a job.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the worker thread has exited.
    pub fn submit(&self, request: WorkerRequest) -> Result<JobHandle, WorkerError> {
        let (responses, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let command = Command {
            request,
            responses,
            cancel: cancel.clone(),
        };

        self.commands
            .as_ref()
            .ok_or(WorkerError::Stopped)?
            .send(command)
            .map_err(|_| WorkerError::Stopped)?;

        Ok(JobHandle {
            responses: receiver,
            cancel,
        })
    }

    /// Stop accepting jobs and wait for the queue to drain.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Worker thread panicked");
            }
        }
    }
}

impl Drop for UpscaleWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_command(orchestrator: &UpscaleOrchestrator, command: Command) {
    let Command {
        request,
        responses,
        cancel,
    } = command;

    let request = match request.into_request() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected malformed request");
            let _ = responses.send(WorkerResponse::Alert {
                alertmsg: e.to_string(),
            });
            return;
        }
    };

    let sink = ProgressSink::new(move |event| {
        let _ = responses.send(WorkerResponse::from(event));
    });
    orchestrator.execute(request, &sink, &cancel).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoxFuture;
    use crate::error::{Result, UpscaleError};
    use crate::inference::tests::MockModel;
    use crate::inference::{BackendHandle, BackendId, ModelHandle};
    use crate::orchestrator::UpscalingOptions;
    use crate::pixel::PixelBuffer;
    use crate::registry::ModelId;
    use tokio::sync::Notify;

    struct StaticResolver {
        model: ModelHandle,
    }

    impl ModelResolver for StaticResolver {
        fn resolve_backend(&self, id: BackendId) -> Result<BackendHandle> {
            match id {
                BackendId::Cpu => Ok(BackendHandle::new(id, "test", 1)),
                BackendId::Gpu => Err(UpscaleError::UnsupportedBackend {
                    backend: id,
                    reason: "no adapter".to_string(),
                }),
            }
        }

        fn resolve_model<'a>(
            &'a self,
            _id: ModelId,
            _backend: &'a BackendHandle,
            _progress: &'a ProgressSink,
        ) -> BoxFuture<'a, Result<ModelHandle>> {
            let model = Arc::clone(&self.model);
            Box::pin(async move { Ok(model) })
        }
    }

    /// Holds model resolution until the gate is opened.
    struct GatedResolver {
        inner: StaticResolver,
        gate: Arc<Notify>,
    }

    impl ModelResolver for GatedResolver {
        fn resolve_backend(&self, id: BackendId) -> Result<BackendHandle> {
            self.inner.resolve_backend(id)
        }

        fn resolve_model<'a>(
            &'a self,
            id: ModelId,
            backend: &'a BackendHandle,
            progress: &'a ProgressSink,
        ) -> BoxFuture<'a, Result<ModelHandle>> {
            Box::pin(async move {
                self.gate.notified().await;
                self.inner.resolve_model(id, backend, progress).await
            })
        }
    }

    fn worker() -> UpscaleWorker {
        let resolver = Arc::new(StaticResolver {
            model: Arc::new(MockModel::new(2)),
        });
        UpscaleWorker::spawn(resolver, UpscaleConfig::default()).unwrap()
    }

    fn drain(handle: &mut JobHandle) -> Vec<WorkerResponse> {
        let mut out = Vec::new();
        while let Some(response) = handle.recv_blocking() {
            out.push(response);
        }
        out
    }

    #[test]
    fn test_job_runs_to_done() {
        let worker = worker();
        let mut handle = worker
            .submit(WorkerRequest::new(
                UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Cpu),
                PixelBuffer::new(100, 70),
            ))
            .unwrap();

        let responses = drain(&mut handle);
        let (last, progress) = responses.split_last().unwrap();

        assert!(!progress.is_empty());
        assert!(progress.iter().all(|r| !r.is_terminal()));
        match last {
            WorkerResponse::Done { done, output, info } => {
                assert!(*done);
                assert_eq!(output.len(), 200 * 140 * 4);
                assert_eq!(info, "200x140");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_backend_alerts() {
        let worker = worker();
        let mut handle = worker
            .submit(WorkerRequest::new(
                UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Gpu),
                PixelBuffer::new(8, 8),
            ))
            .unwrap();

        let responses = drain(&mut handle);
        assert_eq!(responses.len(), 1);
        assert!(matches!(
            &responses[0],
            WorkerResponse::Alert { alertmsg } if alertmsg.contains("gpu")
        ));
    }

    #[test]
    fn test_malformed_request_alerts() {
        let worker = worker();
        let mut request = WorkerRequest::new(
            UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Cpu),
            PixelBuffer::new(2, 2),
        );
        request.width = 3;
        let mut handle = worker.submit(request).unwrap();

        let responses = drain(&mut handle);
        assert_eq!(responses.len(), 1);
        assert!(responses[0].is_terminal());
    }

    #[test]
    fn test_cancelled_job_alerts() {
        let gate = Arc::new(Notify::new());
        let resolver = Arc::new(GatedResolver {
            inner: StaticResolver {
                model: Arc::new(MockModel::new(2)),
            },
            gate: Arc::clone(&gate),
        });
        let worker = UpscaleWorker::spawn(resolver, UpscaleConfig::default()).unwrap();

        let mut handle = worker
            .submit(WorkerRequest::new(
                UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Cpu),
                PixelBuffer::new(8, 8),
            ))
            .unwrap();
        handle.cancel();
        gate.notify_one();

        let responses = drain(&mut handle);
        assert_eq!(responses.len(), 1);
        match &responses[0] {
            WorkerResponse::Alert { alertmsg } => assert_eq!(alertmsg, "Upscaling cancelled"),
            other => panic!("expected cancellation alert, got {:?}", other),
        }
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let worker = worker();
        let mut first = worker
            .submit(WorkerRequest::new(
                UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Cpu),
                PixelBuffer::new(4, 4),
            ))
            .unwrap();
        let mut second = worker
            .submit(WorkerRequest::new(
                UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Cpu),
                PixelBuffer::new(6, 6),
            ))
            .unwrap();

        assert!(matches!(drain(&mut first).last(), Some(WorkerResponse::Done { .. })));
        assert!(matches!(drain(&mut second).last(), Some(WorkerResponse::Done { .. })));
        worker.shutdown();
    }
}
