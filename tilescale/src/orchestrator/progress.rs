//! Progress events emitted by a running job.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::pixel::PixelBuffer;

/// An event in a job's lifetime.
///
/// Any number of `Progress` events are followed by exactly one `Done` or
/// `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum UpscalingProgress {
    Progress { percent: f32, message: String },
    Done { output: PixelBuffer },
    Failed { message: String },
}

impl UpscalingProgress {
    /// `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UpscalingProgress::Progress { .. })
    }
}

/// Callback receiving [`UpscalingProgress`] events.
#[derive(Clone)]
pub struct ProgressSink {
    inner: Arc<dyn Fn(UpscalingProgress) + Send + Sync>,
}

impl ProgressSink {
    pub fn new(f: impl Fn(UpscalingProgress) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Sink that drops every event.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Forward events into a channel. Events sent after the receiver is gone
    /// are dropped.
    pub fn from_sender(sender: UnboundedSender<UpscalingProgress>) -> Self {
        Self::new(move |event| {
            let _ = sender.send(event);
        })
    }

    pub fn emit(&self, event: UpscalingProgress) {
        (self.inner)(event)
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(!UpscalingProgress::Progress {
            percent: 50.0,
            message: String::new()
        }
        .is_terminal());
        assert!(UpscalingProgress::Failed {
            message: "x".to_string()
        }
        .is_terminal());
        assert!(UpscalingProgress::Done {
            output: PixelBuffer::new(1, 1)
        }
        .is_terminal());
    }

    #[test]
    fn test_sender_sink_forwards_and_tolerates_closed_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ProgressSink::from_sender(tx);

        sink.emit(UpscalingProgress::Failed {
            message: "boom".to_string(),
        });
        assert!(matches!(rx.try_recv(), Ok(UpscalingProgress::Failed { .. })));

        drop(rx);
        sink.emit(UpscalingProgress::Failed {
            message: "ignored".to_string(),
        });
    }
}
