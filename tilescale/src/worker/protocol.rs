//! Messages crossing the worker boundary.
//!
//! Field names match the JSON the worker speaks:
//!
//! ```text
//! request   {"model":"slim-2x","backend":"cpu","factor":2,"width":W,"height":H,"input":[…]}
//! progress  {"progress":50.0,"info":"Upscaled tile 3/6"}
//! done      {"done":true,"output":[…],"info":"200x300"}
//! failure   {"alertmsg":"Failed to load model slim-2x: …"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::inference::BackendId;
use crate::orchestrator::{UpscaleRequest, UpscalingOptions, UpscalingProgress};
use crate::pixel::PixelBuffer;
use crate::registry::ModelId;

/// A job submitted to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub model: ModelId,
    pub backend: BackendId,
    pub factor: u32,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, `width * height * 4` bytes.
    pub input: Vec<u8>,
}

impl WorkerRequest {
    /// Build a request, moving the pixels out of `input`.
    pub fn new(options: UpscalingOptions, input: PixelBuffer) -> Self {
        Self {
            model: options.model,
            backend: options.backend,
            factor: options.factor,
            width: input.width(),
            height: input.height(),
            input: input.into_raw(),
        }
    }

    pub fn options(&self) -> UpscalingOptions {
        UpscalingOptions::new(self.model, self.backend, self.factor)
    }

    /// Validate the payload and turn it into a job.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBuffer` if `input` does not hold `width * height` pixels.
    pub fn into_request(self) -> Result<UpscaleRequest> {
        let options = self.options();
        let input = PixelBuffer::from_raw(self.width, self.height, self.input)?;
        Ok(UpscaleRequest::new(options, input))
    }
}

/// A message from the worker about a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    Progress {
        progress: f32,
        info: String,
    },
    Done {
        done: bool,
        output: Vec<u8>,
        info: String,
    },
    Alert {
        alertmsg: String,
    },
}

impl WorkerResponse {
    /// `Done` or `Alert`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerResponse::Progress { .. })
    }
}

impl From<UpscalingProgress> for WorkerResponse {
    fn from(event: UpscalingProgress) -> Self {
        match event {
            UpscalingProgress::Progress { percent, message } => WorkerResponse::Progress {
                progress: percent,
                info: message,
            },
            UpscalingProgress::Done { output } => WorkerResponse::Done {
                done: true,
                info: format!("{}x{}", output.width(), output.height()),
                output: output.into_raw(),
            },
            UpscalingProgress::Failed { message } => WorkerResponse::Alert { alertmsg: message },
        }
    }
}
