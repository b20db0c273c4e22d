//! Upscale command - run one image through the tile pipeline.

use std::path::PathBuf;
use std::time::Instant;

use console::style;
use image::RgbaImage;
use indicatif::{ProgressBar, ProgressStyle};
use tilescale::{PixelBuffer, UpscalingOptions, WorkerRequest, WorkerResponse};

use super::common::{
    resolve_backend, resolve_model, resolve_upscale_config, BackendChoice, ModelChoice,
};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the upscale command.
pub struct UpscaleArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub model: Option<ModelChoice>,
    pub backend: Option<BackendChoice>,
    pub factor: Option<u32>,
    pub tile_size: Option<u32>,
    pub min_overlap: Option<u32>,
}

/// Run the upscale command.
pub fn run(args: UpscaleArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("upscale");
    let config = runner.config();

    let model = resolve_model(args.model, config);
    let backend = resolve_backend(args.backend, config);
    let factor = args.factor.unwrap_or_else(|| model.scale());
    let upscale = resolve_upscale_config(args.tile_size, args.min_overlap, config)?;

    let input = image::open(&args.input)?.to_rgba8();
    let (width, height) = input.dimensions();

    println!("Input:   {} ({}x{})", args.input.display(), width, height);
    println!("Model:   {} ({})", model, model.description());
    println!("Backend: {}", backend);
    println!(
        "Tiles:   {}px, {}px minimum overlap",
        upscale.tile_size, upscale.min_overlap
    );
    println!();

    let worker = runner.create_worker(upscale)?;
    let options = UpscalingOptions::new(model, backend, factor);
    let mut job = worker.submit(WorkerRequest::new(options, PixelBuffer::from(input)))?;

    let cancel = job.cancel_token();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Cancelling...");
        cancel.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let bar = progress_bar();
    let started = Instant::now();

    let output = loop {
        match job.recv_blocking() {
            Some(WorkerResponse::Progress { progress, info }) => {
                bar.set_position(progress.round() as u64);
                bar.set_message(info);
            }
            Some(WorkerResponse::Done { output, .. }) => {
                bar.finish_and_clear();
                break output;
            }
            Some(WorkerResponse::Alert { alertmsg }) => {
                bar.abandon();
                return Err(CliError::Upscale(alertmsg));
            }
            None => {
                bar.abandon();
                return Err(CliError::Disconnected);
            }
        }
    };
    worker.shutdown();

    let (out_width, out_height) = (width * factor, height * factor);
    let image = RgbaImage::from_raw(out_width, out_height, output).ok_or_else(|| {
        CliError::Image(format!(
            "worker returned a buffer that is not {}x{}",
            out_width, out_height
        ))
    })?;
    image.save(&args.output)?;

    println!(
        "{} {} ({}x{}) in {:.1}s",
        style("Wrote").green().bold(),
        args.output.display(),
        out_width,
        out_height,
        started.elapsed().as_secs_f64()
    );
    println!("{}", runner.metrics().snapshot());
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}
