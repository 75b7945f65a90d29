//! Video export: replay the recorded path into frames
//!
//! Lines accumulate on a persistent frame buffer, so the path traces in over
//! the length of the video. One frame is emitted per sample.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::Rgb;
use thiserror::Error;

use super::sink::{FfmpegSink, FrameSink, SinkConfig};
use crate::capture::Point;
use crate::render::raster::{draw_dot, draw_segment};
use crate::render::{frame_rate, playback_duration, PathStyle, ResolvedBackground};

/// Errors that can occur while exporting a video
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: no samples recorded")]
    Empty,

    #[error("ffmpeg not found (install it or set PATH_TRACE_FFMPEG)")]
    FfmpegNotFound,

    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoder failed ({status}): {stderr}")]
    Encoder { status: String, stderr: String },

    #[error("Frame is {actual:?}, encoder expects {expected:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Everything needed to render one recording to video
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub points: Arc<[Point]>,
    pub width: u32,
    pub height: u32,
    /// Rate the points were sampled at
    pub sample_rate_hz: u32,
    pub style: PathStyle,
    pub background: ResolvedBackground,
    pub output: PathBuf,
}

impl ExportJob {
    pub fn fps(&self) -> f64 {
        frame_rate(self.sample_rate_hz, self.style.speed)
    }

    pub fn duration(&self) -> Duration {
        playback_duration(self.points.len(), self.sample_rate_hz, self.style.speed)
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            path: self.output.clone(),
            width: self.width,
            height: self.height,
            fps: self.fps(),
        }
    }
}

/// What a finished export produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub frames: usize,
    pub fps: f64,
    pub duration: Duration,
    pub speed: f32,
}

impl ExportSummary {
    /// Text for the completion notice
    pub fn notice(&self) -> String {
        format!(
            "Video saved successfully!\n\nFPS: {:.1}\nDuration: {:.2} seconds\nSpeed: {:.1}x",
            self.fps,
            self.duration.as_secs_f64(),
            self.speed
        )
    }
}

/// Render `job` frame by frame into the sink returned by `open_sink`.
///
/// The sink is only opened when there is at least one sample, so an empty
/// recording never touches the output path. `progress` counts written frames.
pub fn export_video<S, F>(job: &ExportJob, open_sink: F, progress: &AtomicUsize) -> Result<ExportSummary, ExportError>
where
    S: FrameSink,
    F: FnOnce(&SinkConfig) -> Result<S, ExportError>,
{
    if job.points.is_empty() {
        return Err(ExportError::Empty);
    }

    let config = job.sink_config();
    let mut sink = open_sink(&config)?;

    let color = Rgb(job.style.color);
    let thickness = job.style.thickness as f32;
    let dot_radius = job.style.export_dot_radius();
    let mut frame = job.background.base_frame(job.width, job.height);

    for (i, curr) in job.points.iter().enumerate() {
        if i > 0 {
            let prev = job.points[i - 1];
            let to = (curr.x as f32, curr.y as f32);
            draw_segment(&mut frame, (prev.x as f32, prev.y as f32), to, thickness, color);
            if job.style.show_dots {
                draw_dot(&mut frame, to, dot_radius, color);
            }
        }
        sink.write_frame(&frame)?;
        progress.store(i + 1, Ordering::Relaxed);
    }

    sink.finish()?;

    let summary = ExportSummary {
        path: job.output.clone(),
        frames: job.points.len(),
        fps: config.fps,
        duration: job.duration(),
        speed: job.style.speed,
    };
    log::info!(
        "Exported {} frames at {:.1} fps ({:.2}s) to {}",
        summary.frames,
        summary.fps,
        summary.duration.as_secs_f64(),
        summary.path.display()
    );
    Ok(summary)
}

/// An export running on a background thread
pub struct ExportTask {
    progress: Arc<AtomicUsize>,
    total: usize,
    handle: Option<thread::JoinHandle<Result<ExportSummary, ExportError>>>,
}

impl ExportTask {
    /// Start exporting `job` through ffmpeg
    pub fn spawn(job: ExportJob) -> std::io::Result<Self> {
        let progress = Arc::new(AtomicUsize::new(0));
        let total = job.points.len();
        let counter = Arc::clone(&progress);

        let handle = thread::Builder::new()
            .name("path-export".to_string())
            .spawn(move || export_video(&job, FfmpegSink::spawn, &counter))?;

        Ok(Self {
            progress,
            total,
            handle: Some(handle),
        })
    }

    /// (frames written, total frames)
    pub fn progress(&self) -> (usize, usize) {
        (self.progress.load(Ordering::Relaxed), self.total)
    }

    /// The result, once the worker has finished
    pub fn poll(&mut self) -> Option<Result<ExportSummary, ExportError>> {
        if !self.handle.as_ref()?.is_finished() {
            return None;
        }
        let handle = self.handle.take()?;
        Some(handle.join().unwrap_or_else(|_| {
            Err(ExportError::Io(std::io::Error::other("export thread panicked")))
        }))
    }
}
