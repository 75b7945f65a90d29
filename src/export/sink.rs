//! Frame sinks: where rendered export frames go
//!
//! The production sink pipes raw RGB frames into an `ffmpeg` child process,
//! which handles encoding and the container.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;

use image::RgbImage;

use super::ExportError;

/// Environment variable that overrides the encoder binary
pub const FFMPEG_ENV: &str = "PATH_TRACE_FFMPEG";

/// Output parameters handed to a sink when it is opened
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Receives export frames in order
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), ExportError>;

    /// Flush and close the output
    fn finish(self) -> Result<(), ExportError>;
}

/// Encoder binary: `$PATH_TRACE_FFMPEG` if set, otherwise `ffmpeg` from PATH
pub fn ffmpeg_binary() -> OsString {
    std::env::var_os(FFMPEG_ENV)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| OsString::from("ffmpeg"))
}

/// Arguments for encoding `rgb24` frames from stdin into `config.path`
pub fn ffmpeg_args(config: &SinkConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    args.push(format!("{}x{}", config.width, config.height).into());
    args.push("-r".into());
    args.push(format!("{:.3}", config.fps).into());
    args.extend(
        [
            "-i",
            "-",
            // yuv420p needs even dimensions
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-c:v",
            "mpeg4",
            "-q:v",
            "2",
            "-pix_fmt",
            "yuv420p",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(config.path.clone().into_os_string());
    args
}

/// Sink that streams frames to an `ffmpeg` process
pub struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<thread::JoinHandle<String>>,
    width: u32,
    height: u32,
}

impl FfmpegSink {
    /// Start the encoder from [`ffmpeg_binary`]
    pub fn spawn(config: &SinkConfig) -> Result<Self, ExportError> {
        Self::spawn_with(&ffmpeg_binary(), config)
    }

    /// Start `binary` as the encoder with the arguments for `config`
    pub fn spawn_with(binary: &OsStr, config: &SinkConfig) -> Result<Self, ExportError> {
        if !(config.fps.is_finite() && config.fps > 0.0) {
            return Err(ExportError::InvalidFrameRate(config.fps));
        }

        log::info!(
            "Starting encoder {:?}: {}x{} @ {:.3} fps -> {}",
            binary,
            config.width,
            config.height,
            config.fps,
            config.path.display()
        );

        let mut child = Command::new(binary)
            .args(ffmpeg_args(config))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ExportError::FfmpegNotFound,
                _ => ExportError::Io(e),
            })?;

        let stdin = child.stdin.take();
        // Drain stderr concurrently so ffmpeg never blocks on a full pipe
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                if let Err(e) = pipe.read_to_string(&mut text) {
                    text = format!("<failed to read ffmpeg stderr: {}>", e);
                }
                text
            })
        });

        Ok(Self {
            child: Some(child),
            stdin,
            stderr,
            width: config.width,
            height: config.height,
        })
    }

    /// Close stdin, wait for the process and turn a failure into an error
    fn wait(&mut self) -> Result<(), ExportError> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if status.success() {
            if !stderr.trim().is_empty() {
                log::warn!("ffmpeg: {}", stderr.trim());
            }
            Ok(())
        } else {
            Err(ExportError::Encoder {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), ExportError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(ExportError::FrameSize {
                expected: (self.width, self.height),
                actual: frame.dimensions(),
            });
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ExportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)))?;

        if let Err(e) = stdin.write_all(frame.as_raw()) {
            // The encoder exited early; its stderr explains why
            return match self.wait() {
                Err(encoder_err) => Err(encoder_err),
                Ok(()) => Err(ExportError::Io(e)),
            };
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(), ExportError> {
        self.wait()
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(fps: f64) -> SinkConfig {
        SinkConfig {
            path: PathBuf::from("/tmp/out.mp4"),
            width: 1920,
            height: 1080,
            fps,
        }
    }

    #[test]
    fn test_args_describe_raw_input() {
        let args: Vec<String> = ffmpeg_args(&config(45.0))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let after = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };

        assert_eq!(after("-f"), "rawvideo");
        assert_eq!(after("-s"), "1920x1080");
        assert_eq!(after("-r"), "45.000");
        assert_eq!(after("-i"), "-");
        assert_eq!(after("-c:v"), "mpeg4");
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
        assert_eq!(args[0], "-y");
    }

    #[test]
    fn test_fractional_frame_rate() {
        let args = ffmpeg_args(&config(0.1 * 30.0));
        assert!(args.iter().any(|a| a == "3.000"));
    }

    #[test]
    fn test_spawn_rejects_bad_frame_rate() {
        assert!(matches!(
            FfmpegSink::spawn(&config(0.0)),
            Err(ExportError::InvalidFrameRate(_))
        ));
        assert!(matches!(
            FfmpegSink::spawn(&config(f64::NAN)),
            Err(ExportError::InvalidFrameRate(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_binary_is_not_found() {
        let result = FfmpegSink::spawn_with(OsStr::new("/nonexistent/path-trace-ffmpeg"), &config(30.0));
        assert!(matches!(result, Err(ExportError::FfmpegNotFound)));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_encoder_reports_status() {
        let sink = FfmpegSink::spawn_with(OsStr::new("false"), &config(30.0)).unwrap();
        match sink.finish() {
            Err(ExportError::Encoder { status, .. }) => assert!(!status.is_empty()),
            other => panic!("expected an encoder error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_write_after_failed_exit_reports_status() {
        let large = SinkConfig {
            width: 2000,
            height: 2000,
            ..config(30.0)
        };
        let mut sink = FfmpegSink::spawn_with(OsStr::new("false"), &large).unwrap();

        // Far larger than a pipe buffer, so the write sees the closed pipe
        let frame = RgbImage::new(2000, 2000);
        assert!(matches!(
            sink.write_frame(&frame),
            Err(ExportError::Encoder { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_early_clean_exit_is_broken_pipe() {
        let large = SinkConfig {
            width: 2000,
            height: 2000,
            ..config(30.0)
        };
        let mut sink = FfmpegSink::spawn_with(OsStr::new("true"), &large).unwrap();

        let frame = RgbImage::new(2000, 2000);
        match sink.write_frame(&frame) {
            Err(ExportError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected a broken pipe, got {:?}", other),
        }

        // Nothing left to close
        assert!(sink.finish().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let mut sink = FfmpegSink::spawn_with(OsStr::new("true"), &config(30.0)).unwrap();
        let result = sink.write_frame(&RgbImage::new(10, 10));
        assert!(matches!(
            result,
            Err(ExportError::FrameSize {
                expected: (1920, 1080),
                actual: (10, 10)
            })
        ));
    }
}
