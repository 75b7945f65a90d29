//! Recording sessions and the sample sequence they produce

use std::time::Duration;

use crate::capture::{
    interval_for, point_channel, CaptureError, MonitorInfo, Point, PointConsumer, PointerSource,
    Sampler,
};

/// Preview ring capacity. Overflow only costs preview animation, so this
/// just has to cover a few seconds without repaints.
const PREVIEW_CAPACITY: usize = 4096;

/// The ordered samples of one recording
#[derive(Debug, Clone)]
pub struct Recording {
    points: Vec<Point>,
    sample_rate_hz: u32,
    monitor: MonitorInfo,
}

impl Recording {
    pub fn new(monitor: MonitorInfo, sample_rate_hz: u32) -> Self {
        Self {
            points: Vec::new(),
            sample_rate_hz,
            monitor,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn monitor(&self) -> &MonitorInfo {
        &self.monitor
    }

    /// Wall-clock length of the recording
    pub fn recorded_duration(&self) -> Duration {
        interval_for(self.sample_rate_hz) * self.points.len() as u32
    }
}

/// A recording in progress: the sampler thread plus the preview feed
pub struct RecordingSession {
    sampler: Sampler,
    consumer: PointConsumer,
    live: Vec<Point>,
    recording: Recording,
}

impl RecordingSession {
    /// Start sampling `monitor` at `hz` with a fresh, empty sequence
    pub fn start<F, S, N>(
        make_source: F,
        monitor: MonitorInfo,
        hz: u32,
        on_sample: N,
    ) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Option<S> + Send + 'static,
        S: PointerSource,
        N: Fn() + Send + 'static,
    {
        let (producer, consumer) = point_channel(PREVIEW_CAPACITY);
        let sampler = Sampler::start(make_source, monitor.clone(), hz, producer, on_sample)?;
        let recording = Recording::new(monitor, sampler.hz());

        Ok(Self {
            sampler,
            consumer,
            live: Vec::new(),
            recording,
        })
    }

    /// Points delivered to the preview since the last call
    pub fn drain(&mut self) -> &[Point] {
        self.live.clear();
        self.consumer.drain_into(&mut self.live);
        &self.live
    }

    /// Samples taken so far
    pub fn len(&self) -> usize {
        if self.sampler.is_running() {
            self.sampler.appended()
        } else {
            self.recording.len()
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.recording.sample_rate_hz
    }

    pub fn interval(&self) -> Duration {
        interval_for(self.recording.sample_rate_hz)
    }

    /// Stop the sampler and take its sequence as the recording.
    ///
    /// After this the sequence no longer changes. Returns the last points
    /// still waiting for the preview.
    pub fn finish(&mut self) -> &[Point] {
        self.live.clear();
        if !self.sampler.is_running() {
            return &self.live;
        }

        self.recording.points = self.sampler.stop();

        let dropped = self.consumer.dropped();
        if dropped > 0 {
            log::debug!("Preview skipped {} point(s) while the UI was behind", dropped);
        }

        self.consumer.drain_into(&mut self.live);
        log::info!(
            "Recording stopped: {} samples at {} Hz ({:.2}s)",
            self.recording.len(),
            self.recording.sample_rate_hz,
            self.recording.recorded_duration().as_secs_f64()
        );
        &self.live
    }

    /// Stop if still running and hand over the frozen recording
    pub fn into_recording(mut self) -> Recording {
        self.finish();
        self.recording
    }
}
