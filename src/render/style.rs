//! Path style and the timing values derived from it

use std::ops::RangeInclusive;
use std::time::Duration;

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use crate::capture::{MAX_HZ, MIN_HZ};

pub const THICKNESS_RANGE: RangeInclusive<u32> = 1..=30;
pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=10.0;
pub const SAMPLE_RATE_RANGE: RangeInclusive<u32> = MIN_HZ..=MAX_HZ;

/// How the traced path looks and how fast it is sampled and played back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathStyle {
    /// Line colour as sRGB
    pub color: [u8; 3],
    /// Line thickness in pixels
    pub thickness: u32,
    pub show_dots: bool,
    /// Samples per second while recording
    pub sample_rate_hz: u32,
    /// Playback speed multiplier for the exported video
    pub speed: f32,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: [237, 107, 255],
            thickness: 4,
            show_dots: true,
            sample_rate_hz: 30,
            speed: 1.0,
        }
    }
}

impl PathStyle {
    pub fn color32(&self) -> Color32 {
        let [r, g, b] = self.color;
        Color32::from_rgb(r, g, b)
    }

    /// Clamp every field into its valid range
    pub fn sanitized(mut self) -> Self {
        self.thickness = self
            .thickness
            .clamp(*THICKNESS_RANGE.start(), *THICKNESS_RANGE.end());
        self.sample_rate_hz = self
            .sample_rate_hz
            .clamp(*SAMPLE_RATE_RANGE.start(), *SAMPLE_RATE_RANGE.end());
        self.speed = if self.speed.is_finite() {
            self.speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end())
        } else {
            1.0
        };
        self
    }

    /// Radius of the dot stamped at the leading point of an exported frame
    pub fn export_dot_radius(&self) -> f32 {
        (self.thickness / 2 + 1) as f32
    }

    /// Radius of the dots drawn by the live preview
    pub fn preview_dot_radius(&self) -> f32 {
        (self.thickness / 2) as f32
    }
}

/// Video frame rate: one frame per sample, sped up by the playback multiplier
pub fn frame_rate(sample_rate_hz: u32, speed: f32) -> f64 {
    sample_rate_hz as f64 * speed as f64
}

/// Length of the exported video for `sample_count` samples
pub fn playback_duration(sample_count: usize, sample_rate_hz: u32, speed: f32) -> Duration {
    if sample_rate_hz == 0 || speed <= 0.0 {
        return Duration::ZERO;
    }
    let recorded = sample_count as f64 / sample_rate_hz as f64;
    Duration::from_secs_f64(recorded / speed as f64)
}
