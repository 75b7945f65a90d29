//! Display enumeration and monitor-local coordinate mapping

use thiserror::Error;

use super::buffer::Point;

/// Errors that can occur while querying displays or input devices
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to enumerate displays: {0}")]
    Enumerate(#[from] xcap::XCapError),

    #[error("No displays found")]
    NoDisplays,

    #[error("Cannot read pointer or keyboard state (no display connection or missing permission)")]
    InputUnavailable,

    #[error("Failed to start worker thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// One display rectangle in global desktop coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub index: usize,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl MonitorInfo {
    pub fn new(index: usize, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            index,
            name: format!("Monitor {}", index + 1),
            x,
            y,
            width,
            height,
            is_primary: index == 0,
        }
    }

    /// List the connected displays in the order the OS reports them.
    ///
    /// Displays that report a zero size are skipped; indices stay dense.
    pub fn enumerate() -> Result<Vec<MonitorInfo>, CaptureError> {
        let monitors = xcap::Monitor::all()?;
        let mut result = Vec::with_capacity(monitors.len());

        for monitor in &monitors {
            let width = monitor.width().unwrap_or(0);
            let height = monitor.height().unwrap_or(0);
            if width == 0 || height == 0 {
                log::warn!("Skipping display with zero size");
                continue;
            }

            let index = result.len();
            let name = monitor
                .name()
                .ok()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("Monitor {}", index + 1));

            result.push(MonitorInfo {
                index,
                name,
                x: monitor.x().unwrap_or(0),
                y: monitor.y().unwrap_or(0),
                width,
                height,
                is_primary: monitor.is_primary().unwrap_or(false),
            });
        }

        if result.is_empty() {
            return Err(CaptureError::NoDisplays);
        }

        log::info!("Found {} display(s)", result.len());
        for m in &result {
            log::debug!("  {}: {}x{} at ({}, {})", m.name, m.width, m.height, m.x, m.y);
        }

        Ok(result)
    }

    /// Half-open containment test against the display rectangle
    pub fn contains(&self, gx: i32, gy: i32) -> bool {
        let (gx, gy) = (gx as i64, gy as i64);
        let (x, y) = (self.x as i64, self.y as i64);
        gx >= x && gx < x + self.width as i64 && gy >= y && gy < y + self.height as i64
    }

    /// Translate a global position to monitor-local coordinates.
    ///
    /// Returns `None` when the position is outside this display.
    pub fn to_local(&self, gx: i32, gy: i32) -> Option<Point> {
        if !self.contains(gx, gy) {
            return None;
        }
        Some(Point::new(gx - self.x, gy - self.y))
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Short label for the display selector
    pub fn label(&self) -> String {
        let primary = if self.is_primary { " (primary)" } else { "" };
        format!("{} - {}x{}{}", self.name, self.width, self.height, primary)
    }
}
