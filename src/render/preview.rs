//! Animated live preview of the path being recorded
//!
//! Each new sample is joined to the previous one by a short run of
//! interpolated sub-segments that appear one after another across the sample
//! interval, so the line grows smoothly instead of jumping.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke, TextureHandle, Vec2};

use super::background::ResolvedBackground;
use super::raster::FPoint;
use super::style::PathStyle;
use crate::capture::{MonitorInfo, Point};

/// Sub-segments drawn per sample interval
pub const SUB_STEPS: u32 = 4;

/// Linear interpolation between two points.
///
/// Written as `a(1-t) + bt` so both ends are reproduced exactly.
pub fn lerp(a: Point, b: Point, t: f32) -> FPoint {
    let (ax, ay) = (a.x as f32, a.y as f32);
    let (bx, by) = (b.x as f32, b.y as f32);
    (ax * (1.0 - t) + bx * t, ay * (1.0 - t) + by * t)
}

/// Largest rect with the given aspect ratio centred inside `available`
pub fn fit_rect(available: Rect, aspect: f32) -> Rect {
    if aspect <= 0.0 || !aspect.is_finite() {
        return available;
    }
    let size = if available.width() / available.height().max(1.0) > aspect {
        Vec2::new(available.height() * aspect, available.height())
    } else {
        Vec2::new(available.width(), available.width() / aspect)
    };
    Rect::from_center_size(available.center(), size)
}

/// One piece of the path in monitor-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    from: FPoint,
    to: FPoint,
}

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    segment: Segment,
}

/// Live path preview widget
pub struct LivePreview {
    last_point: Option<Point>,
    pending: VecDeque<Scheduled>,
    /// Revealed path as a polyline in monitor-local coordinates
    revealed: Vec<FPoint>,
    /// When the most recently scheduled sub-segment is due
    last_due: Option<Instant>,
    pairs: usize,
    background: Option<TextureHandle>,
    background_fill: Color32,
}

impl Default for LivePreview {
    fn default() -> Self {
        Self::new()
    }
}

impl LivePreview {
    pub fn new() -> Self {
        Self {
            last_point: None,
            pending: VecDeque::new(),
            revealed: Vec::with_capacity(8192),
            last_due: None,
            pairs: 0,
            background: None,
            background_fill: ResolvedBackground::default().fill_color(),
        }
    }

    /// Forget the previous path; called when a new recording starts
    pub fn clear(&mut self) {
        self.last_point = None;
        self.pending.clear();
        self.revealed.clear();
        self.last_due = None;
        self.pairs = 0;
    }

    /// Use `background` behind the path, uploading it as a texture if needed
    pub fn set_background(&mut self, ctx: &egui::Context, background: &ResolvedBackground) {
        self.background_fill = background.fill_color();
        self.background = background
            .color_image()
            .map(|image| ctx.load_texture("path-background", image, egui::TextureOptions::LINEAR));
    }

    /// Queue the animation from the previous sample to `point`.
    ///
    /// The sub-segments are spread over `interval`, starting at `now` or when
    /// the previously queued pair finishes, whichever is later.
    pub fn push(&mut self, point: Point, now: Instant, interval: Duration) {
        let Some(prev) = self.last_point.replace(point) else {
            return;
        };

        let start = self.last_due.map_or(now, |due| due.max(now));
        let step = interval / SUB_STEPS;

        for i in 1..=SUB_STEPS {
            let t_prev = (i - 1) as f32 / SUB_STEPS as f32;
            let t_curr = i as f32 / SUB_STEPS as f32;
            let due = start + step * i;
            self.pending.push_back(Scheduled {
                due,
                segment: Segment {
                    from: lerp(prev, point, t_prev),
                    to: lerp(prev, point, t_curr),
                },
            });
            self.last_due = Some(due);
        }
        self.pairs += 1;
    }

    /// Reveal every sub-segment that is due by `now`.
    ///
    /// Returns true while animation is still pending.
    pub fn advance(&mut self, now: Instant) -> bool {
        while self.pending.front().is_some_and(|s| s.due <= now) {
            if let Some(Scheduled { segment, .. }) = self.pending.pop_front() {
                if self.revealed.is_empty() {
                    self.revealed.push(segment.from);
                }
                self.revealed.push(segment.to);
            }
        }
        !self.pending.is_empty()
    }

    /// Vertices of the revealed path, in path order. Consecutive sub-segments
    /// share an end point, so this is every segment end after the first start.
    pub fn revealed(&self) -> &[FPoint] {
        &self.revealed
    }

    /// Number of sample pairs queued since the last clear
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// The path as shapes for `rect`: one polyline, plus a dot at every
    /// revealed sub-segment end when dots are on
    fn path_shapes(&self, rect: Rect, monitor_size: (u32, u32), style: &PathStyle) -> Vec<Shape> {
        if self.revealed.len() < 2 {
            return Vec::new();
        }

        let scale = Vec2::new(
            rect.width() / monitor_size.0.max(1) as f32,
            rect.height() / monitor_size.1.max(1) as f32,
        );
        let to_screen = |&(x, y): &FPoint| Pos2::new(rect.left() + x * scale.x, rect.top() + y * scale.y);

        let color = style.color32();
        let vertices: Vec<Pos2> = self.revealed.iter().map(to_screen).collect();
        let dot_radius = style.preview_dot_radius();
        let dots = style.show_dots && dot_radius > 0.0;

        let mut shapes = Vec::with_capacity(if dots { vertices.len() } else { 1 });
        if dots {
            shapes.extend(
                vertices[1..]
                    .iter()
                    .map(|&center| Shape::circle_filled(center, dot_radius, color)),
            );
        }
        // Path under the dots
        shapes.insert(0, Shape::line(vertices, Stroke::new(style.thickness as f32, color)));
        shapes
    }

    /// Draw the preview into `rect`, scaling from a `monitor_size` display
    pub fn paint(&self, painter: &egui::Painter, rect: Rect, monitor_size: (u32, u32), style: &PathStyle) {
        painter.rect_filled(rect, 0.0, self.background_fill);
        if let Some(texture) = &self.background {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }

        painter
            .with_clip_rect(rect)
            .extend(self.path_shapes(rect, monitor_size, style));
    }

    /// Allocate a canvas with the monitor's aspect ratio and paint into it
    pub fn show(&self, ui: &mut egui::Ui, monitor: &MonitorInfo, style: &PathStyle) -> egui::Response {
        let available = ui.available_rect_before_wrap();
        let canvas = fit_rect(available.shrink(8.0), monitor.aspect_ratio());

        let response = ui.allocate_rect(available, egui::Sense::hover());
        let painter = ui.painter_at(available);
        painter.rect_stroke(canvas.expand(2.0), 0.0, Stroke::new(2.0, Color32::from_gray(70)));
        self.paint(&painter, canvas, monitor.size(), style);

        response
    }
}
