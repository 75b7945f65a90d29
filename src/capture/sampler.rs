//! Fixed-rate cursor sampling on a worker thread
//!
//! Each tick reads the global pointer position, keeps it only if it lies on
//! the selected display, and appends the monitor-local point to the
//! worker's own sequence. A tick whose position falls outside the display is
//! skipped; it is never retried or interpolated. Every appended point is also
//! offered to the preview channel, which may drop it when full.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use device_query::{DeviceQuery, DeviceState};

use super::buffer::{Point, PointProducer};
use super::monitor::{CaptureError, MonitorInfo};

/// Lowest and highest accepted sampling rates
pub const MIN_HZ: u32 = 1;
pub const MAX_HZ: u32 = 120;

/// Something that can report the global pointer position
pub trait PointerSource {
    fn position(&self) -> (i32, i32);
}

/// Pointer position from the OS via `device_query`
pub struct DevicePointer {
    state: DeviceState,
}

impl DevicePointer {
    /// Connect to the OS input state, or `None` when it can't be read
    /// (no X display, or missing accessibility permission on macOS)
    pub fn checked_new() -> Option<Self> {
        DeviceState::checked_new().map(|state| Self { state })
    }
}

impl PointerSource for DevicePointer {
    fn position(&self) -> (i32, i32) {
        self.state.get_mouse().coords
    }
}

/// Sampling period for a rate in Hz (rates below 1 Hz are treated as 1 Hz)
pub fn interval_for(hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / hz.max(MIN_HZ) as f64)
}

/// One sampling tick: the monitor-local point, or `None` to skip the tick
pub fn sample_tick<S: PointerSource + ?Sized>(source: &S, monitor: &MonitorInfo) -> Option<Point> {
    let (gx, gy) = source.position();
    monitor.to_local(gx, gy)
}

/// Handle to a running sampler thread
pub struct Sampler {
    stop: Arc<AtomicBool>,
    appended: Arc<AtomicUsize>,
    handle: Option<thread::JoinHandle<Vec<Point>>>,
    hz: u32,
}

impl Sampler {
    /// Spawn the sampling thread.
    ///
    /// `make_source` runs on the worker, so the pointer source itself does not
    /// need to be `Send`. If it returns `None` no sampling happens and this
    /// returns [`CaptureError::InputUnavailable`]. `on_sample` is called after
    /// every appended point.
    pub fn start<F, S, N>(
        make_source: F,
        monitor: MonitorInfo,
        hz: u32,
        mut producer: PointProducer,
        on_sample: N,
    ) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Option<S> + Send + 'static,
        S: PointerSource,
        N: Fn() + Send + 'static,
    {
        let hz = hz.clamp(MIN_HZ, MAX_HZ);
        let interval = interval_for(hz);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let appended = Arc::new(AtomicUsize::new(0));
        let appended_count = Arc::clone(&appended);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<bool>(1);

        log::info!(
            "Starting sampler at {} Hz on {} ({}x{} at {}, {})",
            hz,
            monitor.name,
            monitor.width,
            monitor.height,
            monitor.x,
            monitor.y
        );

        let handle = thread::Builder::new()
            .name("path-sampler".to_string())
            .spawn(move || {
                let Some(source) = make_source() else {
                    let _ = ready_tx.send(false);
                    return Vec::new();
                };
                let _ = ready_tx.send(true);

                let mut points = Vec::new();
                let mut next_tick = Instant::now();
                let mut warned_full = false;

                while !stop_flag.load(Ordering::Acquire) {
                    if let Some(point) = sample_tick(&source, &monitor) {
                        points.push(point);
                        appended_count.store(points.len(), Ordering::Release);
                        if !producer.push(point) && !warned_full {
                            log::debug!("Preview channel full, preview is skipping points");
                            warned_full = true;
                        }
                        on_sample();
                    }

                    next_tick += interval;
                    let now = Instant::now();
                    if next_tick < now {
                        // Fell behind; don't burst to catch up
                        next_tick = now;
                    }

                    // Park until the next tick; stop() unparks us early
                    while !stop_flag.load(Ordering::Acquire) {
                        let now = Instant::now();
                        if now >= next_tick {
                            break;
                        }
                        thread::park_timeout(next_tick - now);
                    }
                }

                log::debug!("Sampler thread exiting after {} points", points.len());
                points
            })?;

        // A worker that dies before reporting counts as a failed source
        if ready_rx.recv() != Ok(true) {
            let _ = handle.join();
            log::error!("Pointer position is not readable, sampler not started");
            return Err(CaptureError::InputUnavailable);
        }

        Ok(Self {
            stop,
            appended,
            handle: Some(handle),
            hz,
        })
    }

    /// Effective sampling rate after clamping
    pub fn hz(&self) -> u32 {
        self.hz
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Points the worker has appended so far
    pub fn appended(&self) -> usize {
        self.appended.load(Ordering::Acquire)
    }

    /// Signal the worker to stop, wait for it to exit and take its sequence.
    ///
    /// Once this returns the sequence is frozen. A second call returns an
    /// empty `Vec`.
    pub fn stop(&mut self) -> Vec<Point> {
        self.stop.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Vec::new();
        };

        handle.thread().unpark();
        match handle.join() {
            Ok(points) => {
                log::info!("Sampler stopped with {} points", points.len());
                points
            }
            Err(_) => {
                log::error!("Sampler thread panicked");
                Vec::new()
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::buffer::point_channel;
    use std::cell::Cell;

    /// Replays a fixed list of positions, repeating the last one
    struct Scripted {
        positions: Vec<(i32, i32)>,
        next: Cell<usize>,
    }

    impl Scripted {
        fn new(positions: Vec<(i32, i32)>) -> Self {
            Self {
                positions,
                next: Cell::new(0),
            }
        }
    }

    impl PointerSource for Scripted {
        fn position(&self) -> (i32, i32) {
            let i = self.next.get().min(self.positions.len() - 1);
            self.next.set(self.next.get() + 1);
            self.positions[i]
        }
    }

    #[test]
    fn test_interval_for() {
        assert_eq!(interval_for(1), Duration::from_secs(1));
        assert_eq!(interval_for(4), Duration::from_millis(250));
        // Zero is clamped to 1 Hz rather than dividing by zero
        assert_eq!(interval_for(0), Duration::from_secs(1));
    }

    #[test]
    fn test_sample_tick_translates_inside() {
        let monitor = MonitorInfo::new(1, 100, 50, 800, 600);
        let source = Scripted::new(vec![(150, 60)]);

        assert_eq!(sample_tick(&source, &monitor), Some(Point::new(50, 10)));
    }

    #[test]
    fn test_sample_tick_skips_outside() {
        let monitor = MonitorInfo::new(1, 100, 50, 800, 600);
        let source = Scripted::new(vec![(99, 60), (900, 60), (150, 650), (150, 49)]);

        for _ in 0..4 {
            assert_eq!(sample_tick(&source, &monitor), None);
        }
    }

    #[test]
    fn test_worker_only_appends_points_on_monitor() {
        let monitor = MonitorInfo::new(0, 0, 0, 100, 100);
        let (producer, mut consumer) = point_channel(1024);
        let notified = Arc::new(AtomicUsize::new(0));
        let notified_cb = Arc::clone(&notified);

        // Alternate on and off the display, then settle inside it
        let script = vec![(10, 10), (500, 10), (20, 20), (-5, 5), (30, 30)];
        let mut sampler = Sampler::start(
            move || Some(Scripted::new(script)),
            monitor.clone(),
            MAX_HZ,
            producer,
            move || {
                notified_cb.fetch_add(1, Ordering::Relaxed);
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        let points = sampler.stop();
        assert!(!sampler.is_running());

        assert!(points.len() >= 3);
        assert_eq!(&points[..3], &[Point::new(10, 10), Point::new(20, 20), Point::new(30, 30)]);
        assert!(points
            .iter()
            .all(|p| p.x >= 0 && p.y >= 0 && p.x < 100 && p.y < 100));
        assert_eq!(notified.load(Ordering::Relaxed), points.len());

        // The preview saw the same points in the same order
        let mut previewed = Vec::new();
        consumer.drain_into(&mut previewed);
        assert_eq!(previewed, points);
    }

    #[test]
    fn test_stop_freezes_sequence() {
        let monitor = MonitorInfo::new(0, 0, 0, 100, 100);
        let (producer, mut consumer) = point_channel(1024);

        let mut sampler = Sampler::start(
            || Some(Scripted::new(vec![(1, 1)])),
            monitor,
            MAX_HZ,
            producer,
            || {},
        )
        .unwrap();
        thread::sleep(Duration::from_millis(30));
        let points = sampler.stop();
        let frozen = sampler.appended();
        assert_eq!(frozen, points.len());

        let mut previewed = Vec::new();
        consumer.drain_into(&mut previewed);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(consumer.drain_into(&mut previewed), 0);
        assert_eq!(sampler.appended(), frozen);

        // Already stopped: nothing more to hand over
        assert!(sampler.stop().is_empty());
    }

    #[test]
    fn test_stop_does_not_wait_for_slow_tick() {
        let monitor = MonitorInfo::new(0, 0, 0, 100, 100);
        let (producer, _consumer) = point_channel(16);

        let mut sampler = Sampler::start(
            || Some(Scripted::new(vec![(1, 1)])),
            monitor,
            MIN_HZ,
            producer,
            || {},
        )
        .unwrap();
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        sampler.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    /// Always on the display; counts every read
    struct Counting {
        reads: Arc<AtomicUsize>,
    }

    impl PointerSource for Counting {
        fn position(&self) -> (i32, i32) {
            let n = self.reads.fetch_add(1, Ordering::Relaxed) as i32;
            (n % 100, 5)
        }
    }

    #[test]
    fn test_full_preview_channel_keeps_every_sample() {
        let monitor = MonitorInfo::new(0, 0, 0, 100, 100);
        // Tiny ring that nobody drains
        let (producer, consumer) = point_channel(4);
        let reads = Arc::new(AtomicUsize::new(0));
        let source_reads = Arc::clone(&reads);

        let mut sampler = Sampler::start(
            move || Some(Counting { reads: source_reads }),
            monitor,
            MAX_HZ,
            producer,
            || {},
        )
        .unwrap();
        thread::sleep(Duration::from_millis(200));
        let points = sampler.stop();

        assert!(points.len() > 4);
        assert_eq!(points.len(), reads.load(Ordering::Relaxed));
        assert!(consumer.dropped() > 0);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(*point, Point::new(i as i32 % 100, 5));
        }
    }

    #[test]
    fn test_unreadable_pointer_fails_start() {
        let monitor = MonitorInfo::new(0, 0, 0, 100, 100);
        let (producer, _consumer) = point_channel(4);

        let result = Sampler::start(|| None::<Scripted>, monitor, 30, producer, || {});
        assert!(matches!(result, Err(CaptureError::InputUnavailable)));
    }
}
