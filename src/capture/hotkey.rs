//! Global start/stop hotkey
//!
//! Polls the keyboard state on a background thread so the hotkey also works
//! while the window is unfocused. The callback thread only raises a flag; the
//! UI thread consumes it once per frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use device_query::{DeviceQuery, DeviceState, Keycode};

use super::monitor::CaptureError;

const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Something that can report which keys are held down
pub trait KeySource {
    fn keys(&self) -> Vec<Keycode>;
}

impl KeySource for DeviceState {
    fn keys(&self) -> Vec<Keycode> {
        self.get_keys()
    }
}

/// Tracks press edges for a single key across polls
#[derive(Debug)]
struct EdgeDetector {
    key: Keycode,
    was_down: bool,
}

impl EdgeDetector {
    fn new(key: Keycode) -> Self {
        Self {
            key,
            was_down: false,
        }
    }

    /// Returns true only on the poll where the key goes from up to down
    fn update(&mut self, keys: &[Keycode]) -> bool {
        let down = keys.contains(&self.key);
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

/// Background watcher for the record toggle hotkey
pub struct HotkeyWatcher {
    pressed: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl HotkeyWatcher {
    /// Start watching `key` on the OS keyboard. `on_press` is called from the
    /// watcher thread.
    pub fn spawn<N>(key: Keycode, on_press: N) -> Result<Self, CaptureError>
    where
        N: Fn() + Send + 'static,
    {
        Self::spawn_with(key, DeviceState::checked_new, on_press)
    }

    /// Start watching `key` on the source built by `make_source`, which runs
    /// on the watcher thread. `None` from it fails the spawn.
    pub fn spawn_with<F, S, N>(key: Keycode, make_source: F, on_press: N) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Option<S> + Send + 'static,
        S: KeySource,
        N: Fn() + Send + 'static,
    {
        let pressed = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let pressed_flag = Arc::clone(&pressed);
        let running_flag = Arc::clone(&running);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<bool>(1);

        let handle = thread::Builder::new()
            .name("path-hotkey".to_string())
            .spawn(move || {
                let Some(source) = make_source() else {
                    let _ = ready_tx.send(false);
                    return;
                };
                let _ = ready_tx.send(true);
                let mut edge = EdgeDetector::new(key);

                while running_flag.load(Ordering::Relaxed) {
                    if edge.update(&source.keys()) {
                        log::debug!("Hotkey {:?} pressed", key);
                        pressed_flag.store(true, Ordering::Release);
                        on_press();
                    }
                    thread::park_timeout(POLL_INTERVAL);
                }
            })?;

        if ready_rx.recv() != Ok(true) {
            let _ = handle.join();
            return Err(CaptureError::InputUnavailable);
        }

        log::info!("Listening for {:?} hotkey", key);

        Ok(Self {
            pressed,
            running,
            handle: Some(handle),
        })
    }

    /// Consume a pending press, if any
    pub fn take_pressed(&self) -> bool {
        self.pressed.swap(false, Ordering::AcqRel)
    }
}

impl Drop for HotkeyWatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_fires_once_per_press() {
        let mut edge = EdgeDetector::new(Keycode::F8);

        assert!(!edge.update(&[]));
        assert!(edge.update(&[Keycode::F8]));
        // Held down: no repeat
        assert!(!edge.update(&[Keycode::F8]));
        assert!(!edge.update(&[Keycode::F8, Keycode::LShift]));
        assert!(!edge.update(&[]));
        assert!(edge.update(&[Keycode::F8]));
    }

    #[test]
    fn test_other_keys_ignored() {
        let mut edge = EdgeDetector::new(Keycode::F8);

        assert!(!edge.update(&[Keycode::F7]));
        assert!(!edge.update(&[Keycode::F9, Keycode::A]));
    }

    /// Reports F8 held for the first few polls, then nothing
    struct TapF8 {
        polls: std::cell::Cell<usize>,
    }

    impl KeySource for TapF8 {
        fn keys(&self) -> Vec<Keycode> {
            let n = self.polls.get();
            self.polls.set(n + 1);
            if n < 3 {
                vec![Keycode::F8]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn test_watcher_raises_flag_once() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_cb = Arc::clone(&calls);

        let watcher = HotkeyWatcher::spawn_with(
            Keycode::F8,
            || {
                Some(TapF8 {
                    polls: std::cell::Cell::new(0),
                })
            },
            move || {
                calls_cb.fetch_add(1, Ordering::Relaxed);
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(200));
        assert!(watcher.take_pressed());
        assert!(!watcher.take_pressed());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unreadable_keyboard_fails_spawn() {
        let result = HotkeyWatcher::spawn_with(Keycode::F8, || None::<TapF8>, || {});
        assert!(matches!(result, Err(CaptureError::InputUnavailable)));
    }
}
