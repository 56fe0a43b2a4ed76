//! Sleep policy for the sync loop
//!
//! All waits go through [`Sleeper`] so tests can observe them without
//! actually blocking.

use log::debug;
use std::time::Duration;

/// Extra margin added on top of a server-mandated rate-limit wait
pub const RATE_LIMIT_MARGIN: Duration = Duration::from_secs(1);

/// Default pause between consecutive versions
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// A blocking wait
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        debug!("sleep({:.2})", duration.as_secs_f64());
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// How long to wait before retrying after a rate-limit signal
///
/// # Arguments
/// * `mandated` - The wait the service asked for
pub fn rate_limit_delay(mandated: Duration) -> Duration {
    mandated + RATE_LIMIT_MARGIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_rate_limit_delay_adds_one_second() {
        assert_eq!(rate_limit_delay(Duration::from_secs(5)), Duration::from_secs(6));
        assert_eq!(rate_limit_delay(Duration::ZERO), Duration::from_secs(1));
    }

    #[test]
    fn test_sleeper_through_reference() {
        struct Recorder(Mutex<Vec<Duration>>);
        impl Sleeper for Recorder {
            fn sleep(&self, duration: Duration) {
                self.0.lock().unwrap().push(duration);
            }
        }

        let recorder = Recorder(Mutex::new(Vec::new()));
        let by_ref = &recorder;
        by_ref.sleep(Duration::from_millis(10));

        assert_eq!(*recorder.0.lock().unwrap(), vec![Duration::from_millis(10)]);
    }

    #[test]
    fn test_thread_sleeper_zero() {
        ThreadSleeper.sleep(Duration::ZERO);
    }
}
