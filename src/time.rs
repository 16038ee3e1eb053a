//! Platform-agnostic time utilities
//!
//! Debounce deadlines are plain `f64` seconds on a monotonic clock that
//! starts with the app.

use std::time::Duration;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub fn now_seconds() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now() / 1000.0)
        .unwrap_or(0.0)
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm")))]
pub fn now_seconds() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Time left until `deadline`, zero if it already passed
pub fn until(deadline: f64, now: f64) -> Duration {
    Duration::from_secs_f64((deadline - now).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_until() {
        assert_eq!(until(1.5, 1.0), Duration::from_millis(500));
        assert_eq!(until(1.0, 2.0), Duration::ZERO);
    }

    #[test]
    fn test_now_is_monotonic() {
        let a = now_seconds();
        let b = now_seconds();
        assert!(b >= a);
    }
}
