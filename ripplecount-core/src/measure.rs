//! Host Time Source
//!
//! `std::time::Instant`-backed implementation of [`TimeSource`] for running
//! the clock generator directly on a host CPU, plus CPU pinning to keep the
//! busy-poll loop on one core.

use crate::hal::TimeSource;
use std::time::Instant;

/// Monotonic host clock measured from construction
#[derive(Debug, Clone, Copy)]
pub struct HostTime {
    origin: Instant,
}

impl HostTime {
    /// Start a new time source at zero
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for HostTime {
    #[inline(always)]
    fn millis(&mut self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    #[inline(always)]
    fn micros(&mut self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Set CPU affinity to pin the current thread to a specific core
///
/// Avoids core migrations in the middle of a toggle loop.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Set CPU affinity (no-op on this platform)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    // CPU pinning not supported on this platform
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::spin_wait_us;

    #[test]
    fn test_host_time_monotonic() {
        let mut time = HostTime::new();
        let a = time.micros();
        let b = time.micros();
        assert!(b >= a);
    }

    #[test]
    fn test_host_spin_wait() {
        let mut time = HostTime::new();
        let start = Instant::now();
        spin_wait_us(&mut time, 2_000);

        // Should be at least 2ms
        assert!(start.elapsed().as_micros() >= 2_000);
    }

    #[test]
    fn test_millis_tracks_micros() {
        let mut time = HostTime::new();
        let us = time.micros();
        let ms = time.millis();
        assert!(ms <= us / 1000 + 1);
    }
}
