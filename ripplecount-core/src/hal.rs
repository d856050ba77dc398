//! Hardware Collaborators
//!
//! Minimal digital I/O and time traits consumed by the measurement core.
//! Implementations exist for the host (`HostTime`), for the simulated rig
//! used by the CLI and the tests, and can be written for any GPIO backend.

/// A digital output line (e.g. "reset", "clock")
pub trait DigitalOutput {
    /// Drive the line to `level` (`true` = high)
    fn write(&mut self, level: bool);
}

/// A digital input line mapped to one bus bit
pub trait DigitalInput {
    /// Read the current level of the line (`true` = high)
    fn read(&mut self) -> bool;
}

/// Monotonic time source
///
/// Both counters may wrap. Callers only ever compare differences computed
/// with `wrapping_sub`, never absolute values.
pub trait TimeSource {
    /// Milliseconds since an arbitrary origin
    fn millis(&mut self) -> u64;
    /// Microseconds since an arbitrary origin
    fn micros(&mut self) -> u64;
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for &mut T {
    fn write(&mut self, level: bool) {
        (**self).write(level)
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for &mut T {
    fn read(&mut self) -> bool {
        (**self).read()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &mut T {
    fn millis(&mut self) -> u64 {
        (**self).millis()
    }

    fn micros(&mut self) -> u64 {
        (**self).micros()
    }
}

/// Spin until `us` microseconds have elapsed on `time`.
///
/// Busy-polls; never sleeps.
#[inline]
pub fn spin_wait_us<T: TimeSource + ?Sized>(time: &mut T, us: u64) {
    let start = time.micros();
    while time.micros().wrapping_sub(start) < us {
        std::hint::spin_loop();
    }
}

/// Spin until `ms` milliseconds have elapsed on `time`.
#[inline]
pub fn spin_wait_ms<T: TimeSource + ?Sized>(time: &mut T, ms: u64) {
    let start = time.millis();
    while time.millis().wrapping_sub(start) < ms {
        std::hint::spin_loop();
    }
}

/// The set of physical collaborators one trial exclusively owns
pub struct Rig<O, I, T> {
    /// Counter reset line
    pub reset: O,
    /// Generated clock line
    pub clock: O,
    /// Counter output bus
    pub bus: crate::bus::BusSampler<I>,
    /// Monotonic time source
    pub time: T,
}
