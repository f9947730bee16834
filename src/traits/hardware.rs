//! Hardware abstraction traits for door sensors, relay outputs, and time.
//!
//! This module defines the narrow hardware interfaces the door logic runs
//! against, so the same state machine works on an ESP32 and in desktop tests.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DoorSensor`] | Binary open/closed contact per door |
//! | [`RelayOutput`] | Momentary-contact relay driving the door opener |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use garage_doors::traits::{DoorSensor, RelayOutput, SensorReading};
//! use garage_doors::hal::{MockRelay, MockSensor};
//!
//! let mut sensor = MockSensor::new(SensorReading::Closed);
//! assert_eq!(sensor.read(), SensorReading::Closed);
//!
//! let mut relay = MockRelay::new();
//! relay.set_active(true);
//! assert!(relay.is_active());
//! ```

/// Raw reading of a door's position contact.
///
/// The contacts sit at the travel extremes, so a door in mid-travel reads the
/// same as a door that never left its previous extreme. The state estimator
/// disambiguates the two using elapsed time.
///
/// # Default
///
/// Defaults to [`Closed`](Self::Closed), matching the start-up door state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorReading {
    /// The contact reports the door open.
    Open,
    /// The contact reports the door closed.
    #[default]
    Closed,
}

impl SensorReading {
    /// Returns the reading as a lowercase string.
    ///
    /// # Examples
    ///
    /// ```
    /// use garage_doors::traits::SensorReading;
    ///
    /// assert_eq!(SensorReading::Open.as_str(), "open");
    /// assert_eq!(SensorReading::Closed.as_str(), "closed");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SensorReading::Open => "open",
            SensorReading::Closed => "closed",
        }
    }

    /// Map a logic level to a reading.
    ///
    /// Contacts are wired to ground through a pull-up, so an asserted
    /// (low) closed-position contact means the door is closed.
    #[inline]
    pub const fn from_level(is_low: bool) -> Self {
        if is_low {
            SensorReading::Closed
        } else {
            SensorReading::Open
        }
    }
}

/// Door position sensor trait.
///
/// Sampled once per door per tick. Reads must not block.
///
/// # Implementation Notes
///
/// - There is no error path: a stuck or broken contact simply reports a
///   steady value and the estimator ends up believing it
/// - Hardware implementations should log read failures and fall back to
///   the last good reading
pub trait DoorSensor {
    /// Sample the contact.
    fn read(&mut self) -> SensorReading;
}

/// Relay output trait.
///
/// Drives the relay wired in parallel with the opener's wall button. The
/// opener reacts to a pulse, so the relay is only ever energized briefly.
///
/// # Implementation Notes
///
/// - Writes must be idempotent: releasing an already released relay is
///   a no-op, and the pulser relies on that to release every tick
/// - Writes must not block
///
/// # Example Implementation
///
/// ```rust,ignore
/// use garage_doors::traits::RelayOutput;
///
/// struct MyRelay { /* pin handle */ active: bool }
///
/// impl RelayOutput for MyRelay {
///     fn set_active(&mut self, active: bool) {
///         // Relay boards are usually active-low
///         // pin.set_level(!active);
///         self.active = active;
///     }
///
///     fn is_active(&self) -> bool {
///         self.active
///     }
/// }
/// ```
pub trait RelayOutput {
    /// Energize (`true`) or release (`false`) the relay.
    fn set_active(&mut self, active: bool);

    /// Returns the last level written.
    fn is_active(&self) -> bool;

    /// Convenience method to energize the relay.
    fn energize(&mut self) {
        self.set_active(true);
    }

    /// Convenience method to release the relay.
    fn release(&mut self) {
        self.set_active(false);
    }
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for the motion windows and the
/// relay pulse. Elapsed times are always computed with `wrapping_sub`, so
/// a wrapping hardware counter is fine.
///
/// # Example
///
/// ```rust
/// use garage_doors::traits::Clock;
/// use garage_doors::hal::MockClock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed from `since_ms` to `now_ms`, safe across wraparound.
#[inline]
pub const fn elapsed_ms(now_ms: u64, since_ms: u64) -> u64 {
    now_ms.wrapping_sub(since_ms)
}
