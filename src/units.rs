//! Time quantities used when reporting episode results.
//!
//! Simulator telemetry arrives as raw `f64` seconds. Reports convert those
//! values into typed [`qtty`] quantities so downstream consumers cannot mix
//! up seconds and minutes.

use qtty::{Minute, Quantity, Second};

/// Simulated time measured in seconds.
pub type Seconds = Quantity<Second>;

/// Simulated time measured in minutes.
pub type Minutes = Quantity<Minute>;

/// Wraps a raw simulator time value (seconds) as a typed quantity.
#[inline]
pub fn seconds(value: f64) -> Seconds {
    Quantity::<Second>::new(value)
}

/// Converts a duration in seconds to minutes.
///
/// # Example
///
/// ```
/// use corridor::units::{seconds, to_minutes};
///
/// let m = to_minutes(seconds(90.0));
/// assert!((m.value() - 1.5).abs() < 1e-12);
/// ```
#[inline]
pub fn to_minutes(duration: Seconds) -> Minutes {
    duration.to::<Minute>()
}
