//! Availability guard for accommodation calendars.
//!
//! Two stays `[a, b)` and `[c, d)` overlap iff `a < d && c < b`. The guard
//! itself is pure; the store runs it inside the same atomic unit as the
//! booking insert so that two concurrent requests cannot both pass.

pub mod error;
pub mod guard;
pub mod types;

#[cfg(test)]
mod guard_props;

pub use error::AvailabilityError;
pub use guard::AvailabilityGuard;
pub use types::{BookedRange, StayRange};
