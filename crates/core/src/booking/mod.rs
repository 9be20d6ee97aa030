//! Booking lifecycle management.
//!
//! This module implements the booking state machine:
//! PENDING → CONFIRMED → CHECKED_IN → CHECKED_OUT, with CANCELLED reachable
//! from PENDING or CONFIRMED only.
//!
//! # Modules
//!
//! - `types` - Booking entity, states and transitions
//! - `error` - Booking-specific error types
//! - `service` - State transition logic

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::BookingError;
pub use service::BookingStateMachine;
pub use types::{Booking, BookingState, BookingTransition, DetailBooking};
