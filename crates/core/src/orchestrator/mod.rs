//! Booking orchestration.
//!
//! The only component callers invoke directly. It coordinates the
//! availability guard, pricing engine, booking state machine, voucher issuer
//! and settlement ledger into end-to-end use cases.
//!
//! - `collaborators` - Clock, directories, discount policy, principals
//! - `types` - Requests, results and engine settings
//! - `error` - The error taxonomy surfaced to callers
//! - `service` - The use cases

pub mod collaborators;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod scenarios;

pub use collaborators::{
    AccommodationDirectory, AccommodationInfo, Clock, CollaboratorError, DiscountPolicy, FixedClock,
    GuestDirectory, NoDiscount, Principal, Role, StaticAccommodations, StaticGuests, SystemClock,
};
pub use error::{EngineError, ErrorKind};
pub use service::BookingOrchestrator;
pub use types::{BookingResult, CreateBookingRequest, EngineSettings};
