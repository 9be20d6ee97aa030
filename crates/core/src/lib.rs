//! Core booking logic for Staybook.
//!
//! This crate contains the booking lifecycle and financial settlement engine
//! with ZERO web or database dependencies. Persistence is reached through the
//! [`store::BookingStore`] trait; everything else is pure calculation.
//!
//! # Modules
//!
//! - `availability` - Date-range overlap guard
//! - `pricing` - Stay quotes, service fees and tax policies
//! - `booking` - Booking entity and its lifecycle state machine
//! - `voucher` - Voucher issuance and payment-state transitions
//! - `settlement` - Ledger postings against financial accounts
//! - `store` - Persistence contract and the in-memory store
//! - `orchestrator` - End-to-end booking use cases

pub mod availability;
pub mod booking;
pub mod orchestrator;
pub mod pricing;
pub mod settlement;
pub mod store;
pub mod voucher;

pub use orchestrator::{BookingOrchestrator, EngineError, ErrorKind};
