//! Contracts consumed from surrounding systems.
//!
//! The engine reads the current time, accommodation capacity and price,
//! guest ratings and discounts through these traits. Static implementations
//! are provided for embedding and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use staybook_shared::types::{AccommodationId, Money, UserId};
use thiserror::Error;

/// A collaborator call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator} failed: {message}")]
pub struct CollaboratorError {
    /// Which collaborator.
    pub collaborator: &'static str,
    /// What went wrong.
    pub message: String,
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `at`.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            seconds: AtomicI64::new(at.timestamp()),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

/// What the engine needs to know about an accommodation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccommodationInfo {
    /// Accommodation ID.
    pub id: AccommodationId,
    /// Maximum number of guests per booking.
    pub max_guest_capacity: u32,
    /// Current nightly price.
    pub price_per_night: Money,
    /// False while the accommodation is closed for bookings.
    pub is_operational: bool,
}

/// Accommodation lookup.
#[async_trait]
pub trait AccommodationDirectory: Send + Sync {
    /// Returns the accommodation, or `None` if it does not exist.
    async fn lookup(&self, id: AccommodationId) -> Result<Option<AccommodationInfo>, CollaboratorError>;
}

/// Guest reputation lookup.
#[async_trait]
pub trait GuestDirectory: Send + Sync {
    /// Average rating received by the guest.
    async fn average_rating(&self, guest_id: UserId) -> Result<Decimal, CollaboratorError>;
}

/// Promotion logic.
#[async_trait]
pub trait DiscountPolicy: Send + Sync {
    /// Discount for a stay, before rounding.
    async fn discount_for(
        &self,
        guest_id: UserId,
        accommodation_id: AccommodationId,
        sub_total: Money,
    ) -> Result<Money, CollaboratorError>;
}

/// No promotions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiscount;

#[async_trait]
impl DiscountPolicy for NoDiscount {
    async fn discount_for(
        &self,
        _guest_id: UserId,
        _accommodation_id: AccommodationId,
        _sub_total: Money,
    ) -> Result<Money, CollaboratorError> {
        Ok(Money::zero())
    }
}

/// Fixed set of accommodations.
#[derive(Debug, Default, Clone)]
pub struct StaticAccommodations {
    entries: HashMap<AccommodationId, AccommodationInfo>,
}

impl StaticAccommodations {
    /// Creates a directory holding `entries`.
    pub fn new(entries: impl IntoIterator<Item = AccommodationInfo>) -> Self {
        Self {
            entries: entries.into_iter().map(|info| (info.id, info)).collect(),
        }
    }
}

#[async_trait]
impl AccommodationDirectory for StaticAccommodations {
    async fn lookup(&self, id: AccommodationId) -> Result<Option<AccommodationInfo>, CollaboratorError> {
        Ok(self.entries.get(&id).copied())
    }
}

/// Fixed guest ratings; unknown guests get `default_rating`.
#[derive(Debug, Default, Clone)]
pub struct StaticGuests {
    ratings: HashMap<UserId, Decimal>,
    default_rating: Decimal,
}

impl StaticGuests {
    /// Creates a directory where every guest has `default_rating`.
    #[must_use]
    pub fn new(default_rating: Decimal) -> Self {
        Self {
            ratings: HashMap::new(),
            default_rating,
        }
    }

    /// Sets one guest's rating.
    #[must_use]
    pub fn with_rating(mut self, guest_id: UserId, rating: Decimal) -> Self {
        self.ratings.insert(guest_id, rating);
        self
    }
}

#[async_trait]
impl GuestDirectory for StaticGuests {
    async fn average_rating(&self, guest_id: UserId) -> Result<Decimal, CollaboratorError> {
        Ok(self.ratings.get(&guest_id).copied().unwrap_or(self.default_rating))
    }
}

/// Role claim issued by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Books stays.
    Guest,
    /// Owns accommodations.
    Host,
    /// Platform operator.
    Admin,
}

impl Role {
    /// Parses a role claim. `admin_claim` is the configured administrator claim.
    pub fn parse(claim: &str, admin_claim: &str) -> Option<Self> {
        let claim = claim.trim();
        if claim.eq_ignore_ascii_case(admin_claim) {
            return Some(Self::Admin);
        }
        match claim.to_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "host" => Some(Self::Host),
            _ => None,
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// The caller.
    pub user_id: UserId,
    /// The caller's role.
    pub role: Role,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns true if the caller may act on bookings owned by `owner`.
    #[must_use]
    pub fn may_manage(&self, owner: UserId) -> bool {
        self.role == Role::Admin || self.user_id == owner
    }
}
