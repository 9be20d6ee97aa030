//! Booking use cases.
//!
//! The orchestrator validates input, consults collaborators under a timeout,
//! prices the stay and hands each mutation to the store as one atomic unit.
//! It never retries: retryable failures surface as `ErrorKind::Unavailable`.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use staybook_shared::types::{AccommodationId, BookingId, UserId};
use tracing::{info, warn};

use crate::availability::guard::AvailabilityGuard;
use crate::availability::types::StayRange;
use crate::booking::error::BookingError;
use crate::booking::service::BookingStateMachine;
use crate::booking::types::Booking;
use crate::orchestrator::collaborators::{
    AccommodationDirectory, AccommodationInfo, Clock, CollaboratorError, DiscountPolicy, GuestDirectory,
    NoDiscount, Principal, Role, SystemClock,
};
use crate::orchestrator::error::EngineError;
use crate::orchestrator::types::{BookingResult, CreateBookingRequest, EngineSettings};
use crate::pricing::engine::PricingEngine;
use crate::pricing::policy::{FlatRateTax, TaxPolicy};
use crate::pricing::types::{GuestStanding, QuoteRequest};
use crate::settlement::error::SettlementError;
use crate::store::{BookingStore, CancelRequest, EntityKind, NewBooking, PaymentReceipt, RescheduledStay};
use crate::voucher::issuer::VoucherIssuer;
use crate::voucher::types::VoucherSnapshot;

/// Entry point for every booking use case.
pub struct BookingOrchestrator {
    store: Arc<dyn BookingStore>,
    accommodations: Arc<dyn AccommodationDirectory>,
    guests: Arc<dyn GuestDirectory>,
    discounts: Arc<dyn DiscountPolicy>,
    tax: Arc<dyn TaxPolicy>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl BookingOrchestrator {
    /// Creates an orchestrator with the flat tax from `settings`, no
    /// promotions, and the system clock.
    pub fn new(
        store: Arc<dyn BookingStore>,
        accommodations: Arc<dyn AccommodationDirectory>,
        guests: Arc<dyn GuestDirectory>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            accommodations,
            guests,
            discounts: Arc::new(NoDiscount),
            tax: Arc::new(FlatRateTax::new(settings.tax_rate)),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Replaces the discount policy.
    #[must_use]
    pub fn with_discount_policy(mut self, discounts: Arc<dyn DiscountPolicy>) -> Self {
        self.discounts = discounts;
        self
    }

    /// Replaces the tax policy.
    #[must_use]
    pub fn with_tax_policy(mut self, tax: Arc<dyn TaxPolicy>) -> Self {
        self.tax = tax;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds a principal from the auth layer's role claim.
    ///
    /// # Errors
    /// * `InvalidRole` for an unknown claim
    pub fn principal(&self, user_id: UserId, role_claim: &str) -> Result<Principal, EngineError> {
        Role::parse(role_claim, &self.settings.admin_role)
            .map(|role| Principal::new(user_id, role))
            .ok_or_else(|| EngineError::InvalidRole(role_claim.to_string()))
    }

    /// Reserves, prices and creates a PENDING booking.
    #[tracing::instrument(
        name = "booking.create",
        skip_all,
        fields(accommodation_id = %request.accommodation_id, guest_id = %request.guest_id)
    )]
    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<BookingResult, EngineError> {
        self.create(request)
            .await
            .inspect_err(|err| err.log("create_booking"))
    }

    /// Issues the voucher if needed, settles it and confirms the booking.
    ///
    /// Calling it again on a confirmed booking returns the current result
    /// without posting a second transaction.
    #[tracing::instrument(name = "booking.confirm_payment", skip_all, fields(%booking_id))]
    pub async fn confirm_payment(&self, booking_id: BookingId) -> Result<BookingResult, EngineError> {
        self.confirm(booking_id)
            .await
            .inspect_err(|err| err.log("confirm_payment"))
    }

    /// Cancels a booking on behalf of its guest or an administrator,
    /// refunding a paid voucher in the same unit.
    #[tracing::instrument(
        name = "booking.cancel",
        skip_all,
        fields(%booking_id, actor = %actor.user_id)
    )]
    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        actor: &Principal,
        reason: Option<String>,
    ) -> Result<BookingResult, EngineError> {
        self.cancel(booking_id, actor, reason)
            .await
            .inspect_err(|err| err.log("cancel_booking"))
    }

    /// CONFIRMED → CHECKED_IN, on or after the check-in date.
    #[tracing::instrument(name = "booking.check_in", skip_all, fields(%booking_id))]
    pub async fn check_in(&self, booking_id: BookingId) -> Result<BookingResult, EngineError> {
        self.arrive(booking_id)
            .await
            .inspect_err(|err| err.log("check_in"))
    }

    /// CHECKED_IN → CHECKED_OUT, on or after the check-out date.
    #[tracing::instrument(name = "booking.check_out", skip_all, fields(%booking_id))]
    pub async fn check_out(&self, booking_id: BookingId) -> Result<BookingResult, EngineError> {
        self.depart(booking_id)
            .await
            .inspect_err(|err| err.log("check_out"))
    }

    /// Moves a PENDING booking without voucher to new dates and re-prices it
    /// against its frozen nightly price, discount and fee terms.
    #[tracing::instrument(name = "booking.reschedule", skip_all, fields(%booking_id))]
    pub async fn reschedule_booking(
        &self,
        booking_id: BookingId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<BookingResult, EngineError> {
        self.reschedule(booking_id, check_in, check_out)
            .await
            .inspect_err(|err| err.log("reschedule_booking"))
    }

    /// Returns the booking's voucher with its postings.
    #[tracing::instrument(name = "booking.get_voucher", skip_all, fields(%booking_id))]
    pub async fn get_voucher(&self, booking_id: BookingId) -> Result<VoucherSnapshot, EngineError> {
        self.voucher_snapshot(booking_id)
            .await
            .inspect_err(|err| err.log("get_voucher"))
    }

    /// Returns the booking.
    #[tracing::instrument(name = "booking.get", skip_all, fields(%booking_id))]
    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        self.load_booking(booking_id)
            .await
            .inspect_err(|err| err.log("get_booking"))
    }

    async fn create(&self, request: CreateBookingRequest) -> Result<BookingResult, EngineError> {
        let stay = StayRange::new(request.check_in, request.check_out)?;
        AvailabilityGuard::validate_request(&stay, self.clock.today())?;

        let accommodation = self.accommodation(request.accommodation_id).await?;
        if request.number_of_guest == 0 || request.number_of_guest > accommodation.max_guest_capacity {
            return Err(EngineError::InvalidGuestCount {
                requested: request.number_of_guest,
                capacity: accommodation.max_guest_capacity,
            });
        }

        if let Some(account_id) = request.payment_method_id {
            let account = self
                .store
                .find_account(account_id)
                .await?
                .ok_or(EngineError::NotFound {
                    entity: EntityKind::FinancialAccount,
                    id: account_id.into_inner(),
                })?;
            if account.id_user != request.guest_id {
                return Err(SettlementError::AccountHolderMismatch {
                    account_id,
                    holder: account.id_user,
                    guest: request.guest_id,
                }
                .into());
            }
        }

        let service_fee = self
            .store
            .find_service_fee(request.service_fee_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: EntityKind::ServiceFee,
                id: request.service_fee_id.into_inner(),
            })?;
        let standing = GuestStanding {
            average_rating: self
                .call("guest directory", self.guests.average_rating(request.guest_id))
                .await?,
            completed_bookings: self.store.count_completed_bookings(request.guest_id).await?,
        };
        PricingEngine::check_eligibility(&service_fee, &standing)?;

        let discount = match request.discount {
            Some(discount) => discount,
            None => {
                let sub_total = PricingEngine::sub_total(accommodation.price_per_night, stay.nights())?;
                self.call(
                    "discount policy",
                    self.discounts
                        .discount_for(request.guest_id, accommodation.id, sub_total),
                )
                .await?
            }
        };

        let pricing = PricingEngine::quote(
            &QuoteRequest {
                price_per_night: accommodation.price_per_night,
                stay,
                discount,
                service_fee: service_fee.snapshot(),
            },
            self.tax.as_ref(),
        )?;

        let booking = self
            .store
            .reserve(NewBooking {
                creation_date: self.clock.now(),
                guest_id: request.guest_id,
                accommodation_id: accommodation.id,
                stay,
                number_of_guest: request.number_of_guest,
                service_fee: service_fee.snapshot(),
                pricing,
                selected_services: request.selected_services,
                payment_method_id: request.payment_method_id,
            })
            .await?;

        info!(
            booking_id = %booking.id,
            %stay,
            total = %booking.total_price,
            "Booking reserved"
        );
        Ok(BookingResult::from(&booking))
    }

    async fn confirm(&self, booking_id: BookingId) -> Result<BookingResult, EngineError> {
        let mut booking = self.load_booking(booking_id).await?;
        let now = self.clock.now();

        if booking.voucher_id.is_none() {
            let voucher = VoucherIssuer::issue(&booking, &self.settings.currency, now)?;
            let (linked, voucher) = self.store.attach_voucher(booking.id, booking.version, voucher).await?;
            info!(%booking_id, voucher_id = %voucher.id, total = %voucher.total, "Voucher issued");
            booking = linked;
        }

        match self.store.settle_payment(booking.id, booking.version, now).await? {
            PaymentReceipt::Settled {
                booking,
                voucher,
                transaction,
            } => {
                info!(
                    %booking_id,
                    voucher_id = %voucher.id,
                    transaction_id = %transaction.id,
                    amount = %transaction.amount,
                    "Payment settled, booking confirmed"
                );
                Ok(BookingResult::from(&booking))
            }
            PaymentReceipt::AlreadySettled { booking, .. } => {
                info!(%booking_id, "Payment already settled");
                Ok(BookingResult::from(&booking))
            }
        }
    }

    async fn cancel(
        &self,
        booking_id: BookingId,
        actor: &Principal,
        reason: Option<String>,
    ) -> Result<BookingResult, EngineError> {
        let booking = self.load_booking(booking_id).await?;
        if !actor.may_manage(booking.guest_id) {
            warn!(%booking_id, actor = %actor.user_id, "Cancellation refused");
            return Err(EngineError::Forbidden {
                actor: actor.user_id,
                booking_id,
            });
        }

        let receipt = self
            .store
            .cancel(
                booking.id,
                booking.version,
                CancelRequest {
                    cancelled_by: actor.user_id,
                    reason,
                    now: self.clock.now(),
                },
            )
            .await?;

        info!(
            %booking_id,
            refunded = receipt.refund.as_ref().map(|refund| refund.amount.to_string()),
            "Booking cancelled"
        );
        Ok(BookingResult::from(&receipt.booking))
    }

    async fn arrive(&self, booking_id: BookingId) -> Result<BookingResult, EngineError> {
        let booking = self.load_booking(booking_id).await?;
        let transition =
            BookingStateMachine::check_in(booking.state, booking.detail.check_in_date(), self.clock.now())?;
        let updated = self.store.transition(booking.id, booking.version, transition).await?;
        info!(%booking_id, "Guest checked in");
        Ok(BookingResult::from(&updated))
    }

    async fn depart(&self, booking_id: BookingId) -> Result<BookingResult, EngineError> {
        let booking = self.load_booking(booking_id).await?;
        let transition =
            BookingStateMachine::check_out(booking.state, booking.detail.check_out_date(), self.clock.now())?;
        let updated = self.store.transition(booking.id, booking.version, transition).await?;
        info!(%booking_id, "Guest checked out");
        Ok(BookingResult::from(&updated))
    }

    async fn reschedule(
        &self,
        booking_id: BookingId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<BookingResult, EngineError> {
        let booking = self.load_booking(booking_id).await?;
        if booking.voucher_id.is_some() || booking.state != BookingStateMachine::initial_state() {
            return Err(BookingError::NotReschedulable { state: booking.state }.into());
        }

        let stay = StayRange::new(check_in, check_out)?;
        AvailabilityGuard::validate_request(&stay, self.clock.today())?;

        let frozen = &booking.detail;
        let pricing = PricingEngine::quote(
            &QuoteRequest {
                price_per_night: frozen.price_night_accommodation(),
                stay,
                discount: frozen.pricing.discount,
                service_fee: frozen.service_fee,
            },
            self.tax.as_ref(),
        )?;

        let updated = self
            .store
            .reschedule(
                booking.id,
                booking.version,
                RescheduledStay {
                    stay,
                    pricing,
                    updated_at: self.clock.now(),
                },
            )
            .await?;

        info!(%booking_id, %stay, total = %updated.total_price, "Booking rescheduled");
        Ok(BookingResult::from(&updated))
    }

    async fn voucher_snapshot(&self, booking_id: BookingId) -> Result<VoucherSnapshot, EngineError> {
        let booking = self.load_booking(booking_id).await?;
        let voucher_id = booking.voucher_id.ok_or(EngineError::NotFound {
            entity: EntityKind::Voucher,
            id: booking_id.into_inner(),
        })?;
        let voucher = self
            .store
            .find_voucher(voucher_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: EntityKind::Voucher,
                id: voucher_id.into_inner(),
            })?;
        VoucherIssuer::verify_total(&voucher, &booking)?;

        let transactions = self.store.transactions_for_voucher(voucher_id).await?;
        Ok(VoucherSnapshot { voucher, transactions })
    }

    async fn load_booking(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        self.store
            .find_booking(booking_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: EntityKind::Booking,
                id: booking_id.into_inner(),
            })
    }

    async fn accommodation(&self, id: AccommodationId) -> Result<AccommodationInfo, EngineError> {
        let info = self
            .call("accommodation directory", self.accommodations.lookup(id))
            .await?
            .ok_or(EngineError::NotFound {
                entity: EntityKind::Accommodation,
                id: id.into_inner(),
            })?;
        if !info.is_operational {
            return Err(EngineError::AccommodationUnavailable(id));
        }
        Ok(info)
    }

    /// Awaits a collaborator call under the configured timeout.
    async fn call<T, F>(&self, collaborator: &'static str, call: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match tokio::time::timeout(self.settings.collaborator_timeout(), call).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(EngineError::CollaboratorTimeout {
                collaborator,
                timeout_ms: self.settings.collaborator_timeout_ms,
            }),
        }
    }
}
