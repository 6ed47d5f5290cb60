// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use tracing::{debug, info, warn};

use crate::field::{Editable, FieldKey, FieldValue};
use crate::model::BookingField;
use crate::remote::{
    ChildRecordSink, NoticeKind, Notifier, RemoteError, UNAVAILABLE_DATES_MESSAGE,
};
use crate::requested::RequestedMarkers;
use crate::submit::SubmitRejected;
use crate::validation::{ValidationReport, booking_schema, validate};
use crate::{ApartmentId, Booking, BookingDecision, BookingDraft, BookingId, BookingStatus};

/// A booking request that has been sent and not yet settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBooking {
    ticket: u64,
    pub draft: BookingDraft,
}

impl PendingBooking {
    pub const fn ticket(&self) -> u64 {
        self.ticket
    }

    pub const fn apartment_id(&self) -> ApartmentId {
        self.draft.apartment_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Requested(Booking),
    Failed(RemoteError),
    Rejected(SubmitRejected),
    Stale,
}

/// Booking form state for a tenant: the draft being typed, the request in
/// flight and the apartments already asked for.
#[derive(Debug, Clone)]
pub struct BookingComposer {
    draft: Option<BookingDraft>,
    in_flight: Option<u64>,
    next_ticket: u64,
    markers: RequestedMarkers,
    last_error: Option<RemoteError>,
    last_report: Option<ValidationReport>,
}

impl Default for BookingComposer {
    fn default() -> Self {
        Self {
            draft: None,
            in_flight: None,
            next_ticket: 1,
            markers: RequestedMarkers::default(),
            last_error: None,
            last_report: None,
        }
    }
}

impl BookingComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> Option<&BookingDraft> {
        self.draft.as_ref()
    }

    pub fn is_composing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn markers(&self) -> &RequestedMarkers {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut RequestedMarkers {
        &mut self.markers
    }

    pub fn last_error(&self) -> Option<&RemoteError> {
        self.last_error.as_ref()
    }

    pub fn last_report(&self) -> Option<&ValidationReport> {
        self.last_report.as_ref()
    }

    /// Opens a fresh draft for `apartment`. Refused while a request is in flight.
    pub fn start(&mut self, apartment: ApartmentId, start: Date, end: Date) -> bool {
        if self.is_saving() {
            return false;
        }
        self.draft = Some(BookingDraft::new(apartment, start, end));
        self.last_error = None;
        self.last_report = None;
        true
    }

    pub fn update_field(&mut self, field: BookingField, value: FieldValue) -> bool {
        if self.is_saving() {
            return false;
        }
        let Some(draft) = self.draft.as_mut() else {
            return false;
        };
        match draft.set_field(field, value) {
            Ok(()) => true,
            Err(error) => {
                warn!(field = field.name(), %error, "ignored booking field update");
                false
            }
        }
    }

    pub fn cancel(&mut self) {
        if !self.is_saving() {
            self.draft = None;
        }
    }

    pub fn begin(
        &mut self,
        notifier: &mut dyn Notifier,
    ) -> Result<PendingBooking, SubmitRejected> {
        if self.is_saving() {
            debug!("booking rejected: request already in flight");
            return Err(SubmitRejected::AlreadySaving);
        }
        let Some(draft) = &self.draft else {
            return Err(SubmitRejected::NotEditing);
        };

        let report = validate(draft, &booking_schema());
        if !report.is_valid() {
            notifier.notify(NoticeKind::Error, &report.summary());
            self.last_report = Some(report.clone());
            return Err(SubmitRejected::Invalid(report));
        }
        self.last_report = None;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.last_error = None;
        info!(
            apartment = draft.apartment_id.get(),
            start = %draft.start_date,
            end = %draft.end_date,
            ticket,
            "requesting booking"
        );
        Ok(PendingBooking {
            ticket,
            draft: draft.clone(),
        })
    }

    pub fn settle(
        &mut self,
        pending: PendingBooking,
        result: Result<Booking, RemoteError>,
        notifier: &mut dyn Notifier,
    ) -> BookingOutcome {
        if self.in_flight != Some(pending.ticket) {
            debug!(ticket = pending.ticket, "ignoring settle for a stale booking request");
            return BookingOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(booking) => {
                info!(
                    booking = booking.id.get(),
                    apartment = booking.apartment_id.get(),
                    "booking requested"
                );
                self.markers.mark(booking.apartment_id);
                self.draft = None;
                notifier.notify(NoticeKind::Success, "booking request sent");
                BookingOutcome::Requested(booking)
            }
            Err(error) => {
                warn!(apartment = pending.apartment_id().get(), %error, "booking request failed");
                notifier.notify(NoticeKind::Error, &booking_failure_message(&error));
                self.last_error = Some(error.clone());
                BookingOutcome::Failed(error)
            }
        }
    }

    /// Drops the in-flight request so its completion is ignored.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }

    pub fn submit<S>(&mut self, sink: &mut S, notifier: &mut dyn Notifier) -> BookingOutcome
    where
        S: ChildRecordSink + ?Sized,
    {
        let pending = match self.begin(notifier) {
            Ok(pending) => pending,
            Err(rejected) => return BookingOutcome::Rejected(rejected),
        };
        let result = sink.create_child_record(pending.apartment_id(), &pending.draft);
        self.settle(pending, result, notifier)
    }
}

/// Owner decision on a pending booking. The server refuses to approve a
/// booking that overlaps one already approved.
pub fn review_booking<S>(
    sink: &mut S,
    booking: BookingId,
    decision: BookingDecision,
    notifier: &mut dyn Notifier,
) -> Result<Booking, RemoteError>
where
    S: ChildRecordSink + ?Sized,
{
    match sink.decide_booking(booking, decision) {
        Ok(updated) => {
            info!(booking = booking.get(), decision = decision.as_str(), "booking reviewed");
            notifier.notify(
                NoticeKind::Success,
                &format!("booking {booking} {}", updated.status.as_str()),
            );
            Ok(updated)
        }
        Err(error) => {
            warn!(booking = booking.get(), decision = decision.as_str(), %error, "review failed");
            notifier.notify(NoticeKind::Error, &booking_failure_message(&error));
            Err(error)
        }
    }
}

/// User-facing text for a failed booking request or review. A conflict here
/// always means the dates are taken.
pub fn booking_failure_message(error: &RemoteError) -> String {
    match error {
        RemoteError::Conflict(detail) if detail.trim().is_empty() => {
            UNAVAILABLE_DATES_MESSAGE.to_owned()
        }
        RemoteError::Conflict(detail) => format!("{UNAVAILABLE_DATES_MESSAGE} ({detail})"),
        other => other.user_message(),
    }
}

/// Pending bookings whose dates overlap an approved booking of the same apartment.
pub fn conflicting_bookings(bookings: &[Booking]) -> Vec<BookingId> {
    bookings
        .iter()
        .filter(|booking| booking.status == BookingStatus::Pending)
        .filter(|pending| {
            bookings.iter().any(|other| {
                other.status == BookingStatus::Approved
                    && other.apartment_id == pending.apartment_id
                    && other.range().overlaps(&pending.range())
            })
        })
        .map(|booking| booking.id)
        .collect()
}
