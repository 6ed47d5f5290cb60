// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use tracing::debug;

use crate::{ApartmentId, Booking, UserId};

/// Apartments the current user has asked to book, for display only.
///
/// The server's booking list is authoritative; `reconcile` replaces whatever
/// was marked locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedMarkers {
    apartments: BTreeSet<ApartmentId>,
}

impl RequestedMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, apartment: ApartmentId) {
        self.apartments.insert(apartment);
    }

    pub fn is_requested(&self, apartment: ApartmentId) -> bool {
        self.apartments.contains(&apartment)
    }

    pub fn reconcile(&mut self, server_bookings: &[Booking], tenant: UserId) {
        let apartments: BTreeSet<ApartmentId> = server_bookings
            .iter()
            .filter(|booking| booking.tenant_id == tenant && booking.status.is_open())
            .map(|booking| booking.apartment_id)
            .collect();
        let dropped = self.apartments.difference(&apartments).count();
        debug!(
            tenant = tenant.get(),
            requested = apartments.len(),
            dropped,
            "reconciled requested markers"
        );
        self.apartments = apartments;
    }

    pub fn iter(&self) -> impl Iterator<Item = ApartmentId> + '_ {
        self.apartments.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.apartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apartments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::RequestedMarkers;
    use crate::{ApartmentId, Booking, BookingId, BookingStatus, UserId};
    use time::macros::{date, datetime};

    fn booking(id: i64, apartment: i64, tenant: i64, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(id),
            apartment_id: ApartmentId::new(apartment),
            tenant_id: UserId::new(tenant),
            start_date: date!(2025 - 07 - 01),
            end_date: date!(2025 - 07 - 10),
            message: String::new(),
            status,
            created_at: datetime!(2025-06-01 10:00 UTC),
        }
    }

    #[test]
    fn mark_is_local_until_reconciled() {
        let mut markers = RequestedMarkers::new();
        assert!(markers.is_empty());
        markers.mark(ApartmentId::new(3));
        markers.mark(ApartmentId::new(3));
        assert!(markers.is_requested(ApartmentId::new(3)));
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn reconcile_keeps_only_open_bookings_of_the_tenant() {
        let mut markers = RequestedMarkers::new();
        markers.mark(ApartmentId::new(9));

        let server = vec![
            booking(1, 1, 5, BookingStatus::Pending),
            booking(2, 2, 5, BookingStatus::Approved),
            booking(3, 3, 5, BookingStatus::Rejected),
            booking(4, 4, 6, BookingStatus::Pending),
            booking(5, 5, 5, BookingStatus::Cancelled),
        ];
        markers.reconcile(&server, UserId::new(5));

        let ids: Vec<i64> = markers.iter().map(ApartmentId::get).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(!markers.is_requested(ApartmentId::new(9)));
    }

    #[test]
    fn reconcile_with_no_bookings_clears_markers() {
        let mut markers = RequestedMarkers::new();
        markers.mark(ApartmentId::new(1));
        markers.reconcile(&[], UserId::new(1));
        assert!(markers.is_empty());
    }
}
