// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use arenda_app::{
    Apartment, ApartmentId, Booking, BookingDecision, BookingDraft, BookingId, BookingStatus,
    ChildRecordSink, CollectionKey, CollectionPage, CollectionSource, Profile, RecordSource,
    RecordWriter, RemoteError, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use time::OffsetDateTime;

pub const INVALID_PRICE_MESSAGE: &str = "price_per_month must be positive";

/// In-memory stand-in for the listings backend.
///
/// Behaves like the real server for the rules the client relies on: patches
/// merge at the top level, bookings that overlap an approved one are refused
/// with a conflict, and lists come back in fixed-size pages.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    apartments: BTreeMap<ApartmentId, Apartment>,
    profiles: BTreeMap<UserId, Profile>,
    bookings: Vec<Booking>,
    acting_user: UserId,
    page_size: usize,
    next_booking_id: i64,
    failures: VecDeque<RemoteError>,
    pub fetches: usize,
    pub writes: usize,
    pub creates: usize,
    pub decisions: usize,
    pub last_patch: Option<Map<String, Value>>,
}

impl FakeBackend {
    pub fn new(acting_user: UserId) -> Self {
        Self {
            apartments: BTreeMap::new(),
            profiles: BTreeMap::new(),
            bookings: Vec::new(),
            acting_user,
            page_size: 20,
            next_booking_id: 1,
            failures: VecDeque::new(),
            fetches: 0,
            writes: 0,
            creates: 0,
            decisions: 0,
            last_patch: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn acting_user(&self) -> UserId {
        self.acting_user
    }

    pub fn act_as(&mut self, user: UserId) {
        self.acting_user = user;
    }

    pub fn insert_apartment(&mut self, apartment: Apartment) {
        self.apartments.insert(apartment.id, apartment);
    }

    pub fn insert_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn insert_booking(&mut self, booking: Booking) {
        self.next_booking_id = self.next_booking_id.max(booking.id.get() + 1);
        self.bookings.push(booking);
    }

    pub fn apartment(&self, id: ApartmentId) -> Option<&Apartment> {
        self.apartments.get(&id)
    }

    pub fn profile(&self, id: UserId) -> Option<&Profile> {
        self.profiles.get(&id)
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// The next call of any kind fails with `error`.
    pub fn fail_next(&mut self, error: RemoteError) {
        self.failures.push_back(error);
    }

    fn injected_failure(&mut self) -> Result<(), RemoteError> {
        match self.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: Vec<T>, page: usize) -> CollectionPage<T> {
        if page == 0 {
            return CollectionPage::last(Vec::new());
        }
        let skipped = (page - 1) * self.page_size;
        let has_more = items.len() > skipped + self.page_size;
        let items = items
            .into_iter()
            .skip(skipped)
            .take(self.page_size)
            .collect();
        CollectionPage::new(items, Some(has_more))
    }

    fn approved_overlap(&self, apartment: ApartmentId, draft: &Booking) -> Option<BookingId> {
        self.bookings
            .iter()
            .find(|other| {
                other.id != draft.id
                    && other.apartment_id == apartment
                    && other.status == BookingStatus::Approved
                    && other.range().overlaps(&draft.range())
            })
            .map(|other| other.id)
    }
}

fn merge_patch<T>(record: &T, patch: &Map<String, Value>) -> Result<T, RemoteError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(record)
        .map_err(|error| RemoteError::Network(format!("encode record: {error}")))?;
    let Value::Object(fields) = &mut value else {
        return Err(RemoteError::Network("record is not an object".to_owned()));
    };
    for (key, patched) in patch {
        if !fields.contains_key(key) {
            return Err(RemoteError::Validation(format!("unknown field {key:?}")));
        }
        fields.insert(key.clone(), patched.clone());
    }
    serde_json::from_value(value).map_err(|error| RemoteError::Validation(error.to_string()))
}

impl RecordSource<Apartment> for FakeBackend {
    fn fetch_record(&mut self, id: i64) -> Result<Apartment, RemoteError> {
        self.fetches += 1;
        self.injected_failure()?;
        self.apartments
            .get(&ApartmentId::new(id))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("apartment {id}")))
    }
}

impl RecordSource<Profile> for FakeBackend {
    fn fetch_record(&mut self, id: i64) -> Result<Profile, RemoteError> {
        self.fetches += 1;
        self.injected_failure()?;
        self.profiles
            .get(&UserId::new(id))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("user {id}")))
    }
}

impl RecordWriter<Apartment> for FakeBackend {
    fn write_record(
        &mut self,
        id: i64,
        patch: &Map<String, Value>,
    ) -> Result<Apartment, RemoteError> {
        self.writes += 1;
        self.last_patch = Some(patch.clone());
        self.injected_failure()?;
        let id = ApartmentId::new(id);
        let current = self
            .apartments
            .get(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("apartment {id}")))?;
        let mut updated = merge_patch(current, patch)?;
        if updated.price_per_month <= 0 {
            return Err(RemoteError::Validation(INVALID_PRICE_MESSAGE.to_owned()));
        }
        updated.id = id;
        updated.title = updated.title.trim().to_owned();
        self.apartments.insert(id, updated.clone());
        Ok(updated)
    }
}

impl RecordWriter<Profile> for FakeBackend {
    fn write_record(&mut self, id: i64, patch: &Map<String, Value>) -> Result<Profile, RemoteError> {
        self.writes += 1;
        self.last_patch = Some(patch.clone());
        self.injected_failure()?;
        let id = UserId::new(id);
        let current = self
            .profiles
            .get(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("user {id}")))?;
        let mut updated = merge_patch(current, patch)?;
        updated.id = id;
        updated.username = updated.username.trim().to_lowercase();
        self.profiles.insert(id, updated.clone());
        Ok(updated)
    }
}

impl CollectionSource<Apartment> for FakeBackend {
    fn fetch_collection(
        &mut self,
        key: &CollectionKey,
        page: usize,
    ) -> Result<CollectionPage<Apartment>, RemoteError> {
        self.fetches += 1;
        self.injected_failure()?;
        let items: Vec<Apartment> = match key {
            CollectionKey::All => self.apartments.values().cloned().collect(),
            CollectionKey::Owner(owner) => self
                .apartments
                .values()
                .filter(|apartment| apartment.owner_id == *owner)
                .cloned()
                .collect(),
            other => {
                return Err(RemoteError::Validation(format!(
                    "apartments cannot be listed by {other:?}"
                )));
            }
        };
        Ok(self.page(items, page))
    }
}

impl CollectionSource<Booking> for FakeBackend {
    fn fetch_collection(
        &mut self,
        key: &CollectionKey,
        page: usize,
    ) -> Result<CollectionPage<Booking>, RemoteError> {
        self.fetches += 1;
        self.injected_failure()?;
        let items: Vec<Booking> = match key {
            CollectionKey::Tenant(tenant) => self
                .bookings
                .iter()
                .filter(|booking| booking.tenant_id == *tenant)
                .cloned()
                .collect(),
            CollectionKey::Apartment(apartment) => self
                .bookings
                .iter()
                .filter(|booking| booking.apartment_id == *apartment)
                .cloned()
                .collect(),
            other => {
                return Err(RemoteError::Validation(format!(
                    "bookings cannot be listed by {other:?}"
                )));
            }
        };
        Ok(self.page(items, page))
    }
}

impl ChildRecordSink for FakeBackend {
    fn create_child_record(
        &mut self,
        parent: ApartmentId,
        draft: &BookingDraft,
    ) -> Result<Booking, RemoteError> {
        self.creates += 1;
        self.injected_failure()?;
        if !self.apartments.contains_key(&parent) {
            return Err(RemoteError::NotFound(format!("apartment {parent}")));
        }
        if draft.end_date <= draft.start_date {
            return Err(RemoteError::Validation(
                "end_date must be after start_date".to_owned(),
            ));
        }

        let booking = Booking {
            id: BookingId::new(self.next_booking_id),
            apartment_id: parent,
            tenant_id: self.acting_user,
            start_date: draft.start_date,
            end_date: draft.end_date,
            message: draft.message.trim().to_owned(),
            status: BookingStatus::Pending,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        if let Some(existing) = self.approved_overlap(parent, &booking) {
            return Err(RemoteError::Conflict(format!(
                "overlaps approved booking {existing}"
            )));
        }
        self.next_booking_id += 1;
        self.bookings.push(booking.clone());
        Ok(booking)
    }

    fn decide_booking(
        &mut self,
        booking: BookingId,
        decision: BookingDecision,
    ) -> Result<Booking, RemoteError> {
        self.decisions += 1;
        self.injected_failure()?;
        let Some(index) = self.bookings.iter().position(|b| b.id == booking) else {
            return Err(RemoteError::NotFound(format!("booking {booking}")));
        };
        let current = self.bookings[index].clone();
        if current.status != BookingStatus::Pending {
            return Err(RemoteError::Validation(format!(
                "booking {booking} is already {}",
                current.status.as_str()
            )));
        }
        if decision == BookingDecision::Approve
            && let Some(existing) = self.approved_overlap(current.apartment_id, &current)
        {
            return Err(RemoteError::Conflict(format!(
                "overlaps approved booking {existing}"
            )));
        }
        self.bookings[index].status = decision.resulting_status();
        Ok(self.bookings[index].clone())
    }
}
