// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::field::{Editable, FieldError, FieldKey, FieldKind, FieldValue, expect_kind};
use crate::ids::*;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Rented,
    Archived,
}

impl ListingStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Rented, Self::Archived];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Rented => "rented",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "rented" => Some(Self::Rented),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Pending and approved bookings hold the apartment for their dates.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingDecision {
    Approve,
    Reject,
}

impl BookingDecision {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub const fn resulting_status(self) -> BookingStatus {
        match self {
            Self::Approve => BookingStatus::Approved,
            Self::Reject => BookingStatus::Rejected,
        }
    }
}

/// Monthly price ranges offered by the listing search, in tenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceBucket {
    Under100k,
    From100kTo200k,
    From200kTo300k,
    Over300k,
}

impl PriceBucket {
    pub const ALL: [Self; 4] = [
        Self::Under100k,
        Self::From100kTo200k,
        Self::From200kTo300k,
        Self::Over300k,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Under100k => "under-100k",
            Self::From100kTo200k => "100k-200k",
            Self::From200kTo300k => "200k-300k",
            Self::Over300k => "over-300k",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "under-100k" => Some(Self::Under100k),
            "100k-200k" => Some(Self::From100kTo200k),
            "200k-300k" => Some(Self::From200kTo300k),
            "over-300k" => Some(Self::Over300k),
            _ => None,
        }
    }

    pub const fn contains(self, price: i64) -> bool {
        match self {
            Self::Under100k => price < 100_000,
            Self::From100kTo200k => price >= 100_000 && price <= 200_000,
            Self::From200kTo300k => price > 200_000 && price <= 300_000,
            Self::Over300k => price > 300_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomCount {
    One,
    Two,
    Three,
    FourPlus,
}

impl RoomCount {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::FourPlus => "4+",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1" => Some(Self::One),
            "2" => Some(Self::Two),
            "3" => Some(Self::Three),
            "4+" | "4" => Some(Self::FourPlus),
            _ => None,
        }
    }

    pub const fn contains(self, rooms: i64) -> bool {
        match self {
            Self::One => rooms == 1,
            Self::Two => rooms == 2,
            Self::Three => rooms == 3,
            Self::FourPlus => rooms >= 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    pub city: String,
    pub district: String,
    pub street: String,
    pub building: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: ApartmentId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub address: Address,
    pub price_per_month: i64,
    pub rooms: i64,
    pub area_sqm: f64,
    pub floor: Option<i64>,
    #[serde(default)]
    pub utilities: Vec<String>,
    pub status: ListingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Budget {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub telegram: String,
    pub bio: String,
    #[serde(default)]
    pub budget: Budget,
    pub preferred_district: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

impl DateRange {
    pub const fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Both ends are inclusive.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub apartment_id: ApartmentId,
    pub tenant_id: UserId,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub message: String,
    pub status: BookingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Booking {
    pub const fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Booking request as typed into the booking form before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingDraft {
    #[serde(skip_serializing)]
    pub apartment_id: ApartmentId,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub message: String,
}

impl BookingDraft {
    pub fn new(apartment_id: ApartmentId, start_date: Date, end_date: Date) -> Self {
        Self {
            apartment_id,
            start_date,
            end_date,
            message: String::new(),
        }
    }

    pub const fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApartmentField {
    Title,
    Description,
    City,
    District,
    Street,
    Building,
    PricePerMonth,
    Rooms,
    AreaSqm,
    Floor,
    Utilities,
    Status,
}

impl FieldKey for ApartmentField {
    const ALL: &'static [Self] = &[
        Self::Title,
        Self::Description,
        Self::City,
        Self::District,
        Self::Street,
        Self::Building,
        Self::PricePerMonth,
        Self::Rooms,
        Self::AreaSqm,
        Self::Floor,
        Self::Utilities,
        Self::Status,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::City => "address.city",
            Self::District => "address.district",
            Self::Street => "address.street",
            Self::Building => "address.building",
            Self::PricePerMonth => "price_per_month",
            Self::Rooms => "rooms",
            Self::AreaSqm => "area_sqm",
            Self::Floor => "floor",
            Self::Utilities => "utilities",
            Self::Status => "status",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Title
            | Self::Description
            | Self::City
            | Self::District
            | Self::Street
            | Self::Building => FieldKind::Text,
            Self::PricePerMonth | Self::Rooms => FieldKind::Integer,
            Self::AreaSqm => FieldKind::Decimal,
            Self::Floor => FieldKind::OptionalInteger,
            Self::Utilities => FieldKind::TextList,
            Self::Status => FieldKind::Status,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::District => "district",
            Self::Street => "street",
            Self::Building => "building",
            Self::PricePerMonth => "monthly price",
            Self::AreaSqm => "area",
            other => other.name(),
        }
    }
}

impl Editable for Apartment {
    type Field = ApartmentField;

    fn record_id(&self) -> i64 {
        self.id.get()
    }

    fn field_value(&self, field: ApartmentField) -> FieldValue {
        match field {
            ApartmentField::Title => FieldValue::Text(self.title.clone()),
            ApartmentField::Description => FieldValue::Text(self.description.clone()),
            ApartmentField::City => FieldValue::Text(self.address.city.clone()),
            ApartmentField::District => FieldValue::Text(self.address.district.clone()),
            ApartmentField::Street => FieldValue::Text(self.address.street.clone()),
            ApartmentField::Building => FieldValue::Text(self.address.building.clone()),
            ApartmentField::PricePerMonth => FieldValue::Integer(self.price_per_month),
            ApartmentField::Rooms => FieldValue::Integer(self.rooms),
            ApartmentField::AreaSqm => FieldValue::Decimal(self.area_sqm),
            ApartmentField::Floor => FieldValue::OptionalInteger(self.floor),
            ApartmentField::Utilities => FieldValue::TextList(self.utilities.clone()),
            ApartmentField::Status => FieldValue::Status(self.status.as_str().to_owned()),
        }
    }

    fn set_field(&mut self, field: ApartmentField, value: FieldValue) -> Result<(), FieldError> {
        expect_kind(field, &value)?;
        match (field, value) {
            (ApartmentField::Title, FieldValue::Text(text)) => self.title = text,
            (ApartmentField::Description, FieldValue::Text(text)) => self.description = text,
            (ApartmentField::City, FieldValue::Text(text)) => self.address.city = text,
            (ApartmentField::District, FieldValue::Text(text)) => self.address.district = text,
            (ApartmentField::Street, FieldValue::Text(text)) => self.address.street = text,
            (ApartmentField::Building, FieldValue::Text(text)) => self.address.building = text,
            (ApartmentField::PricePerMonth, FieldValue::Integer(value)) => {
                self.price_per_month = value;
            }
            (ApartmentField::Rooms, FieldValue::Integer(value)) => self.rooms = value,
            (ApartmentField::AreaSqm, FieldValue::Decimal(value)) => self.area_sqm = value,
            (ApartmentField::Floor, FieldValue::OptionalInteger(value)) => self.floor = value,
            (ApartmentField::Utilities, FieldValue::TextList(items)) => self.utilities = items,
            (ApartmentField::Status, FieldValue::Status(raw)) => {
                self.status =
                    ListingStatus::parse(&raw).ok_or_else(|| FieldError::InvalidValue {
                        field: field.name(),
                        reason: format!("{raw:?} is not one of active, rented, archived"),
                    })?;
            }
            (field, value) => {
                return Err(FieldError::KindMismatch {
                    field: field.name(),
                    expected: field.kind(),
                    actual: value.kind(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Username,
    FirstName,
    LastName,
    Email,
    Phone,
    Telegram,
    Bio,
    BudgetMin,
    BudgetMax,
    PreferredDistrict,
}

impl FieldKey for ProfileField {
    const ALL: &'static [Self] = &[
        Self::Username,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Telegram,
        Self::Bio,
        Self::BudgetMin,
        Self::BudgetMax,
        Self::PreferredDistrict,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Telegram => "telegram",
            Self::Bio => "bio",
            Self::BudgetMin => "budget.min",
            Self::BudgetMax => "budget.max",
            Self::PreferredDistrict => "preferred_district",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::BudgetMin | Self::BudgetMax => FieldKind::OptionalInteger,
            _ => FieldKind::Text,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::BudgetMin => "minimum budget",
            Self::BudgetMax => "maximum budget",
            Self::PreferredDistrict => "preferred district",
            other => other.name(),
        }
    }
}

impl Editable for Profile {
    type Field = ProfileField;

    fn record_id(&self) -> i64 {
        self.id.get()
    }

    fn field_value(&self, field: ProfileField) -> FieldValue {
        match field {
            ProfileField::Username => FieldValue::Text(self.username.clone()),
            ProfileField::FirstName => FieldValue::Text(self.first_name.clone()),
            ProfileField::LastName => FieldValue::Text(self.last_name.clone()),
            ProfileField::Email => FieldValue::Text(self.email.clone()),
            ProfileField::Phone => FieldValue::Text(self.phone.clone()),
            ProfileField::Telegram => FieldValue::Text(self.telegram.clone()),
            ProfileField::Bio => FieldValue::Text(self.bio.clone()),
            ProfileField::BudgetMin => FieldValue::OptionalInteger(self.budget.min),
            ProfileField::BudgetMax => FieldValue::OptionalInteger(self.budget.max),
            ProfileField::PreferredDistrict => FieldValue::Text(self.preferred_district.clone()),
        }
    }

    fn set_field(&mut self, field: ProfileField, value: FieldValue) -> Result<(), FieldError> {
        expect_kind(field, &value)?;
        match (field, value) {
            (ProfileField::BudgetMin, FieldValue::OptionalInteger(value)) => {
                self.budget.min = value;
            }
            (ProfileField::BudgetMax, FieldValue::OptionalInteger(value)) => {
                self.budget.max = value;
            }
            (field, FieldValue::Text(text)) => {
                let slot = match field {
                    ProfileField::Username => &mut self.username,
                    ProfileField::FirstName => &mut self.first_name,
                    ProfileField::LastName => &mut self.last_name,
                    ProfileField::Email => &mut self.email,
                    ProfileField::Phone => &mut self.phone,
                    ProfileField::Telegram => &mut self.telegram,
                    ProfileField::Bio => &mut self.bio,
                    ProfileField::PreferredDistrict => &mut self.preferred_district,
                    ProfileField::BudgetMin | ProfileField::BudgetMax => {
                        return Err(FieldError::KindMismatch {
                            field: field.name(),
                            expected: field.kind(),
                            actual: FieldKind::Text,
                        });
                    }
                };
                *slot = text;
            }
            (field, value) => {
                return Err(FieldError::KindMismatch {
                    field: field.name(),
                    expected: field.kind(),
                    actual: value.kind(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingField {
    StartDate,
    EndDate,
    Message,
}

impl FieldKey for BookingField {
    const ALL: &'static [Self] = &[Self::StartDate, Self::EndDate, Self::Message];

    fn name(self) -> &'static str {
        match self {
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Message => "message",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::StartDate | Self::EndDate => FieldKind::Date,
            Self::Message => FieldKind::Text,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::StartDate => "move-in date",
            Self::EndDate => "move-out date",
            Self::Message => "message",
        }
    }
}

impl Editable for BookingDraft {
    type Field = BookingField;

    fn record_id(&self) -> i64 {
        self.apartment_id.get()
    }

    fn field_value(&self, field: BookingField) -> FieldValue {
        match field {
            BookingField::StartDate => FieldValue::Date(self.start_date),
            BookingField::EndDate => FieldValue::Date(self.end_date),
            BookingField::Message => FieldValue::Text(self.message.clone()),
        }
    }

    fn set_field(&mut self, field: BookingField, value: FieldValue) -> Result<(), FieldError> {
        expect_kind(field, &value)?;
        match (field, value) {
            (BookingField::StartDate, FieldValue::Date(date)) => self.start_date = date,
            (BookingField::EndDate, FieldValue::Date(date)) => self.end_date = date,
            (BookingField::Message, FieldValue::Text(text)) => self.message = text,
            (field, value) => {
                return Err(FieldError::KindMismatch {
                    field: field.name(),
                    expected: field.kind(),
                    actual: value.kind(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Address, Apartment, ApartmentField, Booking, BookingStatus, DateRange, ListingStatus,
        PriceBucket, RoomCount,
    };
    use crate::{ApartmentId, BookingId, Editable, FieldError, FieldKey, FieldValue, UserId};
    use time::macros::{date, datetime};

    fn apartment() -> Apartment {
        Apartment {
            id: ApartmentId::new(1),
            owner_id: UserId::new(9),
            title: "Bright two-room flat".to_owned(),
            description: "Near the park".to_owned(),
            address: Address {
                city: "Almaty".to_owned(),
                district: "Bostandyk".to_owned(),
                street: "Timiryazev".to_owned(),
                building: "42".to_owned(),
            },
            price_per_month: 180_000,
            rooms: 2,
            area_sqm: 54.5,
            floor: Some(4),
            utilities: vec!["wifi".to_owned(), "parking".to_owned()],
            status: ListingStatus::Active,
            created_at: datetime!(2025-05-01 10:00 UTC),
        }
    }

    #[test]
    fn price_bucket_bounds_are_inclusive_on_the_middle_range() {
        assert!(PriceBucket::From100kTo200k.contains(100_000));
        assert!(PriceBucket::From100kTo200k.contains(200_000));
        assert!(!PriceBucket::From200kTo300k.contains(200_000));
        assert!(PriceBucket::Under100k.contains(99_999));
        assert!(PriceBucket::Over300k.contains(300_001));
    }

    #[test]
    fn room_count_four_plus_covers_larger_flats() {
        assert!(RoomCount::FourPlus.contains(6));
        assert!(!RoomCount::Three.contains(4));
        assert_eq!(RoomCount::parse("4"), Some(RoomCount::FourPlus));
    }

    #[test]
    fn nested_address_field_merges_into_parent() {
        let mut record = apartment();
        record
            .set_field(ApartmentField::District, FieldValue::Text("Medeu".to_owned()))
            .expect("district accepts text");
        assert_eq!(record.address.district, "Medeu");
        assert_eq!(record.address.city, "Almaty");
        assert_eq!(record.address.street, "Timiryazev");
    }

    #[test]
    fn status_field_rejects_unknown_value() {
        let mut record = apartment();
        let error = record
            .set_field(ApartmentField::Status, FieldValue::Status("sold".to_owned()))
            .expect_err("unknown status should fail");
        assert!(matches!(error, FieldError::InvalidValue { .. }));
        assert_eq!(record.status, ListingStatus::Active);
    }

    #[test]
    fn kind_mismatch_leaves_record_untouched() {
        let mut record = apartment();
        let error = record
            .set_field(ApartmentField::Rooms, FieldValue::Text("three".to_owned()))
            .expect_err("rooms expects integer");
        assert!(matches!(error, FieldError::KindMismatch { .. }));
        assert_eq!(record.rooms, 2);
    }

    #[test]
    fn utilities_compare_as_a_set() {
        let left = apartment();
        let mut right = apartment();
        right.utilities = vec!["parking".to_owned(), "wifi".to_owned()];
        assert!(left.same_content(&right));
        assert!(left.changed_fields(&right).is_empty());
    }

    #[test]
    fn recased_utilities_and_padded_title_are_changes() {
        let base = apartment();
        let mut edited = apartment();
        edited.utilities = vec!["WiFi".to_owned(), "Parking".to_owned()];
        edited.title = format!("{} ", base.title);
        assert!(!edited.same_content(&base));
        assert_eq!(
            edited.changed_fields(&base),
            vec![ApartmentField::Title, ApartmentField::Utilities]
        );
    }

    #[test]
    fn field_parse_uses_dotted_names() {
        assert_eq!(
            ApartmentField::parse("address.district"),
            Some(ApartmentField::District)
        );
        assert_eq!(ApartmentField::parse("nope"), None);
    }

    #[test]
    fn date_ranges_overlap_inclusively() {
        let booked = DateRange::new(date!(2025 - 06 - 01), date!(2025 - 06 - 10));
        let wanted = DateRange::new(date!(2025 - 06 - 05), date!(2025 - 06 - 15));
        let later = DateRange::new(date!(2025 - 06 - 11), date!(2025 - 06 - 20));
        let touching = DateRange::new(date!(2025 - 06 - 10), date!(2025 - 06 - 12));
        assert!(booked.overlaps(&wanted));
        assert!(!booked.overlaps(&later));
        assert!(booked.overlaps(&touching));
    }

    #[test]
    fn booking_serializes_dates_as_iso_strings() -> Result<(), serde_json::Error> {
        let booking = Booking {
            id: BookingId::new(3),
            apartment_id: ApartmentId::new(1),
            tenant_id: UserId::new(5),
            start_date: date!(2025 - 06 - 01),
            end_date: date!(2025 - 06 - 10),
            message: String::new(),
            status: BookingStatus::Pending,
            created_at: datetime!(2025-05-20 08:30 UTC),
        };
        let value = serde_json::to_value(&booking)?;
        assert_eq!(value["start_date"], "2025-06-01");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["apartment_id"], 1);

        let parsed: Booking = serde_json::from_value(value)?;
        assert_eq!(parsed, booking);
        Ok(())
    }
}
