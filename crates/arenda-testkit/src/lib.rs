// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod backend;

pub use backend::{FakeBackend, INVALID_PRICE_MESSAGE};

use anyhow::{Context, Result};
use arenda_app::{
    Address, Apartment, ApartmentId, Booking, BookingId, BookingStatus, Budget, ListingStatus,
    Profile, UserId,
};
use std::path::PathBuf;
use time::macros::{date, datetime};
use time::{Date, Duration, OffsetDateTime};

const ALMATY_DISTRICTS: [&str; 6] = [
    "Almaly",
    "Auezov",
    "Bostandyk",
    "Medeu",
    "Nauryzbay",
    "Turksib",
];
const ASTANA_DISTRICTS: [&str; 4] = ["Almaty", "Baikonur", "Saryarka", "Yesil"];
const STREETS: [&str; 12] = [
    "Abay",
    "Dostyk",
    "Satpayev",
    "Tole Bi",
    "Furmanov",
    "Zheltoksan",
    "Kabanbay Batyr",
    "Mangilik El",
    "Turan",
    "Kunayev",
    "Rozybakiyev",
    "Gagarin",
];
const TITLE_ADJECTIVES: [&str; 8] = [
    "Bright", "Cozy", "Spacious", "Quiet", "Renovated", "Sunny", "Modern", "Compact",
];
const TITLE_NOUNS: [&str; 4] = ["apartment", "flat", "studio", "loft"];
const UTILITIES: [&str; 8] = [
    "internet",
    "heating",
    "water",
    "parking",
    "elevator",
    "air conditioning",
    "washing machine",
    "concierge",
];
const FIRST_NAMES: [&str; 12] = [
    "Aigerim", "Daniyar", "Arman", "Aruzhan", "Nurlan", "Dana", "Timur", "Madina", "Yerlan",
    "Kamila", "Askar", "Zhanna",
];
const LAST_NAMES: [&str; 10] = [
    "Kim", "Li", "Omarov", "Nurlanov", "Seitkali", "Abenov", "Tulegen", "Bekov", "Ismail",
    "Zhakupov",
];
const MESSAGES: [&str; 6] = [
    "Quiet tenant, no pets, works remotely.",
    "Visiting for a summer internship.",
    "Family of three, looking for a short stay.",
    "Relocating for work, need a place while house hunting.",
    "Student, parents will cover the rent.",
    "Can sign the contract on arrival.",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible Almaty and Astana rental data.
#[derive(Debug, Clone)]
pub struct ListingFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl ListingFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn address(&mut self) -> Address {
        let (city, district) = if self.rng.bool() {
            ("Almaty", self.pick(&ALMATY_DISTRICTS))
        } else {
            ("Astana", self.pick(&ASTANA_DISTRICTS))
        };
        Address {
            city: city.to_owned(),
            district: district.to_owned(),
            street: self.pick(&STREETS).to_owned(),
            building: self.int_range(1, 240).to_string(),
        }
    }

    pub fn apartment(&mut self, id: ApartmentId, owner: UserId) -> Apartment {
        let rooms = self.int_range(1, 5);
        let address = self.address();
        let title = format!(
            "{} {}-room {} on {}",
            self.pick(&TITLE_ADJECTIVES),
            rooms,
            self.pick(&TITLE_NOUNS),
            address.street
        );
        let area = 18 + rooms * self.int_range(14, 24);
        let mut utilities: Vec<String> = UTILITIES
            .iter()
            .filter(|_| self.rng.bool())
            .map(|name| (*name).to_owned())
            .collect();
        utilities.sort();

        Apartment {
            id,
            owner_id: owner,
            title,
            description: self.sentence(6, 14),
            address,
            price_per_month: self.int_range(60, 450) * 1_000,
            rooms,
            area_sqm: area as f64 + self.int_range(0, 9) as f64 / 10.0,
            floor: self.rng.bool().then(|| self.int_range(1, 24)),
            utilities,
            status: ListingStatus::Active,
            created_at: self.timestamp_in_2025(),
        }
    }

    pub fn profile(&mut self, id: UserId) -> Profile {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let min = self.int_range(5, 20) * 10_000;
        let max = min + self.int_range(5, 20) * 10_000;
        Profile {
            id,
            username: format!("{}{}", first.to_lowercase(), id.get()),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: format!("{}.{}@example.kz", first.to_lowercase(), last.to_lowercase()),
            phone: format!("+7 70{} {:03} {:04}", self.int_n(10), self.int_n(1000), self.int_n(10_000)),
            telegram: String::new(),
            bio: self.sentence(4, 10),
            budget: Budget {
                min: Some(min),
                max: Some(max),
            },
            preferred_district: self.pick(&ALMATY_DISTRICTS).to_owned(),
            created_at: self.timestamp_in_2025(),
        }
    }

    /// A pending booking between June and September 2025.
    pub fn booking(&mut self, id: BookingId, apartment: ApartmentId, tenant: UserId) -> Booking {
        let start = shift(date!(2025 - 06 - 01), self.int_range(0, 90));
        let end = shift(start, self.int_range(3, 30));
        Booking {
            id,
            apartment_id: apartment,
            tenant_id: tenant,
            start_date: start,
            end_date: end,
            message: self.pick(&MESSAGES).to_owned(),
            status: BookingStatus::Pending,
            created_at: self.timestamp_in_2025(),
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn timestamp_in_2025(&mut self) -> OffsetDateTime {
        let start = datetime!(2025-01-01 00:00 UTC);
        start + Duration::seconds(self.int_range(0, 364 * 86_400))
    }

    fn sentence(&mut self, min_words: i64, max_words: i64) -> String {
        const WORDS: [&str; 20] = [
            "bright",
            "quiet",
            "courtyard",
            "balcony",
            "mountain",
            "view",
            "metro",
            "nearby",
            "renovated",
            "kitchen",
            "furnished",
            "park",
            "school",
            "market",
            "warm",
            "floors",
            "new",
            "building",
            "secure",
            "entrance",
        ];

        let count = self.int_range(min_words, max_words) as usize;
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

fn shift(date: Date, days: i64) -> Date {
    date.checked_add(Duration::days(days)).unwrap_or(date)
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("arenda").join("config.toml");
    Ok((dir, path))
}

pub fn fixture_datetime() -> &'static str {
    "2025-03-14T09:26:53Z"
}

pub fn almaty_districts() -> &'static [&'static str] {
    &ALMATY_DISTRICTS
}

pub fn astana_districts() -> &'static [&'static str] {
    &ASTANA_DISTRICTS
}

#[cfg(test)]
mod tests {
    use super::{ListingFaker, almaty_districts, astana_districts, temp_config_path};
    use arenda_app::{
        ApartmentId, BookingId, BookingStatus, UserId, validate_apartment, validate_profile,
    };
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_data() {
        let mut left = ListingFaker::new(42);
        let mut right = ListingFaker::new(42);
        assert_eq!(
            left.apartment(ApartmentId::new(1), UserId::new(1)),
            right.apartment(ApartmentId::new(1), UserId::new(1))
        );
    }

    #[test]
    fn zero_seed_is_normalized() {
        assert_eq!(ListingFaker::new(0).seed(), 1);
    }

    #[test]
    fn apartments_pass_validation() {
        let mut faker = ListingFaker::new(9);
        for id in 1..=50 {
            let apartment = faker.apartment(ApartmentId::new(id), UserId::new(1));
            let report = validate_apartment(&apartment);
            assert!(report.is_valid(), "apartment {id}: {}", report.summary());
            let districts = if apartment.address.city == "Almaty" {
                almaty_districts()
            } else {
                astana_districts()
            };
            assert!(districts.contains(&apartment.address.district.as_str()));
        }
    }

    #[test]
    fn profiles_pass_validation() {
        let mut faker = ListingFaker::new(10);
        for id in 1..=30 {
            let profile = faker.profile(UserId::new(id));
            let report = validate_profile(&profile);
            assert!(report.is_valid(), "profile {id}: {}", report.summary());
        }
    }

    #[test]
    fn bookings_have_ordered_dates() {
        let mut faker = ListingFaker::new(12);
        for id in 1..=30 {
            let booking = faker.booking(BookingId::new(id), ApartmentId::new(1), UserId::new(2));
            assert!(booking.end_date > booking.start_date);
            assert_eq!(booking.status, BookingStatus::Pending);
        }
    }

    #[test]
    fn variety_across_seeds() {
        let titles: BTreeSet<String> = (1..=20)
            .map(|seed| {
                ListingFaker::new(seed)
                    .apartment(ApartmentId::new(1), UserId::new(1))
                    .title
            })
            .collect();
        assert!(titles.len() > 10);
    }

    #[test]
    fn temp_config_path_lives_in_temp_dir() {
        let (dir, path) = temp_config_path().expect("temp dir");
        assert!(path.starts_with(dir.path()));
        assert!(path.ends_with("arenda/config.toml"));
    }
}
