// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use arenda_app::{
    Apartment, Booking, BookingId, NoticeKind, Notifier, PageView, Profile, RequestedMarkers,
    format_date,
};
use std::fmt::Write as _;

/// Prints notices as they arrive; errors go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    errors: usize,
}

impl ConsoleNotifier {
    pub fn had_errors(&self) -> bool {
        self.errors > 0
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Error => {
                self.errors += 1;
                eprintln!("{}: {message}", kind.as_str());
            }
            NoticeKind::Success | NoticeKind::Info => println!("{}: {message}", kind.as_str()),
        }
    }
}

fn price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    if amount < 0 {
        grouped.insert(0, '-');
    }
    format!("{grouped} ₸")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn apartment_table(page: &PageView<Apartment>, markers: &RequestedMarkers) -> String {
    if page.rows.is_empty() {
        return "(no apartments)\n".to_owned();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<32}  {:<9}  {:<12}  {:>5}  {:>12}  {}",
        "id", "title", "city", "district", "rooms", "price", "status"
    );
    for apartment in &page.rows {
        let requested = if markers.is_requested(apartment.id) {
            " (requested)"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:>5}  {:<32}  {:<9}  {:<12}  {:>5}  {:>12}  {}{}",
            apartment.id,
            truncate(&apartment.title, 32),
            truncate(&apartment.address.city, 9),
            truncate(&apartment.address.district, 12),
            apartment.rooms,
            price(apartment.price_per_month),
            apartment.status.as_str(),
            requested
        );
    }
    out.push_str(&page_footer(page, "apartments"));
    out
}

pub fn apartment_detail(apartment: &Apartment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", apartment.title, apartment.id);
    let address = &apartment.address;
    let _ = writeln!(
        out,
        "  address:   {}, {} district, {} {}",
        address.city, address.district, address.street, address.building
    );
    let _ = writeln!(out, "  price:     {} / month", price(apartment.price_per_month));
    let _ = writeln!(
        out,
        "  size:      {} rooms, {:.1} m²",
        apartment.rooms, apartment.area_sqm
    );
    if let Some(floor) = apartment.floor {
        let _ = writeln!(out, "  floor:     {floor}");
    }
    if !apartment.utilities.is_empty() {
        let _ = writeln!(out, "  utilities: {}", apartment.utilities.join(", "));
    }
    let _ = writeln!(out, "  status:    {}", apartment.status.as_str());
    if !apartment.description.trim().is_empty() {
        let _ = writeln!(out, "\n{}", apartment.description.trim());
    }
    out
}

pub fn profile_detail(profile: &Profile) -> String {
    let mut out = String::new();
    let name = format!("{} {}", profile.first_name, profile.last_name);
    let _ = writeln!(out, "{} (@{})", name.trim(), profile.username);
    for (label, value) in [
        ("email", &profile.email),
        ("phone", &profile.phone),
        ("telegram", &profile.telegram),
        ("district", &profile.preferred_district),
    ] {
        if !value.trim().is_empty() {
            let _ = writeln!(out, "  {label:<9} {value}");
        }
    }
    let budget = match (profile.budget.min, profile.budget.max) {
        (Some(min), Some(max)) => Some(format!("{} to {}", price(min), price(max))),
        (Some(min), None) => Some(format!("from {}", price(min))),
        (None, Some(max)) => Some(format!("up to {}", price(max))),
        (None, None) => None,
    };
    if let Some(budget) = budget {
        let _ = writeln!(out, "  {:<9} {budget}", "budget");
    }
    if !profile.bio.trim().is_empty() {
        let _ = writeln!(out, "\n{}", profile.bio.trim());
    }
    out
}

pub fn booking_table(page: &PageView<Booking>, conflicts: &[BookingId]) -> String {
    if page.rows.is_empty() {
        return "(no bookings)\n".to_owned();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:>9}  {:>6}  {:<10}  {:<10}  {:<9}  {}",
        "id", "apartment", "tenant", "from", "to", "status", "message"
    );
    for booking in &page.rows {
        let flag = if conflicts.contains(&booking.id) {
            "  ! overlaps approved"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:>5}  {:>9}  {:>6}  {:<10}  {:<10}  {:<9}  {}{}",
            booking.id,
            booking.apartment_id,
            booking.tenant_id,
            format_date(booking.start_date),
            format_date(booking.end_date),
            booking.status.as_str(),
            truncate(&booking.message, 40),
            flag
        );
    }
    out.push_str(&page_footer(page, "bookings"));
    out
}

fn page_footer<T>(page: &PageView<T>, noun: &str) -> String {
    format!(
        "page {}/{} ({} {noun})\n",
        page.page,
        page.total_pages.max(1),
        page.total_items
    )
}
