// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use crate::field::{Editable, FieldKey, FieldValue};
use crate::model::{ApartmentField, BookingField, ProfileField};
use crate::{Apartment, BookingDraft, Profile};

#[derive(Debug, Clone, PartialEq)]
pub enum Rule<F> {
    Required(F),
    MinLength(F, usize),
    Range { field: F, min: i64, max: i64 },
    /// `field` must be greater than or equal to `than` when both are set.
    NotLess { field: F, than: F },
    AnyOf(Vec<F>),
    Email(F),
    /// `end` must fall strictly after `start`.
    DateOrder { start: F, end: F },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every rule violation found in a record, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub errors: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|violation| violation.message.clone())
            .collect()
    }

    pub fn for_field(&self, field: &str) -> Vec<&Violation> {
        self.errors
            .iter()
            .filter(|violation| violation.field == field)
            .collect()
    }

    pub fn summary(&self) -> String {
        self.messages().join("; ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema<F> {
    rules: Vec<Rule<F>>,
}

impl<F> Default for Schema<F> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<F: FieldKey> Schema<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule<F>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self, field: F) -> Self {
        self.rule(Rule::Required(field))
    }

    pub fn min_length(self, field: F, min: usize) -> Self {
        self.rule(Rule::MinLength(field, min))
    }

    pub fn range(self, field: F, min: i64, max: i64) -> Self {
        self.rule(Rule::Range { field, min, max })
    }

    pub fn not_less(self, field: F, than: F) -> Self {
        self.rule(Rule::NotLess { field, than })
    }

    pub fn any_of(self, fields: &[F]) -> Self {
        self.rule(Rule::AnyOf(fields.to_vec()))
    }

    pub fn email(self, field: F) -> Self {
        self.rule(Rule::Email(field))
    }

    pub fn date_order(self, start: F, end: F) -> Self {
        self.rule(Rule::DateOrder { start, end })
    }

    pub fn rules(&self) -> &[Rule<F>] {
        &self.rules
    }
}

pub fn validate<T: Editable>(record: &T, schema: &Schema<T::Field>) -> ValidationReport {
    let errors = schema
        .rules
        .iter()
        .filter_map(|rule| check_rule(record, rule))
        .collect();
    ValidationReport { errors }
}

fn check_rule<T: Editable>(record: &T, rule: &Rule<T::Field>) -> Option<Violation> {
    match rule {
        Rule::Required(field) => record.field_value(*field).is_blank().then(|| {
            violation(
                *field,
                format!(
                    "{} is required -- enter a {} and retry",
                    field.label(),
                    field.label()
                ),
            )
        }),
        Rule::MinLength(field, min) => match record.field_value(*field) {
            FieldValue::Text(text) => {
                let length = text.trim().chars().count();
                (length > 0 && length < *min).then(|| {
                    violation(
                        *field,
                        format!("{} must be at least {min} characters", field.label()),
                    )
                })
            }
            _ => None,
        },
        Rule::Range { field, min, max } => {
            let value = record.field_value(*field).as_number()?;
            (value < *min as f64 || value > *max as f64).then(|| {
                violation(
                    *field,
                    format!("{} must be between {min} and {max}", field.label()),
                )
            })
        }
        Rule::NotLess { field, than } => {
            let value = record.field_value(*field).as_number()?;
            let floor = record.field_value(*than).as_number()?;
            (value < floor).then(|| {
                violation(
                    *field,
                    format!(
                        "{} must be greater than or equal to {}",
                        field.label(),
                        than.label()
                    ),
                )
            })
        }
        Rule::AnyOf(fields) => {
            let first = fields.first()?;
            let present = fields
                .iter()
                .any(|field| !record.field_value(*field).is_blank());
            (!present).then(|| {
                let labels: Vec<&str> = fields.iter().map(|field| field.label()).collect();
                violation(
                    *first,
                    format!("provide at least one of: {}", labels.join(", ")),
                )
            })
        }
        Rule::Email(field) => match record.field_value(*field) {
            FieldValue::Text(text) if !text.trim().is_empty() && !looks_like_email(&text) => {
                Some(violation(
                    *field,
                    format!("{} {:?} is not a valid address", field.label(), text.trim()),
                ))
            }
            _ => None,
        },
        Rule::DateOrder { start, end } => match (
            record.field_value(*start),
            record.field_value(*end),
        ) {
            (FieldValue::Date(start_date), FieldValue::Date(end_date))
                if end_date <= start_date =>
            {
                Some(violation(
                    *end,
                    format!("{} must be after {}", end.label(), start.label()),
                ))
            }
            _ => None,
        },
    }
}

fn violation(field: impl FieldKey, message: String) -> Violation {
    Violation {
        field: field.name(),
        message,
    }
}

fn looks_like_email(text: &str) -> bool {
    let trimmed = text.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && domain
            .rsplit_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !trimmed.contains(char::is_whitespace)
}

pub fn apartment_schema() -> Schema<ApartmentField> {
    Schema::new()
        .required(ApartmentField::Title)
        .min_length(ApartmentField::Title, 5)
        .required(ApartmentField::City)
        .required(ApartmentField::District)
        .required(ApartmentField::Street)
        .range(ApartmentField::PricePerMonth, 1, 100_000_000)
        .range(ApartmentField::Rooms, 1, 20)
        .range(ApartmentField::AreaSqm, 1, 1_000)
        .range(ApartmentField::Floor, -2, 200)
}

pub fn profile_schema() -> Schema<ProfileField> {
    Schema::new()
        .required(ProfileField::Username)
        .min_length(ProfileField::Username, 3)
        .required(ProfileField::FirstName)
        .any_of(&[
            ProfileField::Email,
            ProfileField::Phone,
            ProfileField::Telegram,
        ])
        .email(ProfileField::Email)
        .range(ProfileField::BudgetMin, 0, 100_000_000)
        .range(ProfileField::BudgetMax, 0, 100_000_000)
        .not_less(ProfileField::BudgetMax, ProfileField::BudgetMin)
}

pub fn booking_schema() -> Schema<BookingField> {
    Schema::new()
        .date_order(BookingField::StartDate, BookingField::EndDate)
        .min_length(BookingField::Message, 10)
}

pub fn validate_apartment(record: &Apartment) -> ValidationReport {
    validate(record, &apartment_schema())
}

pub fn validate_profile(record: &Profile) -> ValidationReport {
    validate(record, &profile_schema())
}

pub fn validate_booking(draft: &BookingDraft) -> ValidationReport {
    validate(draft, &booking_schema())
}
