// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use time::Date;
use time::macros::format_description;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    OptionalInteger,
    Decimal,
    Date,
    TextList,
    Status,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::OptionalInteger => "optional integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::TextList => "list",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed value read from or written into a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    OptionalInteger(Option<i64>),
    Decimal(f64),
    Date(Date),
    TextList(Vec<String>),
    Status(String),
}

impl FieldValue {
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Integer(_) => FieldKind::Integer,
            Self::OptionalInteger(_) => FieldKind::OptionalInteger,
            Self::Decimal(_) => FieldKind::Decimal,
            Self::Date(_) => FieldKind::Date,
            Self::TextList(_) => FieldKind::TextList,
            Self::Status(_) => FieldKind::Status,
        }
    }

    /// Parses user input for a field of the given kind.
    pub fn parse(kind: FieldKind, raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        match kind {
            FieldKind::Text => Ok(Self::Text(trimmed.to_owned())),
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| format!("{trimmed:?} is not a whole number")),
            FieldKind::OptionalInteger => {
                if trimmed.is_empty() {
                    return Ok(Self::OptionalInteger(None));
                }
                trimmed
                    .parse::<i64>()
                    .map(|value| Self::OptionalInteger(Some(value)))
                    .map_err(|_| format!("{trimmed:?} is not a whole number"))
            }
            FieldKind::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Self::Decimal)
                .ok_or_else(|| format!("{trimmed:?} is not a decimal number")),
            FieldKind::Date => parse_date(trimmed).map(Self::Date),
            FieldKind::TextList => Ok(Self::TextList(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect(),
            )),
            FieldKind::Status => Ok(Self::Status(trimmed.to_ascii_lowercase())),
        }
    }

    /// Value as compared for change detection. List order is ignored; text
    /// is compared exactly.
    pub fn normalized(&self) -> Self {
        match self {
            Self::TextList(items) => {
                let mut items = items.clone();
                items.sort();
                Self::TextList(items)
            }
            other => other.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) | Self::Status(value) => value.trim().is_empty(),
            Self::OptionalInteger(value) => value.is_none(),
            Self::TextList(items) => items.iter().all(|item| item.trim().is_empty()),
            Self::Integer(_) | Self::Decimal(_) | Self::Date(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) | Self::OptionalInteger(Some(value)) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(value) | Self::Status(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::OptionalInteger(Some(value)) => value.to_string(),
            Self::OptionalInteger(None) => String::new(),
            Self::Decimal(value) => format!("{value:.1}"),
            Self::Date(value) => format_date(*value),
            Self::TextList(items) => items.join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{field} expects a {expected} value, got {actual}")]
    KindMismatch {
        field: &'static str,
        expected: FieldKind,
        actual: FieldKind,
    },
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("unknown field {0:?}")]
    UnknownField(String),
}

pub trait FieldKey: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn kind(self) -> FieldKind;

    fn label(self) -> &'static str {
        self.name()
    }

    fn parse(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(wanted))
    }

    /// Parses `raw` as a value for this field.
    fn parse_value(self, raw: &str) -> Result<FieldValue, FieldError> {
        FieldValue::parse(self.kind(), raw).map_err(|reason| FieldError::InvalidValue {
            field: self.name(),
            reason,
        })
    }
}

/// A record that can be edited field by field through an `EditStore`.
pub trait Editable: Clone + Serialize {
    type Field: FieldKey;

    fn record_id(&self) -> i64;

    fn field_value(&self, field: Self::Field) -> FieldValue;

    fn set_field(&mut self, field: Self::Field, value: FieldValue) -> Result<(), FieldError>;

    fn same_content(&self, other: &Self) -> bool {
        Self::Field::ALL.iter().all(|field| {
            self.field_value(*field).normalized() == other.field_value(*field).normalized()
        })
    }

    fn changed_fields(&self, base: &Self) -> Vec<Self::Field> {
        Self::Field::ALL
            .iter()
            .copied()
            .filter(|field| {
                self.field_value(*field).normalized() != base.field_value(*field).normalized()
            })
            .collect()
    }
}

pub(crate) fn expect_kind(field: impl FieldKey, value: &FieldValue) -> Result<(), FieldError> {
    if value.kind() == field.kind() {
        return Ok(());
    }
    Err(FieldError::KindMismatch {
        field: field.name(),
        expected: field.kind(),
        actual: value.kind(),
    })
}

pub fn parse_date(input: &str) -> Result<Date, String> {
    Date::parse(input.trim(), &format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("{input:?} is not a date, use YYYY-MM-DD"))
}

pub fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}
