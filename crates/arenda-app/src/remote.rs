// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ApartmentId, Booking, BookingDecision, BookingDraft, BookingId, UserId};

pub const UNAVAILABLE_DATES_MESSAGE: &str = "apartment is not available for the selected dates";
pub const CONFLICT_MESSAGE: &str = "the server refused the change because it conflicts with existing data";

/// Failures reported by the remote collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rejected by server: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
}

impl RemoteError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Message shown to the user; conflicts get wording distinct from generic failures.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("{what} no longer exists"),
            Self::Conflict(detail) if detail.trim().is_empty() => {
                CONFLICT_MESSAGE.to_owned()
            }
            Self::Conflict(detail) => format!("{CONFLICT_MESSAGE} ({detail})"),
            Self::Validation(detail) => format!("server rejected the changes: {detail}"),
            Self::Network(detail) => {
                format!("request failed -- check your connection and retry ({detail})")
            }
        }
    }
}

/// Which slice of a collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKey {
    All,
    Owner(UserId),
    Tenant(UserId),
    Apartment(ApartmentId),
}

pub trait RecordSource<T> {
    fn fetch_record(&mut self, id: i64) -> Result<T, RemoteError>;
}

/// One server page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPage<T> {
    pub items: Vec<T>,
    /// `Some(false)` once the server reports no further pages, `None` when it
    /// does not say.
    pub has_more: Option<bool>,
}

impl<T> CollectionPage<T> {
    pub fn new(items: Vec<T>, has_more: Option<bool>) -> Self {
        Self { items, has_more }
    }

    /// A page the server marked as final, or a collection it does not paginate.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, Some(false))
    }

    pub fn is_last(&self) -> bool {
        self.items.is_empty() || self.has_more == Some(false)
    }
}

pub trait CollectionSource<T> {
    /// Returns an empty page, not an error, when nothing matches.
    fn fetch_collection(
        &mut self,
        key: &CollectionKey,
        page: usize,
    ) -> Result<CollectionPage<T>, RemoteError>;
}

pub trait RecordWriter<T> {
    /// Applies `patch` and returns the authoritative post-write record.
    fn write_record(&mut self, id: i64, patch: &Map<String, Value>) -> Result<T, RemoteError>;
}

pub trait ChildRecordSink {
    fn create_child_record(
        &mut self,
        parent: ApartmentId,
        draft: &BookingDraft,
    ) -> Result<Booking, RemoteError>;

    fn decide_booking(
        &mut self,
        booking: BookingId,
        decision: BookingDecision,
    ) -> Result<Booking, RemoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// Fire-and-forget user feedback.
pub trait Notifier {
    fn notify(&mut self, kind: NoticeKind, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notifier for Vec<Notice> {
    fn notify(&mut self, kind: NoticeKind, message: &str) {
        self.push(Notice {
            kind,
            message: message.to_owned(),
        });
    }
}
