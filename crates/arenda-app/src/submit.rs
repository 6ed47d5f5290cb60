// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::edit::EditStore;
use crate::field::{Editable, FieldKey};
use crate::remote::{NoticeKind, Notifier, RecordWriter, RemoteError};
use crate::validation::{Schema, ValidationReport, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    View,
    Editing,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRejected {
    NotEditing,
    AlreadySaving,
    NoChanges,
    Invalid(ValidationReport),
}

/// A write that has been started and not yet settled.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmit {
    ticket: u64,
    pub id: i64,
    pub patch: Map<String, Value>,
}

impl PendingSubmit {
    pub const fn ticket(&self) -> u64 {
        self.ticket
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved,
    Failed(RemoteError),
    Rejected(SubmitRejected),
    Stale,
}

/// Validates the working copy, hands it to the writer and reconciles the result.
///
/// At most one write is in flight per pipeline.
#[derive(Debug, Clone)]
pub struct SubmitPipeline {
    label: &'static str,
    in_flight: Option<u64>,
    next_ticket: u64,
    last_error: Option<RemoteError>,
    last_report: Option<ValidationReport>,
}

impl SubmitPipeline {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            in_flight: None,
            next_ticket: 1,
            last_error: None,
            last_report: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn phase<T: Editable>(&self, store: &EditStore<T>) -> Phase {
        if self.in_flight.is_some() {
            Phase::Saving
        } else if store.is_editing() {
            Phase::Editing
        } else {
            Phase::View
        }
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&RemoteError> {
        self.last_error.as_ref()
    }

    pub fn last_report(&self) -> Option<&ValidationReport> {
        self.last_report.as_ref()
    }

    pub fn begin<T: Editable>(
        &mut self,
        store: &mut EditStore<T>,
        schema: &Schema<T::Field>,
        notifier: &mut dyn Notifier,
    ) -> Result<PendingSubmit, SubmitRejected> {
        if self.in_flight.is_some() {
            debug!(label = self.label, "submit rejected: write already in flight");
            return Err(SubmitRejected::AlreadySaving);
        }
        let Some(working) = store.working() else {
            return Err(SubmitRejected::NotEditing);
        };
        let id = working.record_id();

        let report = validate(working, schema);
        if !report.is_valid() {
            notifier.notify(NoticeKind::Error, &report.summary());
            self.last_report = Some(report.clone());
            return Err(SubmitRejected::Invalid(report));
        }
        self.last_report = None;

        if !store.has_changes() {
            store.cancel_editing();
            notifier.notify(NoticeKind::Info, "no changes to save");
            return Err(SubmitRejected::NoChanges);
        }

        let changed: Vec<&str> = store
            .changed_fields()
            .into_iter()
            .map(FieldKey::name)
            .collect();
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.last_error = None;

        info!(label = self.label, id, ticket, fields = ?changed, "saving");
        Ok(PendingSubmit {
            ticket,
            id,
            patch: store.patch(),
        })
    }

    pub fn settle<T: Editable>(
        &mut self,
        store: &mut EditStore<T>,
        pending: PendingSubmit,
        result: Result<T, RemoteError>,
        notifier: &mut dyn Notifier,
    ) -> SubmitOutcome {
        if self.in_flight != Some(pending.ticket) {
            debug!(
                label = self.label,
                ticket = pending.ticket,
                "ignoring settle for a write that is no longer current"
            );
            return SubmitOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(record) => {
                info!(label = self.label, id = pending.id, "saved");
                store.save_success(record);
                notifier.notify(NoticeKind::Success, &format!("{} saved", self.label));
                SubmitOutcome::Saved
            }
            Err(error) => {
                warn!(label = self.label, id = pending.id, %error, "save failed");
                notifier.notify(NoticeKind::Error, &error.user_message());
                self.last_error = Some(error.clone());
                SubmitOutcome::Failed(error)
            }
        }
    }

    /// Drops any in-flight write so its completion is ignored.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }

    pub fn submit<T, W>(
        &mut self,
        store: &mut EditStore<T>,
        schema: &Schema<T::Field>,
        writer: &mut W,
        notifier: &mut dyn Notifier,
    ) -> SubmitOutcome
    where
        T: Editable,
        W: RecordWriter<T> + ?Sized,
    {
        let pending = match self.begin(store, schema, notifier) {
            Ok(pending) => pending,
            Err(rejected) => return SubmitOutcome::Rejected(rejected),
        };
        let result = writer.write_record(pending.id, &pending.patch);
        self.settle(store, pending, result, notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, SubmitOutcome, SubmitPipeline, SubmitRejected};
    use crate::{
        Budget, EditStore, FieldValue, Notice, NoticeKind, Profile, ProfileField, RecordWriter,
        RemoteError, UNAVAILABLE_DATES_MESSAGE, UserId, profile_schema,
    };
    use serde_json::{Map, Value};
    use time::macros::datetime;

    struct ScriptedWriter {
        calls: Vec<Map<String, Value>>,
        reply: Result<Profile, RemoteError>,
    }

    impl RecordWriter<Profile> for ScriptedWriter {
        fn write_record(
            &mut self,
            _id: i64,
            patch: &Map<String, Value>,
        ) -> Result<Profile, RemoteError> {
            self.calls.push(patch.clone());
            self.reply.clone()
        }
    }

    fn profile() -> Profile {
        Profile {
            id: UserId::new(11),
            username: "arman".to_owned(),
            first_name: "Arman".to_owned(),
            last_name: String::new(),
            email: "arman@example.kz".to_owned(),
            phone: String::new(),
            telegram: String::new(),
            bio: String::new(),
            budget: Budget {
                min: Some(80_000),
                max: Some(150_000),
            },
            preferred_district: String::new(),
            created_at: datetime!(2025-04-04 04:04 UTC),
        }
    }

    fn editing() -> EditStore<Profile> {
        let mut store = EditStore::new();
        store.set_record(profile());
        store.start_editing();
        store
    }

    #[test]
    fn successful_submit_commits_server_record() {
        let mut store = editing();
        store.update_field(ProfileField::Bio, FieldValue::Text("Engineer".to_owned()));
        let mut server = profile();
        server.bio = "Engineer".to_owned();
        let mut writer = ScriptedWriter {
            calls: Vec::new(),
            reply: Ok(server.clone()),
        };
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let outcome = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);

        assert_eq!(outcome, SubmitOutcome::Saved);
        assert_eq!(store.record(), Some(&server));
        assert!(!store.is_editing());
        assert_eq!(pipeline.phase(&store), Phase::View);
        assert_eq!(writer.calls.len(), 1);
        assert_eq!(writer.calls[0].keys().collect::<Vec<_>>(), vec!["bio"]);
        assert_eq!(notices[0].kind, NoticeKind::Success);
    }

    #[test]
    fn invalid_budget_blocks_the_writer() {
        let mut store = editing();
        store.update_field(ProfileField::BudgetMax, FieldValue::OptionalInteger(Some(50_000)));
        let mut writer = ScriptedWriter {
            calls: Vec::new(),
            reply: Ok(profile()),
        };
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let outcome = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);

        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(SubmitRejected::Invalid(_))
        ));
        assert!(writer.calls.is_empty());
        assert!(store.is_editing());
        assert_eq!(pipeline.phase(&store), Phase::Editing);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert!(pipeline.last_report().is_some());
    }

    #[test]
    fn failed_write_keeps_working_copy_for_retry() {
        let mut store = editing();
        store.update_field(ProfileField::Bio, FieldValue::Text("Engineer".to_owned()));
        let mut writer = ScriptedWriter {
            calls: Vec::new(),
            reply: Err(RemoteError::Network("connection reset".to_owned())),
        };
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let outcome = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);

        assert!(matches!(outcome, SubmitOutcome::Failed(RemoteError::Network(_))));
        assert_eq!(pipeline.phase(&store), Phase::Editing);
        assert_eq!(
            store.working().map(|record| record.bio.as_str()),
            Some("Engineer")
        );
        assert_eq!(store.record(), Some(&profile()));
        assert!(pipeline.last_error().is_some_and(RemoteError::is_retryable));

        writer.reply = Ok({
            let mut server = profile();
            server.bio = "Engineer".to_owned();
            server
        });
        let retry = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);
        assert_eq!(retry, SubmitOutcome::Saved);
        assert!(pipeline.last_error().is_none());
    }

    #[test]
    fn second_submit_while_pending_is_rejected() {
        let mut store = editing();
        store.update_field(ProfileField::Bio, FieldValue::Text("Engineer".to_owned()));
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");
        let schema = profile_schema();

        let pending = pipeline
            .begin(&mut store, &schema, &mut notices)
            .expect("first submit starts");
        assert_eq!(pipeline.phase(&store), Phase::Saving);
        assert_eq!(
            pipeline.begin(&mut store, &schema, &mut notices),
            Err(SubmitRejected::AlreadySaving)
        );

        let outcome = pipeline.settle(&mut store, pending.clone(), Ok(profile()), &mut notices);
        assert_eq!(outcome, SubmitOutcome::Saved);
        assert_eq!(
            pipeline.settle(&mut store, pending, Ok(profile()), &mut notices),
            SubmitOutcome::Stale
        );
    }

    #[test]
    fn abandoned_write_is_ignored_on_settle() {
        let mut store = editing();
        store.update_field(ProfileField::Bio, FieldValue::Text("Engineer".to_owned()));
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let pending = pipeline
            .begin(&mut store, &profile_schema(), &mut notices)
            .expect("submit starts");
        pipeline.abandon();
        let outcome = pipeline.settle(&mut store, pending, Ok(profile()), &mut notices);

        assert_eq!(outcome, SubmitOutcome::Stale);
        assert!(store.is_editing());
    }

    #[test]
    fn submit_without_changes_returns_to_view() {
        let mut store = editing();
        let mut writer = ScriptedWriter {
            calls: Vec::new(),
            reply: Ok(profile()),
        };
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let outcome = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);

        assert_eq!(outcome, SubmitOutcome::Rejected(SubmitRejected::NoChanges));
        assert!(writer.calls.is_empty());
        assert_eq!(pipeline.phase(&store), Phase::View);
        assert_eq!(notices[0].kind, NoticeKind::Info);
    }

    #[test]
    fn profile_conflict_keeps_edits_without_booking_wording() {
        let mut store = editing();
        store.update_field(ProfileField::Username, FieldValue::Text("dana".to_owned()));
        let mut writer = ScriptedWriter {
            calls: Vec::new(),
            reply: Err(RemoteError::Conflict("username already taken".to_owned())),
        };
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let outcome = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);

        assert!(matches!(outcome, SubmitOutcome::Failed(RemoteError::Conflict(_))));
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert!(!notices[0].message.contains(UNAVAILABLE_DATES_MESSAGE));
        assert!(notices[0].message.contains("username already taken"));
        assert_eq!(
            store.working().map(|record| record.username.as_str()),
            Some("dana")
        );
    }

    #[test]
    fn whitespace_only_edit_reaches_the_writer() {
        let mut store = editing();
        let padded = format!("{} ", profile().first_name);
        store.update_field(ProfileField::FirstName, FieldValue::Text(padded));
        assert!(store.has_changes());
        let mut writer = ScriptedWriter {
            calls: Vec::new(),
            reply: Ok(profile()),
        };
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");

        let outcome = pipeline.submit(&mut store, &profile_schema(), &mut writer, &mut notices);

        assert_eq!(outcome, SubmitOutcome::Saved);
        assert_eq!(writer.calls.len(), 1);
        assert_eq!(writer.calls[0].keys().collect::<Vec<_>>(), vec!["first_name"]);
    }

    #[test]
    fn submit_outside_edit_mode_is_rejected() {
        let mut store = EditStore::new();
        store.set_record(profile());
        let mut notices: Vec<Notice> = Vec::new();
        let mut pipeline = SubmitPipeline::new("profile");
        assert_eq!(
            pipeline.begin(&mut store, &profile_schema(), &mut notices),
            Err(SubmitRejected::NotEditing)
        );
    }
}
