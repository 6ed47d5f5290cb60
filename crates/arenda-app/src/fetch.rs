// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, warn};

use crate::edit::{EditStore, RefetchPolicy};
use crate::field::{Editable, FieldValue};
use crate::list::{ListController, Listable, PageView};
use crate::remote::{
    CollectionKey, CollectionSource, NoticeKind, Notifier, RecordSource, RecordWriter, RemoteError,
};
use crate::submit::{Phase, PendingSubmit, SubmitOutcome, SubmitPipeline, SubmitRejected};
use crate::validation::Schema;

/// Upper bound on server pages pulled by one collection reload.
pub const MAX_FETCH_PAGES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Last-request-wins bookkeeping for one view's fetches.
#[derive(Debug, Clone, Default)]
pub struct FetchGate {
    issued: u64,
    current: Option<u64>,
}

impl FetchGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> FetchTicket {
        self.issued += 1;
        self.current = Some(self.issued);
        FetchTicket(self.issued)
    }

    /// True only for the most recently issued, still-outstanding ticket.
    pub fn accept(&mut self, ticket: FetchTicket) -> bool {
        if self.current == Some(ticket.0) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    pub fn invalidate(&mut self) {
        self.current = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed {
        message: String,
        retryable: bool,
    },
}

impl LoadState {
    fn from_error(error: &RemoteError) -> Self {
        Self::Failed {
            message: error.user_message(),
            retryable: error.is_retryable(),
        }
    }
}

/// One record shown in a detail page: fetch state, edit state and save pipeline.
#[derive(Debug, Clone)]
pub struct RecordView<T: Editable> {
    store: EditStore<T>,
    pipeline: SubmitPipeline,
    schema: Schema<T::Field>,
    gate: FetchGate,
    state: LoadState,
}

impl<T: Editable> RecordView<T> {
    pub fn new(label: &'static str, schema: Schema<T::Field>) -> Self {
        Self::with_policy(label, schema, RefetchPolicy::default())
    }

    pub fn with_policy(label: &'static str, schema: Schema<T::Field>, policy: RefetchPolicy) -> Self {
        Self {
            store: EditStore::with_policy(policy),
            pipeline: SubmitPipeline::new(label),
            schema,
            gate: FetchGate::new(),
            state: LoadState::Idle,
        }
    }

    pub fn store(&self) -> &EditStore<T> {
        &self.store
    }

    pub fn pipeline(&self) -> &SubmitPipeline {
        &self.pipeline
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.pipeline.phase(&self.store)
    }

    pub fn begin_load(&mut self) -> FetchTicket {
        self.state = LoadState::Loading;
        self.gate.issue()
    }

    /// Applies a fetch result unless a newer fetch was started since.
    pub fn finish_load(
        &mut self,
        ticket: FetchTicket,
        result: Result<T, RemoteError>,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if !self.gate.accept(ticket) {
            debug!(label = self.pipeline.label(), ?ticket, "dropping stale fetch result");
            return false;
        }
        match result {
            Ok(record) if self.pipeline.is_saving() => {
                debug!(
                    label = self.pipeline.label(),
                    "record refreshed during save; working copy kept"
                );
                self.store.replace_record(record);
                self.state = LoadState::Ready;
            }
            Ok(record) => {
                self.store.set_record(record);
                self.state = LoadState::Ready;
            }
            Err(error) => {
                warn!(label = self.pipeline.label(), %error, "fetch failed");
                notifier.notify(NoticeKind::Error, &error.user_message());
                if matches!(error, RemoteError::NotFound(_)) && !self.pipeline.is_saving() {
                    self.store.clear();
                }
                self.state = LoadState::from_error(&error);
            }
        }
        true
    }

    pub fn load<S>(&mut self, source: &mut S, id: i64, notifier: &mut dyn Notifier) -> bool
    where
        S: RecordSource<T> + ?Sized,
    {
        let ticket = self.begin_load();
        let result = source.fetch_record(id);
        self.finish_load(ticket, result, notifier)
    }

    pub fn start_editing(&mut self) -> bool {
        if self.pipeline.is_saving() {
            return false;
        }
        self.store.start_editing()
    }

    pub fn cancel_editing(&mut self) -> bool {
        if self.pipeline.is_saving() {
            return false;
        }
        self.store.cancel_editing();
        true
    }

    pub fn update_field(&mut self, field: T::Field, value: FieldValue) -> bool {
        if self.pipeline.is_saving() {
            return false;
        }
        self.store.update_field(field, value)
    }

    pub fn begin_submit(
        &mut self,
        notifier: &mut dyn Notifier,
    ) -> Result<PendingSubmit, SubmitRejected> {
        self.pipeline.begin(&mut self.store, &self.schema, notifier)
    }

    pub fn settle_submit(
        &mut self,
        pending: PendingSubmit,
        result: Result<T, RemoteError>,
        notifier: &mut dyn Notifier,
    ) -> SubmitOutcome {
        self.pipeline
            .settle(&mut self.store, pending, result, notifier)
    }

    pub fn submit<W>(&mut self, writer: &mut W, notifier: &mut dyn Notifier) -> SubmitOutcome
    where
        W: RecordWriter<T> + ?Sized,
    {
        self.pipeline
            .submit(&mut self.store, &self.schema, writer, notifier)
    }

    /// Called when the view goes away; outstanding results are ignored afterwards.
    pub fn leave(&mut self) {
        self.gate.invalidate();
        self.pipeline.abandon();
    }
}

/// A fetched collection plus the list controller that pages through it.
#[derive(Debug, Clone)]
pub struct CollectionView<T: Listable> {
    controller: ListController<T>,
    gate: FetchGate,
    items: Vec<T>,
    state: LoadState,
}

impl<T: Listable> Default for CollectionView<T> {
    fn default() -> Self {
        Self {
            controller: ListController::default(),
            gate: FetchGate::new(),
            items: Vec::new(),
            state: LoadState::Idle,
        }
    }
}

impl<T: Listable> CollectionView<T> {
    pub fn new(controller: ListController<T>) -> Self {
        Self {
            controller,
            ..Self::default()
        }
    }

    pub fn controller(&self) -> &ListController<T> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ListController<T> {
        &mut self.controller
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn view(&self) -> PageView<T> {
        self.controller.view(&self.items)
    }

    pub fn begin_reload(&mut self) -> FetchTicket {
        self.state = LoadState::Loading;
        self.gate.issue()
    }

    pub fn finish_reload(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<T>, RemoteError>,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if !self.gate.accept(ticket) {
            debug!(?ticket, "dropping stale collection result");
            return false;
        }
        match result {
            Ok(items) => {
                self.items = items;
                self.state = LoadState::Ready;
            }
            Err(error) => {
                warn!(%error, "collection fetch failed");
                notifier.notify(NoticeKind::Error, &error.user_message());
                self.state = LoadState::from_error(&error);
            }
        }
        true
    }

    pub fn reload<S>(
        &mut self,
        source: &mut S,
        key: &CollectionKey,
        notifier: &mut dyn Notifier,
    ) -> bool
    where
        S: CollectionSource<T> + ?Sized,
    {
        let ticket = self.begin_reload();
        let result = fetch_all(source, key);
        self.finish_reload(ticket, result, notifier)
    }

    pub fn leave(&mut self) {
        self.gate.invalidate();
    }
}

/// Pulls server pages starting at 1 until the server reports the last page,
/// an empty page comes back, or a page past the first is missing.
pub fn fetch_all<T, S>(source: &mut S, key: &CollectionKey) -> Result<Vec<T>, RemoteError>
where
    S: CollectionSource<T> + ?Sized,
{
    let mut items = Vec::new();
    for page in 1..=MAX_FETCH_PAGES {
        let batch = match source.fetch_collection(key, page) {
            Ok(batch) => batch,
            Err(RemoteError::NotFound(subject)) if page > 1 => {
                debug!(page, %subject, "page past the end of the collection");
                return Ok(items);
            }
            Err(error) => return Err(error),
        };
        let last = batch.is_last();
        items.extend(batch.items);
        if last {
            return Ok(items);
        }
    }
    warn!(
        pages = MAX_FETCH_PAGES,
        items = items.len(),
        "collection truncated at the page limit"
    );
    Ok(items)
}
