// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Apartment, Booking, BookingStatus, ListingStatus, PriceBucket, RoomCount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// A sortable cell. Missing values sort after everything else in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(Date),
    Timestamp(OffsetDateTime),
    Missing,
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Integer(_) | Self::Decimal(_) => 0,
            Self::Date(_) => 1,
            Self::Timestamp(_) => 2,
            Self::Text(_) => 3,
            Self::Missing => 4,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => {
                left.to_lowercase().cmp(&right.to_lowercase())
            }
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Decimal(left), Self::Decimal(right)) => left.total_cmp(right),
            (Self::Integer(left), Self::Decimal(right)) => (*left as f64).total_cmp(right),
            (Self::Decimal(left), Self::Integer(right)) => left.total_cmp(&(*right as f64)),
            (Self::Date(left), Self::Date(right)) => left.cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// A record that can be shown in a filtered, sorted, paginated list.
pub trait Listable: Clone {
    type Filter: Clone + Default + PartialEq + fmt::Debug;
    type SortField: Copy + Eq + fmt::Debug;

    /// Text fields matched by free-text search.
    fn search_haystacks(&self) -> Vec<&str>;

    fn matches_filter(&self, filter: &Self::Filter) -> bool;

    fn sort_value(&self, field: Self::SortField) -> SortValue;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<S> {
    pub field: S,
    pub direction: SortDirection,
}

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<F, S> {
    pub search_text: String,
    pub filter: F,
    pub sort: Option<SortSpec<S>>,
    pub page: usize,
    pub page_size: usize,
}

impl<F: Default, S> Default for ListQuery<F, S> {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            filter: F::default(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub fn apply_filters<T: Listable>(
    items: &[T],
    query: &ListQuery<T::Filter, T::SortField>,
) -> Vec<T> {
    let needle = query.search_text.trim().to_lowercase();
    items
        .iter()
        .filter(|item| {
            needle.is_empty()
                || item
                    .search_haystacks()
                    .iter()
                    .any(|hay| hay.to_lowercase().contains(&needle))
        })
        .filter(|item| item.matches_filter(&query.filter))
        .cloned()
        .collect()
}

pub fn apply_sort<T: Listable>(
    items: &[T],
    field: T::SortField,
    direction: SortDirection,
) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|left, right| {
        let left = left.sort_value(field);
        let right = right.sort_value(field);
        match (&left, &right) {
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Greater,
            (_, SortValue::Missing) => Ordering::Less,
            _ => {
                let ordering = left.compare(&right);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
        }
    });
    sorted
}

/// Rows `[(page-1)*size, page*size)`. Out-of-range pages come back empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return Vec::new();
    }
    let end = start.saturating_add(page_size).min(items.len());
    items[start..end].to_vec()
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Query state for one list view; derives the visible page from fetched rows.
#[derive(Debug, Clone)]
pub struct ListController<T: Listable> {
    query: ListQuery<T::Filter, T::SortField>,
}

impl<T: Listable> Default for ListController<T> {
    fn default() -> Self {
        Self {
            query: ListQuery::default(),
        }
    }
}

impl<T: Listable> ListController<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        let mut controller = Self::default();
        controller.query.page_size = page_size.max(1);
        controller
    }

    pub fn query(&self) -> &ListQuery<T::Filter, T::SortField> {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.query.page
    }

    pub fn set_search(&mut self, text: &str) {
        if self.query.search_text != text {
            self.query.search_text = text.to_owned();
            self.query.page = 1;
        }
    }

    pub fn set_filter(&mut self, filter: T::Filter) {
        if self.query.filter != filter {
            self.query.filter = filter;
            self.query.page = 1;
        }
    }

    pub fn update_filter(&mut self, update: impl FnOnce(&mut T::Filter)) {
        let mut filter = self.query.filter.clone();
        update(&mut filter);
        self.set_filter(filter);
    }

    pub fn set_sort(&mut self, field: T::SortField, direction: SortDirection) {
        let sort = Some(SortSpec { field, direction });
        if self.query.sort != sort {
            self.query.sort = sort;
            self.query.page = 1;
        }
    }

    /// Sorting the same field again flips direction, a new field starts ascending.
    pub fn toggle_sort(&mut self, field: T::SortField) {
        let direction = match self.query.sort {
            Some(spec) if spec.field == field => spec.direction.flip(),
            _ => SortDirection::Asc,
        };
        self.set_sort(field, direction);
    }

    pub fn clear_sort(&mut self) {
        if self.query.sort.is_some() {
            self.query.sort = None;
            self.query.page = 1;
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        let page_size = page_size.max(1);
        if self.query.page_size != page_size {
            self.query.page_size = page_size;
            self.query.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.query.page = page.max(1);
    }

    /// Advances one page, stopping at the last page `items` fill under the
    /// current query.
    pub fn next_page(&mut self, items: &[T]) {
        let last = total_pages(self.matching(items).len(), self.query.page_size).max(1);
        self.query.page = self.query.page.saturating_add(1).min(last);
    }

    pub fn prev_page(&mut self) {
        self.query.page = self.query.page.saturating_sub(1).max(1);
    }

    pub fn reset(&mut self) {
        let page_size = self.query.page_size;
        self.query = ListQuery::default();
        self.query.page_size = page_size;
    }

    /// Filtered and sorted rows across every page.
    pub fn matching(&self, items: &[T]) -> Vec<T> {
        let filtered = apply_filters(items, &self.query);
        match self.query.sort {
            Some(spec) => apply_sort(&filtered, spec.field, spec.direction),
            None => filtered,
        }
    }

    pub fn view(&self, items: &[T]) -> PageView<T> {
        let matching = self.matching(items);
        PageView {
            rows: paginate(&matching, self.query.page, self.query.page_size),
            page: self.query.page,
            page_size: self.query.page_size,
            total_items: matching.len(),
            total_pages: total_pages(matching.len(), self.query.page_size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApartmentFilter {
    pub status: Option<ListingStatus>,
    pub price: Option<PriceBucket>,
    pub rooms: Option<RoomCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApartmentSort {
    Price,
    Rooms,
    Area,
    CreatedAt,
    Title,
    District,
}

impl ApartmentSort {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Rooms => "rooms",
            Self::Area => "area",
            Self::CreatedAt => "created",
            Self::Title => "title",
            Self::District => "district",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "price" => Some(Self::Price),
            "rooms" => Some(Self::Rooms),
            "area" => Some(Self::Area),
            "created" => Some(Self::CreatedAt),
            "title" => Some(Self::Title),
            "district" => Some(Self::District),
            _ => None,
        }
    }
}

impl Listable for Apartment {
    type Filter = ApartmentFilter;
    type SortField = ApartmentSort;

    fn search_haystacks(&self) -> Vec<&str> {
        vec![
            &self.title,
            &self.description,
            &self.address.city,
            &self.address.district,
            &self.address.street,
        ]
    }

    fn matches_filter(&self, filter: &ApartmentFilter) -> bool {
        filter.status.is_none_or(|status| self.status == status)
            && filter
                .price
                .is_none_or(|bucket| bucket.contains(self.price_per_month))
            && filter.rooms.is_none_or(|rooms| rooms.contains(self.rooms))
    }

    fn sort_value(&self, field: ApartmentSort) -> SortValue {
        match field {
            ApartmentSort::Price => SortValue::Integer(self.price_per_month),
            ApartmentSort::Rooms => SortValue::Integer(self.rooms),
            ApartmentSort::Area => SortValue::Decimal(self.area_sqm),
            ApartmentSort::CreatedAt => SortValue::Timestamp(self.created_at),
            ApartmentSort::Title => text_or_missing(&self.title),
            ApartmentSort::District => text_or_missing(&self.address.district),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingSort {
    StartDate,
    CreatedAt,
    Status,
}

impl BookingSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(Self::StartDate),
            "created" => Some(Self::CreatedAt),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

impl Listable for Booking {
    type Filter = BookingFilter;
    type SortField = BookingSort;

    fn search_haystacks(&self) -> Vec<&str> {
        vec![&self.message, self.status.as_str()]
    }

    fn matches_filter(&self, filter: &BookingFilter) -> bool {
        filter.status.is_none_or(|status| self.status == status)
    }

    fn sort_value(&self, field: BookingSort) -> SortValue {
        match field {
            BookingSort::StartDate => SortValue::Date(self.start_date),
            BookingSort::CreatedAt => SortValue::Timestamp(self.created_at),
            BookingSort::Status => SortValue::Text(self.status.as_str().to_owned()),
        }
    }
}

fn text_or_missing(value: &str) -> SortValue {
    if value.trim().is_empty() {
        SortValue::Missing
    } else {
        SortValue::Text(value.to_owned())
    }
}

/// Parses a categorical filter value where `all` (or blank) means no filter.
pub fn parse_choice<V>(raw: &str, parse: impl Fn(&str) -> Option<V>) -> Result<Option<V>, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized == "all" {
        return Ok(None);
    }
    parse(&normalized)
        .map(Some)
        .ok_or_else(|| format!("unknown filter value {raw:?}"))
}
