// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use arenda_app::{
    Apartment, ApartmentId, Booking, BookingDecision, BookingDraft, BookingId, ChildRecordSink,
    CollectionKey, CollectionPage, CollectionSource, Profile, RecordSource, RecordWriter, RemoteError, UserId,
};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Blocking JSON client for the listings backend.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty -- set it in the config file and retry");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?} -- fix the scheme and retry",
                base_url.scheme()
            );
        }
        if base_url.cannot_be_a_base() {
            bail!("api.base_url {trimmed:?} cannot carry paths -- use an http(s) URL");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fetch_apartment(&self, id: ApartmentId) -> Result<Apartment, RemoteError> {
        self.call(Method::GET, &["apartments", &id.to_string()], None, None)
    }

    pub fn list_apartments(
        &self,
        page: usize,
    ) -> Result<CollectionPage<Apartment>, RemoteError> {
        self.list(&["apartments"], page)
    }

    pub fn list_owner_apartments(
        &self,
        owner: UserId,
        page: usize,
    ) -> Result<CollectionPage<Apartment>, RemoteError> {
        self.list(&["users", &owner.to_string(), "apartments"], page)
    }

    pub fn update_apartment(
        &self,
        id: ApartmentId,
        patch: &Map<String, Value>,
    ) -> Result<Apartment, RemoteError> {
        self.call(
            Method::PATCH,
            &["apartments", &id.to_string()],
            None,
            Some(&Value::Object(patch.clone())),
        )
    }

    pub fn fetch_profile(&self, id: UserId) -> Result<Profile, RemoteError> {
        self.call(Method::GET, &["users", &id.to_string()], None, None)
    }

    pub fn update_profile(
        &self,
        id: UserId,
        patch: &Map<String, Value>,
    ) -> Result<Profile, RemoteError> {
        self.call(
            Method::PATCH,
            &["users", &id.to_string()],
            None,
            Some(&Value::Object(patch.clone())),
        )
    }

    pub fn list_tenant_bookings(
        &self,
        tenant: UserId,
        page: usize,
    ) -> Result<CollectionPage<Booking>, RemoteError> {
        self.list(&["users", &tenant.to_string(), "bookings"], page)
    }

    pub fn list_apartment_bookings(
        &self,
        apartment: ApartmentId,
        page: usize,
    ) -> Result<CollectionPage<Booking>, RemoteError> {
        self.list(&["apartments", &apartment.to_string(), "bookings"], page)
    }

    pub fn create_booking(
        &self,
        apartment: ApartmentId,
        draft: &BookingDraft,
    ) -> Result<Booking, RemoteError> {
        let body = serde_json::to_value(draft)
            .map_err(|error| RemoteError::Validation(format!("encode booking: {error}")))?;
        self.call(
            Method::POST,
            &["apartments", &apartment.to_string(), "bookings"],
            None,
            Some(&body),
        )
    }

    pub fn decide_booking(
        &self,
        booking: BookingId,
        decision: BookingDecision,
    ) -> Result<Booking, RemoteError> {
        self.call(
            Method::POST,
            &["bookings", &booking.to_string(), decision.as_str()],
            None,
            None,
        )
    }

    fn list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        page: usize,
    ) -> Result<CollectionPage<T>, RemoteError> {
        let listing: Listing<T> =
            self.call(Method::GET, segments, Some(("page", page.to_string())), None)?;
        Ok(listing.into_page())
    }

    fn endpoint(&self, segments: &[&str], query: Option<(&str, String)>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, &value);
        }
        url
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: Option<(&str, String)>,
        body: Option<&Value>,
    ) -> Result<T, RemoteError> {
        let url = self.endpoint(segments, query);
        debug!(%method, %url, "api request");
        let mut request: RequestBuilder = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), &error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            debug!(%url, status = status.as_u16(), "api request failed");
            return Err(clean_error_response(status, &body, &describe(segments)));
        }

        response
            .json::<T>()
            .map_err(|error| RemoteError::Network(format!("decode response from {url}: {error}")))
    }
}

impl RecordSource<Apartment> for Client {
    fn fetch_record(&mut self, id: i64) -> Result<Apartment, RemoteError> {
        self.fetch_apartment(ApartmentId::new(id))
    }
}

impl RecordSource<Profile> for Client {
    fn fetch_record(&mut self, id: i64) -> Result<Profile, RemoteError> {
        self.fetch_profile(UserId::new(id))
    }
}

impl RecordWriter<Apartment> for Client {
    fn write_record(&mut self, id: i64, patch: &Map<String, Value>) -> Result<Apartment, RemoteError> {
        self.update_apartment(ApartmentId::new(id), patch)
    }
}

impl RecordWriter<Profile> for Client {
    fn write_record(&mut self, id: i64, patch: &Map<String, Value>) -> Result<Profile, RemoteError> {
        self.update_profile(UserId::new(id), patch)
    }
}

impl CollectionSource<Apartment> for Client {
    fn fetch_collection(
        &mut self,
        key: &CollectionKey,
        page: usize,
    ) -> Result<CollectionPage<Apartment>, RemoteError> {
        match key {
            CollectionKey::All => self.list_apartments(page),
            CollectionKey::Owner(owner) => self.list_owner_apartments(*owner, page),
            other => Err(unsupported_key("apartments", other)),
        }
    }
}

impl CollectionSource<Booking> for Client {
    fn fetch_collection(
        &mut self,
        key: &CollectionKey,
        page: usize,
    ) -> Result<CollectionPage<Booking>, RemoteError> {
        match key {
            CollectionKey::Tenant(tenant) => self.list_tenant_bookings(*tenant, page),
            CollectionKey::Apartment(apartment) => self.list_apartment_bookings(*apartment, page),
            other => Err(unsupported_key("bookings", other)),
        }
    }
}

impl ChildRecordSink for Client {
    fn create_child_record(
        &mut self,
        parent: ApartmentId,
        draft: &BookingDraft,
    ) -> Result<Booking, RemoteError> {
        self.create_booking(parent, draft)
    }

    fn decide_booking(
        &mut self,
        booking: BookingId,
        decision: BookingDecision,
    ) -> Result<Booking, RemoteError> {
        Client::decide_booking(self, booking, decision)
    }
}

fn unsupported_key(collection: &str, key: &CollectionKey) -> RemoteError {
    RemoteError::Validation(format!("{collection} cannot be listed by {key:?}"))
}

/// "apartment 4", "user 2 bookings" and similar, for NotFound messages.
fn describe(segments: &[&str]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let is_id_next = segments
                .get(index + 1)
                .is_some_and(|next| next.parse::<i64>().is_ok());
            if is_id_next {
                segment.trim_end_matches('s')
            } else {
                segment
            }
        })
        .collect::<Vec<&str>>()
        .join(" ")
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        return RemoteError::Network(format!("{base_url} timed out -- retry in a moment"));
    }
    RemoteError::Network(format!(
        "cannot reach {base_url} -- check api.base_url and that the server is running ({error})"
    ))
}

fn clean_error_response(status: StatusCode, body: &str, subject: &str) -> RemoteError {
    let detail = server_detail(body);
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(subject.to_owned()),
        StatusCode::CONFLICT => RemoteError::Conflict(detail.unwrap_or_default()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Validation(
            detail.unwrap_or_else(|| format!("server returned {}", status.as_u16())),
        ),
        _ => RemoteError::Network(match detail {
            Some(detail) => format!("server error ({}): {detail}", status.as_u16()),
            None => format!("server returned {}", status.as_u16()),
        }),
    }
}

fn server_detail(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.detail)
        && !message.trim().is_empty()
    {
        return Some(message.trim().to_owned());
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return Some(trimmed.to_owned());
    }
    None
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    detail: Option<String>,
}

/// A bare array is the whole collection; the envelope form carries
/// `next` and `count` when the server paginates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Paged {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        count: Option<u64>,
    },
}

impl<T> Listing<T> {
    fn into_page(self) -> CollectionPage<T> {
        match self {
            Self::Bare(items) => CollectionPage::last(items),
            Self::Paged {
                results,
                next,
                count,
            } => {
                let has_more = match (next, count) {
                    (Some(_), _) => Some(true),
                    (None, Some(_)) => Some(false),
                    (None, None) => None,
                };
                CollectionPage::new(results, has_more)
            }
        }
    }
}
