//! Status-change feed contracts, record parsing, and feed implementations.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use envsync_core::{
    CustomField, EnvelopeStatus, EnvelopeSummary, RecipientRecord, RecipientStatus,
    DEFAULT_ROUTING_ORDER,
};
use reqwest::{header, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "envsync-feed";

/// Inclusive time window `[start, end]` queried for status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One page of raw envelope records plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub records: Vec<JsonValue>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),
    #[error("feed throttled (retry after {retry_after:?})")]
    Throttled { retry_after: Option<Duration> },
}

/// Paginated source of envelope status changes.
#[async_trait]
pub trait StatusChangeFeed: Send + Sync {
    fn name(&self) -> &'static str;

    async fn query(&self, window: &FeedWindow, cursor: Option<&str>) -> Result<FeedPage, FeedError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("invalid timestamp in {field}: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("invalid routing order {value:?} for signer {index}")]
    InvalidRoutingOrder { index: usize, value: String },
    #[error("signer {index} has no email")]
    MissingRecipientEmail { index: usize },
}

/// Best-effort envelope id for failure reporting, read before validation.
pub fn envelope_id_hint(value: &JsonValue) -> Option<String> {
    non_empty(json_str(value, &["envelopeId"]))
}

/// Validates one raw feed record into an [`EnvelopeSummary`].
pub fn parse_envelope_summary(value: &JsonValue) -> Result<EnvelopeSummary, RecordError> {
    if !value.is_object() {
        return Err(RecordError::NotAnObject);
    }
    let envelope_id = envelope_id_hint(value).ok_or(RecordError::MissingField("envelopeId"))?;
    let status = non_empty(json_str(value, &["status"]))
        .map(|s| EnvelopeStatus::parse(&s))
        .ok_or(RecordError::MissingField("status"))?;

    let mut custom_fields = Vec::new();
    for list in ["textCustomFields", "listCustomFields"] {
        for field in json_array(value, &["customFields", list]) {
            let Some(name) = json_str(field, &["name"]) else { continue };
            custom_fields.push(CustomField {
                name: name.to_string(),
                value: json_str(field, &["value"]).unwrap_or_default().to_string(),
            });
        }
    }

    let mut recipients: Vec<RecipientRecord> = Vec::new();
    for (index, signer) in json_array(value, &["recipients", "signers"]).iter().enumerate() {
        let recipient = parse_signer(index, signer)?;
        match recipients.iter_mut().find(|r| r.slot() == recipient.slot()) {
            Some(existing) => *existing = recipient,
            None => recipients.push(recipient),
        }
    }

    Ok(EnvelopeSummary {
        envelope_id,
        subject: non_empty(json_str(value, &["emailSubject"])),
        sender_email: non_empty(json_str(value, &["sender", "email"])),
        status,
        created_at: json_timestamp(value, "createdDateTime")?,
        sent_at: json_timestamp(value, "sentDateTime")?,
        delivered_at: json_timestamp(value, "deliveredDateTime")?,
        completed_at: json_timestamp(value, "completedDateTime")?,
        status_changed_at: json_timestamp(value, "statusChangedDateTime")?,
        custom_fields,
        recipients,
    })
}

fn parse_signer(index: usize, signer: &JsonValue) -> Result<RecipientRecord, RecordError> {
    let email = non_empty(json_str(signer, &["email"]))
        .ok_or(RecordError::MissingRecipientEmail { index })?;
    let routing_order = match signer.get("routingOrder") {
        None | Some(JsonValue::Null) => DEFAULT_ROUTING_ORDER,
        Some(JsonValue::String(s)) if s.trim().is_empty() => DEFAULT_ROUTING_ORDER,
        Some(JsonValue::String(s)) => s.trim().parse().map_err(|_| RecordError::InvalidRoutingOrder {
            index,
            value: s.clone(),
        })?,
        Some(other) => other
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| RecordError::InvalidRoutingOrder {
                index,
                value: other.to_string(),
            })?,
    };

    Ok(RecipientRecord {
        name: non_empty(json_str(signer, &["name"])),
        email,
        role: non_empty(json_str(signer, &["roleName"])),
        routing_order,
        status: RecipientStatus::parse(json_str(signer, &["status"]).unwrap_or_default()),
        raw: signer.clone(),
    })
}

fn json_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    let mut cur = value;
    for key in path {
        cur = cur.get(*key)?;
    }
    cur.as_str()
}

fn json_array<'a>(value: &'a JsonValue, path: &[&str]) -> &'a [JsonValue] {
    let mut cur = value;
    for key in path {
        match cur.get(*key) {
            Some(next) => cur = next,
            None => return &[],
        }
    }
    cur.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn json_timestamp(value: &JsonValue, field: &'static str) -> Result<Option<DateTime<Utc>>, RecordError> {
    let Some(raw) = non_empty(json_str(value, &[field])) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| RecordError::InvalidTimestamp { field, value: raw })
}

#[derive(Debug, Clone)]
pub struct HttpFeedConfig {
    pub base_uri: String,
    pub account_id: String,
    pub access_token: String,
    pub page_size: u32,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

/// Feed backed by the signing platform's envelope status-change listing.
#[derive(Debug)]
pub struct HttpStatusFeed {
    client: reqwest::Client,
    config: HttpFeedConfig,
}

pub fn is_throttle_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

impl HttpStatusFeed {
    pub fn new(config: HttpFeedConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client, config })
    }

    fn listing_url(&self, window: &FeedWindow, cursor: Option<&str>) -> Result<Url, FeedError> {
        let base = format!(
            "{}/v2.1/accounts/{}/envelopes",
            self.config.base_uri.trim_end_matches('/'),
            self.config.account_id
        );
        let params = [
            ("from_date", window.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("to_date", window.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("start_position", cursor.unwrap_or("0").to_string()),
            ("count", self.config.page_size.max(1).to_string()),
            ("include", "recipients,custom_fields".to_string()),
            ("order_by", "last_modified".to_string()),
            ("order", "asc".to_string()),
        ];
        Url::parse_with_params(&base, &params)
            .map_err(|err| FeedError::Unavailable(format!("invalid listing url {base}: {err}")))
    }
}

#[async_trait]
impl StatusChangeFeed for HttpStatusFeed {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn query(&self, window: &FeedWindow, cursor: Option<&str>) -> Result<FeedPage, FeedError> {
        let url = self.listing_url(window, cursor)?;
        debug!(%url, "querying status changes");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|err| FeedError::Unavailable(format!("request failed: {err}")))?;

        let status = resp.status();
        if is_throttle_status(status) {
            let retry_after = resp
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FeedError::Throttled { retry_after });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Unavailable(format!(
                "http status {} from status-change listing: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|err| FeedError::Unavailable(format!("reading listing body: {err}")))?;
        parse_listing(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusChangeListing {
    #[serde(default)]
    envelopes: Option<Vec<JsonValue>>,
    #[serde(default)]
    end_position: Option<JsonValue>,
    #[serde(default)]
    next_uri: Option<String>,
}

/// Decodes a status-change listing body; the next cursor is `endPosition + 1`.
pub fn parse_listing(body: &[u8]) -> Result<FeedPage, FeedError> {
    let listing: StatusChangeListing = serde_json::from_slice(body)
        .map_err(|err| FeedError::Unavailable(format!("decoding status-change listing: {err}")))?;

    let has_more = listing
        .next_uri
        .as_deref()
        .map(|uri| !uri.trim().is_empty())
        .unwrap_or(false);
    let next_cursor = if has_more {
        let end = listing
            .end_position
            .as_ref()
            .and_then(|v| match v {
                JsonValue::String(s) => s.trim().parse::<u64>().ok(),
                other => other.as_u64(),
            })
            .ok_or_else(|| FeedError::Unavailable("listing has nextUri but no endPosition".to_string()))?;
        Some((end + 1).to_string())
    } else {
        None
    };

    Ok(FeedPage {
        records: listing.envelopes.unwrap_or_default(),
        next_cursor,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureBundle {
    #[serde(default)]
    pub pages: Vec<FixturePage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixturePage {
    #[serde(default)]
    pub envelopes: Vec<JsonValue>,
}

pub fn load_fixture_bundle(path: impl AsRef<Path>) -> anyhow::Result<FixtureBundle> {
    read_json_file(path)
}

fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Replays captured pages in order, regardless of the requested window.
#[derive(Debug, Clone)]
pub struct FixtureFeed {
    bundle: FixtureBundle,
}

impl FixtureFeed {
    pub fn new(bundle: FixtureBundle) -> Self {
        Self { bundle }
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(load_fixture_bundle(path)?))
    }
}

#[async_trait]
impl StatusChangeFeed for FixtureFeed {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn query(&self, _window: &FeedWindow, cursor: Option<&str>) -> Result<FeedPage, FeedError> {
        let index = match cursor {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| FeedError::Unavailable(format!("invalid fixture cursor {raw:?}")))?,
        };
        let Some(page) = self.bundle.pages.get(index) else {
            return Ok(FeedPage::default());
        };
        let next_cursor = (index + 1 < self.bundle.pages.len()).then(|| (index + 1).to_string());
        Ok(FeedPage {
            records: page.envelopes.clone(),
            next_cursor,
        })
    }
}
