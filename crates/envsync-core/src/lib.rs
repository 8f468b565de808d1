//! Core domain model for envelope status sync.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub const CRATE_NAME: &str = "envsync-core";

/// Routing order assigned to recipients that carry none (end of the signing sequence).
pub const DEFAULT_ROUTING_ORDER: i32 = 9999;

/// Raw envelope status as reported by the signing platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvelopeStatus {
    Created,
    Sent,
    Delivered,
    Signed,
    Completed,
    Declined,
    Voided,
    Processing,
    Other(String),
}

impl EnvelopeStatus {
    /// Parses a platform status; `cancelled` is folded into `Voided`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "signed" => Self::Signed,
            "completed" => Self::Completed,
            "declined" => Self::Declined,
            "voided" | "cancelled" | "canceled" => Self::Voided,
            "processing" => Self::Processing,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Signed => "signed",
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::Voided => "voided",
            Self::Processing => "processing",
            Self::Other(other) => other,
        }
    }

    /// Terminal statuses never transition back to a non-terminal one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Declined | Self::Voided)
    }
}

impl From<String> for EnvelopeStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EnvelopeStatus> for String {
    fn from(value: EnvelopeStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-recipient status as reported by the signing platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecipientStatus {
    Created,
    Sent,
    Delivered,
    Signed,
    Completed,
    Declined,
    AutoResponded,
    Other(String),
}

impl RecipientStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "signed" => Self::Signed,
            "completed" => Self::Completed,
            "declined" => Self::Declined,
            "autoresponded" => Self::AutoResponded,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Signed => "signed",
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::AutoResponded => "autoresponded",
            Self::Other(other) => other,
        }
    }

    pub fn has_signed(&self) -> bool {
        matches!(self, Self::Signed | Self::Completed)
    }
}

impl From<String> for RecipientStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<RecipientStatus> for String {
    fn from(value: RecipientStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level status derived from the raw platform state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppStatus {
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Awaiting Customer")]
    AwaitingCustomer,
    #[serde(rename = "Partially Signed")]
    PartiallySigned,
    #[serde(rename = "Awaiting Processing")]
    AwaitingProcessing,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Declined")]
    Declined,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl AppStatus {
    pub const ALL: [AppStatus; 7] = [
        Self::Draft,
        Self::AwaitingCustomer,
        Self::PartiallySigned,
        Self::AwaitingProcessing,
        Self::Completed,
        Self::Declined,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::AwaitingCustomer => "Awaiting Customer",
            Self::PartiallySigned => "Partially Signed",
            Self::AwaitingProcessing => "Awaiting Processing",
            Self::Completed => "Completed",
            Self::Declined => "Declined",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown application status {s:?}"))
    }
}

/// Maps the raw envelope status plus ordered recipient statuses to an [`AppStatus`].
///
/// Rules are evaluated in order and the first match wins:
/// voided, any decline, completed, all signed, some signed, sent/delivered, draft.
pub fn derive_app_status(raw: &EnvelopeStatus, recipients: &[RecipientStatus]) -> AppStatus {
    if *raw == EnvelopeStatus::Voided {
        return AppStatus::Cancelled;
    }
    if *raw == EnvelopeStatus::Declined || recipients.iter().any(|r| *r == RecipientStatus::Declined) {
        return AppStatus::Declined;
    }
    if *raw == EnvelopeStatus::Completed {
        return AppStatus::Completed;
    }

    let signed = recipients.iter().filter(|r| r.has_signed()).count();
    if !recipients.is_empty() && signed == recipients.len() {
        return AppStatus::AwaitingProcessing;
    }
    if signed > 0 {
        return AppStatus::PartiallySigned;
    }
    if matches!(raw, EnvelopeStatus::Sent | EnvelopeStatus::Delivered) {
        return AppStatus::AwaitingCustomer;
    }
    AppStatus::Draft
}

/// Name/value metadata attached to an envelope by the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}

/// Recipient as carried by a feed record, before it is bound to a stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientRecord {
    pub name: Option<String>,
    pub email: String,
    pub role: Option<String>,
    pub routing_order: i32,
    pub status: RecipientStatus,
    pub raw: JsonValue,
}

impl RecipientRecord {
    /// Identity of a recipient within its envelope: (email, routing order).
    pub fn slot(&self) -> (String, i32) {
        (self.email.to_ascii_lowercase(), self.routing_order)
    }
}

/// Validated feed record: the handoff contract from a feed into the sync pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSummary {
    pub envelope_id: String,
    pub subject: Option<String>,
    pub sender_email: Option<String>,
    pub status: EnvelopeStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub custom_fields: Vec<CustomField>,
    pub recipients: Vec<RecipientRecord>,
}

impl EnvelopeSummary {
    pub fn recipient_statuses(&self) -> Vec<RecipientStatus> {
        let mut ordered: Vec<&RecipientRecord> = self.recipients.iter().collect();
        ordered.sort_by_key(|r| r.routing_order);
        ordered.into_iter().map(|r| r.status.clone()).collect()
    }
}

/// Envelope fields written by an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub id: String,
    pub subject: Option<String>,
    pub sender_email: Option<String>,
    pub deal_name: Option<String>,
    pub status: EnvelopeStatus,
    pub app_status: AppStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persisted envelope row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub subject: Option<String>,
    pub sender_email: Option<String>,
    pub deal_name: Option<String>,
    pub status: EnvelopeStatus,
    pub app_status: AppStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted recipient row; owned by its envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub envelope_id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Option<String>,
    pub routing_order: i32,
    pub status: RecipientStatus,
    pub raw: JsonValue,
}

impl Recipient {
    pub fn slot(&self) -> (String, i32) {
        (self.email.to_ascii_lowercase(), self.routing_order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Success,
    Error,
    Partial,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "partial" => Ok(Self::Partial),
            other => Err(format!("unknown sync outcome {other:?}")),
        }
    }
}

/// How a sync run chooses the start of its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum SyncMode {
    Incremental,
    DaysBack(u32),
    ForceFull,
}

impl SyncMode {
    /// Tag stored as the sync log's kind.
    pub fn tag(&self) -> String {
        match self {
            Self::Incremental => "incremental".to_string(),
            Self::DaysBack(days) => format!("days_back:{days}"),
            Self::ForceFull => "force_full".to_string(),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// Append-only audit row for one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub sync_type: String,
    pub last_sync_date: DateTime<Utc>,
    pub envelopes_synced: i64,
    pub envelopes_failed: i64,
    pub sync_status: SyncOutcome,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSyncLog {
    pub sync_type: String,
    pub last_sync_date: DateTime<Utc>,
    pub envelopes_synced: i64,
    pub envelopes_failed: i64,
    pub sync_status: SyncOutcome,
    pub error_message: Option<String>,
}

/// Single-flight lock row. Stale once older than the maximum run duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLock {
    pub name: String,
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FeedUnavailable,
    FeedThrottled,
    RecordMalformed,
    PersistenceFailure,
    Timeout,
    Cancelled,
}

impl FailureKind {
    /// Record-level failures are skipped and counted; the rest end the run.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::RecordMalformed | Self::PersistenceFailure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub kind: FailureKind,
    pub envelope_id: Option<String>,
    pub detail: String,
}

impl RecordFailure {
    pub fn new(kind: FailureKind, envelope_id: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            envelope_id,
            detail: detail.into(),
        }
    }
}

/// Result of one sync run, returned to the caller and summarized into the sync log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: SyncMode,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub covered_until: DateTime<Utc>,
    pub outcome: SyncOutcome,
    pub pages_fetched: usize,
    pub envelopes_synced: usize,
    pub envelopes_inserted: usize,
    pub envelopes_updated: usize,
    pub failures: Vec<RecordFailure>,
    pub reclaimed_lock: Option<SyncLock>,
    pub sync_log_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn record_failure_count(&self) -> usize {
        self.failures.iter().filter(|f| f.kind.is_record_level()).count()
    }
}
