//! Idempotent envelope persistence, the sync audit log, and the single-flight lock.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use envsync_core::{
    AppStatus, Envelope, EnvelopeRecord, EnvelopeStatus, NewSyncLog, Recipient, RecipientRecord,
    RecipientStatus, SyncLock, SyncLogEntry, SyncOutcome,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const CRATE_NAME: &str = "envsync-storage";

/// Name of the lock row guarding envelope sync runs.
pub const SYNC_LOCK_NAME: &str = "envelope_sync";

/// Matches the `sync_logs.error_message` column width.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("invalid stored value in {column}: {value:?}")]
    Decode { column: &'static str, value: String },
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub inserted: bool,
    /// Set when the feed tried to move a terminal status backwards; the stored status was kept.
    pub regressed_from: Option<EnvelopeStatus>,
    pub recipients_inserted: usize,
    pub recipients_updated: usize,
    pub recipients_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAcquisition {
    Acquired,
    Reclaimed { previous: SyncLock },
    Held { current: SyncLock },
}

#[async_trait]
pub trait UpsertStore: Send + Sync {
    /// Inserts or updates one envelope and reconciles its recipients atomically.
    async fn upsert_envelope(
        &self,
        envelope: &EnvelopeRecord,
        recipients: &[RecipientRecord],
    ) -> Result<UpsertOutcome, StoreError>;

    async fn append_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, StoreError>;

    async fn last_successful_sync_date(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn recent_sync_logs(&self, limit: i64) -> Result<Vec<SyncLogEntry>, StoreError>;

    async fn try_acquire_sync_lock(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        stale_after: chrono::Duration,
    ) -> Result<LockAcquisition, StoreError>;

    /// Releases the lock if `owner` still holds it.
    async fn release_sync_lock(&self, owner: &str) -> Result<bool, StoreError>;

    async fn current_sync_lock(&self) -> Result<Option<SyncLock>, StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeMerge {
    pub envelope: Envelope,
    pub regressed_from: Option<EnvelopeStatus>,
}

/// Folds an incoming record onto the stored row.
///
/// Lifecycle timestamps only move forward and are never cleared. A terminal
/// status is kept when the incoming status is non-terminal.
pub fn merge_envelope(existing: Option<&Envelope>, incoming: &EnvelopeRecord, now: DateTime<Utc>) -> EnvelopeMerge {
    let Some(existing) = existing else {
        return EnvelopeMerge {
            envelope: Envelope {
                id: incoming.id.clone(),
                subject: incoming.subject.clone(),
                sender_email: incoming.sender_email.clone(),
                deal_name: incoming.deal_name.clone(),
                status: incoming.status.clone(),
                app_status: incoming.app_status,
                created_at: incoming.created_at,
                sent_at: incoming.sent_at,
                delivered_at: incoming.delivered_at,
                completed_at: incoming.completed_at,
                updated_at: now,
            },
            regressed_from: None,
        };
    };

    let regressed = existing.status.is_terminal() && !incoming.status.is_terminal();
    let (status, app_status) = if regressed {
        (existing.status.clone(), existing.app_status)
    } else {
        (incoming.status.clone(), incoming.app_status)
    };

    EnvelopeMerge {
        envelope: Envelope {
            id: existing.id.clone(),
            subject: incoming.subject.clone(),
            sender_email: incoming.sender_email.clone(),
            deal_name: incoming.deal_name.clone(),
            status,
            app_status,
            created_at: existing.created_at.max(incoming.created_at),
            sent_at: existing.sent_at.max(incoming.sent_at),
            delivered_at: existing.delivered_at.max(incoming.delivered_at),
            completed_at: existing.completed_at.max(incoming.completed_at),
            updated_at: now,
        },
        regressed_from: regressed.then(|| incoming.status.clone()),
    }
}

/// Row-level changes that bring an envelope's stored recipients in line with the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipientPlan {
    pub updates: Vec<(i64, RecipientRecord)>,
    pub inserts: Vec<RecipientRecord>,
    pub deletes: Vec<i64>,
}

/// Matches recipients by (email, routing order). Existing duplicates of a slot and
/// slots absent from the feed are deleted.
pub fn plan_recipients(existing: &[Recipient], incoming: &[RecipientRecord]) -> RecipientPlan {
    let mut plan = RecipientPlan::default();

    let mut ordered: Vec<&Recipient> = existing.iter().collect();
    ordered.sort_by_key(|r| r.id);
    let mut by_slot: HashMap<(String, i32), i64> = HashMap::new();
    for recipient in ordered {
        if by_slot.contains_key(&recipient.slot()) {
            plan.deletes.push(recipient.id);
        } else {
            by_slot.insert(recipient.slot(), recipient.id);
        }
    }

    let mut wanted: Vec<&RecipientRecord> = Vec::with_capacity(incoming.len());
    for record in incoming {
        match wanted.iter_mut().find(|w| w.slot() == record.slot()) {
            Some(slot) => *slot = record,
            None => wanted.push(record),
        }
    }

    for record in wanted {
        match by_slot.remove(&record.slot()) {
            Some(id) => plan.updates.push((id, record.clone())),
            None => plan.inserts.push(record.clone()),
        }
    }
    plan.deletes.extend(by_slot.into_values());
    plan.deletes.sort_unstable();
    plan
}

fn truncate_message(message: Option<&str>) -> Option<String> {
    message.map(|m| m.chars().take(MAX_ERROR_MESSAGE_CHARS).collect())
}

fn lock_is_fresh(lock: &SyncLock, now: DateTime<Utc>, stale_after: chrono::Duration) -> bool {
    lock.acquired_at > now - stale_after
}

fn warn_on_regression(envelope_id: &str, merge: &EnvelopeMerge) {
    if let Some(incoming) = &merge.regressed_from {
        warn!(
            envelope_id,
            stored = %merge.envelope.status,
            incoming = %incoming,
            "feed reported a status regression from a terminal status; keeping stored status"
        );
    }
}

#[derive(Debug, Clone)]
pub struct PgUpsertStore {
    pool: PgPool,
}

impl PgUpsertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

fn envelope_from_row(row: &PgRow) -> Result<Envelope, StoreError> {
    let status: String = row.try_get("status")?;
    let app_status: String = row.try_get("app_status")?;
    let app_status = app_status.parse::<AppStatus>().map_err(|_| StoreError::Decode {
        column: "app_status",
        value: app_status.clone(),
    })?;
    Ok(Envelope {
        id: row.try_get("id")?,
        subject: row.try_get("subject")?,
        sender_email: row.try_get("sender_email")?,
        deal_name: row.try_get("deal_name")?,
        status: EnvelopeStatus::parse(&status),
        app_status,
        created_at: row.try_get("created_at")?,
        sent_at: row.try_get("sent_at")?,
        delivered_at: row.try_get("delivered_at")?,
        completed_at: row.try_get("completed_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn recipient_from_row(row: &PgRow) -> Result<Recipient, StoreError> {
    let status: String = row.try_get("recipient_status")?;
    Ok(Recipient {
        id: row.try_get("id")?,
        envelope_id: row.try_get("envelope_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        routing_order: row.try_get("routing_order")?,
        status: RecipientStatus::parse(&status),
        raw: row.try_get("raw")?,
    })
}

fn sync_log_from_row(row: &PgRow) -> Result<SyncLogEntry, StoreError> {
    let sync_status: String = row.try_get("sync_status")?;
    let sync_status = sync_status.parse::<SyncOutcome>().map_err(|_| StoreError::Decode {
        column: "sync_status",
        value: sync_status.clone(),
    })?;
    Ok(SyncLogEntry {
        id: row.try_get("id")?,
        sync_type: row.try_get("sync_type")?,
        last_sync_date: row.try_get("last_sync_date")?,
        envelopes_synced: row.try_get("envelopes_synced")?,
        envelopes_failed: row.try_get("envelopes_failed")?,
        sync_status,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn sync_lock_from_row(row: &PgRow) -> Result<SyncLock, StoreError> {
    Ok(SyncLock {
        name: row.try_get("name")?,
        owner: row.try_get("owner")?,
        acquired_at: row.try_get("acquired_at")?,
    })
}

#[async_trait]
impl UpsertStore for PgUpsertStore {
    async fn upsert_envelope(
        &self,
        envelope: &EnvelopeRecord,
        recipients: &[RecipientRecord],
    ) -> Result<UpsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            r#"
            SELECT id, subject, sender_email, deal_name, status, app_status,
                   created_at, sent_at, delivered_at, completed_at, updated_at
              FROM envelopes
             WHERE id = $1
               FOR UPDATE
            "#,
        )
        .bind(&envelope.id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| envelope_from_row(&row))
        .transpose()?;

        let merge = merge_envelope(existing.as_ref(), envelope, Utc::now());
        warn_on_regression(&envelope.id, &merge);
        let row = &merge.envelope;

        sqlx::query(
            r#"
            INSERT INTO envelopes (id, subject, sender_email, deal_name, status, app_status,
                                   created_at, sent_at, delivered_at, completed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE
               SET subject = EXCLUDED.subject,
                   sender_email = EXCLUDED.sender_email,
                   deal_name = EXCLUDED.deal_name,
                   status = EXCLUDED.status,
                   app_status = EXCLUDED.app_status,
                   created_at = EXCLUDED.created_at,
                   sent_at = EXCLUDED.sent_at,
                   delivered_at = EXCLUDED.delivered_at,
                   completed_at = EXCLUDED.completed_at,
                   updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&row.id)
        .bind(&row.subject)
        .bind(&row.sender_email)
        .bind(&row.deal_name)
        .bind(row.status.as_str())
        .bind(row.app_status.as_str())
        .bind(row.created_at)
        .bind(row.sent_at)
        .bind(row.delivered_at)
        .bind(row.completed_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        let stored = sqlx::query(
            r#"
            SELECT id, envelope_id, name, email, role, routing_order, recipient_status, raw
              FROM recipients
             WHERE envelope_id = $1
             ORDER BY id
            "#,
        )
        .bind(&envelope.id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(recipient_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let plan = plan_recipients(&stored, recipients);

        if !plan.deletes.is_empty() {
            sqlx::query("DELETE FROM recipients WHERE id = ANY($1)")
                .bind(&plan.deletes)
                .execute(&mut *tx)
                .await?;
        }

        for (id, recipient) in &plan.updates {
            sqlx::query(
                r#"
                UPDATE recipients
                   SET name = $2,
                       email = $3,
                       role = $4,
                       routing_order = $5,
                       recipient_status = $6,
                       raw = $7
                 WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&recipient.name)
            .bind(&recipient.email)
            .bind(&recipient.role)
            .bind(recipient.routing_order)
            .bind(recipient.status.as_str())
            .bind(&recipient.raw)
            .execute(&mut *tx)
            .await?;
        }

        for recipient in &plan.inserts {
            sqlx::query(
                r#"
                INSERT INTO recipients (envelope_id, name, email, role, routing_order, recipient_status, raw)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&envelope.id)
            .bind(&recipient.name)
            .bind(&recipient.email)
            .bind(&recipient.role)
            .bind(recipient.routing_order)
            .bind(recipient.status.as_str())
            .bind(&recipient.raw)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(envelope_id = %envelope.id, inserted = existing.is_none(), "envelope upserted");

        Ok(UpsertOutcome {
            inserted: existing.is_none(),
            regressed_from: merge.regressed_from,
            recipients_inserted: plan.inserts.len(),
            recipients_updated: plan.updates.len(),
            recipients_removed: plan.deletes.len(),
        })
    }

    async fn append_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO sync_logs (sync_type, last_sync_date, envelopes_synced, envelopes_failed,
                                   sync_status, error_message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sync_type, last_sync_date, envelopes_synced, envelopes_failed,
                      sync_status, error_message, created_at
            "#,
        )
        .bind(&entry.sync_type)
        .bind(entry.last_sync_date)
        .bind(entry.envelopes_synced)
        .bind(entry.envelopes_failed)
        .bind(entry.sync_status.as_str())
        .bind(truncate_message(entry.error_message.as_deref()))
        .fetch_one(&self.pool)
        .await?;
        sync_log_from_row(&row)
    }

    async fn last_successful_sync_date(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT last_sync_date
              FROM sync_logs
             WHERE sync_status = 'success'
             ORDER BY created_at DESC, id DESC
             LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.try_get("last_sync_date")).transpose()?)
    }

    async fn recent_sync_logs(&self, limit: i64) -> Result<Vec<SyncLogEntry>, StoreError> {
        sqlx::query(
            r#"
            SELECT id, sync_type, last_sync_date, envelopes_synced, envelopes_failed,
                   sync_status, error_message, created_at
              FROM sync_logs
             ORDER BY created_at DESC, id DESC
             LIMIT $1
            "#,
        )
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(sync_log_from_row)
        .collect()
    }

    async fn try_acquire_sync_lock(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        stale_after: chrono::Duration,
    ) -> Result<LockAcquisition, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query("SELECT name, owner, acquired_at FROM sync_locks WHERE name = $1 FOR UPDATE")
            .bind(SYNC_LOCK_NAME)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| sync_lock_from_row(&row))
            .transpose()?;

        let acquisition = match current {
            Some(current) if lock_is_fresh(&current, now, stale_after) => LockAcquisition::Held { current },
            Some(previous) => {
                sqlx::query("UPDATE sync_locks SET owner = $2, acquired_at = $3 WHERE name = $1")
                    .bind(SYNC_LOCK_NAME)
                    .bind(owner)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                LockAcquisition::Reclaimed { previous }
            }
            None => {
                let inserted = sqlx::query(
                    "INSERT INTO sync_locks (name, owner, acquired_at) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
                )
                .bind(SYNC_LOCK_NAME)
                .bind(owner)
                .bind(now)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if inserted == 1 {
                    LockAcquisition::Acquired
                } else {
                    let current = sqlx::query("SELECT name, owner, acquired_at FROM sync_locks WHERE name = $1")
                        .bind(SYNC_LOCK_NAME)
                        .fetch_optional(&mut *tx)
                        .await?
                        .map(|row| sync_lock_from_row(&row))
                        .transpose()?
                        .ok_or_else(|| StoreError::Message("sync lock changed hands during acquisition".to_string()))?;
                    LockAcquisition::Held { current }
                }
            }
        };

        tx.commit().await?;
        Ok(acquisition)
    }

    async fn release_sync_lock(&self, owner: &str) -> Result<bool, StoreError> {
        let released = sqlx::query("DELETE FROM sync_locks WHERE name = $1 AND owner = $2")
            .bind(SYNC_LOCK_NAME)
            .bind(owner)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(released > 0)
    }

    async fn current_sync_lock(&self) -> Result<Option<SyncLock>, StoreError> {
        sqlx::query("SELECT name, owner, acquired_at FROM sync_locks WHERE name = $1")
            .bind(SYNC_LOCK_NAME)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| sync_lock_from_row(&row))
            .transpose()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    envelopes: BTreeMap<String, Envelope>,
    recipients: Vec<Recipient>,
    next_recipient_id: i64,
    sync_logs: Vec<SyncLogEntry>,
    lock: Option<SyncLock>,
}

/// In-process store with the same reconciliation and locking rules as [`PgUpsertStore`].
#[derive(Debug, Default)]
pub struct MemoryUpsertStore {
    state: Mutex<MemoryState>,
}

impl MemoryUpsertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn envelope(&self, id: &str) -> Option<Envelope> {
        self.state.lock().await.envelopes.get(id).cloned()
    }

    pub async fn envelopes(&self) -> Vec<Envelope> {
        self.state.lock().await.envelopes.values().cloned().collect()
    }

    pub async fn recipients(&self, envelope_id: &str) -> Vec<Recipient> {
        let state = self.state.lock().await;
        let mut rows: Vec<Recipient> = state
            .recipients
            .iter()
            .filter(|r| r.envelope_id == envelope_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.routing_order, r.id));
        rows
    }

    pub async fn recipient_count(&self) -> usize {
        self.state.lock().await.recipients.len()
    }

    pub async fn sync_logs(&self) -> Vec<SyncLogEntry> {
        self.state.lock().await.sync_logs.clone()
    }

    /// Installs a lock row as if another process held it.
    pub async fn install_lock(&self, lock: SyncLock) {
        self.state.lock().await.lock = Some(lock);
    }
}

#[async_trait]
impl UpsertStore for MemoryUpsertStore {
    async fn upsert_envelope(
        &self,
        envelope: &EnvelopeRecord,
        recipients: &[RecipientRecord],
    ) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state.lock().await;

        let existing = state.envelopes.get(&envelope.id).cloned();
        let merge = merge_envelope(existing.as_ref(), envelope, Utc::now());
        warn_on_regression(&envelope.id, &merge);

        let stored: Vec<Recipient> = state
            .recipients
            .iter()
            .filter(|r| r.envelope_id == envelope.id)
            .cloned()
            .collect();
        let plan = plan_recipients(&stored, recipients);

        state.recipients.retain(|r| !plan.deletes.contains(&r.id));
        for (id, record) in &plan.updates {
            if let Some(row) = state.recipients.iter_mut().find(|r| r.id == *id) {
                row.name = record.name.clone();
                row.email = record.email.clone();
                row.role = record.role.clone();
                row.routing_order = record.routing_order;
                row.status = record.status.clone();
                row.raw = record.raw.clone();
            }
        }
        for record in &plan.inserts {
            state.next_recipient_id += 1;
            let id = state.next_recipient_id;
            state.recipients.push(Recipient {
                id,
                envelope_id: envelope.id.clone(),
                name: record.name.clone(),
                email: record.email.clone(),
                role: record.role.clone(),
                routing_order: record.routing_order,
                status: record.status.clone(),
                raw: record.raw.clone(),
            });
        }
        state.envelopes.insert(envelope.id.clone(), merge.envelope);

        Ok(UpsertOutcome {
            inserted: existing.is_none(),
            regressed_from: merge.regressed_from,
            recipients_inserted: plan.inserts.len(),
            recipients_updated: plan.updates.len(),
            recipients_removed: plan.deletes.len(),
        })
    }

    async fn append_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry, StoreError> {
        let mut state = self.state.lock().await;
        let row = SyncLogEntry {
            id: state.sync_logs.len() as i64 + 1,
            sync_type: entry.sync_type.clone(),
            last_sync_date: entry.last_sync_date,
            envelopes_synced: entry.envelopes_synced,
            envelopes_failed: entry.envelopes_failed,
            sync_status: entry.sync_status,
            error_message: truncate_message(entry.error_message.as_deref()),
            created_at: Utc::now(),
        };
        state.sync_logs.push(row.clone());
        Ok(row)
    }

    async fn last_successful_sync_date(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .sync_logs
            .iter()
            .rev()
            .find(|log| log.sync_status == SyncOutcome::Success)
            .map(|log| log.last_sync_date))
    }

    async fn recent_sync_logs(&self, limit: i64) -> Result<Vec<SyncLogEntry>, StoreError> {
        let state = self.state.lock().await;
        let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        Ok(state.sync_logs.iter().rev().take(limit).cloned().collect())
    }

    async fn try_acquire_sync_lock(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        stale_after: chrono::Duration,
    ) -> Result<LockAcquisition, StoreError> {
        let mut state = self.state.lock().await;
        let fresh = SyncLock {
            name: SYNC_LOCK_NAME.to_string(),
            owner: owner.to_string(),
            acquired_at: now,
        };
        match state.lock.take() {
            Some(current) if lock_is_fresh(&current, now, stale_after) => {
                state.lock = Some(current.clone());
                Ok(LockAcquisition::Held { current })
            }
            Some(previous) => {
                state.lock = Some(fresh);
                Ok(LockAcquisition::Reclaimed { previous })
            }
            None => {
                state.lock = Some(fresh);
                Ok(LockAcquisition::Acquired)
            }
        }
    }

    async fn release_sync_lock(&self, owner: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.lock.as_ref().is_some_and(|lock| lock.owner == owner) {
            state.lock = None;
            return Ok(true);
        }
        Ok(false)
    }

    async fn current_sync_lock(&self) -> Result<Option<SyncLock>, StoreError> {
        Ok(self.state.lock().await.lock.clone())
    }
}
