// SQLite-backed implementation of every storage port.
//
// Tables:
// - filter_rules: rule definitions with JSON kind/scope payloads
// - reports: user reports, with a partial unique index enforcing one
//   pending report per (reporter, content) pair
// - queue_items: moderation queue, indexed for triage ordering
// - moderation_states: per-content moderation projections
// - sanctions: user sanctions with JSON appeal/revocation sub-records
// - moderation_log: append-only audit log, seq assigned by AUTOINCREMENT
//
// The pool is capped at one connection. SQLite only ever has one writer,
// and a single connection keeps every check-then-write transaction serial,
// which is what the conditional lifecycle writes rely on here.

use crate::core::actions::{AppliedAction, ApplyAction, ModerationState, ModerationStateStore};
use crate::core::audit::{
    LogAction, ModLogQuery, ModLogStore, ModerationLogEntry, NewLogEntry, StateSnapshot,
};
use crate::core::error::{ModResult, ModerationError};
use crate::core::filters::{FilterRule, FilterStore, RuleAction, RuleKind, RuleScope, RuleStats};
use crate::core::ids::{
    ContentId, DiscussionId, LogEntryId, QueueItemId, ReportId, RuleId, SanctionId, UserId,
};
use crate::core::queue::{
    Priority, QueueItem, QueuePage, QueueQuery, QueueSource, QueueStatus, QueueStore,
};
use crate::core::reports::{Report, ReportCategory, ReportReview, ReportStatus, ReportStore};
use crate::core::sanctions::{
    is_currently_active, AppealRecord, AppealStatus, RevocationRecord, Sanction, SanctionStore,
    SanctionType,
};
use crate::core::stats::{
    QueueCounts, QueueDepth, ReportCounts, RuleCounts, SanctionCount, StatsStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, Transaction};
use std::path::Path;
use uuid::Uuid;

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&conn_str)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS filter_rules (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                action TEXT NOT NULL,
                severity TEXT NOT NULL,
                confidence_threshold REAL NOT NULL,
                scope TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT 1,
                test_mode BOOLEAN NOT NULL DEFAULT 0,
                matches INTEGER NOT NULL DEFAULT 0,
                true_positives INTEGER NOT NULL DEFAULT 0,
                false_positives INTEGER NOT NULL DEFAULT 0,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                content_id TEXT NOT NULL,
                discussion_id TEXT NOT NULL,
                reporter_id TEXT NOT NULL,
                category TEXT NOT NULL,
                reason TEXT NOT NULL,
                priority TEXT NOT NULL,
                status TEXT NOT NULL,
                resolution TEXT,
                reviewed_by TEXT,
                reviewed_at TEXT,
                review_notes TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // The dedupe guard: one pending report per (reporter, content) pair.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS ux_reports_pending
                ON reports(reporter_id, content_id) WHERE status = 'pending';
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_reports_content
                ON reports(content_id, created_at DESC);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_items (
                id TEXT PRIMARY KEY,
                report_id TEXT,
                content_id TEXT NOT NULL,
                discussion_id TEXT NOT NULL,
                priority TEXT NOT NULL,
                priority_rank INTEGER NOT NULL,
                status TEXT NOT NULL,
                source TEXT NOT NULL,
                rule_id TEXT,
                preview TEXT NOT NULL,
                is_urgent BOOLEAN NOT NULL DEFAULT 0,
                assigned_to TEXT,
                assigned_by TEXT,
                assigned_at TEXT,
                resolved_by TEXT,
                resolved_at TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_queue_items_triage
                ON queue_items(status, priority_rank DESC, created_at DESC);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_queue_items_report
                ON queue_items(report_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_states (
                content_id TEXT PRIMARY KEY,
                discussion_id TEXT NOT NULL,
                is_hidden BOOLEAN NOT NULL DEFAULT 0,
                hidden_by TEXT,
                hidden_at TEXT,
                hide_reason TEXT,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                deleted_by TEXT,
                deleted_at TEXT,
                delete_reason TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sanctions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                issued_by TEXT NOT NULL,
                sanction_type TEXT NOT NULL,
                reason TEXT NOT NULL,
                starts_at TEXT NOT NULL,
                ends_at TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                appeal TEXT,
                appeal_status TEXT,
                revocation TEXT,
                report_id TEXT,
                content_id TEXT,
                prior_sanction_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sanctions_user
                ON sanctions(user_id, created_at DESC);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_log (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                content_id TEXT,
                discussion_id TEXT,
                sanction_id TEXT,
                subject_user_id TEXT,
                moderator_id TEXT NOT NULL,
                action TEXT NOT NULL,
                reason TEXT,
                before_state TEXT NOT NULL,
                after_state TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_moderation_log_content
                ON moderation_log(content_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_moderation_log_sanction
                ON moderation_log(sanction_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_sanction_tx(
        tx: &mut Transaction<'_, Sqlite>,
        id: &SanctionId,
    ) -> ModResult<Sanction> {
        let row = sqlx::query("SELECT * FROM sanctions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(ModerationError::storage)?;
        match row {
            Some(row) => sanction_from_row(&row),
            None => Err(ModerationError::NotFound(format!("sanction {id}"))),
        }
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn parse_uuid(raw: &str) -> ModResult<Uuid> {
    Uuid::parse_str(raw).map_err(ModerationError::storage)
}

fn parse_ts(raw: &str) -> ModResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(ModerationError::storage)
}

fn parse_ts_opt(raw: Option<String>) -> ModResult<Option<DateTime<Utc>>> {
    match raw {
        Some(raw) => Ok(Some(parse_ts(&raw)?)),
        None => Ok(None),
    }
}

fn parse_priority(raw: &str) -> ModResult<Priority> {
    Priority::parse_str(raw)
        .ok_or_else(|| ModerationError::storage(format!("unknown priority {raw}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> ModResult<T> {
    serde_json::from_str(raw).map_err(ModerationError::storage)
}

fn to_json<T: serde::Serialize>(value: &T) -> ModResult<String> {
    serde_json::to_string(value).map_err(ModerationError::storage)
}

fn rule_from_row(row: &SqliteRow) -> ModResult<FilterRule> {
    let matches = row.get::<i64, _>("matches") as u64;
    let true_positives = row.get::<i64, _>("true_positives") as u64;
    let false_positives = row.get::<i64, _>("false_positives") as u64;
    let accuracy = if matches > 0 {
        true_positives as f64 / matches as f64
    } else {
        0.0
    };
    let action_raw: String = row.get("action");
    let severity_raw: String = row.get("severity");
    Ok(FilterRule {
        id: RuleId(parse_uuid(&row.get::<String, _>("id"))?),
        name: row.get("name"),
        kind: parse_json::<RuleKind>(&row.get::<String, _>("kind"))?,
        action: RuleAction::parse_str(&action_raw)
            .ok_or_else(|| ModerationError::storage(format!("unknown rule action {action_raw}")))?,
        severity: parse_priority(&severity_raw)?,
        confidence_threshold: row.get("confidence_threshold"),
        scope: parse_json::<RuleScope>(&row.get::<String, _>("scope"))?,
        active: row.get("active"),
        test_mode: row.get("test_mode"),
        stats: RuleStats {
            matches,
            true_positives,
            false_positives,
            accuracy,
        },
        created_by: UserId(row.get("created_by")),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts_opt(row.get("updated_at"))?,
    })
}

fn report_from_row(row: &SqliteRow) -> ModResult<Report> {
    let category_raw: String = row.get("category");
    let priority_raw: String = row.get("priority");
    let status_raw: String = row.get("status");
    Ok(Report {
        id: ReportId(parse_uuid(&row.get::<String, _>("id"))?),
        content_id: ContentId(row.get("content_id")),
        discussion_id: DiscussionId(row.get("discussion_id")),
        reporter_id: UserId(row.get("reporter_id")),
        category: ReportCategory::parse_str(&category_raw),
        reason: row.get("reason"),
        priority: parse_priority(&priority_raw)?,
        status: ReportStatus::parse_str(&status_raw)
            .ok_or_else(|| ModerationError::storage(format!("unknown report status {status_raw}")))?,
        resolution: row.get("resolution"),
        reviewed_by: row.get::<Option<String>, _>("reviewed_by").map(UserId),
        reviewed_at: parse_ts_opt(row.get("reviewed_at"))?,
        review_notes: row.get("review_notes"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn item_from_row(row: &SqliteRow) -> ModResult<QueueItem> {
    let priority_raw: String = row.get("priority");
    let status_raw: String = row.get("status");
    let source_raw: String = row.get("source");
    let report_id = match row.get::<Option<String>, _>("report_id") {
        Some(raw) => Some(ReportId(parse_uuid(&raw)?)),
        None => None,
    };
    let rule_id = match row.get::<Option<String>, _>("rule_id") {
        Some(raw) => Some(RuleId(parse_uuid(&raw)?)),
        None => None,
    };
    Ok(QueueItem {
        id: QueueItemId(parse_uuid(&row.get::<String, _>("id"))?),
        report_id,
        content_id: ContentId(row.get("content_id")),
        discussion_id: DiscussionId(row.get("discussion_id")),
        priority: parse_priority(&priority_raw)?,
        status: QueueStatus::parse_str(&status_raw)
            .ok_or_else(|| ModerationError::storage(format!("unknown queue status {status_raw}")))?,
        source: QueueSource::parse_str(&source_raw)
            .ok_or_else(|| ModerationError::storage(format!("unknown queue source {source_raw}")))?,
        rule_id,
        preview: row.get("preview"),
        is_urgent: row.get("is_urgent"),
        assigned_to: row.get::<Option<String>, _>("assigned_to").map(UserId),
        assigned_by: row.get::<Option<String>, _>("assigned_by").map(UserId),
        assigned_at: parse_ts_opt(row.get("assigned_at"))?,
        resolved_by: row.get::<Option<String>, _>("resolved_by").map(UserId),
        resolved_at: parse_ts_opt(row.get("resolved_at"))?,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn state_from_row(row: &SqliteRow) -> ModResult<ModerationState> {
    Ok(ModerationState {
        content_id: ContentId(row.get("content_id")),
        discussion_id: DiscussionId(row.get("discussion_id")),
        is_hidden: row.get("is_hidden"),
        hidden_by: row.get::<Option<String>, _>("hidden_by").map(UserId),
        hidden_at: parse_ts_opt(row.get("hidden_at"))?,
        hide_reason: row.get("hide_reason"),
        is_deleted: row.get("is_deleted"),
        deleted_by: row.get::<Option<String>, _>("deleted_by").map(UserId),
        deleted_at: parse_ts_opt(row.get("deleted_at"))?,
        delete_reason: row.get("delete_reason"),
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

fn sanction_from_row(row: &SqliteRow) -> ModResult<Sanction> {
    let type_raw: String = row.get("sanction_type");
    let appeal = match row.get::<Option<String>, _>("appeal") {
        Some(raw) => Some(parse_json::<AppealRecord>(&raw)?),
        None => None,
    };
    let revocation = match row.get::<Option<String>, _>("revocation") {
        Some(raw) => Some(parse_json::<RevocationRecord>(&raw)?),
        None => None,
    };
    let report_id = match row.get::<Option<String>, _>("report_id") {
        Some(raw) => Some(ReportId(parse_uuid(&raw)?)),
        None => None,
    };
    Ok(Sanction {
        id: SanctionId(parse_uuid(&row.get::<String, _>("id"))?),
        user_id: UserId(row.get("user_id")),
        issued_by: UserId(row.get("issued_by")),
        sanction_type: SanctionType::parse_str(&type_raw)
            .ok_or_else(|| ModerationError::storage(format!("unknown sanction type {type_raw}")))?,
        reason: row.get("reason"),
        starts_at: parse_ts(&row.get::<String, _>("starts_at"))?,
        ends_at: parse_ts_opt(row.get("ends_at"))?,
        is_active: row.get("is_active"),
        appeal,
        revocation,
        report_id,
        content_id: row.get::<Option<String>, _>("content_id").map(ContentId),
        prior_sanction_count: row.get::<i64, _>("prior_sanction_count") as u32,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

fn log_from_row(row: &SqliteRow) -> ModResult<ModerationLogEntry> {
    let action_raw: String = row.get("action");
    let sanction_id = match row.get::<Option<String>, _>("sanction_id") {
        Some(raw) => Some(SanctionId(parse_uuid(&raw)?)),
        None => None,
    };
    Ok(ModerationLogEntry {
        id: LogEntryId(parse_uuid(&row.get::<String, _>("id"))?),
        seq: row.get("seq"),
        content_id: row.get::<Option<String>, _>("content_id").map(ContentId),
        discussion_id: row
            .get::<Option<String>, _>("discussion_id")
            .map(DiscussionId),
        sanction_id,
        subject_user_id: row.get::<Option<String>, _>("subject_user_id").map(UserId),
        moderator_id: UserId(row.get("moderator_id")),
        action: LogAction::parse_str(&action_raw)
            .ok_or_else(|| ModerationError::storage(format!("unknown log action {action_raw}")))?,
        reason: row.get("reason"),
        before: parse_json::<StateSnapshot>(&row.get::<String, _>("before_state"))?,
        after: parse_json::<StateSnapshot>(&row.get::<String, _>("after_state"))?,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
    })
}

/// Inserts a log entry inside the caller's transaction and returns it with
/// the AUTOINCREMENT-assigned sequence number.
async fn append_log_tx(
    tx: &mut Transaction<'_, Sqlite>,
    new: NewLogEntry,
) -> ModResult<ModerationLogEntry> {
    let id = LogEntryId::new();
    let before = to_json(&new.before)?;
    let after = to_json(&new.after)?;
    let result = sqlx::query(
        r#"
        INSERT INTO moderation_log (
            id, content_id, discussion_id, sanction_id, subject_user_id,
            moderator_id, action, reason, before_state, after_state, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.content_id.as_ref().map(|c| c.0.clone()))
    .bind(new.discussion_id.as_ref().map(|d| d.0.clone()))
    .bind(new.sanction_id.map(|s| s.to_string()))
    .bind(new.subject_user_id.as_ref().map(|u| u.0.clone()))
    .bind(new.moderator_id.0.clone())
    .bind(new.action.as_str())
    .bind(new.reason.clone())
    .bind(before)
    .bind(after)
    .bind(new.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(ModerationError::storage)?;

    Ok(ModerationLogEntry {
        id,
        seq: result.last_insert_rowid(),
        content_id: new.content_id,
        discussion_id: new.discussion_id,
        sanction_id: new.sanction_id,
        subject_user_id: new.subject_user_id,
        moderator_id: new.moderator_id,
        action: new.action,
        reason: new.reason,
        before: new.before,
        after: new.after,
        created_at: new.created_at,
    })
}

// ============================================================================
// FILTER RULES
// ============================================================================

#[async_trait]
impl FilterStore for SqliteStore {
    async fn insert_rule(&self, rule: &FilterRule) -> ModResult<()> {
        sqlx::query(
            r#"
            INSERT INTO filter_rules (
                id, name, kind, action, severity, confidence_threshold, scope,
                active, test_mode, matches, true_positives, false_positives,
                created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.id.to_string())
        .bind(rule.name.clone())
        .bind(to_json(&rule.kind)?)
        .bind(rule.action.as_str())
        .bind(rule.severity.as_str())
        .bind(rule.confidence_threshold)
        .bind(to_json(&rule.scope)?)
        .bind(rule.active)
        .bind(rule.test_mode)
        .bind(rule.stats.matches as i64)
        .bind(rule.stats.true_positives as i64)
        .bind(rule.stats.false_positives as i64)
        .bind(rule.created_by.0.clone())
        .bind(rule.created_at.to_rfc3339())
        .bind(rule.updated_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;
        Ok(())
    }

    async fn rule(&self, id: &RuleId) -> ModResult<Option<FilterRule>> {
        let row = sqlx::query("SELECT * FROM filter_rules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        row.map(|row| rule_from_row(&row)).transpose()
    }

    async fn update_rule(&self, rule: &FilterRule) -> ModResult<FilterRule> {
        let result = sqlx::query(
            r#"
            UPDATE filter_rules
            SET name = ?, kind = ?, action = ?, severity = ?,
                confidence_threshold = ?, scope = ?, active = ?, test_mode = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(rule.name.clone())
        .bind(to_json(&rule.kind)?)
        .bind(rule.action.as_str())
        .bind(rule.severity.as_str())
        .bind(rule.confidence_threshold)
        .bind(to_json(&rule.scope)?)
        .bind(rule.active)
        .bind(rule.test_mode)
        .bind(rule.updated_at.map(|t| t.to_rfc3339()))
        .bind(rule.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;
        if result.rows_affected() == 0 {
            return Err(ModerationError::NotFound(format!("filter rule {}", rule.id)));
        }
        self.rule(&rule.id)
            .await?
            .ok_or_else(|| ModerationError::storage("updated rule vanished"))
    }

    async fn set_rule_active(&self, id: &RuleId, active: bool) -> ModResult<FilterRule> {
        let result = sqlx::query("UPDATE filter_rules SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        if result.rows_affected() == 0 {
            return Err(ModerationError::NotFound(format!("filter rule {id}")));
        }
        self.rule(id)
            .await?
            .ok_or_else(|| ModerationError::storage("updated rule vanished"))
    }

    async fn list_rules(&self, active_only: bool) -> ModResult<Vec<FilterRule>> {
        let sql = if active_only {
            "SELECT * FROM filter_rules WHERE active = 1 ORDER BY created_at ASC"
        } else {
            "SELECT * FROM filter_rules ORDER BY created_at ASC"
        };
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        rows.iter().map(rule_from_row).collect()
    }

    async fn record_rule_feedback(&self, id: &RuleId, was_correct: bool) -> ModResult<FilterRule> {
        // Arithmetic in SQL so concurrent feedback cannot lose increments.
        let result = sqlx::query(
            r#"
            UPDATE filter_rules
            SET matches = matches + 1,
                true_positives = true_positives + CASE WHEN ? THEN 1 ELSE 0 END,
                false_positives = false_positives + CASE WHEN ? THEN 0 ELSE 1 END
            WHERE id = ?
            "#,
        )
        .bind(was_correct)
        .bind(was_correct)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;
        if result.rows_affected() == 0 {
            return Err(ModerationError::NotFound(format!("filter rule {id}")));
        }
        self.rule(id)
            .await?
            .ok_or_else(|| ModerationError::storage("updated rule vanished"))
    }
}

// ============================================================================
// REPORTS
// ============================================================================

#[async_trait]
impl ReportStore for SqliteStore {
    async fn insert_report_with_item(&self, report: &Report, item: &QueueItem) -> ModResult<()> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;

        let insert = sqlx::query(
            r#"
            INSERT INTO reports (
                id, content_id, discussion_id, reporter_id, category, reason,
                priority, status, resolution, reviewed_by, reviewed_at,
                review_notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.id.to_string())
        .bind(report.content_id.0.clone())
        .bind(report.discussion_id.0.clone())
        .bind(report.reporter_id.0.clone())
        .bind(report.category.as_str())
        .bind(report.reason.clone())
        .bind(report.priority.as_str())
        .bind(report.status.as_str())
        .bind(report.resolution.clone())
        .bind(report.reviewed_by.as_ref().map(|u| u.0.clone()))
        .bind(report.reviewed_at.map(|t| t.to_rfc3339()))
        .bind(report.review_notes.clone())
        .bind(report.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            // The partial unique index on pending (reporter, content) pairs
            // decides duplicate-submission races.
            if err
                .as_database_error()
                .map_or(false, |db| db.is_unique_violation())
            {
                return Err(ModerationError::Conflict(
                    "content already reported".to_string(),
                ));
            }
            return Err(ModerationError::storage(err));
        }

        insert_item_tx(&mut tx, item).await?;
        tx.commit().await.map_err(ModerationError::storage)?;
        Ok(())
    }

    async fn report(&self, id: &ReportId) -> ModResult<Option<Report>> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        row.map(|row| report_from_row(&row)).transpose()
    }

    async fn find_pending_by_reporter(
        &self,
        reporter_id: &UserId,
        content_id: &ContentId,
    ) -> ModResult<Option<Report>> {
        let row = sqlx::query(
            "SELECT * FROM reports WHERE reporter_id = ? AND content_id = ? AND status = 'pending'",
        )
        .bind(reporter_id.0.clone())
        .bind(content_id.0.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(ModerationError::storage)?;
        row.map(|row| report_from_row(&row)).transpose()
    }

    async fn mark_reviewed(&self, id: &ReportId, review: &ReportReview) -> ModResult<Report> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = 'reviewed', resolution = ?, reviewed_by = ?,
                reviewed_at = ?, review_notes = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(review.resolution.clone())
        .bind(review.reviewed_by.0.clone())
        .bind(review.reviewed_at.to_rfc3339())
        .bind(review.notes.clone())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        if result.rows_affected() == 0 {
            return match self.report(id).await? {
                None => Err(ModerationError::NotFound(format!("report {id}"))),
                Some(_) => Err(ModerationError::Conflict(format!(
                    "report {id} was already reviewed"
                ))),
            };
        }
        self.report(id)
            .await?
            .ok_or_else(|| ModerationError::storage("reviewed report vanished"))
    }

    async fn reports_for_content(&self, content_id: &ContentId) -> ModResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT * FROM reports WHERE content_id = ? ORDER BY created_at DESC",
        )
        .bind(content_id.0.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(ModerationError::storage)?;
        rows.iter().map(report_from_row).collect()
    }
}

async fn insert_item_tx(tx: &mut Transaction<'_, Sqlite>, item: &QueueItem) -> ModResult<()> {
    sqlx::query(
        r#"
        INSERT INTO queue_items (
            id, report_id, content_id, discussion_id, priority, priority_rank,
            status, source, rule_id, preview, is_urgent, assigned_to,
            assigned_by, assigned_at, resolved_by, resolved_at, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.report_id.map(|r| r.to_string()))
    .bind(item.content_id.0.clone())
    .bind(item.discussion_id.0.clone())
    .bind(item.priority.as_str())
    .bind(item.priority.rank())
    .bind(item.status.as_str())
    .bind(item.source.as_str())
    .bind(item.rule_id.map(|r| r.to_string()))
    .bind(item.preview.clone())
    .bind(item.is_urgent)
    .bind(item.assigned_to.as_ref().map(|u| u.0.clone()))
    .bind(item.assigned_by.as_ref().map(|u| u.0.clone()))
    .bind(item.assigned_at.map(|t| t.to_rfc3339()))
    .bind(item.resolved_by.as_ref().map(|u| u.0.clone()))
    .bind(item.resolved_at.map(|t| t.to_rfc3339()))
    .bind(item.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(ModerationError::storage)?;
    Ok(())
}

// ============================================================================
// QUEUE
// ============================================================================

#[async_trait]
impl QueueStore for SqliteStore {
    async fn insert_item(&self, item: &QueueItem) -> ModResult<()> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;
        insert_item_tx(&mut tx, item).await?;
        tx.commit().await.map_err(ModerationError::storage)?;
        Ok(())
    }

    async fn queue_item(&self, id: &QueueItemId) -> ModResult<Option<QueueItem>> {
        let row = sqlx::query("SELECT * FROM queue_items WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        row.map(|row| item_from_row(&row)).transpose()
    }

    async fn assign_item(
        &self,
        id: &QueueItemId,
        moderator_id: &UserId,
        assigned_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<QueueItem> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items
            SET status = 'in_review', assigned_to = ?, assigned_by = ?, assigned_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(moderator_id.0.clone())
        .bind(assigned_by.0.clone())
        .bind(at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        if result.rows_affected() == 0 {
            return match self.queue_item(id).await? {
                None => Err(ModerationError::NotFound(format!("queue item {id}"))),
                Some(item) if item.status == QueueStatus::Resolved => Err(
                    ModerationError::Conflict(format!("queue item {id} is already resolved")),
                ),
                Some(_) => Err(ModerationError::Conflict(format!(
                    "queue item {id} is already assigned"
                ))),
            };
        }
        self.queue_item(id)
            .await?
            .ok_or_else(|| ModerationError::storage("assigned item vanished"))
    }

    async fn unassign_item(&self, id: &QueueItemId) -> ModResult<QueueItem> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items
            SET status = 'pending', assigned_to = NULL, assigned_by = NULL, assigned_at = NULL
            WHERE id = ? AND status = 'in_review'
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        if result.rows_affected() == 0 {
            return match self.queue_item(id).await? {
                None => Err(ModerationError::NotFound(format!("queue item {id}"))),
                Some(_) => Err(ModerationError::Conflict(format!(
                    "queue item {id} is not in review"
                ))),
            };
        }
        self.queue_item(id)
            .await?
            .ok_or_else(|| ModerationError::storage("unassigned item vanished"))
    }

    async fn resolve_item(
        &self,
        id: &QueueItemId,
        resolved_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<QueueItem> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items
            SET status = 'resolved', resolved_by = ?, resolved_at = ?
            WHERE id = ? AND status != 'resolved'
            "#,
        )
        .bind(resolved_by.0.clone())
        .bind(at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        if result.rows_affected() == 0 {
            return match self.queue_item(id).await? {
                None => Err(ModerationError::NotFound(format!("queue item {id}"))),
                Some(_) => Err(ModerationError::Conflict(format!(
                    "queue item {id} is already resolved"
                ))),
            };
        }
        self.queue_item(id)
            .await?
            .ok_or_else(|| ModerationError::storage("resolved item vanished"))
    }

    async fn resolve_item_for_report(
        &self,
        report_id: &ReportId,
        resolved_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<Option<QueueItem>> {
        let result = sqlx::query(
            r#"
            UPDATE queue_items
            SET status = 'resolved', resolved_by = ?, resolved_at = ?
            WHERE report_id = ? AND status != 'resolved'
            "#,
        )
        .bind(resolved_by.0.clone())
        .bind(at.to_rfc3339())
        .bind(report_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let row = sqlx::query("SELECT * FROM queue_items WHERE report_id = ?")
            .bind(report_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        row.map(|row| item_from_row(&row)).transpose()
    }

    async fn list_items(&self, query: &QueueQuery) -> ModResult<QueuePage> {
        let mut where_sql = String::from(" WHERE 1=1");
        if query.priority.is_some() {
            where_sql.push_str(" AND priority = ?");
        }
        if query.status.is_some() {
            where_sql.push_str(" AND status = ?");
        }
        if query.assigned_to.is_some() {
            where_sql.push_str(" AND assigned_to = ?");
        }

        let count_sql = format!("SELECT COUNT(*) AS n FROM queue_items{where_sql}");
        let mut count_query = sqlx::query(&count_sql);
        if let Some(priority) = query.priority {
            count_query = count_query.bind(priority.as_str());
        }
        if let Some(status) = query.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(assigned_to) = &query.assigned_to {
            count_query = count_query.bind(assigned_to.0.clone());
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(ModerationError::storage)?
            .get::<i64, _>("n") as u64;

        let page_sql = format!(
            "SELECT * FROM queue_items{where_sql} \
             ORDER BY priority_rank DESC, created_at DESC LIMIT ? OFFSET ?"
        );
        let mut page_query = sqlx::query(&page_sql);
        if let Some(priority) = query.priority {
            page_query = page_query.bind(priority.as_str());
        }
        if let Some(status) = query.status {
            page_query = page_query.bind(status.as_str());
        }
        if let Some(assigned_to) = &query.assigned_to {
            page_query = page_query.bind(assigned_to.0.clone());
        }
        let rows = page_query
            .bind(query.limit as i64)
            .bind(query.offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(ModerationError::storage)?;

        let items: ModResult<Vec<QueueItem>> = rows.iter().map(item_from_row).collect();
        Ok(QueuePage {
            items: items?,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }
}

// ============================================================================
// MODERATION STATES
// ============================================================================

#[async_trait]
impl ModerationStateStore for SqliteStore {
    async fn moderation_state(&self, content_id: &ContentId) -> ModResult<Option<ModerationState>> {
        let row = sqlx::query("SELECT * FROM moderation_states WHERE content_id = ?")
            .bind(content_id.0.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        row.map(|row| state_from_row(&row)).transpose()
    }

    async fn apply_action(&self, apply: &ApplyAction) -> ModResult<AppliedAction> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;

        let existing = sqlx::query("SELECT * FROM moderation_states WHERE content_id = ?")
            .bind(apply.content_id.0.clone())
            .fetch_optional(&mut *tx)
            .await
            .map_err(ModerationError::storage)?;
        let mut state = match existing {
            Some(row) => state_from_row(&row)?,
            None => ModerationState::visible(
                apply.content_id.clone(),
                apply.discussion_id.clone(),
                apply.at,
            ),
        };

        let before = state.snapshot();
        state.apply(apply.action, &apply.moderator_id, apply.reason.as_deref(), apply.at);
        let after = state.snapshot();

        sqlx::query(
            r#"
            INSERT INTO moderation_states (
                content_id, discussion_id, is_hidden, hidden_by, hidden_at,
                hide_reason, is_deleted, deleted_by, deleted_at, delete_reason,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_id) DO UPDATE SET
                discussion_id = excluded.discussion_id,
                is_hidden = excluded.is_hidden,
                hidden_by = excluded.hidden_by,
                hidden_at = excluded.hidden_at,
                hide_reason = excluded.hide_reason,
                is_deleted = excluded.is_deleted,
                deleted_by = excluded.deleted_by,
                deleted_at = excluded.deleted_at,
                delete_reason = excluded.delete_reason,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(state.content_id.0.clone())
        .bind(state.discussion_id.0.clone())
        .bind(state.is_hidden)
        .bind(state.hidden_by.as_ref().map(|u| u.0.clone()))
        .bind(state.hidden_at.map(|t| t.to_rfc3339()))
        .bind(state.hide_reason.clone())
        .bind(state.is_deleted)
        .bind(state.deleted_by.as_ref().map(|u| u.0.clone()))
        .bind(state.deleted_at.map(|t| t.to_rfc3339()))
        .bind(state.delete_reason.clone())
        .bind(state.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(ModerationError::storage)?;

        let log_entry = append_log_tx(
            &mut tx,
            NewLogEntry::content_action(
                apply.content_id.clone(),
                apply.discussion_id.clone(),
                apply.author_id.clone(),
                apply.moderator_id.clone(),
                apply.action.log_action(),
                apply.reason.clone(),
                before,
                after,
                apply.at,
            ),
        )
        .await?;

        tx.commit().await.map_err(ModerationError::storage)?;
        Ok(AppliedAction { state, log_entry })
    }
}

// ============================================================================
// SANCTIONS
// ============================================================================

#[async_trait]
impl SanctionStore for SqliteStore {
    async fn insert_sanction(&self, sanction: &Sanction) -> ModResult<()> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;

        sqlx::query(
            r#"
            INSERT INTO sanctions (
                id, user_id, issued_by, sanction_type, reason, starts_at,
                ends_at, is_active, appeal, appeal_status, revocation,
                report_id, content_id, prior_sanction_count, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sanction.id.to_string())
        .bind(sanction.user_id.0.clone())
        .bind(sanction.issued_by.0.clone())
        .bind(sanction.sanction_type.as_str())
        .bind(sanction.reason.clone())
        .bind(sanction.starts_at.to_rfc3339())
        .bind(sanction.ends_at.map(|t| t.to_rfc3339()))
        .bind(sanction.is_active)
        .bind(match &sanction.appeal {
            Some(appeal) => Some(to_json(appeal)?),
            None => None,
        })
        .bind(sanction.appeal_status().map(|s| s.as_str()))
        .bind(match &sanction.revocation {
            Some(revocation) => Some(to_json(revocation)?),
            None => None,
        })
        .bind(sanction.report_id.map(|r| r.to_string()))
        .bind(sanction.content_id.as_ref().map(|c| c.0.clone()))
        .bind(sanction.prior_sanction_count as i64)
        .bind(sanction.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(ModerationError::storage)?;

        append_log_tx(
            &mut tx,
            NewLogEntry::sanction_action(
                sanction.id,
                sanction.user_id.clone(),
                sanction.content_id.clone(),
                sanction.issued_by.clone(),
                sanction.sanction_type.log_action(),
                Some(sanction.reason.clone()),
                StateSnapshot::Sanction {
                    is_active: false,
                    appeal_status: None,
                },
                StateSnapshot::Sanction {
                    is_active: sanction.is_active,
                    appeal_status: sanction.appeal_status(),
                },
                sanction.created_at,
            ),
        )
        .await?;

        tx.commit().await.map_err(ModerationError::storage)?;
        Ok(())
    }

    async fn sanction(&self, id: &SanctionId) -> ModResult<Option<Sanction>> {
        let row = sqlx::query("SELECT * FROM sanctions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        row.map(|row| sanction_from_row(&row)).transpose()
    }

    async fn sanctions_for_user(&self, user_id: &UserId) -> ModResult<Vec<Sanction>> {
        let rows = sqlx::query(
            "SELECT * FROM sanctions WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.0.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(ModerationError::storage)?;
        rows.iter().map(sanction_from_row).collect()
    }

    async fn revoke_sanction(
        &self,
        id: &SanctionId,
        revoked_by: &UserId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;
        let sanction = Self::fetch_sanction_tx(&mut tx, id).await?;
        if !is_currently_active(&sanction, at) {
            return Err(ModerationError::Conflict(format!(
                "sanction {id} is not active"
            )));
        }

        let revocation = RevocationRecord {
            revoked_by: revoked_by.clone(),
            reason: reason.to_string(),
            revoked_at: at,
        };
        sqlx::query("UPDATE sanctions SET is_active = 0, revocation = ? WHERE id = ?")
            .bind(to_json(&revocation)?)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(ModerationError::storage)?;

        append_log_tx(
            &mut tx,
            NewLogEntry::sanction_action(
                *id,
                sanction.user_id.clone(),
                sanction.content_id.clone(),
                revoked_by.clone(),
                LogAction::RevokeSanction,
                Some(reason.to_string()),
                StateSnapshot::Sanction {
                    is_active: true,
                    appeal_status: sanction.appeal_status(),
                },
                StateSnapshot::Sanction {
                    is_active: false,
                    appeal_status: sanction.appeal_status(),
                },
                at,
            ),
        )
        .await?;

        tx.commit().await.map_err(ModerationError::storage)?;
        Ok(Sanction {
            is_active: false,
            revocation: Some(revocation),
            ..sanction
        })
    }

    async fn file_appeal(
        &self,
        id: &SanctionId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;
        let sanction = Self::fetch_sanction_tx(&mut tx, id).await?;
        if !is_currently_active(&sanction, at) {
            return Err(ModerationError::Conflict(format!(
                "sanction {id} is not active"
            )));
        }
        if sanction.appeal.is_some() {
            return Err(ModerationError::Conflict(format!(
                "sanction {id} was already appealed"
            )));
        }

        let appeal = AppealRecord::pending(reason.to_string(), at);
        sqlx::query("UPDATE sanctions SET appeal = ?, appeal_status = 'pending' WHERE id = ?")
            .bind(to_json(&appeal)?)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(ModerationError::storage)?;
        tx.commit().await.map_err(ModerationError::storage)?;

        Ok(Sanction {
            appeal: Some(appeal),
            ..sanction
        })
    }

    async fn decide_appeal(
        &self,
        id: &SanctionId,
        approved: bool,
        reviewed_by: &UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction> {
        let mut tx = self.pool.begin().await.map_err(ModerationError::storage)?;
        let sanction = Self::fetch_sanction_tx(&mut tx, id).await?;

        let mut appeal = match sanction.appeal.clone() {
            Some(appeal) if appeal.status == AppealStatus::Pending => appeal,
            _ => {
                return Err(ModerationError::Conflict(format!(
                    "sanction {id} has no pending appeal"
                )))
            }
        };
        let before = StateSnapshot::Sanction {
            is_active: sanction.is_active,
            appeal_status: Some(AppealStatus::Pending),
        };

        appeal.status = if approved {
            AppealStatus::Approved
        } else {
            AppealStatus::Denied
        };
        appeal.reviewed_by = Some(reviewed_by.clone());
        appeal.review_notes = notes.clone();
        appeal.reviewed_at = Some(at);
        let is_active = sanction.is_active && !approved;

        sqlx::query(
            "UPDATE sanctions SET appeal = ?, appeal_status = ?, is_active = ? WHERE id = ?",
        )
        .bind(to_json(&appeal)?)
        .bind(appeal.status.as_str())
        .bind(is_active)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(ModerationError::storage)?;

        append_log_tx(
            &mut tx,
            NewLogEntry::sanction_action(
                *id,
                sanction.user_id.clone(),
                sanction.content_id.clone(),
                reviewed_by.clone(),
                if approved {
                    LogAction::AppealApproved
                } else {
                    LogAction::AppealDenied
                },
                notes,
                before,
                StateSnapshot::Sanction {
                    is_active,
                    appeal_status: Some(appeal.status),
                },
                at,
            ),
        )
        .await?;

        tx.commit().await.map_err(ModerationError::storage)?;
        Ok(Sanction {
            is_active,
            appeal: Some(appeal),
            ..sanction
        })
    }
}

// ============================================================================
// MODERATION LOG
// ============================================================================

#[async_trait]
impl ModLogStore for SqliteStore {
    async fn log_entries(&self, query: &ModLogQuery) -> ModResult<Vec<ModerationLogEntry>> {
        let mut sql = String::from("SELECT * FROM moderation_log WHERE 1=1");
        if query.content_id.is_some() {
            sql.push_str(" AND content_id = ?");
        }
        if query.discussion_id.is_some() {
            sql.push_str(" AND discussion_id = ?");
        }
        sql.push_str(" ORDER BY seq DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query(&sql);
        if let Some(content_id) = &query.content_id {
            q = q.bind(content_id.0.clone());
        }
        if let Some(discussion_id) = &query.discussion_id {
            q = q.bind(discussion_id.0.clone());
        }
        let rows = q
            .bind(query.limit as i64)
            .bind(query.offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        rows.iter().map(log_from_row).collect()
    }
}

// ============================================================================
// STATS
// ============================================================================

#[async_trait]
impl StatsStore for SqliteStore {
    async fn report_counts(&self) -> ModResult<ReportCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM reports GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        let mut counts = ReportCounts::default();
        for row in rows {
            let status: String = row.get("status");
            let n = row.get::<i64, _>("n") as u64;
            match status.as_str() {
                "pending" => counts.pending = n,
                "reviewed" => counts.reviewed = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn queue_counts(&self) -> ModResult<QueueCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM queue_items GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(ModerationError::storage)?;
        let mut counts = QueueCounts::default();
        for row in rows {
            let status: String = row.get("status");
            let n = row.get::<i64, _>("n") as u64;
            match status.as_str() {
                "pending" => counts.pending = n,
                "in_review" => counts.in_review = n,
                "resolved" => counts.resolved = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn queue_depths(&self) -> ModResult<Vec<QueueDepth>> {
        let rows = sqlx::query(
            "SELECT priority, COUNT(*) AS n FROM queue_items \
             WHERE status = 'pending' GROUP BY priority",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        let mut depths: Vec<QueueDepth> = Priority::all()
            .into_iter()
            .rev()
            .map(|priority| QueueDepth { priority, count: 0 })
            .collect();
        for row in rows {
            let priority = parse_priority(&row.get::<String, _>("priority"))?;
            let n = row.get::<i64, _>("n") as u64;
            if let Some(depth) = depths.iter_mut().find(|d| d.priority == priority) {
                depth.count = n;
            }
        }
        Ok(depths)
    }

    async fn active_sanction_counts(&self, now: DateTime<Utc>) -> ModResult<Vec<SanctionCount>> {
        let rows = sqlx::query(
            "SELECT sanction_type, COUNT(*) AS n FROM sanctions \
             WHERE is_active = 1 AND (ends_at IS NULL OR ends_at > ?) \
             GROUP BY sanction_type",
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(ModerationError::storage)?;

        let mut counts = Vec::new();
        for sanction_type in [
            SanctionType::PermanentBan,
            SanctionType::TemporarySuspension,
            SanctionType::Warning,
        ] {
            for row in &rows {
                let raw: String = row.get("sanction_type");
                if raw == sanction_type.as_str() {
                    counts.push(SanctionCount {
                        sanction_type,
                        count: row.get::<i64, _>("n") as u64,
                    });
                }
            }
        }
        Ok(counts)
    }

    async fn rule_counts(&self) -> ModResult<RuleCounts> {
        let active = sqlx::query("SELECT COUNT(*) AS n FROM filter_rules WHERE active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(ModerationError::storage)?
            .get::<i64, _>("n") as u64;
        let test_mode = sqlx::query(
            "SELECT COUNT(*) AS n FROM filter_rules WHERE active = 1 AND test_mode = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(ModerationError::storage)?
        .get::<i64, _>("n") as u64;
        Ok(RuleCounts { active, test_mode })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::ModerationAction;
    use crate::core::filters::NewFilterRule;
    use tempfile::TempDir;

    async fn store() -> (SqliteStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moderation.db");
        let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();
        (store, dir)
    }

    fn report_pair(reporter: &str, content: &str) -> (Report, QueueItem) {
        let now = Utc::now();
        let report = Report::new(
            ContentId::from(content),
            DiscussionId::from("d-1"),
            UserId::from(reporter),
            ReportCategory::Spam,
            "spam".to_string(),
            now,
        );
        let item = QueueItem::for_report(
            report.id,
            report.content_id.clone(),
            report.discussion_id.clone(),
            report.priority,
            "preview".to_string(),
            now,
        );
        (report, item)
    }

    #[tokio::test]
    async fn test_pending_report_dedupe_survives_in_the_index() {
        let (store, _dir) = store().await;
        let (report, item) = report_pair("u-1", "c-1");
        store.insert_report_with_item(&report, &item).await.unwrap();

        let (dup, dup_item) = report_pair("u-1", "c-1");
        let second = store.insert_report_with_item(&dup, &dup_item).await;
        assert!(matches!(second, Err(ModerationError::Conflict(_))));

        store
            .mark_reviewed(
                &report.id,
                &ReportReview {
                    reviewed_by: UserId::from("mod-1"),
                    resolution: "done".to_string(),
                    notes: None,
                    reviewed_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        // Reviewed reports leave the partial index, so the pair is free again.
        let (again, again_item) = report_pair("u-1", "c-1");
        store
            .insert_report_with_item(&again, &again_item)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_assign_is_a_conditional_write() {
        let (store, _dir) = store().await;
        let (report, item) = report_pair("u-1", "c-1");
        store.insert_report_with_item(&report, &item).await.unwrap();

        let assigned = store
            .assign_item(&item.id, &UserId::from("mod-1"), &UserId::from("mod-1"), Utc::now())
            .await
            .unwrap();
        assert_eq!(assigned.status, QueueStatus::InReview);
        assert_eq!(assigned.assigned_to, Some(UserId::from("mod-1")));

        let second = store
            .assign_item(&item.id, &UserId::from("mod-2"), &UserId::from("mod-2"), Utc::now())
            .await;
        assert!(matches!(second, Err(ModerationError::Conflict(_))));

        let missing = store
            .assign_item(
                &QueueItemId::new(),
                &UserId::from("mod-1"),
                &UserId::from("mod-1"),
                Utc::now(),
            )
            .await;
        assert!(matches!(missing, Err(ModerationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_apply_action_persists_state_and_log_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moderation.db");
        let url = path.to_str().unwrap().to_string();

        {
            let store = SqliteStore::new(&url).await.unwrap();
            let applied = store
                .apply_action(&ApplyAction {
                    content_id: ContentId::from("c-1"),
                    discussion_id: DiscussionId::from("d-1"),
                    author_id: Some(UserId::from("author-1")),
                    moderator_id: UserId::from("mod-1"),
                    action: ModerationAction::Hide,
                    reason: Some("off topic".to_string()),
                    at: Utc::now(),
                })
                .await
                .unwrap();
            assert!(applied.state.is_hidden);
            assert_eq!(applied.log_entry.seq, 1);
        }

        let reopened = SqliteStore::new(&url).await.unwrap();
        let state = reopened
            .moderation_state(&ContentId::from("c-1"))
            .await
            .unwrap()
            .expect("state should persist");
        assert!(state.is_hidden);
        assert_eq!(state.hide_reason.as_deref(), Some("off topic"));

        let entries = reopened
            .log_entries(&ModLogQuery {
                content_id: Some(ContentId::from("c-1")),
                limit: 10,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, LogAction::Hide);
        assert_eq!(
            entries[0].before,
            StateSnapshot::Content {
                is_hidden: false,
                is_deleted: false
            }
        );
    }

    #[tokio::test]
    async fn test_sanction_lifecycle_round_trips_json_sub_records() {
        let (store, _dir) = store().await;
        let now = Utc::now();
        let sanction = Sanction {
            id: SanctionId::new(),
            user_id: UserId::from("u-1"),
            issued_by: UserId::from("mod-1"),
            sanction_type: SanctionType::TemporarySuspension,
            reason: "spam".to_string(),
            starts_at: now,
            ends_at: Some(now + chrono::Duration::hours(24)),
            is_active: true,
            appeal: None,
            revocation: None,
            report_id: None,
            content_id: Some(ContentId::from("c-1")),
            prior_sanction_count: 2,
            created_at: now,
        };
        store.insert_sanction(&sanction).await.unwrap();

        let appealed = store
            .file_appeal(&sanction.id, "context was missing", Utc::now())
            .await
            .unwrap();
        assert_eq!(appealed.appeal_status(), Some(AppealStatus::Pending));

        let decided = store
            .decide_appeal(
                &sanction.id,
                true,
                &UserId::from("admin-1"),
                Some("agreed".to_string()),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(!decided.is_active);
        assert_eq!(decided.appeal_status(), Some(AppealStatus::Approved));

        let loaded = store.sanction(&sanction.id).await.unwrap().unwrap();
        assert_eq!(loaded.prior_sanction_count, 2);
        assert_eq!(loaded.content_id, Some(ContentId::from("c-1")));
        let appeal = loaded.appeal.expect("appeal sub-record");
        assert_eq!(appeal.reason, "context was missing");
        assert_eq!(appeal.reviewed_by, Some(UserId::from("admin-1")));

        // Issuance first, then the approval; filing an appeal is not logged.
        let entries = store
            .log_entries(&ModLogQuery {
                limit: 10,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, LogAction::AppealApproved);
        assert_eq!(entries[1].action, LogAction::Suspend);

        // An offset skips past the newest entry.
        let older = store
            .log_entries(&ModLogQuery {
                limit: 10,
                offset: 1,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(older.len(), 1);
        assert_eq!(older[0].action, LogAction::Suspend);
    }

    #[tokio::test]
    async fn test_filter_rules_round_trip_with_feedback() {
        let (store, _dir) = store().await;
        let rule = FilterRule::from_new(
            NewFilterRule {
                name: "spam words".to_string(),
                kind: RuleKind::Keyword {
                    keywords: vec!["free coins".to_string(), "scam".to_string()],
                },
                action: RuleAction::Queue,
                severity: Some(Priority::High),
                confidence_threshold: Some(0.7),
                scope: Some(RuleScope {
                    title: true,
                    body: true,
                    comment: false,
                }),
                test_mode: false,
            },
            UserId::from("admin-1"),
            Utc::now(),
        );
        store.insert_rule(&rule).await.unwrap();

        let loaded = store.rule(&rule.id).await.unwrap().unwrap();
        assert_eq!(loaded.kind, rule.kind);
        assert_eq!(loaded.scope, rule.scope);
        assert_eq!(loaded.severity, Priority::High);

        store.record_rule_feedback(&rule.id, true).await.unwrap();
        let updated = store.record_rule_feedback(&rule.id, false).await.unwrap();
        assert_eq!(updated.stats.matches, 2);
        assert_eq!(updated.stats.true_positives, 1);
        assert!((updated.stats.accuracy - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_listing_orders_and_counts() {
        let (store, _dir) = store().await;
        let mut ids = Vec::new();
        for (reporter, content, category, age_hours) in [
            ("u-1", "c-1", ReportCategory::Spam, 3),
            ("u-2", "c-2", ReportCategory::HateSpeech, 2),
            ("u-3", "c-3", ReportCategory::HateSpeech, 1),
        ] {
            let now = Utc::now() - chrono::Duration::hours(age_hours);
            let report = Report::new(
                ContentId::from(content),
                DiscussionId::from("d-1"),
                UserId::from(reporter),
                category,
                "reason".to_string(),
                now,
            );
            let item = QueueItem::for_report(
                report.id,
                report.content_id.clone(),
                report.discussion_id.clone(),
                report.priority,
                "preview".to_string(),
                now,
            );
            store.insert_report_with_item(&report, &item).await.unwrap();
            ids.push(item.id);
        }

        let page = store
            .list_items(&QueueQuery {
                priority: None,
                status: None,
                assigned_to: None,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        // Urgent bucket first, newest first inside it, then the medium item.
        let got: Vec<_> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(got, vec![ids[2], ids[1], ids[0]]);

        let depths = store.queue_depths().await.unwrap();
        assert_eq!(depths[0].priority, Priority::Urgent);
        assert_eq!(depths[0].count, 2);
    }
}
