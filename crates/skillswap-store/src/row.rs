//! Column conversion helpers shared by the `row_to_*` mappers.
//!
//! SQLite stores UUIDs, timestamps, and enum tags as TEXT; these helpers
//! parse them back, reporting failures as `FromSqlConversionFailure` so the
//! offending column index survives into the error.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

use skillswap_shared::events::NotificationKind;
use skillswap_shared::{ExchangeStatus, TransactionKind};

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::from(msg))
}

pub(crate) fn col_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e.to_string()))
}

pub(crate) fn col_uuid_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e.to_string())))
        .transpose()
}

pub(crate) fn col_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e.to_string()))
}

pub(crate) fn col_ts_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e.to_string()))
    })
    .transpose()
}

pub(crate) fn col_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<ExchangeStatus> {
    let s: String = row.get(idx)?;
    ExchangeStatus::parse(&s).ok_or_else(|| conversion_err(idx, format!("unknown status: {s}")))
}

pub(crate) fn col_status_opt(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<ExchangeStatus>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        ExchangeStatus::parse(&s).ok_or_else(|| conversion_err(idx, format!("unknown status: {s}")))
    })
    .transpose()
}

pub(crate) fn col_kind(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionKind> {
    let s: String = row.get(idx)?;
    TransactionKind::parse(&s)
        .ok_or_else(|| conversion_err(idx, format!("unknown transaction kind: {s}")))
}

pub(crate) fn col_notification_kind(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<NotificationKind> {
    let s: String = row.get(idx)?;
    NotificationKind::parse(&s)
        .ok_or_else(|| conversion_err(idx, format!("unknown notification kind: {s}")))
}

pub(crate) fn col_json(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_err(idx, e.to_string()))
}
