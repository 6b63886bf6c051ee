//! Claim repository: CRUD operations for the `claims` table.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::claim::{Claim, ClaimFields, ClaimStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn claim_from_row(row: &Row<'_>) -> Result<Claim, rusqlite::Error> {
    let id: String = row.get("id")?;
    let status_raw: String = row.get("status")?;
    let status = ClaimStatus::parse(&status_raw).unwrap_or_else(|| {
        log::warn!(
            "Claim {} has unknown status '{}', treating as failed",
            id,
            status_raw
        );
        ClaimStatus::Failed
    });

    Ok(Claim {
        owner_id: row.get("owner_id")?,
        document_ref: row.get("document_ref")?,
        status,
        extracted_text: row.get("extracted_text")?,
        fields: ClaimFields {
            name: row.get("field_name")?,
            date: parse_date(row.get("field_date")?),
            amount: row.get("field_amount")?,
            currency: row.get("field_currency")?,
        },
        corrected_fields: ClaimFields {
            name: row.get("corrected_name")?,
            date: parse_date(row.get("corrected_date")?),
            amount: row.get("corrected_amount")?,
            currency: row.get("corrected_currency")?,
        },
        created_at: parse_timestamp(&id, "created_at", &row.get::<_, String>("created_at")?),
        updated_at: parse_timestamp(&id, "updated_at", &row.get::<_, String>("updated_at")?),
        id,
    })
}

fn parse_timestamp(id: &str, column: &str, raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            log::warn!("Claim {} has invalid {} '{}': {}", id, column, raw, e);
            Utc::now()
        }
    }
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

/// Inserts a new claim row.
pub fn insert(db: &Database, claim: &Claim) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO claims (id, owner_id, document_ref, status, extracted_text,
             field_name, field_date, field_amount, field_currency,
             corrected_name, corrected_date, corrected_amount, corrected_currency,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                claim.id,
                claim.owner_id,
                claim.document_ref,
                claim.status.as_str(),
                claim.extracted_text,
                claim.fields.name,
                date_to_sql(claim.fields.date),
                claim.fields.amount,
                claim.fields.currency,
                claim.corrected_fields.name,
                date_to_sql(claim.corrected_fields.date),
                claim.corrected_fields.amount,
                claim.corrected_fields.currency,
                claim.created_at.to_rfc3339(),
                claim.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Finds a claim by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Claim>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM claims WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], claim_from_row)?;
        match rows.next() {
            Some(Ok(claim)) => Ok(Some(claim)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all claims of one owner, newest first.
pub fn list_by_owner(db: &Database, owner_id: &str) -> Result<Vec<Claim>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM claims WHERE owner_id = ?1 ORDER BY created_at DESC")?;
        let claims = stmt
            .query_map(params![owner_id], claim_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(claims)
    })
}

/// Counts claims currently in the given status.
pub fn count_by_status(db: &Database, status: ClaimStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM claims WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    })
}

/// Updates only the status and updated_at of a claim. A missing id is
/// a silent no-op, matching the upsert-free update semantics callers
/// rely on during shutdown races.
pub fn update_status(
    db: &Database,
    id: &str,
    status: ClaimStatus,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE claims SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), updated_at.to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Stores a successful run's output: full text, derived fields and the
/// completed status, in one statement.
pub fn store_result(
    db: &Database,
    id: &str,
    extracted_text: &str,
    fields: &ClaimFields,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE claims SET status = 'completed', extracted_text = ?2,
             field_name = ?3, field_date = ?4, field_amount = ?5, field_currency = ?6,
             updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                extracted_text,
                fields.name,
                date_to_sql(fields.date),
                fields.amount,
                fields.currency,
                updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Replaces the corrected fields wholesale. Machine-derived fields are
/// left untouched.
pub fn set_corrected_fields(
    db: &Database,
    id: &str,
    fields: &ClaimFields,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE claims SET corrected_name = ?2, corrected_date = ?3,
             corrected_amount = ?4, corrected_currency = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                id,
                fields.name,
                date_to_sql(fields.date),
                fields.amount,
                fields.currency,
                updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}
