use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// A `queued_scans` row before its status and metadata are parsed.
#[derive(Debug, Clone)]
pub struct ScanRow {
    pub id: String,
    pub payload: String,
    pub scanned_at_ms: i64,
    pub status: String,
    pub retry_count: i64,
    pub metadata: String,
}

const COLUMNS: &str = "id, payload, scanned_at_ms, status, retry_count, metadata";

fn scan_row(row: &SqliteRow) -> Result<ScanRow, sqlx::Error> {
    Ok(ScanRow {
        id: row.try_get("id")?,
        payload: row.try_get("payload")?,
        scanned_at_ms: row.try_get("scanned_at_ms")?,
        status: row.try_get("status")?,
        retry_count: row.try_get("retry_count")?,
        metadata: row.try_get("metadata")?,
    })
}

/// Insert a new scan
pub async fn insert_scan(pool: &SqlitePool, scan: &ScanRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO queued_scans (id, payload, scanned_at_ms, status, retry_count, metadata)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&scan.id)
    .bind(&scan.payload)
    .bind(scan.scanned_at_ms)
    .bind(&scan.status)
    .bind(scan.retry_count)
    .bind(&scan.metadata)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_scan(pool: &SqlitePool, id: &str) -> Result<Option<ScanRow>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM queued_scans WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(scan_row).transpose()
}

/// Every scan, oldest first
pub async fn list_scans(pool: &SqlitePool) -> Result<Vec<ScanRow>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM queued_scans ORDER BY scanned_at_ms ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(scan_row).collect()
}

/// Scans in one status, in drain order
pub async fn list_scans_by_status(
    pool: &SqlitePool,
    status: &str,
) -> Result<Vec<ScanRow>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM queued_scans WHERE status = ?1 ORDER BY scanned_at_ms ASC, id ASC"
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    rows.iter().map(scan_row).collect()
}

pub async fn count_scans_by_status(pool: &SqlitePool, status: &str) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM queued_scans WHERE status = ?1")
        .bind(status)
        .fetch_one(pool)
        .await?;

    row.try_get("n")
}

/// `(status, count)` pairs for every status present in the table
pub async fn count_scans_grouped(pool: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM queued_scans GROUP BY status")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| -> Result<(String, i64), sqlx::Error> {
            Ok((r.try_get("status")?, r.try_get("n")?))
        })
        .collect()
}

/// Set the status (and optionally the retry count); returns the updated row,
/// or `None` if no scan has this id.
pub async fn update_scan_status(
    pool: &SqlitePool,
    id: &str,
    status: &str,
    retry_count: Option<i64>,
) -> Result<Option<ScanRow>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE queued_scans
        SET status = ?1,
            retry_count = COALESCE(?2, retry_count)
        WHERE id = ?3
        RETURNING {COLUMNS}
        "#
    ))
    .bind(status)
    .bind(retry_count)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(scan_row).transpose()
}

/// Returns the number of rows deleted (0 or 1)
pub async fn delete_scan(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM queued_scans WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_all_scans(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM queued_scans").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Cheap round-trip for health checks
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
