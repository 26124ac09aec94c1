use rusqlite::Connection;

use crate::db::DatabaseError;

/// A single consistency issue detected by the checker.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyIssue {
    pub category: String,
    pub severity: String,
    pub description: String,
    pub bed_id: Option<String>,
}

/// Result of a consistency check over bed occupancy and open assignments.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
    pub beds_checked: i64,
    pub occupancy_drift_detected: bool,
}

fn collect_ids(conn: &Connection, sql: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Run a full consistency check across beds and bed assignments.
///
/// Detects:
/// - Beds flagged occupied with no open assignment
/// - Beds flagged vacant that still hold an open assignment
/// - Open assignments whose patient is already marked discharged
pub fn check_consistency(conn: &Connection) -> Result<ConsistencyReport, DatabaseError> {
    let mut issues = Vec::new();

    // 1. Occupied flag without an open assignment
    let phantom = collect_ids(
        conn,
        "SELECT b.id FROM beds b
         WHERE b.is_occupied = 1
         AND NOT EXISTS (SELECT 1 FROM bed_assignments a
                         WHERE a.bed_id = b.id AND a.discharged_at IS NULL)
         ORDER BY b.id",
    )?;
    for id in &phantom {
        issues.push(ConsistencyIssue {
            category: "phantom_occupancy".into(),
            severity: "high".into(),
            description: "Bed flagged occupied but has no open assignment".into(),
            bed_id: Some(id.clone()),
        });
    }

    // 2. Open assignment on a bed flagged vacant
    let unflagged = collect_ids(
        conn,
        "SELECT b.id FROM beds b
         WHERE b.is_occupied = 0
         AND EXISTS (SELECT 1 FROM bed_assignments a
                     WHERE a.bed_id = b.id AND a.discharged_at IS NULL)
         ORDER BY b.id",
    )?;
    for id in &unflagged {
        issues.push(ConsistencyIssue {
            category: "unflagged_occupancy".into(),
            severity: "high".into(),
            description: "Bed flagged vacant but holds an open assignment".into(),
            bed_id: Some(id.clone()),
        });
    }

    // 3. Discharged patients still holding a bed
    let stale = collect_ids(
        conn,
        "SELECT a.bed_id FROM bed_assignments a
         JOIN patients p ON p.id = a.patient_id
         WHERE a.discharged_at IS NULL AND p.status = 'discharged'
         ORDER BY a.bed_id",
    )?;
    for id in stale {
        issues.push(ConsistencyIssue {
            category: "discharged_patient_in_bed".into(),
            severity: "low".into(),
            description: "Open assignment belongs to a patient marked discharged".into(),
            bed_id: Some(id),
        });
    }

    let beds_checked: i64 = conn.query_row("SELECT COUNT(*) FROM beds", [], |row| row.get(0))?;

    Ok(ConsistencyReport {
        issues,
        beds_checked,
        occupancy_drift_detected: !phantom.is_empty() || !unflagged.is_empty(),
    })
}

/// Re-derive every drifted occupancy flag from the open assignments.
///
/// Assignments are the source of truth; only the flag is rewritten.
/// Returns the ids of the beds that were repaired.
pub fn repair_consistency(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let drifted = collect_ids(
        conn,
        "SELECT b.id FROM beds b
         WHERE b.is_occupied != EXISTS (SELECT 1 FROM bed_assignments a
                                        WHERE a.bed_id = b.id AND a.discharged_at IS NULL)
         ORDER BY b.id",
    )?;

    if !drifted.is_empty() {
        conn.execute(
            "UPDATE beds SET is_occupied = EXISTS (
                 SELECT 1 FROM bed_assignments a
                 WHERE a.bed_id = beds.id AND a.discharged_at IS NULL)
             WHERE is_occupied != EXISTS (
                 SELECT 1 FROM bed_assignments a
                 WHERE a.bed_id = beds.id AND a.discharged_at IS NULL)",
            [],
        )?;
        tracing::info!(count = drifted.len(), "Repaired bed occupancy drift");
    }

    Ok(drifted)
}
