use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::BedAssignment;

const ASSIGNMENT_COLUMNS: &str =
    "id, bed_id, patient_id, assigned_by, assigned_at, discharged_at, notes";

/// Raw row; timestamps are parsed outside the rusqlite closure so bad values surface as
/// `DatabaseError::InvalidTimestamp` instead of a generic conversion failure.
struct AssignmentRow {
    id: String,
    bed_id: String,
    patient_id: String,
    assigned_by: String,
    assigned_at: String,
    discharged_at: Option<String>,
    notes: Option<String>,
}

impl TryFrom<AssignmentRow> for BedAssignment {
    type Error = DatabaseError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(BedAssignment {
            assigned_at: parse_timestamp("assigned_at", &row.assigned_at)?,
            discharged_at: row
                .discharged_at
                .as_deref()
                .map(|value| parse_timestamp("discharged_at", value))
                .transpose()?,
            id: row.id,
            bed_id: row.bed_id,
            patient_id: row.patient_id,
            assigned_by: row.assigned_by,
            notes: row.notes,
        })
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        id: row.get(0)?,
        bed_id: row.get(1)?,
        patient_id: row.get(2)?,
        assigned_by: row.get(3)?,
        assigned_at: row.get(4)?,
        discharged_at: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn query_one(
    conn: &Connection,
    filter: &str,
    key: &str,
) -> Result<Option<BedAssignment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ASSIGNMENT_COLUMNS} FROM bed_assignments WHERE {filter}"),
            params![key],
            map_row,
        )
        .optional()?;
    row.map(BedAssignment::try_from).transpose()
}

fn query_history(
    conn: &Connection,
    column: &str,
    key: &str,
) -> Result<Vec<BedAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM bed_assignments
         WHERE {column} = ?1
         ORDER BY assigned_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map(params![key], map_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(BedAssignment::try_from).collect()
}

pub fn insert_assignment(conn: &Connection, assignment: &BedAssignment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bed_assignments
         (id, bed_id, patient_id, assigned_by, assigned_at, discharged_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            assignment.id,
            assignment.bed_id,
            assignment.patient_id,
            assignment.assigned_by,
            format_timestamp(&assignment.assigned_at),
            assignment.discharged_at.as_ref().map(format_timestamp),
            assignment.notes,
        ],
    )?;
    Ok(())
}

pub fn get_open_assignment_for_bed(
    conn: &Connection,
    bed_id: &str,
) -> Result<Option<BedAssignment>, DatabaseError> {
    query_one(conn, "bed_id = ?1 AND discharged_at IS NULL", bed_id)
}

pub fn get_open_assignment_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<BedAssignment>, DatabaseError> {
    query_one(conn, "patient_id = ?1 AND discharged_at IS NULL", patient_id)
}

/// Seal an open assignment of `bed_id`. Returns `false` if no such open assignment exists.
pub fn close_assignment(
    conn: &Connection,
    assignment_id: &str,
    bed_id: &str,
    discharged_at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE bed_assignments SET discharged_at = ?1
         WHERE id = ?2 AND bed_id = ?3 AND discharged_at IS NULL",
        params![format_timestamp(discharged_at), assignment_id, bed_id],
    )?;
    Ok(changed == 1)
}

/// Assignments of one bed, most recent first.
pub fn list_assignments_for_bed(
    conn: &Connection,
    bed_id: &str,
) -> Result<Vec<BedAssignment>, DatabaseError> {
    query_history(conn, "bed_id", bed_id)
}

/// Assignments of one patient, most recent first.
pub fn list_assignments_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<BedAssignment>, DatabaseError> {
    query_history(conn, "patient_id", patient_id)
}
