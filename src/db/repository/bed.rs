use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::Bed;

const BED_COLUMNS: &str = "id, bed_number, department_id, room_id, is_occupied";

fn map_bed(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bed> {
    Ok(Bed {
        id: row.get(0)?,
        bed_number: row.get(1)?,
        department_id: row.get(2)?,
        room_id: row.get(3)?,
        is_occupied: row.get(4)?,
    })
}

pub fn insert_bed(conn: &Connection, bed: &Bed) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO beds (id, bed_number, department_id, room_id, is_occupied)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![bed.id, bed.bed_number, bed.department_id, bed.room_id, bed.is_occupied],
    )?;
    Ok(())
}

pub fn get_bed(conn: &Connection, bed_id: &str) -> Result<Option<Bed>, DatabaseError> {
    let bed = conn
        .query_row(
            &format!("SELECT {BED_COLUMNS} FROM beds WHERE id = ?1"),
            params![bed_id],
            map_bed,
        )
        .optional()?;
    Ok(bed)
}

/// All beds ordered for display (bed number, then id).
pub fn list_beds(conn: &Connection) -> Result<Vec<Bed>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BED_COLUMNS} FROM beds ORDER BY bed_number ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], map_bed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn bed_exists(conn: &Connection, bed_id: &str) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM beds WHERE id = ?1)",
        params![bed_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Flip a vacant bed to occupied. Returns `false` when the bed is missing or already occupied.
pub fn claim_bed(conn: &Connection, bed_id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE beds SET is_occupied = 1 WHERE id = ?1 AND is_occupied = 0",
        params![bed_id],
    )?;
    Ok(changed == 1)
}

/// Flip an occupied bed to vacant. Returns `false` when the bed is missing or already vacant.
pub fn release_bed(conn: &Connection, bed_id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE beds SET is_occupied = 0 WHERE id = ?1 AND is_occupied = 1",
        params![bed_id],
    )?;
    Ok(changed == 1)
}

/// Create a bed, or update its number, department and room.
///
/// The occupancy flag is never written here: new beds start vacant and existing
/// beds keep the flag their assignments imply.
pub fn upsert_bed(conn: &Connection, bed: &Bed) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO beds (id, bed_number, department_id, room_id, is_occupied)
         VALUES (?1, ?2, ?3, ?4, 0)
         ON CONFLICT(id) DO UPDATE SET
             bed_number = excluded.bed_number,
             department_id = excluded.department_id,
             room_id = excluded.room_id",
        params![bed.id, bed.bed_number, bed.department_id, bed.room_id],
    )?;
    Ok(())
}
