use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{Department, Room};

pub fn insert_department(conn: &Connection, department: &Department) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO departments (id, name) VALUES (?1, ?2)",
        params![department.id, department.name],
    )?;
    Ok(())
}

pub fn insert_room(conn: &Connection, room: &Room) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO rooms (id, department_id, floor, capacity) VALUES (?1, ?2, ?3, ?4)",
        params![room.id, room.department_id, room.floor, room.capacity],
    )?;
    Ok(())
}

pub fn list_departments(conn: &Connection) -> Result<Vec<Department>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Department {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn list_rooms(conn: &Connection) -> Result<Vec<Room>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, department_id, floor, capacity FROM rooms ORDER BY floor ASC, id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Room {
            id: row.get(0)?,
            department_id: row.get(1)?,
            floor: row.get(2)?,
            capacity: row.get(3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}
