use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{Patient, PatientStatus};

struct PatientRow {
    id: String,
    name: String,
    department_id: Option<String>,
    status: String,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DatabaseError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        Ok(Patient {
            status: PatientStatus::from_str(&row.status)?,
            id: row.id,
            name: row.name,
            department_id: row.department_id,
        })
    }
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, department_id, status) VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.id,
            patient.name,
            patient.department_id,
            patient.status.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, department_id, status FROM patients WHERE id = ?1",
            params![patient_id],
            |row| {
                Ok(PatientRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    department_id: row.get(2)?,
                    status: row.get(3)?,
                })
            },
        )
        .optional()?;

    row.map(Patient::try_from).transpose()
}
