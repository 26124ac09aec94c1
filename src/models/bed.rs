use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: String,
    pub bed_number: String,
    pub department_id: Option<String>,
    pub room_id: String,
    /// Derived flag; must equal "an open assignment references this bed".
    pub is_occupied: bool,
}
