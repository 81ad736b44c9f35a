use serde::{Deserialize, Serialize};

/// A bookable service offered by a business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub duration_minutes: i32,
    /// Minor currency units.
    pub price: i64,
    pub active: bool,
}
