use serde::{Deserialize, Serialize};

use super::WorkingHours;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub active: bool,
    /// Overrides the business hours when set.
    pub working_hours: Option<WorkingHours>,
}
