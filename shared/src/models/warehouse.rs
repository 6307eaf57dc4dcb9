//! Warehouse models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical storage site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: Uuid,
    /// Unique warehouse code (e.g., "WH-3F9A1C")
    pub code: String,
    pub name: String,
    pub location: Option<String>,
    pub active: bool,
    /// User with the WAREHOUSE_MANAGER role responsible for this site
    pub manager_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
