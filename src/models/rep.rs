use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::context::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepStatus {
    Active,
    Inactive,
}

impl RepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepStatus::Active => "active",
            RepStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for RepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RepStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(RepStatus::Active),
            "inactive" => Ok(RepStatus::Inactive),
            other => Err(format!("unsupported rep status: {other}")),
        }
    }
}

/// A system user. Reps carry the travel and territory fields; admin and
/// owner accounts leave them empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub region: Option<String>,
    pub postcodes: Vec<String>,
    pub max_travel_time: f64,
    pub max_travel_miles: f64,
    pub calendar_id: Option<String>,
    pub role: Role,
    pub status: RepStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepCreateInput {
    /// Account id issued by the identity provider.
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub region: String,
    /// Comma separated service postcodes.
    #[serde(default)]
    pub postcodes: Option<String>,
    #[serde(default)]
    pub max_travel_time: Option<f64>,
    #[serde(default)]
    pub max_travel_miles: Option<f64>,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateInput {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}
