use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Enquiry,
    Qualified,
    Booked,
    Visited,
    Sold,
    NotSold,
    Installed,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Enquiry => "enquiry",
            CustomerStatus::Qualified => "qualified",
            CustomerStatus::Booked => "booked",
            CustomerStatus::Visited => "visited",
            CustomerStatus::Sold => "sold",
            CustomerStatus::NotSold => "not_sold",
            CustomerStatus::Installed => "installed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CustomerStatus::Enquiry => "Initial Enquiry",
            CustomerStatus::Qualified => "Qualified",
            CustomerStatus::Booked => "Survey Booked",
            CustomerStatus::Visited => "Visited",
            CustomerStatus::Sold => "Sold",
            CustomerStatus::NotSold => "Not Sold",
            CustomerStatus::Installed => "Installed",
        }
    }

    /// `sold` and `installed` never move back to an earlier stage.
    pub fn is_closed_won(&self) -> bool {
        matches!(self, CustomerStatus::Sold | CustomerStatus::Installed)
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CustomerStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "enquiry" => Ok(CustomerStatus::Enquiry),
            "qualified" => Ok(CustomerStatus::Qualified),
            "booked" => Ok(CustomerStatus::Booked),
            "visited" => Ok(CustomerStatus::Visited),
            "sold" => Ok(CustomerStatus::Sold),
            "not_sold" => Ok(CustomerStatus::NotSold),
            "installed" => Ok(CustomerStatus::Installed),
            other => Err(format!("unsupported customer status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InstallationType {
    HeatPump,
    Solar,
    Battery,
    HeatPumpSolar,
    HeatPumpSolarBattery,
    Mvhr,
    GreenBuild,
}

impl InstallationType {
    pub const ALL: [InstallationType; 7] = [
        InstallationType::HeatPump,
        InstallationType::Solar,
        InstallationType::Battery,
        InstallationType::HeatPumpSolar,
        InstallationType::HeatPumpSolarBattery,
        InstallationType::Mvhr,
        InstallationType::GreenBuild,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationType::HeatPump => "heat_pump",
            InstallationType::Solar => "solar",
            InstallationType::Battery => "battery",
            InstallationType::HeatPumpSolar => "heat_pump_solar",
            InstallationType::HeatPumpSolarBattery => "heat_pump_solar_battery",
            InstallationType::Mvhr => "mvhr",
            InstallationType::GreenBuild => "green_build",
        }
    }
}

impl fmt::Display for InstallationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InstallationType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        InstallationType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unsupported installation type: {value}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub postcode: String,
    pub address: String,
    pub property_type: Option<String>,
    pub heating_system: Option<String>,
    pub installation_type: Option<InstallationType>,
    pub estimated_value: f64,
    pub notes: Option<String>,
    pub status: CustomerStatus,
    pub bus_grant_eligible: bool,
    pub assigned_rep_id: Option<String>,
    pub deposit_received: bool,
    pub deposit_amount: Option<f64>,
    pub deposit_received_date: Option<DateTime<Utc>>,
    pub installation_completed_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_contacted: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreateInput {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub postcode: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub heating_system: Option<String>,
    #[serde(default)]
    pub installation_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_rep_id: Option<String>,
}

/// Read-side predicates for the customer list.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    Green,
    Yellow,
    Orange,
    Red,
    Black,
}

