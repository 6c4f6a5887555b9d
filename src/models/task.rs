use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    WelcomeCall,
    BusGrant,
    BookHeatLoss,
    CompleteHeatLoss,
    GenerateQuote,
    BookInstallation,
    CompleteInstallation,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::WelcomeCall,
        TaskType::BusGrant,
        TaskType::BookHeatLoss,
        TaskType::CompleteHeatLoss,
        TaskType::GenerateQuote,
        TaskType::BookInstallation,
        TaskType::CompleteInstallation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::WelcomeCall => "welcome_call",
            TaskType::BusGrant => "bus_grant",
            TaskType::BookHeatLoss => "book_heat_loss",
            TaskType::CompleteHeatLoss => "complete_heat_loss",
            TaskType::GenerateQuote => "generate_quote",
            TaskType::BookInstallation => "book_installation",
            TaskType::CompleteInstallation => "complete_installation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskType::WelcomeCall => "Welcome Call",
            TaskType::BusGrant => "BUS Grant Application",
            TaskType::BookHeatLoss => "Book Heat Loss Survey",
            TaskType::CompleteHeatLoss => "Complete Heat Loss Survey",
            TaskType::GenerateQuote => "Generate Quote",
            TaskType::BookInstallation => "Book Installation",
            TaskType::CompleteInstallation => "Complete Installation",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TaskType::WelcomeCall => {
                "Call customer to introduce yourself and discuss their requirements"
            }
            TaskType::BusGrant => "Submit BUS grant application for eligible properties",
            TaskType::BookHeatLoss => "Schedule heat loss survey with customer",
            TaskType::CompleteHeatLoss => "Complete heat loss survey and analysis",
            TaskType::GenerateQuote => "Generate and send quotation to customer",
            TaskType::BookInstallation => "Schedule installation date with customer",
            TaskType::CompleteInstallation => {
                "Complete installation and obtain customer sign-off"
            }
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        TaskType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unsupported task type: {value}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "not_started" => Ok(TaskStatus::NotStarted),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unsupported task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskUrgency {
    Overdue,
    Urgent,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub customer_id: String,
    pub assigned_rep_id: Option<String>,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Payload for a task entered by a rep or admin. Fields are optional so that
/// a missing value is reported as a validation error rather than a decode
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assigned_rep_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
