use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roles issued by the identity provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Rep,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rep => "rep",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Admins and owners see every record; reps only see their own.
    pub fn sees_everything(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "rep" => Ok(Role::Rep),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unsupported role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Which slice of the shared collections an operation may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Rep(String),
}

/// Acting principal plus the instant the operation runs at.
///
/// Every service call takes one of these so that `now` and the actor are
/// injected rather than read from ambient state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            now: Utc::now(),
        }
    }

    pub fn at(principal: Principal, now: DateTime<Utc>) -> Self {
        Self { principal, now }
    }

    pub fn actor_id(&self) -> &str {
        &self.principal.id
    }

    pub fn scope(&self) -> Scope {
        if self.principal.role.sees_everything() {
            Scope::All
        } else {
            Scope::Rep(self.principal.id.clone())
        }
    }
}
