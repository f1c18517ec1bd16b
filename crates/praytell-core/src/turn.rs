use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// System turns (context summaries, error notices) stay client-side.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, Role::System)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(Error::validation("Invalid role")),
        }
    }
}

/// A single chat contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Store id, set once the turn has been persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub body: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        role: Role,
        body: impl Into<String>,
        location: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            role,
            body: body.into(),
            location: location.into(),
            timestamp,
        }
    }

    pub fn user(body: impl Into<String>, location: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Role::User, body, location, at)
    }

    pub fn assistant(
        body: impl Into<String>,
        location: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(Role::Assistant, body, location, at)
    }

    pub fn system(body: impl Into<String>, location: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Role::System, body, location, at)
    }

    /// Timestamp in the form it is persisted and shown in prompts
    pub fn datetime(&self) -> String {
        format_instant(&self.timestamp)
    }
}

/// RFC 3339 with a `Z` suffix, e.g. `2024-01-01T00:00:00Z`
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
