use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Problem {
    Legal,
    Malware,
    Spam,
    Broken,
    Other,
}

impl Problem {
    pub const ALL: [Problem; 5] = [
        Problem::Legal,
        Problem::Malware,
        Problem::Spam,
        Problem::Broken,
        Problem::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Problem::Legal => "legal",
            Problem::Malware => "malware",
            Problem::Spam => "spam",
            Problem::Broken => "broken",
            Problem::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Problem::Legal => "Illegal content",
            Problem::Malware => "Malicious content",
            Problem::Spam => "Spam",
            Problem::Broken => "It does not work",
            Problem::Other => "Something else",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: i64,
    pub metadap_id: i64,
    pub problem: String,
    /// None for anonymous reports and for reporters whose account is gone
    pub reporter_id: Option<i64>,
    pub email: String,
    pub message: String,
    pub solved: bool,
    pub created_at: DateTime<Utc>,
    /// Ids of the affected daps
    pub versions: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub metadap_id: i64,
    pub problem: Problem,
    pub reporter_id: Option<i64>,
    pub email: String,
    pub message: String,
    pub versions: Vec<i64>,
}
