use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::package::version::Version;

/// One published version of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Dap {
    pub id: i64,
    pub metadap_id: i64,
    pub version: String,
    pub license: String,
    pub summary: String,
    pub description: String,
    pub authors: Vec<String>,
    pub homepage: String,
    pub bugreports: String,
    /// Path of the stored archive, relative to the media directory
    pub file: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Dap {
    pub fn is_pre(&self) -> bool {
        Version::parse(&self.version).map(|v| v.is_pre()).unwrap_or(false)
    }

    pub fn label(&self, package_name: &str) -> String {
        format!("{}-{}", package_name, self.version)
    }
}

#[derive(Debug, Clone)]
pub struct NewDap {
    pub metadap_id: i64,
    pub version: String,
    pub license: String,
    pub summary: String,
    pub description: String,
    pub authors: Vec<String>,
    pub homepage: String,
    pub bugreports: String,
    pub file: String,
}
