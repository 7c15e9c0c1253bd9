use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata returned by the service for a `json=true` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatMetadata {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub url: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
}

impl CatMetadata {
    /// Projection kept in the store. The URL is dropped because the version
    /// key is derived from it.
    pub fn to_db_metadata(&self) -> CatDbMetadata {
        CatDbMetadata {
            id: self.id.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
            mime_type: self.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatDbMetadata {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
}

impl CatDbMetadata {
    pub fn to_metadata(&self, url: &str) -> CatMetadata {
        CatMetadata {
            id: self.id.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
            url: url.to_string(),
            mime_type: self.mime_type.clone(),
        }
    }
}
