//! On-disk history of every fetched cat.
//!
//! All entries live in the `cats` table under a three part key:
//!
//! - `(cat_id, version_id, "metadata")` → JSON of [`CatDbMetadata`]
//! - `(cat_id, version_id, "data")` → raw image bytes
//!
//! `version_id` is the FNV-1a 64 hash of the source URL in lowercase hex, so
//! fetching the same URL twice overwrites one version instead of adding one.
//! redb allows one write transaction at a time; concurrent writers queue on
//! `begin_write`.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use log::{debug, info};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::{CatDbMetadata, CatMetadata};

pub use error::DatabaseError;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum DatabaseError {
        #[error("Database error: {0}")]
        Redb(#[from] redb::DatabaseError),

        #[error("Table error: {0}")]
        TableError(#[from] redb::TableError),

        #[error("Storage error: {0}")]
        StorageError(#[from] redb::StorageError),

        #[error("Transaction error: {0}")]
        TransactionError(#[from] redb::TransactionError),

        #[error("Commit error: {0}")]
        CommitError(#[from] redb::CommitError),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Metadata encoding error: {0}")]
        Json(#[from] serde_json::Error),

        #[error("Cat id is empty")]
        EmptyCatId,
    }
}

const CATS_TABLE: TableDefinition<(&str, &str, &str), &[u8]> = TableDefinition::new("cats");

const KEY_METADATA: &str = "metadata";
const KEY_DATA: &str = "data";

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Version key for a source URL: FNV-1a 64, lowercase hex, no padding.
pub fn hash_url(url: &str) -> String {
    let hash = url
        .bytes()
        .fold(FNV_OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME));
    format!("{:x}", hash)
}

/// One stored retrieval of a cat.
#[derive(Debug, Clone, PartialEq)]
pub struct CatVersion {
    pub metadata: CatDbMetadata,
    pub data: Vec<u8>,
}

/// Per-version listing without the image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionSummary {
    pub cat_id: String,
    pub version_id: String,
    pub metadata: Option<String>,
    pub data_len: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatDbStats {
    pub cats: usize,
    pub versions: usize,
    pub data_bytes: u64,
}

pub struct CatDb {
    db: redb::Database,
    path: PathBuf,
}

impl CatDb {
    /// Opens the store at `path`, creating the file (mode 0644) and the
    /// `cats` table when missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        create_db_file(path)?;

        let db = redb::Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CATS_TABLE)?;
        }
        write_txn.commit()?;

        info!("Opened cat store at {}", path.display());
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores `data` and the metadata projection under
    /// `(metadata.id, hash_url(metadata.url))` in one write transaction.
    ///
    /// Returns the cat id and version id written.
    pub fn add_cat_version(
        &self,
        metadata: &CatMetadata,
        data: &[u8],
    ) -> Result<(String, String), DatabaseError> {
        if metadata.id.is_empty() {
            return Err(DatabaseError::EmptyCatId);
        }

        let cat_id = metadata.id.as_str();
        let version_id = hash_url(&metadata.url);
        let meta = serde_json::to_vec(&metadata.to_db_metadata())?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CATS_TABLE)?;
            table.insert((cat_id, version_id.as_str(), KEY_METADATA), meta.as_slice())?;
            table.insert((cat_id, version_id.as_str(), KEY_DATA), data)?;
        }
        write_txn.commit()?;

        debug!(
            "Stored cat {} version {} ({} bytes)",
            cat_id,
            version_id,
            data.len()
        );
        Ok((cat_id.to_string(), version_id))
    }

    /// Reads one version back. `None` unless both leaves are present.
    pub fn get_cat_version(
        &self,
        cat_id: &str,
        version_id: &str,
    ) -> Result<Option<CatVersion>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATS_TABLE)?;

        let metadata = table.get((cat_id, version_id, KEY_METADATA))?;
        let data = table.get((cat_id, version_id, KEY_DATA))?;

        match (metadata, data) {
            (Some(metadata), Some(data)) => Ok(Some(CatVersion {
                metadata: serde_json::from_slice(metadata.value())?,
                data: data.value().to_vec(),
            })),
            _ => Ok(None),
        }
    }

    /// Distinct cat ids, in key order.
    pub fn cat_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATS_TABLE)?;

        let mut ids: Vec<String> = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            let (cat_id, _, _) = key.value();
            if ids.last().map(String::as_str) != Some(cat_id) {
                ids.push(cat_id.to_string());
            }
        }

        Ok(ids)
    }

    /// Version ids stored for `cat_id`, in key order.
    pub fn versions(&self, cat_id: &str) -> Result<Vec<String>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATS_TABLE)?;

        let mut versions: Vec<String> = Vec::new();
        for entry in table.range((cat_id, "", "")..)? {
            let (key, _) = entry?;
            let (entry_cat, version_id, _) = key.value();
            if entry_cat != cat_id {
                break;
            }
            if versions.last().map(String::as_str) != Some(version_id) {
                versions.push(version_id.to_string());
            }
        }

        Ok(versions)
    }

    /// Every stored version with its raw metadata JSON and image size.
    pub fn version_summaries(&self) -> Result<Vec<VersionSummary>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATS_TABLE)?;

        let mut summaries: BTreeMap<(String, String), VersionSummary> = BTreeMap::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let (cat_id, version_id, leaf) = key.value();

            let summary = summaries
                .entry((cat_id.to_string(), version_id.to_string()))
                .or_insert_with(|| VersionSummary {
                    cat_id: cat_id.to_string(),
                    version_id: version_id.to_string(),
                    metadata: None,
                    data_len: 0,
                });

            match leaf {
                KEY_METADATA => {
                    summary.metadata = Some(String::from_utf8_lossy(value.value()).into_owned())
                }
                KEY_DATA => summary.data_len = value.value().len(),
                _ => {}
            }
        }

        Ok(summaries.into_values().collect())
    }

    pub fn stats(&self) -> Result<CatDbStats, DatabaseError> {
        let summaries = self.version_summaries()?;

        let mut stats = CatDbStats {
            versions: summaries.len(),
            ..CatDbStats::default()
        };
        let mut last_cat: Option<&str> = None;
        for summary in &summaries {
            if last_cat != Some(summary.cat_id.as_str()) {
                stats.cats += 1;
                last_cat = Some(summary.cat_id.as_str());
            }
            stats.data_bytes += summary.data_len as u64;
        }

        Ok(stats)
    }

    /// Logs the store statistics and releases the file.
    pub fn close(self) -> Result<(), DatabaseError> {
        let stats = self.stats()?;
        info!(
            "Closing cat store {}: {} cats, {} versions, {} bytes",
            self.path.display(),
            stats.cats,
            stats.versions,
            stats.data_bytes
        );
        drop(self.db);
        Ok(())
    }
}

fn create_db_file(path: &Path) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path).map(|_| ())
}

#[cfg(test)]
mod tests;
