pub mod catdb;

pub use catdb::{hash_url, CatDb, CatDbStats, CatVersion, DatabaseError, VersionSummary};
