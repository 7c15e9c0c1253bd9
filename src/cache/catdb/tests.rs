use super::*;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_db() -> (CatDb, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = CatDb::open(temp_dir.path().join("cats.db")).unwrap();
    (db, temp_dir)
}

fn make_metadata(id: &str, url: &str) -> CatMetadata {
    CatMetadata {
        id: id.to_string(),
        tags: vec!["cute".to_string(), "orange".to_string()],
        created_at: Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap(),
        url: url.to_string(),
        mime_type: "image/png".to_string(),
    }
}

mod hashing {
    use super::*;

    #[test]
    fn fnv1a_64_reference_values() {
        assert_eq!(hash_url(""), "cbf29ce484222325");
        assert_eq!(hash_url("a"), "af63dc4c8601ec8c");
        assert_eq!(hash_url("foobar"), "85944171f73967e8");
    }

    #[test]
    fn hash_is_stable_and_url_sensitive() {
        let url = "https://cataas.com/cat/X?position=center";
        assert_eq!(hash_url(url), hash_url(url));
        assert_ne!(hash_url(url), hash_url("https://cataas.com/cat/X?position=top"));
        assert!(hash_url(url).chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

mod versions {
    use super::*;

    #[test]
    fn add_and_read_back() {
        let (db, _temp) = create_test_db();
        let meta = make_metadata("X", "U");
        let bytes = b"\x89PNG fake image bytes".to_vec();

        let (cat_id, version_id) = db.add_cat_version(&meta, &bytes).unwrap();
        assert_eq!(cat_id, "X");
        assert_eq!(version_id, hash_url("U"));

        let stored = db.get_cat_version("X", &version_id).unwrap().unwrap();
        assert_eq!(stored.data, bytes);
        assert_eq!(stored.metadata, meta.to_db_metadata());
        assert_eq!(stored.metadata.to_metadata("U"), meta);
    }

    #[test]
    fn same_url_overwrites_single_version() {
        let (db, _temp) = create_test_db();
        let meta = make_metadata("X", "https://cataas.com/cat/X");

        db.add_cat_version(&meta, b"first").unwrap();
        let (_, version_id) = db.add_cat_version(&meta, b"second").unwrap();

        assert_eq!(db.versions("X").unwrap(), vec![version_id.clone()]);
        let stored = db.get_cat_version("X", &version_id).unwrap().unwrap();
        assert_eq!(stored.data, b"second");
    }

    #[test]
    fn different_urls_add_versions_under_one_cat() {
        let (db, _temp) = create_test_db();

        db.add_cat_version(&make_metadata("X", "https://cataas.com/cat/X?width=1"), b"a")
            .unwrap();
        db.add_cat_version(&make_metadata("X", "https://cataas.com/cat/X?width=2"), b"bb")
            .unwrap();
        db.add_cat_version(&make_metadata("Y", "https://cataas.com/cat/Y"), b"ccc")
            .unwrap();

        assert_eq!(db.cat_ids().unwrap(), vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(db.versions("X").unwrap().len(), 2);
        assert_eq!(db.versions("Y").unwrap().len(), 1);
        assert!(db.versions("Z").unwrap().is_empty());

        let stats = db.stats().unwrap();
        assert_eq!(
            stats,
            CatDbStats {
                cats: 2,
                versions: 3,
                data_bytes: 6
            }
        );
    }

    #[test]
    fn versions_do_not_leak_into_prefixed_cat_ids() {
        let (db, _temp) = create_test_db();

        db.add_cat_version(&make_metadata("ab", "u1"), b"1").unwrap();
        db.add_cat_version(&make_metadata("abc", "u2"), b"2").unwrap();

        assert_eq!(db.versions("ab").unwrap(), vec![hash_url("u1")]);
        assert_eq!(db.versions("abc").unwrap(), vec![hash_url("u2")]);
    }

    #[test]
    fn missing_version_is_none() {
        let (db, _temp) = create_test_db();
        db.add_cat_version(&make_metadata("X", "U"), b"data").unwrap();

        assert!(db.get_cat_version("X", "deadbeef").unwrap().is_none());
        assert!(db.get_cat_version("nope", &hash_url("U")).unwrap().is_none());
    }

    #[test]
    fn empty_cat_id_is_rejected() {
        let (db, _temp) = create_test_db();
        let result = db.add_cat_version(&make_metadata("", "U"), b"data");
        assert!(matches!(result, Err(DatabaseError::EmptyCatId)));
        assert!(db.cat_ids().unwrap().is_empty());
    }

    #[test]
    fn summaries_carry_metadata_json_and_sizes() {
        let (db, _temp) = create_test_db();
        db.add_cat_version(&make_metadata("X", "U"), &[0u8; 2048]).unwrap();

        let summaries = db.version_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].cat_id, "X");
        assert_eq!(summaries[0].version_id, hash_url("U"));
        assert_eq!(summaries[0].data_len, 2048);

        let json: serde_json::Value =
            serde_json::from_str(summaries[0].metadata.as_deref().unwrap()).unwrap();
        assert_eq!(json["id"], "X");
        assert_eq!(json["mimetype"], "image/png");
        assert!(json.get("url").is_none());
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn reopen_keeps_versions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cats.db");

        let db = CatDb::open(&path).unwrap();
        let (_, version_id) = db.add_cat_version(&make_metadata("X", "U"), b"kept").unwrap();
        db.close().unwrap();

        let db = CatDb::open(&path).unwrap();
        let stored = db.get_cat_version("X", &version_id).unwrap().unwrap();
        assert_eq!(stored.data, b"kept");
        assert_eq!(db.path(), path.as_path());
    }

    #[test]
    fn open_creates_empty_store() {
        let (db, _temp) = create_test_db();
        assert!(db.path().exists());
        assert_eq!(db.stats().unwrap(), CatDbStats::default());
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_not_world_writable() {
        use std::os::unix::fs::PermissionsExt;

        let (db, _temp) = create_test_db();
        let mode = std::fs::metadata(db.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o022, 0);
        assert_eq!(mode & 0o600, 0o600);
    }

    #[test]
    fn concurrent_writers_are_serialized() {
        let (db, _temp) = create_test_db();
        let db = Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let meta = make_metadata(
                            &format!("cat-{}", worker % 4),
                            &format!("https://cataas.com/cat?w={}&i={}", worker, i),
                        );
                        db.add_cat_version(&meta, &[worker as u8; 16]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = db.stats().unwrap();
        assert_eq!(stats.cats, 4);
        assert_eq!(stats.versions, 80);
        assert_eq!(stats.data_bytes, 80 * 16);
    }
}
