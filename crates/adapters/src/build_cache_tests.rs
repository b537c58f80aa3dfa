// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_fixture_apk(dir: &Path, app_ini: &str) {
    let apk_path = dir.join("build.apk");
    let file = std::fs::File::create(&apk_path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("application.ini", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(app_ini.as_bytes()).unwrap();
    zip.finish().unwrap();
}

const FIXTURE_INI: &str = "\
[App]
Vendor=Mozilla
SourceStamp=abc123
Version=55.0a1
SourceRepository=http://hg.mozilla.org/mozilla-central
BuildID=20260101120000
";

#[test]
fn check_zip_integrity_passes_for_valid_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_apk(dir.path(), FIXTURE_INI);
    check_zip_integrity(dir.path()).unwrap();
}

#[test]
fn check_zip_integrity_fails_for_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("build.apk"), b"not a zip").unwrap();
    assert!(check_zip_integrity(dir.path()).is_err());
}

#[test]
fn read_app_ini_extracts_required_fields() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_apk(dir.path(), FIXTURE_INI);
    let app_ini = read_app_ini(dir.path()).unwrap();
    assert_eq!(app_ini.source_stamp, "abc123");
    assert_eq!(app_ini.version, "55.0a1");
    assert_eq!(app_ini.source_repository, "http://hg.mozilla.org/mozilla-central");
    assert_eq!(app_ini.build_id, "20260101120000");
}

#[test]
fn read_app_ini_fails_on_missing_key() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_apk(dir.path(), "[App]\nVersion=55.0a1\n");
    let err = read_app_ini(dir.path()).unwrap_err();
    assert!(matches!(err, AdapterError::MissingIniKey { .. }));
}

#[tokio::test]
async fn fake_build_cache_records_force_flag() {
    let cache = FakeBuildCache::new();
    let dir = tempfile::tempdir().unwrap();
    cache.register("https://example.com/build.apk", dir.path().to_path_buf());

    let resolved = cache.get_local_dir("https://example.com/build.apk", false).await.unwrap();
    assert_eq!(resolved, dir.path());
    cache.get_local_dir("https://example.com/build.apk", true).await.unwrap();

    assert_eq!(
        cache.calls(),
        vec![
            ("https://example.com/build.apk".to_string(), false),
            ("https://example.com/build.apk".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn fake_build_cache_unregistered_url_errors() {
    let cache = FakeBuildCache::new();
    let err = cache.get_local_dir("https://example.com/missing.apk", false).await.unwrap_err();
    assert!(matches!(err, AdapterError::HttpStatus { .. }));
}
