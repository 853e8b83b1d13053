mod common;

use hicona_core::error::HiconaError;
use hicona_core::kw::KwConfig;
use tempfile::TempDir;

#[test]
fn test_parse_strips_header_and_footer() {
    let text = common::kw_text("Plate 7", 3, 1, 9, 2);
    let config = KwConfig::parse(&text, 1, 2).unwrap();
    assert_eq!(config.plate_name, "Plate 7");
    assert_eq!(config.planes, 3);
    assert_eq!(config.timepoints, 1);
    assert_eq!(config.fields, Some(9));
    assert_eq!(config.channels, 2);
    assert_eq!(config.measurement, "Measurement 1");
}

#[test]
fn test_channel_list_counts_entries() {
    let text = common::kw_text("P", 1, 1, 1, 4);
    let config = KwConfig::parse(&text, 1, 2).unwrap();
    assert_eq!(config.channels, 4);
}

#[test]
fn test_channel_scalar_counts_as_one() {
    let text = common::kw_text("P", 1, 1, 1, 1);
    let config = KwConfig::parse(&text, 1, 2).unwrap();
    assert_eq!(config.channels, 1);
}

#[test]
fn test_missing_fields_key_is_none() {
    let text = "header\n{\"PLATENAME\": \"P\", \"PLANES\": 1, \"TIMEPOINTS\": 1, \"CHANNEL\": \"DAPI\"}\nfooter\nfooter\n";
    let config = KwConfig::parse(text, 1, 2).unwrap();
    assert_eq!(config.fields, None);
    assert!(config.guid.is_empty());
}

#[test]
fn test_too_short_file_is_an_error() {
    assert!(KwConfig::parse("only\ntwo", 1, 2).is_err());
}

#[test]
fn test_malformed_json_body_is_an_error() {
    let text = "header\nnot json at all\nfooter\nfooter\n";
    assert!(KwConfig::parse(text, 1, 2).is_err());
}

#[test]
fn test_load_wraps_errors_with_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.kw.txt");
    std::fs::write(&path, "header\n{bad\nfooter\nfooter\n").unwrap();
    match KwConfig::load(&path) {
        Err(HiconaError::KwConfig { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected KwConfig error, got {other:?}"),
    }
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.kw.txt");
    std::fs::write(&path, common::kw_text("Loaded", 2, 1, 4, 3)).unwrap();
    let config = KwConfig::load(&path).unwrap();
    assert_eq!(config.plate_name, "Loaded");
    assert_eq!(config.channels, 3);
}
