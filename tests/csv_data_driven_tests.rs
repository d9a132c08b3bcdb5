//! Integration tests for dataset files.
//!
//! Datasets are headerless CSV files written by the data preparation step
//! and read back by the actions that need them.

use dc_loadtest::data_source::{read_input_file, read_json, read_json_as, DataSourceError, Dataset};
use dc_loadtest::extractor::get_first_index;
use serde::Deserialize;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_rows(rows: &[Vec<String>]) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let mut writer = csv::Writer::from_path(file.path()).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
    file
}

#[test]
fn test_written_rows_read_back_in_order() {
    let rows: Vec<Vec<String>> = (0..50)
        .map(|i| {
            vec![
                format!("PRJ-{}", i),
                format!("Summary with, a comma {}", i),
                format!("{}", 10000 + i),
            ]
        })
        .collect();
    let file = write_rows(&rows);

    let read = read_input_file(file.path()).unwrap();
    assert_eq!(read, rows);
}

#[test]
fn test_dataset_from_file_round_robin() {
    let rows = vec![
        vec!["user1".to_string(), "pass1".to_string()],
        vec!["user2".to_string(), "pass2".to_string()],
    ];
    let file = write_rows(&rows);

    let users = Dataset::from_file(file.path()).unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users.next_row()[0], "user1");
    assert_eq!(users.next_row()[0], "user2");
    assert_eq!(users.next_row()[0], "user1");
}

#[test]
fn test_empty_dataset_file_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    let err = Dataset::from_file(file.path()).unwrap_err();
    assert!(matches!(err, DataSourceError::EmptyData(_)));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = read_input_file("/nonexistent/users.csv").unwrap_err();
    assert!(matches!(err, DataSourceError::IoError(_)));
}

#[test]
fn test_first_row_of_dataset() {
    let file = write_rows(&[vec!["ABC".to_string(), "10001".to_string()]]);
    let projects = read_input_file(file.path()).unwrap();

    let first = get_first_index(&projects, "no projects").unwrap();
    assert_eq!(first[0], "ABC");

    let none: Vec<Vec<String>> = Vec::new();
    let err = get_first_index(&none, "no projects").unwrap_err();
    assert!(err.to_string().contains("no projects"));
}

#[derive(Debug, Deserialize, PartialEq)]
struct SpaceSettings {
    key: String,
    pages: u32,
}

#[test]
fn test_read_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"key": "DS", "pages": 12, "labels": ["a", "b"]}}"#).unwrap();

    let value = read_json(file.path()).unwrap();
    assert_eq!(value["key"], "DS");
    assert_eq!(value["labels"][1], "b");

    let typed: SpaceSettings = read_json_as(file.path()).unwrap();
    assert_eq!(
        typed,
        SpaceSettings {
            key: "DS".to_string(),
            pages: 12
        }
    );
}

#[test]
fn test_invalid_json_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{not json").unwrap();

    let err = read_json(file.path()).unwrap_err();
    assert!(matches!(err, DataSourceError::JsonError(_)));
}
