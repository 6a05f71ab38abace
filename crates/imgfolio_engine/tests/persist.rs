use std::fs;

use imgfolio_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("pdfs");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write_bytes("images.pdf", b"%PDF-1").unwrap();
    assert_eq!(first.file_name().unwrap(), "images.pdf");
    assert_eq!(fs::read(&first).unwrap(), b"%PDF-1");

    let second = writer.write_bytes("images.pdf", b"%PDF-2").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"%PDF-2");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write_bytes("images.pdf", b"data").is_err());
    assert!(!file_path.with_file_name("images.pdf").exists());
}

#[test]
fn rejects_path_like_file_names() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    for name in ["", "..", "../escape.pdf", "sub/images.pdf"] {
        let err = writer.write_bytes(name, b"x").unwrap_err();
        assert!(matches!(err, PersistError::FileName(_)), "{name}: {err}");
    }
}
