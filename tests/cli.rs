//! Exercises the three CLI adapters end-to-end (spec section 6.3):
//! generate an image, add a file to it, then extract everything back out.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn generate_add_extract_round_trip() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("image.bin");
    let payload_path = dir.path().join("payload.bin");
    let output_dir = dir.path().join("out");

    fs::write(&payload_path, b"hello from the cli").unwrap();

    Command::cargo_bin("appfs_generate")
        .unwrap()
        .args(["524288", image_path.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(fs::metadata(&image_path).unwrap().len(), 524_288);

    Command::cargo_bin("appfs_add_file")
        .unwrap()
        .args([
            image_path.to_str().unwrap(),
            payload_path.to_str().unwrap(),
            "greeting",
            "A Greeting",
            "1",
        ])
        .assert()
        .success();

    Command::cargo_bin("appfs_extract")
        .unwrap()
        .args(["-o", output_dir.to_str().unwrap(), image_path.to_str().unwrap()])
        .assert()
        .success();

    let extracted = fs::read(output_dir.join("greeting")).unwrap();
    assert_eq!(extracted, b"hello from the cli");
}

#[test]
fn add_file_fails_without_enough_space() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("image.bin");
    let payload_path = dir.path().join("payload.bin");

    Command::cargo_bin("appfs_generate")
        .unwrap()
        .args(["131072", image_path.to_str().unwrap()])
        .assert()
        .success();

    fs::write(&payload_path, vec![0u8; 200_000]).unwrap();

    Command::cargo_bin("appfs_add_file")
        .unwrap()
        .args([
            image_path.to_str().unwrap(),
            payload_path.to_str().unwrap(),
            "toobig",
            "Too Big",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enough free space"));
}
