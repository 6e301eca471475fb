use assert_cmd::Command;
use image::{ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn write_png(path: &Path, w: u32, h: u32, seed: u8) {
    RgbImage::from_fn(w, h, |x, y| {
        Rgb([seed.wrapping_add(x as u8), seed.wrapping_add(y as u8), seed])
    })
    .save_with_format(path, ImageFormat::Png)
    .expect("write png");
}

fn write_wav(path: &Path, rate: u32, frames: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).expect("create wav");
    for i in 0..frames {
        w.write_sample((i % 100) as i16).expect("left");
        w.write_sample(-((i % 100) as i16)).expect("right");
    }
    w.finalize().expect("finalize wav");
}

fn read_manifest(dir: &Path) -> Value {
    let bytes = fs::read(dir.join("metadata.json")).expect("manifest exists");
    serde_json::from_slice(&bytes).expect("manifest is json")
}

/// Four bundles: one of each kind plus one that matches no rule.
fn write_upload_tree(root: &Path) {
    let text = root.join("riddle");
    let visual = root.join("jigsaw");
    let mixed = root.join("soundboard");
    let odd = root.join("notes");
    for d in [&text, &visual, &mixed, &odd] {
        fs::create_dir_all(d).expect("mkdir bundle");
    }

    fs::write(text.join("clue.txt"), "the cat sat concatenate\n").expect("write text");
    fs::write(text.join("empty.txt"), "").expect("write text");

    write_png(&visual.join("a.png"), 64, 48, 10);
    write_png(&visual.join("b.PNG"), 30, 90, 80);
    write_png(&visual.join("c.png"), 20, 20, 160);

    write_png(&mixed.join("cover.png"), 16, 16, 40);
    write_wav(&mixed.join("theme.wav"), 8_000, 20_000);

    fs::write(odd.join("readme.md"), "# not a puzzle").expect("write md");
}

#[test]
fn help_lists_scan_flags() {
    let output = Command::new(assert_cmd::cargo::cargo_bin!("puzzlemeta"))
        .arg("--help")
        .output()
        .expect("--help runs");

    assert!(output.status.success());
    let text = combined_output(&output);
    for flag in ["--workers", "--thumbnail-dir", "--no-thumbnail", "--progress", "--verbose"] {
        assert!(text.contains(flag), "help text missing {flag}: {text}");
    }
}

#[test]
fn missing_root_prints_usage_and_fails() {
    Command::new(assert_cmd::cargo::cargo_bin!("puzzlemeta"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn root_that_is_not_a_directory_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let file = tmp.path().join("file.txt");
    fs::write(&file, "x").expect("write");

    Command::new(assert_cmd::cargo::cargo_bin!("puzzlemeta"))
        .arg(&file)
        .arg("--progress")
        .arg("quiet")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a directory"));
}

#[test]
fn scan_writes_manifests_and_thumbnail() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("upload-dir");
    let thumbs = tmp.path().join("thumbs");
    write_upload_tree(&root);

    let output = Command::new(assert_cmd::cargo::cargo_bin!("puzzlemeta"))
        .arg(&root)
        .arg("--workers")
        .arg("2")
        .arg("--thumbnail-dir")
        .arg(&thumbs)
        .arg("--progress")
        .arg("plain")
        .output()
        .expect("scan runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    let text = combined_output(&output);
    assert!(text.contains("[PROGRESS] scan"), "missing plain progress: {text}");
    assert!(text.contains("Scan summary:"), "missing summary: {text}");
    assert!(text.contains("bundles=4"), "{text}");
    assert!(text.contains("manifests=3"), "{text}");
    assert!(text.contains("unclassified=1"), "{text}");
    assert!(text.contains("failed=0"), "{text}");

    let riddle = read_manifest(&root.join("riddle"));
    assert_eq!(riddle["type"], "Text");
    assert_eq!(riddle["size"], 24);
    let clue = &riddle["filesData"][0];
    assert_eq!(clue["type"], "txt");
    assert_eq!(clue["numOfUniqeWords"], 4);
    assert_eq!(clue["mostContainerWord"], "concatenate");
    assert_eq!(clue["numOfContainerWord"], 1);
    let empty = &riddle["filesData"][1];
    assert_eq!(empty["size"], 0);
    assert_eq!(empty["checksum"], "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(empty["mostContainerWord"], "empty");

    let jigsaw = read_manifest(&root.join("jigsaw"));
    assert_eq!(jigsaw["type"], "Visual");
    let files = jigsaw["filesData"].as_array().expect("files array");
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["type"], "png");
    assert_eq!(files[0]["width"], 64);
    assert_eq!(files[0]["height"], 48);
    assert_eq!(files[1]["width"], 30);
    assert_eq!(files[1]["height"], 90);
    let sum: u64 = files.iter().map(|f| f["size"].as_u64().expect("size")).sum();
    assert_eq!(jigsaw["size"].as_u64(), Some(sum));

    let board = read_manifest(&root.join("soundboard"));
    assert_eq!(board["type"], "Audio-Visual");
    assert_eq!(board["filesData"][0]["type"], "png");
    assert_eq!(board["filesData"][1]["type"], "wav");
    assert_eq!(board["filesData"][1]["durationInSec"], 2);

    assert!(!root.join("notes/metadata.json").exists());

    let collage = image::open(thumbs.join("t-100.jpg")).expect("thumbnail decodes");
    assert_eq!((collage.width(), collage.height()), (1000, 1000));
}

#[test]
fn corrupt_bundle_is_reported_and_others_still_written() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("upload-dir");
    fs::create_dir_all(root.join("bad")).expect("mkdir");
    fs::create_dir_all(root.join("good")).expect("mkdir");
    fs::write(root.join("bad/piece.png"), b"\x89PNG but truncated").expect("write");
    fs::write(root.join("good/words.txt"), "alpha beta\n").expect("write");

    let output = Command::new(assert_cmd::cargo::cargo_bin!("puzzlemeta"))
        .arg(&root)
        .arg("--no-thumbnail")
        .arg("--progress")
        .arg("quiet")
        .output()
        .expect("scan runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    let text = combined_output(&output);
    assert!(text.contains("failed=1"), "{text}");
    assert!(text.contains("piece.png"), "failure should name the file: {text}");
    assert!(!root.join("bad/metadata.json").exists());
    assert!(root.join("good/metadata.json").exists());
}

#[test]
fn rescan_is_stable() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("upload-dir");
    write_upload_tree(&root);

    let run = || {
        Command::new(assert_cmd::cargo::cargo_bin!("puzzlemeta"))
            .arg(&root)
            .arg("--no-thumbnail")
            .arg("--progress")
            .arg("quiet")
            .output()
            .expect("scan runs")
    };

    let first = run();
    assert!(first.status.success(), "{}", combined_output(&first));
    let before = fs::read(root.join("jigsaw/metadata.json")).expect("manifest");

    let second = run();
    assert!(second.status.success(), "{}", combined_output(&second));
    assert!(combined_output(&second).contains("manifests=3"));
    let after = fs::read(root.join("jigsaw/metadata.json")).expect("manifest");
    assert_eq!(before, after);
}
