use assert_cmd::Command;
use image::{GrayImage, Luma};
use omr::grid::{fixed_grid, FixedGridParams, LayoutSpec};
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn omr() -> Command {
    Command::cargo_bin("omr").unwrap()
}

/// Top-down scan of a three-question sheet with A, B and E filled.
fn write_scan(path: &Path) {
    let (w, h) = (400usize, 300usize);
    let layout = LayoutSpec::fixed(3, 1, FixedGridParams::default());
    let grid = fixed_grid(&layout, &FixedGridParams::default(), w, h);
    let mut img = GrayImage::from_pixel(w as u32, h as u32, Luma([235]));
    for (q, option) in [(1u32, 0usize), (2, 1), (3, 4)] {
        let r = grid.get(q).unwrap()[option].rect;
        for y in (r.y as u32)..((r.y + r.h).ceil() as u32) {
            for x in (r.x as u32)..((r.x + r.w).ceil() as u32) {
                img.put_pixel(x, y, Luma([15]));
            }
        }
    }
    img.save(path).unwrap();
}

#[test]
fn validate_key_accepts_sequential_key() {
    let dir = tempfile::tempdir().unwrap();
    let key = dir.path().join("key.json");
    fs::write(&key, r#"{"1":"A","2":"B","3":"C"}"#).unwrap();

    omr()
        .args(["validate-key", key.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid answer key: 3 questions"));
}

#[test]
fn validate_key_lists_every_problem() {
    let dir = tempfile::tempdir().unwrap();
    let key = dir.path().join("key.json");
    fs::write(&key, r#"{"1":"A","3":"x"}"#).unwrap();

    omr()
        .args(["validate-key", key.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("question 2 is missing"))
        .stdout(predicate::str::contains("question 3: answer \"x\" is invalid"))
        .stderr(predicate::str::contains("2 problem(s)"));
}

#[test]
fn grade_writes_report_and_debug_image() {
    let dir = tempfile::tempdir().unwrap();
    write_scan(&dir.path().join("scan.png"));
    let job = dir.path().join("job.json");
    fs::write(
        &job,
        r#"{
            "image_path": "scan.png",
            "answer_key": { "1": "A", "2": "C", "3": "E" },
            "rectify": { "mode": "identity" },
            "layout": { "questions": 3 },
            "report_path": "out/report.json",
            "debug_path": "out/debug.png"
        }"#,
    )
    .unwrap();

    omr()
        .args(["--log-level", "warn", "grade", job.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("2/3 correct"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(report["result"]["correct"], 2);
    assert_eq!(report["result"]["details"]["2"]["status"], "incorrect");
    assert_eq!(report["questions"]["3"]["best_guess"], "E");
    assert!(dir.path().join("out/debug.png").exists());
}

#[test]
fn grade_rejects_invalid_key_before_reading_image() {
    let dir = tempfile::tempdir().unwrap();
    let job = dir.path().join("job.json");
    fs::write(
        &job,
        r#"{
            "image_path": "missing.png",
            "answer_key": { "1": "A", "3": "C" },
            "layout": { "questions": 3 }
        }"#,
    )
    .unwrap();

    omr()
        .args(["grade", job.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("question 2 is missing"))
        .stderr(predicate::str::contains("missing.png").not());
}

#[test]
fn grade_reports_missing_sheet_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    GrayImage::from_pixel(120, 120, Luma([128]))
        .save(dir.path().join("desk.png"))
        .unwrap();
    let job = dir.path().join("job.json");
    fs::write(
        &job,
        r#"{
            "image_path": "desk.png",
            "answer_key": { "1": "A" },
            "layout": { "questions": 1 }
        }"#,
    )
    .unwrap();

    omr()
        .args(["grade", job.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"no_sheet_detected\""))
        .stderr(predicate::str::contains("no sheet boundary detected"));
}

#[test]
fn unknown_log_level_is_an_error() {
    omr()
        .args(["--log-level", "chatty", "validate-key", "key.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log level"));
}
