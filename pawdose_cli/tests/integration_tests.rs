//! Integration tests for the pawdose binary.
//!
//! These tests verify end-to-end behavior including:
//! - Pet and medication editing
//! - Daily dose listing and marking
//! - Adherence statistics
//! - Export, backup and restore

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("pawdose"))
}

fn run(data_dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    cli().args(args).arg("--data-dir").arg(data_dir).assert()
}

/// Rex on a twice-daily January course, Luna on a weekly one
fn seed(data_dir: &Path) {
    run(data_dir, &["pet", "add", "Rex"]).success();
    run(data_dir, &["pet", "add", "Luna"]).success();
    run(
        data_dir,
        &[
            "med", "add", "Apoquel", "--pet", "Rex", "--start", "2024-01-01", "--end",
            "2024-01-31", "--time", "08:00", "--time", "20:00",
        ],
    )
    .success();
    run(
        data_dir,
        &[
            "med", "add", "Bravecto", "--pet", "Luna", "--start", "2024-01-01", "--end",
            "2024-03-31", "--every", "weekly", "--time", "09:30",
        ],
    )
    .success();
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Pet medication reminders and adherence tracking",
        ));
}

#[test]
fn test_pet_add_creates_household_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["pet", "add", "Rex"])
        .success()
        .stdout(predicate::str::contains("Added Rex"));

    let contents = fs::read_to_string(data_dir.join("household.json")).unwrap();
    assert!(contents.contains("\"Rex\""));

    run(data_dir, &["pet", "add", "rex"]).failure();
}

#[test]
fn test_med_add_requires_known_pet() {
    let temp_dir = setup_test_dir();

    run(
        temp_dir.path(),
        &[
            "med", "add", "Apoquel", "--pet", "Ghost", "--start", "2024-01-01", "--end",
            "2024-01-31", "--time", "08:00",
        ],
    )
    .failure();
}

#[test]
fn test_med_add_rejects_reversed_dates() {
    let temp_dir = setup_test_dir();
    run(temp_dir.path(), &["pet", "add", "Rex"]).success();

    run(
        temp_dir.path(),
        &[
            "med", "add", "Apoquel", "--pet", "Rex", "--start", "2024-02-01", "--end",
            "2024-01-01", "--time", "08:00",
        ],
    )
    .failure();
}

#[test]
fn test_today_lists_due_doses() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    // 2024-01-01 is a Monday: both medications are due
    run(temp_dir.path(), &["today", "--date", "2024-01-01"])
        .success()
        .stdout(predicate::str::contains("08:00"))
        .stdout(predicate::str::contains("09:30"))
        .stdout(predicate::str::contains("20:00"))
        .stdout(predicate::str::contains("3 pending"));

    // Tuesday: weekly course is not due
    run(temp_dir.path(), &["today", "--date", "2024-01-02"])
        .success()
        .stdout(predicate::str::contains("Bravecto").not())
        .stdout(predicate::str::contains("2 pending"));
}

#[test]
fn test_today_pet_filter() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(
        temp_dir.path(),
        &["today", "--date", "2024-01-08", "--pet", "Luna"],
    )
    .success()
    .stdout(predicate::str::contains("Bravecto"))
    .stdout(predicate::str::contains("Apoquel").not());
}

#[test]
fn test_mark_then_today_shows_completed() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(
        temp_dir.path(),
        &["mark", "Apoquel", "08:00", "--date", "2024-01-05"],
    )
    .success()
    .stdout(predicate::str::contains("marked taken"));

    run(temp_dir.path(), &["today", "--date", "2024-01-05"])
        .success()
        .stdout(predicate::str::contains("1 taken"))
        .stdout(predicate::str::contains("1 pending"))
        .stdout(predicate::str::contains("adherence 100%"));

    let journal = fs::read_to_string(temp_dir.path().join("logs.jsonl")).unwrap();
    assert_eq!(journal.lines().count(), 1);
    assert!(journal.contains("2024-01-05T08:00:00"));
}

#[test]
fn test_mark_rejects_unscheduled_and_duplicate() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    // No 12:00 reminder
    run(
        temp_dir.path(),
        &["mark", "Apoquel", "12:00", "--date", "2024-01-05"],
    )
    .failure();

    // Outside the course
    run(
        temp_dir.path(),
        &["mark", "Apoquel", "08:00", "--date", "2024-02-01"],
    )
    .failure();

    // Weekly course not due on a Tuesday
    run(
        temp_dir.path(),
        &["mark", "Bravecto", "09:30", "--date", "2024-01-02"],
    )
    .failure();

    run(
        temp_dir.path(),
        &["mark", "Apoquel", "20:00", "--date", "2024-01-05", "--missed"],
    )
    .success()
    .stdout(predicate::str::contains("marked missed"));
    run(
        temp_dir.path(),
        &["mark", "Apoquel", "20:00", "--date", "2024-01-05"],
    )
    .failure();
}

#[test]
fn test_stats_report_trend_and_pets() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    for (date, time, extra) in [
        ("2024-01-04", "08:00", None),
        ("2024-01-04", "20:00", Some("--missed")),
        ("2024-01-05", "08:00", None),
    ] {
        let mut args = vec!["mark", "Apoquel", time, "--date", date];
        args.extend(extra);
        run(temp_dir.path(), &args).success();
    }

    run(
        temp_dir.path(),
        &["stats", "--date", "2024-01-05", "--days", "3"],
    )
    .success()
    .stdout(predicate::str::contains("Last 3 day(s)"))
    .stdout(predicate::str::contains("50%"))
    .stdout(predicate::str::contains("Luna"))
    .stdout(predicate::str::contains("67%"));
}

#[test]
fn test_remove_pet_cascades_logs() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(
        temp_dir.path(),
        &["mark", "Bravecto", "09:30", "--date", "2024-01-08"],
    )
    .success();
    run(
        temp_dir.path(),
        &["mark", "Apoquel", "08:00", "--date", "2024-01-08"],
    )
    .success();

    run(temp_dir.path(), &["pet", "remove", "Luna"])
        .success()
        .stdout(predicate::str::contains("1 medication"));

    let journal = fs::read_to_string(temp_dir.path().join("logs.jsonl")).unwrap();
    assert_eq!(journal.lines().count(), 1);

    run(temp_dir.path(), &["med", "list"])
        .success()
        .stdout(predicate::str::contains("Bravecto").not());
}

#[test]
fn test_export_writes_csv() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());
    run(
        temp_dir.path(),
        &["mark", "Apoquel", "08:00", "--date", "2024-01-03"],
    )
    .success();

    let csv_path = temp_dir.path().join("out").join("history.csv");
    cli()
        .arg("export")
        .arg(&csv_path)
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 log"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("Rex,Apoquel,2024-01-03 08:00"));
}

#[test]
fn test_backup_and_restore_into_fresh_dir() {
    let source = setup_test_dir();
    seed(source.path());
    run(
        source.path(),
        &["mark", "Apoquel", "20:00", "--date", "2024-01-10"],
    )
    .success();

    let backup_path = source.path().join("backup.json");
    cli()
        .arg("backup")
        .arg(&backup_path)
        .arg("--data-dir")
        .arg(source.path())
        .assert()
        .success();

    let backup: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&backup_path).unwrap()).unwrap();
    assert_eq!(backup["pets"].as_array().unwrap().len(), 2);

    let target = setup_test_dir();
    cli()
        .arg("restore")
        .arg(&backup_path)
        .arg("--data-dir")
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 log"));

    run(target.path(), &["today", "--date", "2024-01-10"])
        .success()
        .stdout(predicate::str::contains("1 taken"));
}

#[test]
fn test_reminders_lists_plan() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(temp_dir.path(), &["reminders"])
        .success()
        .stdout(predicate::str::contains("Rex / Apoquel: 08:00"))
        .stdout(predicate::str::contains("Rex / Apoquel: 20:00"))
        .stdout(predicate::str::contains("Luna / Bravecto: 09:30"));
}

#[test]
fn test_med_edit_reschedules_reminders() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(
        temp_dir.path(),
        &["med", "edit", "Apoquel", "--time", "07:15", "--end", "2024-01-20"],
    )
    .success()
    .stdout(predicate::str::contains("Rescheduled 1 reminder"))
    .stdout(predicate::str::contains("07:15"));

    run(temp_dir.path(), &["reminders"])
        .success()
        .stdout(predicate::str::contains("Rex / Apoquel: 07:15 from 2024-01-01 to 2024-01-20"))
        .stdout(predicate::str::contains("08:00").not())
        .stdout(predicate::str::contains("Luna / Bravecto: 09:30"));

    run(temp_dir.path(), &["today", "--date", "2024-01-02"])
        .success()
        .stdout(predicate::str::contains("07:15"))
        .stdout(predicate::str::contains("1 pending"));

    // Past the new end date
    run(temp_dir.path(), &["today", "--date", "2024-01-21"])
        .success()
        .stdout(predicate::str::contains("Nothing due"));
}

#[test]
fn test_med_edit_without_timing_change_keeps_reminders() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(
        temp_dir.path(),
        &["med", "edit", "Apoquel", "--dosage", "half tablet"],
    )
    .success()
    .stdout(predicate::str::contains("Reminders unchanged"));

    run(
        temp_dir.path(),
        &["med", "edit", "Apoquel", "--start", "2024-02-01"],
    )
    .failure();
}

#[test]
fn test_removals_cancel_reminders() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(temp_dir.path(), &["pet", "remove", "Luna"]).success();
    run(temp_dir.path(), &["med", "remove", "Apoquel"]).success();

    let reminders = fs::read_to_string(temp_dir.path().join("reminders.json")).unwrap();
    let reminders: serde_json::Value = serde_json::from_str(&reminders).unwrap();
    assert!(reminders["scheduled"].as_array().unwrap().is_empty());
}

#[test]
fn test_restore_schedules_reminders() {
    let source = setup_test_dir();
    seed(source.path());
    let backup_path = source.path().join("backup.json");
    cli()
        .arg("backup")
        .arg(&backup_path)
        .arg("--data-dir")
        .arg(source.path())
        .assert()
        .success();

    let target = setup_test_dir();
    cli()
        .arg("restore")
        .arg(&backup_path)
        .arg("--data-dir")
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3 reminder(s) scheduled"));

    run(target.path(), &["reminders"])
        .success()
        .stdout(predicate::str::contains("Luna / Bravecto: 09:30"));
}

#[test]
fn test_stats_days_bounded() {
    let temp_dir = setup_test_dir();
    seed(temp_dir.path());

    run(temp_dir.path(), &["stats", "--days", "200000000"]).failure();
    run(temp_dir.path(), &["stats", "--days", "0"]).failure();
    run(
        temp_dir.path(),
        &["stats", "--date", "0001-01-01", "--days", "366"],
    )
    .success();
}

#[test]
fn test_verbose_logs_go_to_stderr() {
    let temp_dir = setup_test_dir();

    cli()
        .args(["-vv", "pet", "add", "Rex", "--data-dir"])
        .arg(temp_dir.path())
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added Rex"))
        .stderr(predicate::str::contains("Using data directory"));
}
