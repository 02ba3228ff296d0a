//! Argument parsing for both subcommands.

use super::*;
use camino::Utf8PathBuf;
use rstest::rstest;

#[rstest]
fn parses_recalculate_flags() {
    let cli = Cli::try_parse_from([
        "suitec",
        "recalculate",
        "--database",
        "data/suitec.db",
        "--course",
        "12",
        "--activity-window",
        "6",
    ])
    .expect("valid arguments");
    let Command::Recalculate(args) = cli.command else {
        panic!("expected recalculate command");
    };
    assert_eq!(args.database, Some(Utf8PathBuf::from("data/suitec.db")));
    assert_eq!(args.course, Some(12));
    assert_eq!(args.activity_window, Some(6));
}

#[rstest]
fn parses_run_flags() {
    let cli = Cli::try_parse_from([
        "suitec",
        "run",
        "--recalculation-interval",
        "10",
        "--weekly-day",
        "fri",
        "--notifications",
        "false",
    ])
    .expect("valid arguments");
    let Command::Run(args) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.recalculation_interval, Some(10));
    assert_eq!(args.weekly_day.as_deref(), Some("fri"));
    assert_eq!(args.notifications, Some(false));
    assert_eq!(args.daily_hour, None);
}

#[rstest]
fn rejects_non_numeric_course() {
    let err = Cli::try_parse_from(["suitec", "recalculate", "--course", "art"])
        .expect_err("course ids are numeric");
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[rstest]
fn requires_a_subcommand() {
    assert!(Cli::try_parse_from(["suitec"]).is_err());
}
