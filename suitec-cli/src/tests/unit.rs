//! Focused unit tests covering CLI configuration validation.

use super::*;
use crate::daemon::RunConfig;
use crate::recalculate::RecalculateConfig;
use camino::Utf8PathBuf;
use chrono::{TimeZone, Utc};
use rstest::rstest;

fn expect_invalid(err: CliError, field: &'static str, env_var: &'static str) {
    match err {
        CliError::InvalidArgument {
            field: invalid,
            env,
            ..
        } => {
            assert_eq!(invalid, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected InvalidArgument, found {other:?}"),
    }
}

#[rstest]
fn recalculate_defaults_apply() {
    let config = RecalculateConfig::try_from(RecalculateArgs::default()).expect("defaults are valid");
    assert_eq!(config.database, Utf8PathBuf::from(DEFAULT_DATABASE));
    assert_eq!(config.settings.window_hours(), 24);
    assert_eq!(config.course, None);
}

#[rstest]
fn recalculate_keeps_the_course_scope() {
    let args = RecalculateArgs {
        course: Some(3),
        activity_window: Some(12),
        ..RecalculateArgs::default()
    };
    let config = RecalculateConfig::try_from(args).expect("valid arguments");
    assert_eq!(config.course, Some(3));
    assert_eq!(config.settings.window_hours(), 12);
}

#[rstest]
fn recalculate_rejects_zero_window() {
    let args = RecalculateArgs {
        activity_window: Some(0),
        ..RecalculateArgs::default()
    };
    let err = RecalculateConfig::try_from(args).expect_err("zero window is invalid");
    expect_invalid(err, ARG_ACTIVITY_WINDOW, ENV_RECALCULATE_ACTIVITY_WINDOW);
}

#[rstest]
fn run_defaults_apply() {
    let config = RunConfig::try_from(RunArgs::default()).expect("defaults are valid");
    assert_eq!(config.database, Utf8PathBuf::from(DEFAULT_DATABASE));
    assert_eq!(config.digest_outbox, Utf8PathBuf::from(DEFAULT_DIGEST_OUTBOX));
    assert_eq!(config.interval.interval().as_secs(), 300);
    assert!(config.notifications);
}

#[rstest]
fn run_parses_the_weekly_day() {
    let args = RunArgs {
        weekly_day: Some("Friday".into()),
        ..RunArgs::default()
    };
    let config = RunConfig::try_from(args).expect("valid arguments");
    // Whatever the local zone, the next fire lands on a Friday there.
    let next = config
        .weekly
        .next_fire(Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).single().expect("valid"))
        .expect("fire time");
    assert_eq!(
        chrono::Datelike::weekday(&next.with_timezone(&chrono::Local)),
        chrono::Weekday::Fri
    );
}

#[rstest]
#[case(RunArgs { activity_window: Some(0), ..RunArgs::default() }, ARG_ACTIVITY_WINDOW, ENV_RUN_ACTIVITY_WINDOW)]
#[case(RunArgs { recalculation_interval: Some(0), ..RunArgs::default() }, ARG_RECALCULATION_INTERVAL, ENV_RUN_RECALCULATION_INTERVAL)]
#[case(RunArgs { daily_hour: Some(24), ..RunArgs::default() }, ARG_DAILY_HOUR, ENV_RUN_DAILY_HOUR)]
#[case(RunArgs { weekly_day: Some("someday".into()), ..RunArgs::default() }, ARG_WEEKLY_DAY, ENV_RUN_WEEKLY_DAY)]
#[case(RunArgs { weekly_hour: Some(25), ..RunArgs::default() }, ARG_WEEKLY_HOUR, ENV_RUN_WEEKLY_HOUR)]
fn run_rejects_invalid_values(
    #[case] args: RunArgs,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let err = RunConfig::try_from(args).expect_err("invalid value should error");
    expect_invalid(err, field, env_var);
}

#[rstest]
fn invalid_argument_names_flag_and_env() {
    let err = CliError::InvalidArgument {
        field: ARG_DAILY_HOUR,
        env: ENV_RUN_DAILY_HOUR,
        reason: "must be an hour between 0 and 23",
    };
    assert_eq!(
        err.to_string(),
        "invalid daily-hour (set --daily-hour or SUITEC_CMDS_RUN_DAILY_HOUR): must be an hour between 0 and 23"
    );
}
