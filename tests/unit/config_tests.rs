use std::path::PathBuf;
use std::time::Duration;

use feed_resurfacer::config::GlobalConfig;
use feed_resurfacer::feed::retry::RetryPolicy;
use feed_resurfacer::feed::runner::RunnerTiming;
use feed_resurfacer::feed::FeedSettings;
use feed_resurfacer::review::TimeScale;
use feed_resurfacer::AppError;

fn full_toml() -> &'static str {
    r#"
db_path = "/var/lib/resurfacer/items.db"
time_scale = "compressed"

[scan]
interval_seconds = 30

[feed]
drain_delay_ms = 250
minimum_gap = 3
viewport_buffer = 1.5
scroll_threshold_px = 80.0

[retry]
delay_ms = 200
max_attempts = 5
"#
}

fn expect_config_error(raw: &str, needle: &str) {
    match GlobalConfig::from_toml_str(raw) {
        Err(AppError::Config(msg)) => {
            assert!(msg.contains(needle), "unexpected message: {msg}");
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn empty_document_yields_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("defaults");
    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.db_path, PathBuf::from("resurfacer.db"));
    assert_eq!(config.time_scale, TimeScale::Standard);
    assert_eq!(config.feed.drain_delay_ms, 500);
    assert_eq!(config.feed.minimum_gap, 5);
    assert_eq!(config.retry.max_attempts, 30);
    assert_eq!(config.scan_interval(), Duration::from_secs(60));
}

#[test]
fn full_document_parses_every_field() {
    let config = GlobalConfig::from_toml_str(full_toml()).expect("valid config");
    assert_eq!(config.db_path, PathBuf::from("/var/lib/resurfacer/items.db"));
    assert_eq!(config.time_scale, TimeScale::Compressed);
    assert_eq!(config.scan_interval(), Duration::from_secs(30));
    assert_eq!(config.feed.minimum_gap, 3);
    assert!((config.feed.viewport_buffer - 1.5).abs() < f64::EPSILON);
    assert_eq!(config.retry.delay_ms, 200);
}

#[test]
fn compressed_scale_shortens_default_scan() {
    let config = GlobalConfig::from_toml_str("time_scale = \"compressed\"").expect("valid");
    assert_eq!(config.scan_interval(), Duration::from_secs(15));
}

#[test]
fn derived_runtime_settings_follow_config() {
    let config = GlobalConfig::from_toml_str(full_toml()).expect("valid config");

    let settings = FeedSettings::from(&config.feed);
    assert_eq!(settings.minimum_gap, 3);
    assert!((settings.scroll_threshold - 80.0).abs() < f64::EPSILON);

    let timing = RunnerTiming::from(&config);
    assert_eq!(timing.scan_interval, Duration::from_secs(30));
    assert_eq!(timing.drain_delay, Duration::from_millis(250));
    assert_eq!(
        timing.retry,
        RetryPolicy {
            delay: Duration::from_millis(200),
            max_attempts: 5,
        }
    );
}

#[test]
fn zero_scan_interval_is_rejected() {
    expect_config_error("[scan]\ninterval_seconds = 0", "scan.interval_seconds");
}

#[test]
fn zero_drain_delay_is_rejected() {
    expect_config_error("[feed]\ndrain_delay_ms = 0", "feed.drain_delay_ms");
}

#[test]
fn zero_minimum_gap_is_rejected() {
    expect_config_error("[feed]\nminimum_gap = 0", "feed.minimum_gap");
}

#[test]
fn negative_viewport_buffer_is_rejected() {
    expect_config_error("[feed]\nviewport_buffer = -1.0", "feed.viewport_buffer");
}

#[test]
fn non_finite_scroll_threshold_is_rejected() {
    expect_config_error("[feed]\nscroll_threshold_px = inf", "feed.scroll_threshold_px");
}

#[test]
fn zero_retry_attempts_is_rejected() {
    expect_config_error("[retry]\nmax_attempts = 0", "retry.max_attempts");
}

#[test]
fn unknown_time_scale_is_rejected() {
    expect_config_error("time_scale = \"weekly\"", "invalid config");
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, full_toml()).expect("write");

    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.feed.drain_delay_ms, 250);
}

#[test]
fn load_from_missing_path_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("failed to read config")));
}
