use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use time::UtcOffset;
use toml::Value;

use notecards_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("notecards_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> notecards_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = notecards_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn assert_validation_message(payload: String, expected: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");

	let message = err.to_string();

	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Sample config must be valid.");

	assert_eq!(cfg.scheduler.bin_intervals_days, vec![1, 3, 7, 13, 19, 29, 37]);
	assert_eq!(cfg.scheduler.graduation_days, 3_650);
	assert_eq!(cfg.security.session_cookie_name, "sessionid");
	assert_eq!(cfg.scheduler.offset().expect("Offset must parse."), UtcOffset::UTC);
}

#[test]
fn scheduler_section_defaults_when_missing() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");

	root.as_table_mut().expect("Template config must be a table.").remove("scheduler");

	let payload = toml::to_string(&root).expect("Failed to render template config.");
	let cfg = load_payload(payload).expect("Config without [scheduler] must be valid.");

	assert_eq!(cfg.scheduler.bin_intervals_days, vec![1, 3, 7, 13, 19, 29, 37]);
	assert_eq!(cfg.scheduler.graduation_days, 3_650);
	assert_eq!(cfg.scheduler.utc_offset, "+00:00");
}

#[test]
fn empty_interval_table_is_rejected() {
	assert_validation_message(
		sample_toml_with("scheduler", "bin_intervals_days", Value::Array(Vec::new())),
		"scheduler.bin_intervals_days must be non-empty.",
	);
}

#[test]
fn zero_interval_is_rejected() {
	let intervals = vec![Value::Integer(1), Value::Integer(0), Value::Integer(7)];

	assert_validation_message(
		sample_toml_with("scheduler", "bin_intervals_days", Value::Array(intervals)),
		"scheduler.bin_intervals_days entries must be greater than zero.",
	);
}

#[test]
fn zero_graduation_days_is_rejected() {
	assert_validation_message(
		sample_toml_with("scheduler", "graduation_days", Value::Integer(0)),
		"scheduler.graduation_days must be greater than zero.",
	);
}

#[test]
fn malformed_utc_offset_is_rejected() {
	assert_validation_message(
		sample_toml_with("scheduler", "utc_offset", Value::String("Europe/Berlin".to_string())),
		"scheduler.utc_offset must look like +HH:MM or -HH:MM",
	);
}

#[test]
fn utc_offset_accepts_signed_and_named_forms() {
	assert_eq!(
		notecards_config::parse_utc_offset("+02:00").expect("Offset must parse."),
		UtcOffset::from_hms(2, 0, 0).expect("Offset must be valid.")
	);
	assert_eq!(
		notecards_config::parse_utc_offset("-05:30").expect("Offset must parse."),
		UtcOffset::from_hms(-5, -30, 0).expect("Offset must be valid.")
	);

	for raw in ["UTC", " z "] {
		assert_eq!(
			notecards_config::parse_utc_offset(raw).expect("Offset must parse."),
			UtcOffset::UTC
		);
	}
}

#[test]
fn cookie_name_with_separator_is_rejected() {
	assert_validation_message(
		sample_toml_with(
			"security",
			"session_cookie_name",
			Value::String("session id".to_string()),
		),
		"security.session_cookie_name may only contain",
	);
}

#[test]
fn non_positive_session_ttl_is_rejected() {
	assert_validation_message(
		sample_toml_with("security", "session_ttl_days", Value::Integer(0)),
		"security.session_ttl_days must be greater than zero.",
	);
}

#[test]
fn day_counts_past_a_century_are_rejected() {
	assert_validation_message(
		sample_toml_with("scheduler", "graduation_days", Value::Integer(4_000_000)),
		"scheduler.graduation_days must be at most 36525.",
	);
	assert_validation_message(
		sample_toml_with(
			"scheduler",
			"bin_intervals_days",
			Value::Array(vec![Value::Integer(1), Value::Integer(36_526)]),
		),
		"scheduler.bin_intervals_days entries must be at most 36525.",
	);
	assert_validation_message(
		sample_toml_with("security", "session_ttl_days", Value::Integer(100_000)),
		"security.session_ttl_days must be at most 36525.",
	);
}

#[test]
fn century_long_graduation_is_accepted() {
	let cfg = load_payload(sample_toml_with(
		"scheduler",
		"graduation_days",
		Value::Integer(i64::from(notecards_config::MAX_DAYS)),
	))
	.expect("A century must be accepted.");

	assert_eq!(cfg.scheduler.graduation_days, 36_525);
}

#[test]
fn zero_pool_size_is_rejected() {
	assert_validation_message(
		sample_toml_with("storage.postgres", "pool_max_conns", Value::Integer(0)),
		"storage.postgres.pool_max_conns must be greater than zero.",
	);
}

#[test]
fn missing_file_is_a_read_error() {
	let err = notecards_config::load(&PathBuf::from("/nonexistent/notecards.toml"))
		.expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error kind: {err:?}");
}
