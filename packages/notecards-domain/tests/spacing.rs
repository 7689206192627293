use time::{Duration, OffsetDateTime, macros::datetime};

use notecards_domain::{
	Error,
	spacing::{self, CardSchedule, SpacingTable},
};

fn now() -> OffsetDateTime {
	datetime!(2024-05-01 12:00 UTC)
}

fn card(spacing_bin: i32, active: bool) -> CardSchedule {
	CardSchedule { spacing_bin, active, next_retrieval_date: now() - Duration::days(1) }
}

#[test]
fn success_advances_one_bin_and_uses_the_new_bins_interval() {
	let table = SpacingTable::default();
	let expected_days = [3, 7, 13, 19, 29, 37];

	for (bin, days) in (1..=6).zip(expected_days) {
		let (next, attempt) = spacing::record_attempt(&table, &card(bin, true), true, now())
			.expect("Attempt must apply.");

		assert_eq!(next.spacing_bin, bin + 1);
		assert!(next.active);
		assert_eq!(next.next_retrieval_date, now() + Duration::days(days));
		assert_eq!(attempt.spacing_bin, bin);
		assert!(attempt.retrieved);
		assert_eq!(attempt.retrieval_date, now());
	}
}

#[test]
fn success_from_last_bin_graduates() {
	let table = SpacingTable::default();
	let (next, attempt) =
		spacing::record_attempt(&table, &card(7, true), true, now()).expect("Attempt must apply.");

	assert_eq!(next.spacing_bin, 8);
	assert!(!next.active);
	assert_eq!(next.next_retrieval_date, now() + Duration::days(3_650));
	assert_eq!(attempt.spacing_bin, 7);
}

#[test]
fn success_on_graduated_card_keeps_bin() {
	let table = SpacingTable::default();
	let (next, attempt) =
		spacing::record_attempt(&table, &card(8, false), true, now()).expect("Attempt must apply.");

	assert_eq!(next.spacing_bin, 8);
	assert!(!next.active);
	assert_eq!(next.next_retrieval_date, now() + Duration::days(3_650));
	assert_eq!(attempt.spacing_bin, 8);
}

#[test]
fn failure_resets_to_first_bin_and_keeps_active() {
	let table = SpacingTable::default();

	for bin in 1..=8 {
		for active in [true, false] {
			let (next, attempt) = spacing::record_attempt(&table, &card(bin, active), false, now())
				.expect("Attempt must apply.");

			assert_eq!(next.spacing_bin, 1);
			assert_eq!(next.active, active);
			assert_eq!(next.next_retrieval_date, now() + Duration::days(1));
			assert_eq!(attempt.spacing_bin, bin);
			assert!(!attempt.retrieved);
		}
	}
}

#[test]
fn invalid_bin_is_an_error() {
	let table = SpacingTable::default();

	for bin in [0, -1, i32::MIN] {
		assert_eq!(
			spacing::record_attempt(&table, &card(bin, true), true, now()),
			Err(Error::InvalidSpacingBin { bin })
		);
	}
}

#[test]
fn study_session_walks_the_bins() {
	let table = SpacingTable::default();
	let mut state = spacing::initial_schedule(now()).expect("Schedule must fit.");
	let mut history = Vec::new();

	assert_eq!(state.spacing_bin, 1);
	assert_eq!(state.next_retrieval_date, now() + Duration::days(1));

	for (succeeded, bin, days) in [(true, 2, 3), (true, 3, 7), (false, 1, 1)] {
		let (next, attempt) =
			spacing::record_attempt(&table, &state, succeeded, now()).expect("Attempt must apply.");

		assert_eq!(next.spacing_bin, bin);
		assert_eq!(next.next_retrieval_date, now() + Duration::days(days));

		history.push(attempt.spacing_bin);
		state = next;
	}

	assert_eq!(history, vec![1, 2, 3]);
}

#[test]
fn custom_table_graduates_earlier() {
	let table = SpacingTable::new(&[2, 5], 100).expect("Table must be valid.");
	let (bin2, _) =
		spacing::record_attempt(&table, &card(1, true), true, now()).expect("Attempt must apply.");
	let (bin3, _) =
		spacing::record_attempt(&table, &bin2, true, now()).expect("Attempt must apply.");

	assert_eq!(bin2.next_retrieval_date, now() + Duration::days(5));
	assert_eq!(bin3.spacing_bin, 3);
	assert!(!bin3.active);
	assert_eq!(bin3.next_retrieval_date, now() + Duration::days(100));

	let (failed, _) =
		spacing::record_attempt(&table, &bin3, false, now()).expect("Attempt must apply.");

	assert_eq!(failed.spacing_bin, 1);
	assert_eq!(failed.next_retrieval_date, now() + Duration::days(1));
}

#[test]
fn due_dates_past_the_calendar_are_errors() {
	let table = SpacingTable::default();
	let end = datetime!(9999-12-31 12:00 UTC);

	for (bin, succeeded) in [(1, true), (3, false), (7, true), (8, true)] {
		let card = CardSchedule { spacing_bin: bin, active: true, next_retrieval_date: end };

		assert_eq!(
			spacing::record_attempt(&table, &card, succeeded, end),
			Err(Error::DateOutOfRange { date: end })
		);
	}

	assert_eq!(spacing::initial_schedule(end), Err(Error::DateOutOfRange { date: end }));
}

#[test]
fn longest_table_schedules_within_range() {
	let table = SpacingTable::new(&[notecards_config::MAX_DAYS], notecards_config::MAX_DAYS)
		.expect("A century must be accepted.");
	let (graduated, _) =
		spacing::record_attempt(&table, &card(2, true), true, now()).expect("Attempt must apply.");

	assert!(!graduated.active);
	assert_eq!(graduated.next_retrieval_date, now() + Duration::days(36_525));
}
