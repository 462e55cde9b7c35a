use crate::domain::models::Streak;
use chrono::{Duration, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

// A streak is alive only while the latest completion is today or yesterday.
// From that latest date, each earlier completion must be exactly one day
// before the previous one to keep counting.
pub fn calculate_streak(
    routine_id: &str,
    completed: &[NaiveDate],
    today: NaiveDate,
    stored_best: u32,
) -> Streak {
    let mut dates: Vec<NaiveDate> = completed.to_vec();
    dates.sort_unstable_by(|left, right| right.cmp(left));

    let mut current = 0;
    if let Some(&latest) = dates.first() {
        let yesterday = today - Duration::days(1);
        if latest == today || latest == yesterday {
            current = 1;
            for (gap, &date) in dates.iter().enumerate().skip(1) {
                if date == latest - Duration::days(gap as i64) {
                    current += 1;
                } else {
                    break;
                }
            }
        }
    }

    Streak {
        routine_id: routine_id.to_string(),
        current,
        best: current.max(stored_best),
        last_completed: dates
            .first()
            .map(|date| date.format(DATE_FORMAT).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
    }

    #[test]
    fn consecutive_days_ending_today_count_up() {
        let completed = vec![date(1), date(2), date(3)];
        let streak = calculate_streak("workout", &completed, date(3), 0);
        assert_eq!(streak.current, 3);
        assert_eq!(streak.best, 3);
        assert_eq!(streak.last_completed.as_deref(), Some("2026-03-03"));
    }

    #[test]
    fn completing_the_next_day_extends_the_streak() {
        let completed = vec![date(1), date(2), date(3), date(4)];
        let streak = calculate_streak("workout", &completed, date(4), 3);
        assert_eq!(streak.current, 4);
        assert_eq!(streak.best, 4);
    }

    #[test]
    fn missing_a_full_day_resets_current_to_zero() {
        let completed = vec![date(1), date(2), date(3), date(4)];
        let streak = calculate_streak("workout", &completed, date(6), 4);
        assert_eq!(streak.current, 0);
        assert_eq!(streak.best, 4);
        assert_eq!(streak.last_completed.as_deref(), Some("2026-03-04"));
    }

    #[test]
    fn latest_completion_yesterday_keeps_streak_alive() {
        let completed = vec![date(2), date(3)];
        let streak = calculate_streak("reading", &completed, date(4), 0);
        assert_eq!(streak.current, 2);
    }

    #[test]
    fn gap_in_history_stops_the_backward_scan() {
        let completed = vec![
            NaiveDate::from_ymd_opt(2026, 2, 28).expect("valid date"),
            date(2),
            date(3),
        ];
        let streak = calculate_streak("reading", &completed, date(3), 0);
        assert_eq!(streak.current, 2);
    }

    #[test]
    fn no_completions_yields_empty_streak() {
        let streak = calculate_streak("lights-out", &[], date(3), 5);
        assert_eq!(streak.current, 0);
        assert_eq!(streak.best, 5);
        assert!(streak.last_completed.is_none());
    }

    #[test]
    fn input_order_does_not_matter() {
        let completed = vec![date(3), date(1), date(2)];
        let streak = calculate_streak("workout", &completed, date(3), 0);
        assert_eq!(streak.current, 3);
    }

    // Feature: dayboard, Property 6: current never exceeds the completion
    // count, best never drops below the stored value, and a latest completion
    // older than yesterday always zeroes current
    proptest! {
        #[test]
        fn property6_streak_bounds_hold(
            offsets in proptest::collection::btree_set(0i64..60, 0..20),
            stored_best in 0u32..50
        ) {
            let today = NaiveDate::from_ymd_opt(2026, 6, 30).expect("valid date");
            let completed: Vec<NaiveDate> = offsets
                .iter()
                .map(|&offset| today - Duration::days(offset))
                .collect();

            let streak = calculate_streak("workout", &completed, today, stored_best);

            prop_assert!(streak.current as usize <= completed.len());
            prop_assert!(streak.best >= stored_best);
            prop_assert!(streak.best >= streak.current);

            let sorted: Vec<i64> = offsets.iter().copied().collect();
            match sorted.first() {
                Some(&nearest) if nearest <= 1 => {
                    let mut expected = 0u32;
                    for (index, &offset) in sorted.iter().enumerate() {
                        if offset == nearest + index as i64 {
                            expected += 1;
                        } else {
                            break;
                        }
                    }
                    prop_assert_eq!(streak.current, expected);
                }
                _ => prop_assert_eq!(streak.current, 0),
            }
        }
    }
}
