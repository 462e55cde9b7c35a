use serde::{Deserialize, Serialize};

pub const DAY_END_MINUTE: u32 = 1440;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl TimeInterval {
    pub fn new(start_minute: u32, end_minute: u32) -> Result<Self, String> {
        if start_minute >= DAY_END_MINUTE {
            return Err(format!(
                "interval.start_minute must be in [0, {DAY_END_MINUTE}): got {start_minute}"
            ));
        }
        if end_minute > DAY_END_MINUTE {
            return Err(format!(
                "interval.end_minute must be in [0, {DAY_END_MINUTE}]: got {end_minute}"
            ));
        }
        if start_minute >= end_minute {
            return Err(format!(
                "interval.start_minute must be before interval.end_minute: got {start_minute}..{end_minute}"
            ));
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    pub fn from_hhmm(start: &str, end: &str) -> Result<Self, String> {
        let start_minute = parse_hhmm(start, "interval.start")?;
        let end_minute = parse_hhmm(end, "interval.end")?;
        Self::new(start_minute, end_minute)
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end_minute - self.start_minute
    }

    // Open-interval test: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }

    pub fn start_hhmm(&self) -> String {
        format_hhmm(self.start_minute)
    }

    pub fn end_hhmm(&self) -> String {
        format_hhmm(self.end_minute)
    }
}

pub fn parse_hhmm(value: &str, field_name: &str) -> Result<u32, String> {
    let mut split = value.trim().split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u32>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u32>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(hour * 60 + minute)
}

pub fn format_hhmm(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

pub fn format_hhmm_12h(minute_of_day: u32) -> String {
    let hour = (minute_of_day / 60) % 24;
    let minute = minute_of_day % 60;
    let period = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour {
        0 => 12,
        value if value > 12 => value - 12,
        value => value,
    };
    format!("{hour12}:{minute:02} {period}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_accepts_valid_bounds() {
        let interval = TimeInterval::new(540, 600).expect("valid interval");
        assert_eq!(interval.duration_minutes(), 60);
        let end_of_day = TimeInterval::new(1435, 1440).expect("interval ending at midnight");
        assert_eq!(end_of_day.end_hhmm(), "24:00");
    }

    #[test]
    fn new_rejects_reversed_and_out_of_range() {
        assert!(TimeInterval::new(600, 600).is_err());
        assert!(TimeInterval::new(600, 540).is_err());
        assert!(TimeInterval::new(1440, 1441).is_err());
        assert!(TimeInterval::new(0, 1441).is_err());
    }

    #[test]
    fn parse_hhmm_rejects_malformed_values() {
        assert!(parse_hhmm("09:00", "t").is_ok());
        assert!(parse_hhmm("9:5", "t").is_ok());
        assert!(parse_hhmm("24:00", "t").is_err());
        assert!(parse_hhmm("12:60", "t").is_err());
        assert!(parse_hhmm("noon", "t").is_err());
        assert!(parse_hhmm("09:00:00", "t").is_err());
        assert!(parse_hhmm("", "t").is_err());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let morning = TimeInterval::from_hhmm("09:00", "10:00").expect("valid interval");
        let next = TimeInterval::from_hhmm("10:00", "11:00").expect("valid interval");
        let late = TimeInterval::from_hhmm("09:59", "10:30").expect("valid interval");

        assert!(!morning.overlaps(&next));
        assert!(!next.overlaps(&morning));
        assert!(morning.overlaps(&late));
        assert!(late.overlaps(&next));
    }

    #[test]
    fn formats_round_trip_and_display_as_12h() {
        assert_eq!(format_hhmm(390), "06:30");
        assert_eq!(format_hhmm(0), "00:00");
        assert_eq!(parse_hhmm(&format_hhmm(1290), "t").expect("parse"), 1290);

        assert_eq!(format_hhmm_12h(390), "6:30 AM");
        assert_eq!(format_hhmm_12h(0), "12:00 AM");
        assert_eq!(format_hhmm_12h(720), "12:00 PM");
        assert_eq!(format_hhmm_12h(1085), "6:05 PM");
    }

    // Feature: dayboard, Property 1: the overlap predicate is symmetric and
    // adjacent intervals never overlap
    proptest! {
        #[test]
        fn property1_overlap_symmetric_and_open(
            a_start in 0u32..1439,
            a_len in 1u32..240,
            b_start in 0u32..1439,
            b_len in 1u32..240
        ) {
            let a = TimeInterval::new(a_start, (a_start + a_len).min(1440)).expect("valid a");
            let b = TimeInterval::new(b_start, (b_start + b_len).min(1440)).expect("valid b");

            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
            if a.end_minute == b.start_minute || b.end_minute == a.start_minute {
                prop_assert!(!a.overlaps(&b));
            }
        }
    }
}
