//! # Timer Expression Parser
//!
//! Turns free-form expressions like `coffee: in 5m` or
//! `dentist: on thursday at 6pm req-ack` into absolute-target [`Timer`]s.
//!
//! Each supported timespec grammar gets its own regex; they are tried in a
//! fixed priority order and the first full-string match wins. The order is
//! part of the contract: some inputs are structurally ambiguous between
//! grammars (`on May 6 at 4am` must reach the month grammar, not die in
//! the weekday one). Anchor-style grammars always roll forward by their
//! natural period (day, week, year) so a resolved target is never in the
//! past.
//!
//! Parsing is pure: the same `(raw, now)` pair always yields the same
//! timer, and nothing here reads the clock.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Treat a countdown match with no units as no match instead of
//!   an immediately-due timer
//! - 1.0.0: Initial release with six timespec grammars

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Month, NaiveDate, NaiveTime, Utc, Weekday};
use regex::{Captures, Regex};

use crate::core::errors::ParseError;
use crate::features::timers::Timer;

/// Timespec grammars in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    /// `in 2d 3h 4m 5s` (any subset of units)
    Countdown,
    /// `in 2d at 6pm`
    DayCountdown,
    /// `on Sun at 6pm`
    Weekday,
    /// `on May 6 at 4am`
    MonthDay,
    /// `tomorrow at 4pm`
    Tomorrow,
    /// `at 4pm`
    Today,
}

/// Clock token shape shared by every anchor grammar; validated for real
/// against the known clock formats in [`parse_clocktime`].
const CLOCK: &str = r"\d\d?(?:[:.]\d\d)?(?:am|pm)?";

fn grammar_table() -> &'static [(Grammar, Regex)] {
    static TABLE: OnceLock<Vec<(Grammar, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let timespecs = [
            (
                Grammar::Countdown,
                concat!(
                    r"in(?:\s+(?P<days>\d+)\s*(?:d|days))?",
                    r"(?:\s+(?P<hours>\d+)\s*(?:h|hs))?",
                    r"(?:\s+(?P<mins>\d+)\s*(?:m|min))?",
                    r"(?:\s+(?P<secs>\d+)\s*(?:s|sec))?"
                )
                .to_string(),
            ),
            (
                Grammar::DayCountdown,
                format!(r"in\s+(?P<days>\d+)\s*(?:d|days)\s+at\s+(?P<time>{CLOCK})"),
            ),
            (
                Grammar::Weekday,
                format!(r"(?:on|next)\s+(?P<wday>\w+)\s+at\s+(?P<time>{CLOCK})"),
            ),
            (
                Grammar::MonthDay,
                format!(r"(?:on|next)\s+(?P<month>\w+)\s+(?P<mday>\d\d?)\s+at\s+(?P<time>{CLOCK})"),
            ),
            (
                Grammar::Tomorrow,
                format!(r"tomorrow\s+at\s+(?P<time>{CLOCK})"),
            ),
            (Grammar::Today, format!(r"at\s+(?P<time>{CLOCK})")),
        ];

        timespecs
            .into_iter()
            .map(|(grammar, timespec)| {
                let full =
                    format!(r"(?i)^(?P<desc>[^:]+?)\s*:\s*{timespec}(?:\s+(?P<flags>req-ack))?\s*$");
                (grammar, Regex::new(&full).expect("grammar regex is valid"))
            })
            .collect()
    })
}

/// Parse a raw `<description> : <timespec> [req-ack]` expression into a
/// timer with a resolved absolute target.
pub fn parse_timer(raw: &str, now: DateTime<Utc>) -> Result<Timer, ParseError> {
    for (grammar, regex) in grammar_table() {
        let Some(caps) = regex.captures(raw) else {
            continue;
        };

        let description = caps["desc"].trim().to_string();
        if description.is_empty() {
            break;
        }

        let target = match resolve_target(*grammar, &caps, now)? {
            Some(target) => target,
            // Structural match that carries no usable timespec (countdown
            // with zero units, or a span beyond what the calendar holds).
            None => continue,
        };

        let require_ack = caps.name("flags").is_some();
        return Ok(Timer::new(description, target, require_ack, now));
    }

    Err(ParseError::Unrecognized(raw.to_string()))
}

/// User-facing syntax help for the timer feature.
pub fn timer_help() -> &'static str {
    "Try: timer <description>: <timespec> [req-ack]\n\
     Try: timer ack <description>\n\
     \x20 timer coffee: in 5m\n\
     \x20 timer dentist: on thursday at 6pm\n\
     \x20 timer standup: tomorrow at 9.30am req-ack\n\
     \x20 timer rent: on Jun 1 at 9am"
}

fn resolve_target(
    grammar: Grammar,
    caps: &Captures<'_>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ParseError> {
    let today = now.date_naive();

    let target = match grammar {
        Grammar::Countdown => {
            let mut secs: i64 = 0;
            let mut any_unit = false;
            for (name, unit_secs) in [("days", 86_400), ("hours", 3_600), ("mins", 60), ("secs", 1)]
            {
                let Some(group) = caps.name(name) else {
                    continue;
                };
                let Ok(count) = group.as_str().parse::<i64>() else {
                    return Ok(None);
                };
                secs = match count.checked_mul(unit_secs).and_then(|s| secs.checked_add(s)) {
                    Some(total) => total,
                    None => return Ok(None),
                };
                any_unit = true;
            }
            if !any_unit {
                return Ok(None);
            }
            let Some(span) = Duration::try_seconds(secs) else {
                return Ok(None);
            };
            match now.checked_add_signed(span) {
                Some(target) => target,
                None => return Ok(None),
            }
        }

        Grammar::DayCountdown => {
            let clock = parse_clock_group(caps)?;
            let Ok(days) = caps["days"].parse::<i64>() else {
                return Ok(None);
            };
            let date = match Duration::try_days(days).and_then(|d| today.checked_add_signed(d)) {
                Some(date) => date,
                None => return Ok(None),
            };
            date.and_time(clock).and_utc()
        }

        Grammar::Weekday => {
            let token = &caps["wday"];
            let wday = Weekday::from_str(token)
                .map_err(|_| ParseError::BadWeekday(token.to_string()))?;
            let clock = parse_clock_group(caps)?;
            let ahead = (7 + wday.num_days_from_monday() as i64
                - today.weekday().num_days_from_monday() as i64)
                % 7;
            let mut date = today + Duration::days(ahead);
            // Same weekday with the clock already passed means next week.
            if date.and_time(clock).and_utc() <= now {
                date = date + Duration::days(7);
            }
            date.and_time(clock).and_utc()
        }

        Grammar::MonthDay => {
            let token = format!("{} {}", &caps["month"], &caps["mday"]);
            let month = Month::from_str(&caps["month"])
                .map_err(|_| ParseError::BadMonthDay(token.clone()))?;
            let day: u32 = caps["mday"]
                .parse()
                .map_err(|_| ParseError::BadMonthDay(token.clone()))?;
            let clock = parse_clock_group(caps)?;
            let date = NaiveDate::from_ymd_opt(today.year(), month.number_from_month(), day)
                .ok_or_else(|| ParseError::BadMonthDay(token.clone()))?;
            if date.and_time(clock).and_utc() > now {
                date.and_time(clock).and_utc()
            } else {
                // Already passed this year; the same month/day next year.
                NaiveDate::from_ymd_opt(today.year() + 1, month.number_from_month(), day)
                    .ok_or(ParseError::BadMonthDay(token))?
                    .and_time(clock)
                    .and_utc()
            }
        }

        Grammar::Tomorrow => {
            let clock = parse_clock_group(caps)?;
            (today + Duration::days(1)).and_time(clock).and_utc()
        }

        Grammar::Today => {
            let clock = parse_clock_group(caps)?;
            let candidate = today.and_time(clock).and_utc();
            if candidate > now {
                candidate
            } else {
                (today + Duration::days(1)).and_time(clock).and_utc()
            }
        }
    };

    Ok(Some(target))
}

fn parse_clock_group(caps: &Captures<'_>) -> Result<NaiveTime, ParseError> {
    let token = &caps["time"];
    parse_clocktime(token).ok_or_else(|| ParseError::BadClock(token.to_string()))
}

/// Parse a clock token. Accepted forms, in order: `6:30pm`, `6.30pm`,
/// `6pm`, `18:30`, `18.30`, `18`. Twelve-hour forms require an hour in
/// 1-12; minutes are exactly two digits when present; seconds are always
/// zero.
pub fn parse_clocktime(raw: &str) -> Option<NaiveTime> {
    let lower = raw.trim().to_ascii_lowercase();

    let (body, pm) = if let Some(rest) = lower.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = lower.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (lower.as_str(), None)
    };

    let (hour_part, minute) = match body.split_once([':', '.']) {
        Some((h, m)) if m.len() == 2 => (h, m.parse().ok()?),
        Some(_) => return None,
        None => (body, 0),
    };

    if hour_part.is_empty() || hour_part.len() > 2 || !hour_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let hour: u32 = hour_part.parse().ok()?;

    let hour = match pm {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}
