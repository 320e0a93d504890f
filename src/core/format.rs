//! Duration rendering shared by timer display and the uptime report
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::Duration;

/// Break a duration into whole days, hours, minutes and seconds and render
/// the non-zero units: `2d, 3h, 5s`. A zero duration renders as `0s`.
pub fn unit_str(span: Duration) -> String {
    let secs = span.num_seconds().max(0);
    let units = [
        (secs / 86_400, "d"),
        (secs % 86_400 / 3_600, "h"),
        (secs % 3_600 / 60, "m"),
        (secs % 60, "s"),
    ];

    let rendered: Vec<String> = units
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, suffix)| format!("{count}{suffix}"))
        .collect();

    if rendered.is_empty() {
        "0s".to_string()
    } else {
        rendered.join(", ")
    }
}

/// Signed rendering for countdown display: `in 5m` while pending,
/// `5m ago` once overdue.
pub fn countdown_str(span: Duration) -> String {
    if span < Duration::zero() {
        format!("{} ago", unit_str(-span))
    } else {
        format!("in {}", unit_str(span))
    }
}
