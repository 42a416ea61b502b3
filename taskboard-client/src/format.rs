/// Display helpers for dates and names

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::fmt;
use taskboard_shared::models::task::{Task, TaskStatus};
use taskboard_shared::models::user::default_name;

/// Today's calendar date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole calendar days from `today` until `due`
///
/// ```
/// use chrono::NaiveDate;
/// use taskboard_client::format::days_remaining;
///
/// let today = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
/// assert_eq!(days_remaining(today, today), 0);
/// assert_eq!(days_remaining(today.pred_opt().unwrap(), today), -1);
/// ```
pub fn days_remaining(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// Label shown next to a due date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueLabel {
    Overdue,
    DueToday,
    DaysRemaining(i64),
}

impl DueLabel {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 0 => DueLabel::Overdue,
            0 => DueLabel::DueToday,
            d => DueLabel::DaysRemaining(d),
        }
    }
}

impl fmt::Display for DueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueLabel::Overdue => f.write_str("Overdue"),
            DueLabel::DueToday => f.write_str("Due Today"),
            DueLabel::DaysRemaining(days) => write!(f, "{} Days Remaining", days),
        }
    }
}

/// Past due and not done
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    task.status != TaskStatus::Done && task.due_date.map_or(false, |due| due < today)
}

/// Name to show for a user; blank names fall back to the email local part
pub fn display_name(name: Option<&str>, email: &str) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_name(email).to_string(),
    }
}

/// Avatar letter
pub fn initial(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// `Oct 18`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// `HH:MM` in local time
pub fn clock_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_remaining_across_month() {
        assert_eq!(days_remaining(date(2025, 11, 2), date(2025, 10, 30)), 3);
        assert_eq!(days_remaining(date(2025, 10, 1), date(2025, 10, 30)), -29);
    }

    #[test]
    fn test_due_labels() {
        assert_eq!(DueLabel::from_days(-3).to_string(), "Overdue");
        assert_eq!(DueLabel::from_days(0).to_string(), "Due Today");
        assert_eq!(DueLabel::from_days(4).to_string(), "4 Days Remaining");
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(display_name(Some("Ana Lima"), "ana@example.com"), "Ana Lima");
        assert_eq!(display_name(Some("  "), "ana@example.com"), "ana");
        assert_eq!(display_name(None, "bo@example.com"), "bo");
    }

    #[test]
    fn test_initial() {
        assert_eq!(initial("ana"), "A");
        assert_eq!(initial(""), "");
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date(date(2025, 10, 8)), "Oct 8");
    }
}
