use chrono::{DateTime, Utc};

/// Render a timestamp relative to the current clock ("3 days ago").
pub fn from_now(ts: DateTime<Utc>) -> String {
    from_now_at(ts, Utc::now())
}

/// Relative rendering against an explicit reference instant. Thresholds
/// follow the common "fromNow" convention: 44s reads as seconds, 89s as a
/// minute, 44min as minutes, and so on up through years.
pub fn from_now_at(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(ts);
    let future = delta.num_seconds() < 0;
    let secs = delta.num_seconds().abs();

    let mins = (secs as f64 / 60.0).round() as i64;
    let hours = (secs as f64 / 3600.0).round() as i64;
    let days = (secs as f64 / 86_400.0).round() as i64;
    let months = (days as f64 / 30.436_875).round() as i64;
    let years = (months as f64 / 12.0).round() as i64;

    let phrase = if secs < 45 {
        "a few seconds".to_string()
    } else if secs < 90 {
        "a minute".to_string()
    } else if mins < 45 {
        format!("{} minutes", mins)
    } else if mins < 90 {
        "an hour".to_string()
    } else if hours < 22 {
        format!("{} hours", hours)
    } else if hours < 36 {
        "a day".to_string()
    } else if days < 26 {
        format!("{} days", days)
    } else if days < 46 {
        "a month".to_string()
    } else if days < 320 {
        format!("{} months", months)
    } else if months < 18 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    };

    if future {
        format!("in {}", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn render(delta: Duration) -> String {
        let now = Utc::now();
        from_now_at(now - delta, now)
    }

    #[test]
    fn test_seconds_and_minutes() {
        assert_eq!(render(Duration::seconds(10)), "a few seconds ago");
        assert_eq!(render(Duration::seconds(60)), "a minute ago");
        assert_eq!(render(Duration::minutes(5)), "5 minutes ago");
    }

    #[test]
    fn test_hours_and_days() {
        assert_eq!(render(Duration::hours(2)), "2 hours ago");
        assert_eq!(render(Duration::hours(26)), "a day ago");
        assert_eq!(render(Duration::days(3)), "3 days ago");
    }

    #[test]
    fn test_months_and_years() {
        assert_eq!(render(Duration::days(30)), "a month ago");
        assert_eq!(render(Duration::days(75)), "2 months ago");
        assert_eq!(render(Duration::days(400)), "a year ago");
        assert_eq!(render(Duration::days(800)), "2 years ago");
    }

    #[test]
    fn test_future_timestamps() {
        let now = Utc::now();
        assert_eq!(from_now_at(now + Duration::days(3), now), "in 3 days");
    }
}
