use jiff::{Timestamp, tz::TimeZone};

/// Short relative label for a chapter's publish time: "2d ago", "3h ago",
/// "15m ago" or "just now". Times in the future also read "just now".
pub fn format_relative(published: Timestamp, now: Timestamp) -> String {
    let delta = now.as_second() - published.as_second();
    if delta <= 0 {
        return "just now".to_string();
    }

    let days = delta / 86_400;
    if days > 0 {
        return format!("{}d ago", days);
    }

    let hours = delta / 3_600;
    if hours > 0 {
        return format!("{}h ago", hours);
    }

    let minutes = delta / 60;
    if minutes > 0 {
        return format!("{}m ago", minutes);
    }

    "just now".to_string()
}

/// Calendar date (`YYYY-MM-DD`) in the given zone, for chapter lists.
pub fn format_date(published: Timestamp, tz: &TimeZone) -> String {
    published.to_zoned(tz.clone()).strftime("%Y-%m-%d").to_string()
}

/// Parse the API's RFC 3339 timestamps; anything else is treated as absent.
pub fn parse_api_timestamp(raw: &str) -> Option<Timestamp> {
    raw.trim().parse::<Timestamp>().ok()
}
