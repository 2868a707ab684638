use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn from_rfc3339(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Delay before retry attempt number `attempts`: 30s doubling per attempt,
/// capped at one hour.
pub fn retry_backoff(attempts: i64) -> Duration {
    let exp = attempts.saturating_sub(1).clamp(0, 10) as u32;
    let secs = (30i64 << exp).min(3600);
    Duration::seconds(secs)
}
