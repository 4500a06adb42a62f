use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Countdown {
    pub launch_date: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub launched: bool,
    pub remaining: Remaining,
}

impl Countdown {
    /// Time left until `launch_date`. Once the date is reached everything is zero.
    pub fn until(launch_date: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
        let total_seconds = (launch_date - now).num_seconds().max(0);

        Countdown {
            launch_date,
            now,
            launched: now >= launch_date,
            remaining: Remaining {
                days: total_seconds / 86_400,
                hours: total_seconds % 86_400 / 3_600,
                minutes: total_seconds % 3_600 / 60,
                seconds: total_seconds % 60,
                total_seconds,
            },
        }
    }
}
