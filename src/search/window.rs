use chrono::{DateTime, Utc};

/// Date range requested by the caller
///
/// Stored as absolute timestamps and only turned into the API's relative `dateRestrict`
/// code when a request URL is built, so the code is relative to the moment of the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// `dateRestrict` code for this window as seen from `now`.
    ///
    /// Only the lower bound can be expressed; the API has no upper bound.
    pub fn restrict_code(&self, now: DateTime<Utc>) -> Option<String> {
        let from = self.from?;
        encode_days((now - from).num_days())
    }
}

/// Relative window code for a span of `days` ending now.
pub fn encode_days(days: i64) -> Option<String> {
    let ceil_div = |n: i64, d: i64| (n + d - 1) / d;
    match days {
        d if d <= 0 => None,
        d if d <= 7 => Some(format!("d{d}")),
        d if d <= 31 => Some(format!("w{}", ceil_div(d, 7))),
        d if d <= 365 => Some(format!("m{}", ceil_div(d, 30))),
        d => Some(format!("y{}", ceil_div(d, 365))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_recent_dates_use_days() {
        let now = Utc::now();
        let window = DateWindow {
            from: Some(now - Duration::days(3)),
            to: None,
        };
        assert_eq!(window.restrict_code(now).as_deref(), Some("d3"));
    }

    #[test]
    fn test_forty_days_rounds_up_to_two_months() {
        let now = Utc::now();
        let window = DateWindow {
            from: Some(now - Duration::days(40)),
            to: None,
        };
        assert_eq!(window.restrict_code(now).as_deref(), Some("m2"));
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(encode_days(7).as_deref(), Some("d7"));
        assert_eq!(encode_days(8).as_deref(), Some("w2"));
        assert_eq!(encode_days(31).as_deref(), Some("w5"));
        assert_eq!(encode_days(32).as_deref(), Some("m2"));
        assert_eq!(encode_days(365).as_deref(), Some("m13"));
        assert_eq!(encode_days(366).as_deref(), Some("y2"));
        assert_eq!(encode_days(800).as_deref(), Some("y3"));
    }

    #[test]
    fn test_future_or_missing_from_has_no_restriction() {
        let now = Utc::now();
        let future = DateWindow {
            from: Some(now + Duration::days(2)),
            to: None,
        };
        assert_eq!(future.restrict_code(now), None);

        let only_to = DateWindow {
            from: None,
            to: Some(now),
        };
        assert_eq!(only_to.restrict_code(now), None);
        assert!(DateWindow::default().is_empty());
    }
}
