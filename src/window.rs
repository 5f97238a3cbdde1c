use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Format accepted by the GitHub `since`/`until` and Buildkite
/// `created_from`/`created_to` query parameters.
const QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Trailing analysis window shared by the commit and deploy feeds.
///
/// Both bounds are inclusive. The end is the instant metrics are measured
/// at, so nothing inside the window is newer than "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl AnalysisWindow {
    /// Window covering the `days` days that end at `now`.
    pub fn ending_at(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Lower bound as sent upstream.
    pub fn query_param(&self) -> String {
        self.start.format(QUERY_FORMAT).to_string()
    }

    /// Upper bound as sent upstream.
    pub fn end_param(&self) -> String {
        self.end.format(QUERY_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_starts_thirty_days_back() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 30, 45).unwrap();
        let window = AnalysisWindow::ending_at(now, DEFAULT_WINDOW_DAYS);

        assert_eq!(
            window.start(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
        );
    }

    #[test]
    fn test_query_param_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 5, 9).unwrap();
        let window = AnalysisWindow::ending_at(now, 30);

        assert_eq!(window.query_param(), "2023-12-16T08:05:09Z");
    }

    #[test]
    fn test_query_param_drops_subseconds() {
        let now = Utc
            .with_ymd_and_hms(2024, 1, 15, 8, 5, 9)
            .unwrap()
            .checked_add_signed(Duration::milliseconds(750))
            .unwrap();
        let window = AnalysisWindow::ending_at(now, 1);

        assert_eq!(window.query_param(), "2024-01-14T08:05:09Z");
    }

    #[test]
    fn test_window_ends_at_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let window = AnalysisWindow::ending_at(now, 30);

        assert_eq!(window.end(), now);
        assert_eq!(window.end_param(), "2024-06-01T00:00:00Z");
        assert!(window.contains(now));
        assert!(window.contains(window.start()));
        assert!(!window.contains(now + Duration::seconds(1)));
        assert!(!window.contains(window.start() - Duration::seconds(1)));
    }
}
