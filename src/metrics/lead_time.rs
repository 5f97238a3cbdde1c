use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;

use super::ComponentEvents;
use crate::clock::Clock;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Calculates the average lead time, in days, for every component that has
/// a commit feed.
///
/// Components without a deploy feed are matched against an empty deploy
/// list. The clock is read once so all samples share the same "now".
pub fn calculate_lead_times(
    commits: &ComponentEvents,
    deploys: &ComponentEvents,
    clock: &impl Clock,
) -> IndexMap<String, f64> {
    let now = clock.now();

    commits
        .iter()
        .map(|(component, component_commits)| {
            let component_deploys = deploys.get(component).map_or(&[][..], Vec::as_slice);
            (
                component.clone(),
                component_lead_time(component_commits, component_deploys, now),
            )
        })
        .collect()
}

/// Mean lead time of one component in fractional days.
///
/// Returns `0.0` when there are no commits. Inputs are left untouched; the
/// deploys are sorted into a private copy before matching.
pub fn component_lead_time(
    commits: &[DateTime<Utc>],
    deploys: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> f64 {
    if commits.is_empty() {
        return 0.0;
    }

    let mut sorted_deploys = deploys.to_vec();
    sorted_deploys.sort_unstable();

    let total_seconds: f64 = commits
        .iter()
        .map(|commit| matching_deploy(*commit, &sorted_deploys, now) - *commit)
        .map(seconds)
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let mean_seconds = total_seconds / commits.len() as f64;

    mean_seconds / SECONDS_PER_DAY
}

/// Picks the deploy credited with shipping `commit`.
///
/// Scans `sorted_deploys` (ascending) from the newest entry backwards and
/// takes the first deploy strictly later than the commit, so the result is
/// the most recent deploy after the commit rather than the nearest one.
/// Falls back to `now` when nothing was deployed after the commit.
pub fn matching_deploy(
    commit: DateTime<Utc>,
    sorted_deploys: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    sorted_deploys
        .iter()
        .rev()
        .find(|deploy| commit < **deploy)
        .copied()
        .unwrap_or(now)
}

fn seconds(delta: TimeDelta) -> f64 {
    delta.as_seconds_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap()
    }

    fn assert_days(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected} days, got {actual}"
        );
    }

    #[test]
    fn test_no_commits_reports_zero() {
        let deploys = vec![at(2, 0), at(3, 0)];
        assert_eq!(component_lead_time(&[], &deploys, at(20, 0)), 0.0);
    }

    #[test]
    fn test_selects_most_recent_deploy_after_commit() {
        let (d1, d2, d3) = (at(1, 0), at(5, 0), at(9, 0));
        let commit = at(3, 0);

        let matched = matching_deploy(commit, &[d1, d2, d3], at(20, 0));

        assert_eq!(matched, d3);
    }

    #[test]
    fn test_commit_newer_than_all_deploys_matches_now() {
        let now = at(20, 0);
        let matched = matching_deploy(at(10, 0), &[at(1, 0), at(5, 0)], now);
        assert_eq!(matched, now);
    }

    #[test]
    fn test_deploy_at_commit_instant_does_not_ship_it() {
        let now = at(20, 0);
        let matched = matching_deploy(at(5, 0), &[at(1, 0), at(5, 0)], now);
        assert_eq!(matched, now);
    }

    #[test]
    fn test_empty_deploys_measures_against_now() {
        let now = at(20, 12);
        let commits = vec![at(18, 12), at(19, 0)];

        // (2.0 + 1.5) / 2
        assert_days(component_lead_time(&commits, &[], now), 1.75);
    }

    #[test]
    fn test_unsorted_deploys_are_ordered_before_matching() {
        let now = at(20, 0);
        let deploys = vec![at(9, 0), at(1, 0), at(5, 0)];
        let commits = vec![at(3, 0)];

        assert_days(component_lead_time(&commits, &deploys, now), 6.0);
        assert_eq!(deploys, vec![at(9, 0), at(1, 0), at(5, 0)]);
    }

    #[test]
    fn test_fractional_days() {
        let now = at(20, 0);
        let commits = vec![at(1, 0)];
        let deploys = vec![at(1, 0) + Duration::hours(6)];

        assert_days(component_lead_time(&commits, &deploys, now), 0.25);
    }

    #[test]
    fn test_sub_millisecond_gaps_are_kept() {
        let commit = at(1, 0);
        let deploy = commit + Duration::microseconds(86_400_000_500);

        let days = component_lead_time(&[commit], &[deploy], at(20, 0));

        assert!(days > 1.0);
        assert_days(days, 1.0 + 0.0005 / 86_400.0);
    }

    #[test]
    fn test_calculate_lead_times_component_without_deploy_feed() {
        let now = at(20, 0);
        let clock = FixedClock(now);
        let mut commits = ComponentEvents::new();
        commits.insert("billing".to_string(), vec![at(16, 0)]);
        commits.insert("quiet".to_string(), vec![]);

        let lead_times = calculate_lead_times(&commits, &ComponentEvents::new(), &clock);

        assert_days(lead_times["billing"], 4.0);
        assert_eq!(lead_times["quiet"], 0.0);
    }

    #[test]
    fn test_calculate_lead_times_ignores_deploy_only_components() {
        let clock = FixedClock(at(20, 0));
        let mut deploys = ComponentEvents::new();
        deploys.insert("orphan".to_string(), vec![at(2, 0)]);

        let lead_times = calculate_lead_times(&ComponentEvents::new(), &deploys, &clock);

        assert!(lead_times.is_empty());
    }
}
