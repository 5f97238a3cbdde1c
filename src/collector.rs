use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::clock::Clock;
use crate::insights::DeliveryInsights;
use crate::metrics::{self, ComponentEvents};
use crate::output::PhaseProgress;
use crate::providers::{CommitSource, DeploySource};
use crate::window::AnalysisWindow;

/// Gathers commits and deploys for every configured component and reduces
/// them to delivery metrics.
pub struct DeliveryCollector<'a, C, D, K> {
    commits: &'a C,
    deploys: &'a D,
    clock: K,
    /// Buildkite pipeline key to GitHub repository name
    components: &'a IndexMap<String, String>,
    window_days: u32,
}

impl<'a, C, D, K> DeliveryCollector<'a, C, D, K>
where
    C: CommitSource,
    D: DeploySource,
    K: Clock,
{
    pub fn new(
        commits: &'a C,
        deploys: &'a D,
        clock: K,
        components: &'a IndexMap<String, String>,
        window_days: u32,
    ) -> Self {
        Self {
            commits,
            deploys,
            clock,
            components,
            window_days,
        }
    }

    /// Collects delivery insights over the trailing window.
    ///
    /// Runs in three phases: all commit feeds, then all deploy feeds, then
    /// the metric calculation. Requests for different components within a
    /// phase run concurrently; results are keyed in configuration order.
    pub async fn collect(&self) -> DeliveryInsights {
        let window = AnalysisWindow::ending_at(self.clock.now(), self.window_days);
        info!(
            "Collecting delivery metrics for {} components since {}",
            self.components.len(),
            window.query_param()
        );

        let progress = PhaseProgress::start_phase_1(self.components.len());

        let commits = self.fetch_commits(&window).await;
        let progress = progress.finish_phase_1_start_phase_2(total_events(&commits));

        let deploys = self.fetch_deploys(&window).await;
        let progress = progress.finish_phase_2_start_phase_3(total_events(&deploys));

        for (component, timeline) in &commits {
            if timeline.is_empty() {
                warn!("No commits found for {component} in the window");
            }
        }

        let components = metrics::summarize(&commits, &deploys, &self.clock);

        progress.finish_phase_3();

        DeliveryInsights {
            collected_at: self.clock.now(),
            window_start: window.start(),
            window_days: self.window_days,
            total_components: components.len(),
            components,
        }
    }

    async fn fetch_commits(&self, window: &AnalysisWindow) -> ComponentEvents {
        let fetches = self
            .components
            .values()
            .map(|repository| self.commits.fetch_commits(repository, window));
        let timelines = join_all(fetches).await;

        self.keyed_within(window, timelines, "commits")
    }

    async fn fetch_deploys(&self, window: &AnalysisWindow) -> ComponentEvents {
        let fetches = self
            .components
            .keys()
            .map(|pipeline| self.deploys.fetch_deploys(pipeline, window));
        let timelines = join_all(fetches).await;

        self.keyed_within(window, timelines, "deploys")
    }

    /// Keys timelines by component and drops events outside the window, so
    /// no event is newer than the instant lead times are measured at.
    fn keyed_within(
        &self,
        window: &AnalysisWindow,
        timelines: Vec<Vec<DateTime<Utc>>>,
        kind: &str,
    ) -> ComponentEvents {
        self.components
            .keys()
            .cloned()
            .zip(timelines)
            .map(|(component, mut timeline)| {
                let received = timeline.len();
                timeline.retain(|instant| window.contains(*instant));
                if timeline.len() < received {
                    debug!(
                        "Dropped {} {kind} of {component} outside the window",
                        received - timeline.len()
                    );
                }
                (component, timeline)
            })
            .collect()
    }
}

fn total_events(events: &ComponentEvents) -> usize {
    events.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubCommits {
        by_repository: HashMap<&'static str, Vec<DateTime<Utc>>>,
        windows_seen: Mutex<Vec<String>>,
    }

    impl CommitSource for StubCommits {
        async fn fetch_commits(
            &self,
            repository: &str,
            window: &AnalysisWindow,
        ) -> Vec<DateTime<Utc>> {
            self.windows_seen.lock().unwrap().push(window.query_param());
            self.by_repository.get(repository).cloned().unwrap_or_default()
        }
    }

    struct StubDeploys {
        by_pipeline: HashMap<&'static str, Vec<DateTime<Utc>>>,
    }

    impl DeploySource for StubDeploys {
        async fn fetch_deploys(
            &self,
            pipeline: &str,
            _window: &AnalysisWindow,
        ) -> Vec<DateTime<Utc>> {
            self.by_pipeline.get(pipeline).cloned().unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn test_collect_end_to_end() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let days = |n: i64| now - Duration::days(n);

        let commits = StubCommits {
            by_repository: HashMap::from([
                ("service-a", vec![days(0), days(5), days(10)]),
                ("service-b", vec![days(2)]),
            ]),
            windows_seen: Mutex::new(Vec::new()),
        };
        let deploys = StubDeploys {
            // newest first, as the CI host lists them
            by_pipeline: HashMap::from([("svc-a", vec![days(3), days(8)])]),
        };
        let mut components = IndexMap::new();
        components.insert("svc-a".to_string(), "service-a".to_string());
        components.insert("svc-b".to_string(), "service-b".to_string());
        components.insert("svc-c".to_string(), "service-c".to_string());

        let collector =
            DeliveryCollector::new(&commits, &deploys, FixedClock(now), &components, 30);
        let insights = collector.collect().await;

        assert_eq!(insights.total_components, 3);
        assert_eq!(insights.window_start, days(30));
        assert_eq!(
            *commits.windows_seen.lock().unwrap(),
            vec!["2024-05-31T00:00:00Z"; 3]
        );

        let svc_a = &insights.components[0];
        assert_eq!(svc_a.component, "svc-a");
        assert_eq!(svc_a.commit_count, 3);
        assert_eq!(svc_a.deploy_count, 2);
        assert!((svc_a.lead_time_days - 3.0).abs() < 1e-9);

        let svc_b = &insights.components[1];
        assert_eq!(svc_b.deploy_count, 0);
        assert!((svc_b.lead_time_days - 2.0).abs() < 1e-9);

        let svc_c = &insights.components[2];
        assert_eq!(svc_c.commit_count, 0);
        assert_eq!(svc_c.lead_time_days, 0.0);
    }

    #[tokio::test]
    async fn test_events_after_measurement_instant_are_dropped() {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();

        let commits = StubCommits {
            by_repository: HashMap::from([("service-a", vec![later, as_of - Duration::days(1)])]),
            windows_seen: Mutex::new(Vec::new()),
        };
        let deploys = StubDeploys {
            by_pipeline: HashMap::from([("svc-a", vec![later])]),
        };
        let mut components = IndexMap::new();
        components.insert("svc-a".to_string(), "service-a".to_string());

        let insights = DeliveryCollector::new(&commits, &deploys, FixedClock(as_of), &components, 30)
            .collect()
            .await;

        let svc_a = &insights.components[0];
        assert_eq!(svc_a.commit_count, 1);
        assert_eq!(svc_a.deploy_count, 0);
        assert!(svc_a.lead_time_days >= 0.0);
        assert!((svc_a.lead_time_days - 1.0).abs() < 1e-9);
    }
}
