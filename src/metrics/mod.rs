mod frequency;
mod lead_time;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::clock::Clock;
use crate::insights::ComponentMetrics;

pub use frequency::count_events;
pub use lead_time::calculate_lead_times;

/// Event timestamps keyed by component, in component configuration order.
pub type ComponentEvents = IndexMap<String, Vec<DateTime<Utc>>>;

/// Reduces the raw feeds of one run into per-component metrics.
///
/// Every component from either feed gets a record; a side missing from one
/// feed counts as empty.
pub fn summarize(
    commits: &ComponentEvents,
    deploys: &ComponentEvents,
    clock: &impl Clock,
) -> Vec<ComponentMetrics> {
    let commit_counts = count_events(commits);
    let deploy_counts = count_events(deploys);
    let lead_times = calculate_lead_times(commits, deploys, clock);

    let mut components: Vec<&String> = commits.keys().collect();
    components.extend(deploys.keys().filter(|key| !commits.contains_key(*key)));

    components
        .into_iter()
        .map(|component| ComponentMetrics {
            component: component.clone(),
            commit_count: commit_counts.get(component).copied().unwrap_or(0),
            deploy_count: deploy_counts.get(component).copied().unwrap_or(0),
            lead_time_days: lead_times.get(component).copied().unwrap_or(0.0),
        })
        .collect()
}
