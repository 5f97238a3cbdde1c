use indexmap::IndexMap;

use super::ComponentEvents;

/// Number of events recorded per component.
///
/// Plain cardinality: duplicate timestamps count twice and nothing is
/// bucketed by time.
pub fn count_events(events: &ComponentEvents) -> IndexMap<String, usize> {
    events
        .iter()
        .map(|(component, timeline)| (component.clone(), timeline.len()))
        .collect()
}
