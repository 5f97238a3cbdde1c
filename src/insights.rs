use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryInsights {
    pub collected_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_days: u32,
    pub total_components: usize,
    pub components: Vec<ComponentMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetrics {
    pub component: String,
    pub commit_count: usize,
    pub deploy_count: usize,
    pub lead_time_days: f64,
}

impl DeliveryInsights {
    #[allow(clippy::cast_precision_loss)]
    pub fn deploy_frequency(&self) -> IndexMap<String, f64> {
        self.components
            .iter()
            .map(|c| (c.component.clone(), c.deploy_count as f64))
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn commit_frequency(&self) -> IndexMap<String, f64> {
        self.components
            .iter()
            .map(|c| (c.component.clone(), c.commit_count as f64))
            .collect()
    }

    pub fn lead_times(&self) -> IndexMap<String, f64> {
        self.components
            .iter()
            .map(|c| (c.component.clone(), c.lead_time_days))
            .collect()
    }
}
