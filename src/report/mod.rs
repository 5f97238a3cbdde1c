mod chart;
mod publisher;
mod storage;

use indexmap::IndexMap;

use crate::error::{LeadLensError, Result};
use crate::insights::DeliveryInsights;

pub use chart::{ChartRenderer, PngBarChart};
pub use publisher::{PublishReport, ReportPublisher};
pub use storage::{BlobStore, LocalDirStore, S3Store, StorageBackend};

/// One chart to draw and publish: a labeled series, its title and the file
/// name used both on disk and as the storage key.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub series: IndexMap<String, f64>,
    pub title: String,
    pub filename: String,
}

impl ChartSpec {
    /// # Errors
    ///
    /// Rejects file names that are empty or would escape the output
    /// directory, and series containing non-finite values.
    pub fn new(
        series: IndexMap<String, f64>,
        title: impl Into<String>,
        filename: impl Into<String>,
    ) -> Result<Self> {
        let filename = filename.into();

        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(LeadLensError::Render(format!(
                "invalid chart file name {filename:?}"
            )));
        }

        if let Some((label, value)) = series.iter().find(|(_, value)| !value.is_finite()) {
            return Err(LeadLensError::Render(format!(
                "{filename}: value {value} for {label} is not finite"
            )));
        }

        Ok(Self {
            series,
            title: title.into(),
            filename,
        })
    }
}

/// The deploy frequency, commit frequency and lead time charts of a run.
pub fn standard_charts(insights: &DeliveryInsights) -> Result<Vec<ChartSpec>> {
    Ok(vec![
        ChartSpec::new(insights.deploy_frequency(), "Deploy Frequency", "freq.png")?,
        ChartSpec::new(insights.commit_frequency(), "Commit Frequency", "commit.png")?,
        ChartSpec::new(insights.lead_times(), "Average Lead Time (days)", "lead.png")?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::ComponentMetrics;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_chart_spec_rejects_path_traversal() {
        assert!(ChartSpec::new(IndexMap::new(), "t", "../lead.png").is_err());
        assert!(ChartSpec::new(IndexMap::new(), "t", "charts/lead.png").is_err());
        assert!(ChartSpec::new(IndexMap::new(), "t", "").is_err());
    }

    #[test]
    fn test_chart_spec_rejects_non_finite_values() {
        let mut series = IndexMap::new();
        series.insert("api".to_string(), f64::NAN);

        let err = ChartSpec::new(series, "Lead", "lead.png").unwrap_err();
        assert!(err.to_string().contains("api"));
    }

    #[test]
    fn test_standard_charts() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let insights = DeliveryInsights {
            collected_at: now,
            window_start: now,
            window_days: 30,
            total_components: 2,
            components: vec![
                ComponentMetrics {
                    component: "svc-b".to_string(),
                    commit_count: 4,
                    deploy_count: 1,
                    lead_time_days: 2.5,
                },
                ComponentMetrics {
                    component: "svc-a".to_string(),
                    commit_count: 3,
                    deploy_count: 2,
                    lead_time_days: 0.0,
                },
            ],
        };

        let charts = standard_charts(&insights).unwrap();

        let files: Vec<&str> = charts.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(files, vec!["freq.png", "commit.png", "lead.png"]);
        assert_eq!(charts[0].title, "Deploy Frequency");
        assert_eq!(charts[0].series["svc-a"], 2.0);
        assert_eq!(charts[1].series["svc-b"], 4.0);
        assert_eq!(charts[2].series["svc-b"], 2.5);
        let order: Vec<&str> = charts[2].series.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["svc-b", "svc-a"]);
    }
}
