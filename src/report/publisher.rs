use std::path::{Path, PathBuf};

use log::{error, info, warn};

use super::{BlobStore, ChartRenderer, ChartSpec};

/// Outcome of a publishing pass.
#[derive(Debug, Default, PartialEq)]
pub struct PublishReport {
    /// Charts written to the output directory
    pub rendered: Vec<PathBuf>,
    /// Storage keys successfully uploaded
    pub uploaded: Vec<String>,
    /// Charts that failed to render or upload
    pub failed: Vec<String>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Renders charts into an output directory and hands each file to a blob
/// store.
///
/// Failures are per chart: a chart that cannot be rendered or uploaded is
/// logged and recorded, and the remaining charts are still processed.
pub struct ReportPublisher<R, S> {
    renderer: R,
    output_dir: PathBuf,
    store: Option<(S, String)>,
}

impl<R, S> ReportPublisher<R, S>
where
    R: ChartRenderer,
    S: BlobStore,
{
    /// Publisher that only renders; see [`Self::with_store`] to upload.
    pub fn new(renderer: R, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            output_dir: output_dir.into(),
            store: None,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: S, bucket: impl Into<String>) -> Self {
        self.store = Some((store, bucket.into()));
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn publish(&self, charts: &[ChartSpec]) -> PublishReport {
        let mut report = PublishReport::default();

        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            warn!(
                "Cannot create output directory {}: {e}",
                self.output_dir.display()
            );
        }

        for chart in charts {
            let path = self.output_dir.join(&chart.filename);

            if let Err(e) = self.renderer.render(chart, &path) {
                error!("Failed to render {}: {e}", chart.filename);
                report.failed.push(chart.filename.clone());
                continue;
            }
            report.rendered.push(path.clone());

            let Some((store, bucket)) = &self.store else {
                continue;
            };

            match store.upload(&path, bucket, &chart.filename).await {
                Ok(()) => report.uploaded.push(chart.filename.clone()),
                Err(e) => {
                    error!("{e}");
                    report.failed.push(chart.filename.clone());
                }
            }
        }

        info!(
            "Published {} of {} charts ({} failed)",
            report.uploaded.len(),
            charts.len(),
            report.failed.len()
        );

        report
    }
}
