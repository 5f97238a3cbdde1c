use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::clock::{Clock, FixedClock, SystemClock};
use crate::collector::DeliveryCollector;
use crate::config::{Config, OutputFormat};
use crate::insights::DeliveryInsights;
use crate::output;
use crate::providers::{BuildkiteClient, GitHubClient};
use crate::report::{
    self, LocalDirStore, PngBarChart, PublishReport, ReportPublisher, S3Store, StorageBackend,
};

#[derive(Parser)]
#[command(name = "leadlens")]
#[command(author, version, about = "Delivery Metrics Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (searched as leadlens.{toml,json,yaml} when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON/CSV export to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch commits and deploys, compute the metrics and publish the charts
    Run {
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        #[arg(long, env = "BUILDKITE_TOKEN", hide_env_values = true)]
        buildkite_token: Option<String>,

        #[arg(short, long, env = "BUCKET_NAME")]
        bucket: Option<String>,

        /// Length of the trailing window in days
        #[arg(short, long)]
        days: Option<u32>,

        /// Measure as of this RFC 3339 instant instead of now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,

        /// Directory the charts are rendered into
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Copy charts into this directory instead of uploading them
        #[arg(long, conflicts_with = "no_upload")]
        publish_dir: Option<PathBuf>,

        /// Render the charts without uploading them
        #[arg(long, default_value_t = false)]
        no_upload: bool,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Write a starter configuration file
    Init {
        #[arg(default_value = "leadlens.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Where the rendered charts end up.
enum Destination {
    None,
    Local(PathBuf),
    Remote,
}

impl Cli {
    #[allow(clippy::too_many_arguments)]
    fn resolve_config(
        &self,
        github_token: Option<&str>,
        buildkite_token: Option<&str>,
        bucket: Option<&str>,
        days: Option<u32>,
        output_dir: Option<&Path>,
        format: Option<OutputFormat>,
    ) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(token) = github_token {
            config.github.token = Some(token.to_owned());
        }
        if let Some(token) = buildkite_token {
            config.buildkite.token = Some(token.to_owned());
        }
        if let Some(bucket) = bucket {
            config.storage.bucket = Some(bucket.to_owned());
        }
        if let Some(days) = days {
            config.window.days = days;
        }
        if let Some(dir) = output_dir {
            config.output.directory = dir.to_path_buf();
        }
        if let Some(format) = format {
            config.output.format = format;
        }
        config.output.pretty |= self.pretty;

        config.validate()?;

        Ok(config)
    }

    async fn storage_backend(config: &Config, destination: &Destination) -> Option<StorageBackend> {
        match destination {
            Destination::None => None,
            Destination::Local(dir) => Some(StorageBackend::Local(LocalDirStore::new(dir))),
            Destination::Remote => {
                let store = S3Store::from_env(
                    config.storage.region.as_deref(),
                    config.storage.endpoint.as_deref(),
                )
                .await;
                Some(StorageBackend::S3(store))
            }
        }
    }

    async fn publish_charts(
        config: &Config,
        insights: &DeliveryInsights,
        destination: &Destination,
    ) -> Result<PublishReport> {
        let charts = report::standard_charts(insights)?;
        let renderer = PngBarChart {
            font: config.output.font.clone(),
            ..PngBarChart::default()
        };
        let publisher = ReportPublisher::new(renderer, &config.output.directory);

        let publisher = match Self::storage_backend(config, destination).await {
            Some(store) => publisher.with_store(store, config.bucket()?),
            None => publisher,
        };

        info!(
            "Rendering {} charts into {}",
            charts.len(),
            publisher.output_dir().display()
        );

        let report = publisher.publish(&charts).await;
        if !report.is_complete() {
            warn!("Some charts were not published: {}", report.failed.join(", "));
        }

        Ok(report)
    }

    fn emit(&self, config: &Config, insights: &DeliveryInsights, report: &PublishReport) -> Result<()> {
        let format = match (config.output.format, &self.output) {
            (OutputFormat::Summary, Some(_)) => OutputFormat::Json,
            (format, _) => format,
        };

        if format == OutputFormat::Summary {
            output::print_summary(insights, Some(report));
            return Ok(());
        }

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            output::export_insights(insights, format, config.output.pretty, &mut file)?;
            info!("Insights written to: {}", output_path.display());
        } else {
            let mut stdout = std::io::stdout().lock();
            output::export_insights(insights, format, config.output.pretty, &mut stdout)?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_run(
        &self,
        github_token: Option<&str>,
        buildkite_token: Option<&str>,
        bucket: Option<&str>,
        days: Option<u32>,
        as_of: Option<DateTime<Utc>>,
        output_dir: Option<&Path>,
        publish_dir: Option<&Path>,
        no_upload: bool,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let config =
            self.resolve_config(github_token, buildkite_token, bucket, days, output_dir, format)?;

        let destination = match (no_upload, publish_dir) {
            (true, _) => Destination::None,
            (false, Some(dir)) => Destination::Local(dir.to_path_buf()),
            (false, None) => Destination::Remote,
        };

        // Everything a run needs is checked before the first request goes out
        let github_token = config.github_token()?;
        let buildkite_token = config.buildkite_token()?;
        if !matches!(destination, Destination::None) {
            config.bucket()?;
        }

        let github = GitHubClient::new(
            &config.github.base_url,
            config.github.org.clone().unwrap_or_default(),
            github_token,
        )?;
        let buildkite = BuildkiteClient::new(
            &config.buildkite.base_url,
            config.buildkite.org.clone().unwrap_or_default(),
            config.buildkite.branch.clone(),
            buildkite_token,
        )?;

        let insights = match as_of {
            Some(instant) => {
                info!("Measuring as of {instant}");
                Self::collect(&config, &github, &buildkite, FixedClock(instant)).await
            }
            None => Self::collect(&config, &github, &buildkite, SystemClock).await,
        };

        let report = Self::publish_charts(&config, &insights, &destination).await?;

        self.emit(&config, &insights, &report)
    }

    async fn collect(
        config: &Config,
        github: &GitHubClient,
        buildkite: &BuildkiteClient,
        clock: impl Clock,
    ) -> DeliveryInsights {
        DeliveryCollector::new(
            github,
            buildkite,
            clock,
            &config.components,
            config.window.days,
        )
        .collect()
        .await
    }

    fn execute_init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists; pass --force to overwrite it",
                path.display()
            );
        }

        Config::example().save(path)?;
        eprintln!("Wrote starter configuration to {}", path.display());

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Run {
                github_token,
                buildkite_token,
                bucket,
                days,
                as_of,
                output_dir,
                publish_dir,
                no_upload,
                format,
            } => {
                self.execute_run(
                    github_token.as_deref(),
                    buildkite_token.as_deref(),
                    bucket.as_deref(),
                    *days,
                    *as_of,
                    output_dir.as_deref(),
                    publish_dir.as_deref(),
                    *no_upload,
                    *format,
                )
                .await
            }
            Commands::Init { path, force } => Self::execute_init(path, *force),
        }
    }
}
