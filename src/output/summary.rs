use std::fmt::Write;

use comfy_table::{Cell, CellAlignment, Color as TableColor};

use crate::insights::DeliveryInsights;
use crate::report::PublishReport;

use super::styling::{bright, bright_green, bright_red, bright_yellow, dim};
use super::tables::{color_coded_deploy_rate_cell, color_coded_lead_time_cell, create_table};

/// Prints a human-readable summary of the delivery metrics to stdout.
///
/// Displays an overview of the run followed by one row per component with
/// its commit count, deploy count, deploy rate and average lead time, and,
/// when charts were published, which uploads succeeded.
///
/// Color coding:
/// - Green: lead time ≤1 day, ≥5 deploys per week
/// - Yellow: lead time ≤7 days, ≥1 deploy per week
/// - Red: anything slower
pub fn print_summary(insights: &DeliveryInsights, publish: Option<&PublishReport>) {
    let mut output = render_summary(insights);
    if let Some(report) = publish {
        output.push_str(&render_publish_report(report));
    }
    println!("{output}");
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

/// Mean lead time across components that had commits in the window.
fn overall_lead_time(insights: &DeliveryInsights) -> Option<f64> {
    let with_commits: Vec<f64> = insights
        .components
        .iter()
        .filter(|c| c.commit_count > 0)
        .map(|c| c.lead_time_days)
        .collect();

    if with_commits.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = with_commits.iter().sum::<f64>() / with_commits.len() as f64;
    Some(mean)
}

fn render_summary(insights: &DeliveryInsights) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let total_commits: usize = insights.components.iter().map(|c| c.commit_count).sum();
    let total_deploys: usize = insights.components.iter().map(|c| c.deploy_count).sum();
    let lead_time_display = overall_lead_time(insights).map_or_else(
        || dim("N/A".to_string()),
        |days| {
            let text = format!("{days:.2} days");
            if days <= 1.0 {
                bright_green(text)
            } else if days <= 7.0 {
                bright_yellow(text)
            } else {
                bright_red(text)
            }
        },
    );

    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Window:"),
        bright_yellow(format!(
            "{} days since {}",
            insights.window_days,
            insights.window_start.format("%Y-%m-%d %H:%M UTC")
        )),
        dim("Components:"),
        bright_yellow(insights.total_components),
        dim("Commits:"),
        bright_yellow(total_commits),
        dim("Deploys:"),
        bright_yellow(total_deploys),
        dim("Average lead time:"),
        lead_time_display,
        dim("Analysis date:"),
        dim(insights.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if insights.components.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No components configured."));
        return output;
    }

    add_section_header(&mut output, "📦", "Components");

    let mut table = create_table();
    table.set_header(
        ["Component", "Commits", "Deploys", "Deploy Rate", "Lead Time"]
            .iter()
            .map(|label| Cell::new(*label).fg(TableColor::Cyan))
            .collect::<Vec<_>>(),
    );

    for component in &insights.components {
        let lead_time_cell = if component.commit_count == 0 {
            Cell::new("N/A").fg(TableColor::DarkGrey)
        } else {
            color_coded_lead_time_cell(component.lead_time_days)
        };

        table.add_row(vec![
            Cell::new(&component.component),
            Cell::new(component.commit_count).set_alignment(CellAlignment::Right),
            Cell::new(component.deploy_count).set_alignment(CellAlignment::Right),
            color_coded_deploy_rate_cell(component.deploy_count, insights.window_days),
            lead_time_cell,
        ]);
    }

    let _ = writeln!(output, "{table}\n");

    output
}

fn render_publish_report(report: &PublishReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📤", "Charts");

    for path in &report.rendered {
        let _ = writeln!(output, "  {} {}", dim("Rendered:"), path.display());
    }
    for key in &report.uploaded {
        let _ = writeln!(output, "  {} {}", bright_green("Uploaded:"), key);
    }
    for key in &report.failed {
        let _ = writeln!(output, "  {} {}", bright_red("Failed:"), key);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::ComponentMetrics;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn component(name: &str, commits: usize, deploys: usize, lead: f64) -> ComponentMetrics {
        ComponentMetrics {
            component: name.to_string(),
            commit_count: commits,
            deploy_count: deploys,
            lead_time_days: lead,
        }
    }

    fn insights(components: Vec<ComponentMetrics>) -> DeliveryInsights {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        DeliveryInsights {
            collected_at: now,
            window_start: Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap(),
            window_days: 30,
            total_components: components.len(),
            components,
        }
    }

    #[test]
    fn test_render_summary_without_components() {
        let output = render_summary(&insights(vec![]));

        assert!(output.contains("Components:"));
        assert!(output.contains("No components configured"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn test_render_summary_lists_components() {
        let output = render_summary(&insights(vec![
            component("svc-a", 3, 2, 3.0),
            component("svc-b", 0, 1, 0.0),
        ]));

        assert!(output.contains("30 days since 2024-05-31 12:00 UTC"));
        assert!(output.contains("svc-a"));
        assert!(output.contains("svc-b"));
        assert!(output.contains("3.00d"));
        // svc-b has no commits so it is left out of the overall average
        assert!(output.contains("3.00 days"));
    }

    #[test]
    fn test_render_summary_deploy_rate_per_week() {
        let output = render_summary(&insights(vec![component("api", 1, 30, 0.5)]));

        assert!(output.contains("7.0/wk"));
        assert!(output.contains("0.50d"));
    }

    #[test]
    fn test_render_publish_report() {
        let report = PublishReport {
            rendered: vec![PathBuf::from("out/freq.png")],
            uploaded: vec!["freq.png".to_string()],
            failed: vec!["lead.png".to_string()],
        };

        let output = render_publish_report(&report);

        assert!(output.contains("out/freq.png"));
        assert!(output.contains("freq.png"));
        assert!(output.contains("lead.png"));
    }
}
