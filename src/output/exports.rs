use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::insights::DeliveryInsights;

/// Exports delivery insights in a machine-readable format.
///
/// - CSV: one row per component for spreadsheets
/// - JSON: the full insights document
///
/// The summary format is rendered by [`super::print_summary`] instead.
pub fn export_insights(
    insights: &DeliveryInsights,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            anyhow::bail!("Summary format is printed to the terminal and cannot be exported")
        }
        OutputFormat::Json => export_json(insights, pretty, output),
        OutputFormat::Csv => export_csv(insights, output),
    }
}

fn export_json(insights: &DeliveryInsights, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(insights)?
    } else {
        serde_json::to_string(insights)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn export_csv(insights: &DeliveryInsights, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "Component,Commits,Deploys,Lead Time (days)")?;

    for component in &insights.components {
        writeln!(
            output,
            "\"{}\",{},{},{:.4}",
            component.component.replace('"', "\"\""),
            component.commit_count,
            component.deploy_count,
            component.lead_time_days
        )?;
    }

    Ok(())
}
