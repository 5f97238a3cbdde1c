mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_insights;
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the `LeadLens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚀 LeadLens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Delivery Metrics Tool")
    );
}
