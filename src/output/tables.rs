use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn color_coded_lead_time_cell(days: f64) -> Cell {
    let text = format!("{days:.2}d");
    if days <= 1.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if days <= 7.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

/// Deploys per week over the window.
pub fn color_coded_deploy_rate_cell(deploys: usize, window_days: u32) -> Cell {
    #[allow(clippy::cast_precision_loss)]
    let per_week = deploys as f64 * 7.0 / f64::from(window_days.max(1));
    let text = format!("{per_week:.1}/wk");
    if per_week >= 5.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if per_week >= 1.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}
