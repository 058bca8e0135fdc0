use eframe::egui::Ui;
use egui_plot::{Line, Plot, PlotPoints};

use rusty_playground::data::model::{CellValue, Dataset};

use crate::color::ColumnColors;

// ---------------------------------------------------------------------------
// Column plot
// ---------------------------------------------------------------------------

/// One line per numeric column, row index on x. Text columns are skipped;
/// missing cells leave a gap.
pub fn column_plot(ui: &mut Ui, dataset: &Dataset, colors: &ColumnColors) {
    let series: Vec<(&String, Vec<Vec<[f64; 2]>>)> = dataset
        .columns()
        .iter()
        .filter_map(|name| {
            let values = dataset.column_values(name)?;
            numeric_segments(&values).map(|segments| (name, segments))
        })
        .collect();

    if series.is_empty() {
        ui.label("No numeric columns to plot.");
        return;
    }

    Plot::new("column_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Row")
        .y_axis_label("Value")
        .height(260.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (name, segments) in series {
                let color = colors.color_for(name);
                // Same name on every segment keeps one legend entry per column.
                for points in segments {
                    let line = Line::new(PlotPoints::from(points))
                        .name(name)
                        .color(color)
                        .width(1.5);
                    plot_ui.line(line);
                }
            }
        });
}

/// Split a column into runs of consecutive numeric cells. `None` when the
/// column holds text or has nothing to draw.
fn numeric_segments(values: &[CellValue]) -> Option<Vec<Vec<[f64; 2]>>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (i, value) in values.iter().enumerate() {
        if matches!(value, CellValue::Null) {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push([i as f64, value.as_f64()?]);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    (!segments.is_empty()).then_some(segments)
}
