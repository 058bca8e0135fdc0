use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use rusty_playground::data::model::Dataset;

use crate::color::ColumnColors;

// ---------------------------------------------------------------------------
// Data preview tables
// ---------------------------------------------------------------------------

/// Show the first `max_rows` rows of `dataset` under a heading.
pub fn preview_table(
    ui: &mut Ui,
    id: &str,
    title: &str,
    dataset: &Dataset,
    max_rows: usize,
    colors: &ColumnColors,
) {
    let (rows, cols) = dataset.shape();
    ui.strong(format!("{title}  ({rows} × {cols})"));
    if cols == 0 {
        ui.label("No columns.");
        return;
    }

    let shown = &dataset.rows()[..rows.min(max_rows)];
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(70.0), cols)
            .max_scroll_height(220.0)
            .header(20.0, |mut header| {
                for name in dataset.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.label(RichText::new(name).strong().color(colors.color_for(name)));
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, shown.len(), |mut row| {
                    let cells = &shown[row.index()];
                    for cell in cells {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell.to_string());
                        });
                    }
                });
            });
    });
    if rows > max_rows {
        ui.weak(format!("showing {max_rows} of {rows} rows"));
    }
}
