use eframe::egui::{self, ScrollArea, Ui};

use crate::color::ColumnColors;
use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct PlaygroundApp {
    pub state: AppState,
}

impl PlaygroundApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for PlaygroundApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: pipeline controls ----
        egui::SidePanel::left("pipeline_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: previews and plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            data_view(ui, &self.state);
        });
    }
}

fn data_view(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = state.pipeline.dataset() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV file to start  (File → Open…)");
        });
        return;
    };

    let colors = ColumnColors::new(dataset.columns());
    let max_rows = state.settings.preview_rows;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            table::preview_table(ui, "dataset", "Dataset", dataset, max_rows, &colors);
            ui.add_space(8.0);

            if let Some(split) = state.pipeline.split_result() {
                ui.columns(2, |cols| {
                    table::preview_table(
                        &mut cols[0],
                        "train",
                        "Train",
                        &split.train_preview,
                        max_rows,
                        &colors,
                    );
                    table::preview_table(
                        &mut cols[1],
                        "test",
                        "Test",
                        &split.test_preview,
                        max_rows,
                        &colors,
                    );
                });
                ui.add_space(8.0);
            }

            plot::column_plot(ui, dataset, &colors);
        });
}
