use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use rusty_playground::model_config::{ModelFamily, ParamKind};
use rusty_playground::pipeline::{NormalizationMethod, Stage};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – pipeline controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let ctx = ui.ctx().clone();
    let stage = state.pipeline.stage();

    ui.heading("Pipeline");
    ui.label(format!("Stage: {stage:?}"));
    ui.separator();

    if stage == Stage::Empty {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.add_enabled_ui(!state.is_busy(), |ui: &mut Ui| {
                feature_section(ui, &ctx, state);
                ui.separator();
                normalize_section(ui, &ctx, state);
                ui.separator();
                split_section(ui, &ctx, state);
                ui.separator();
                model_section(ui, &ctx, state);
            });
        });
}

fn feature_section(ui: &mut Ui, ctx: &egui::Context, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("Features").strong())
        .id_salt("features")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            for (name, checked) in &mut state.draft_columns {
                ui.checkbox(checked, name.as_str());
            }

            let label_text = state.draft_label.clone().unwrap_or_default();
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Label");
                egui::ComboBox::from_id_salt("label_column")
                    .selected_text(&label_text)
                    .show_ui(ui, |ui: &mut Ui| {
                        for (name, _) in &state.draft_columns {
                            if ui.selectable_label(label_text == *name, name).clicked() {
                                state.draft_label = Some(name.clone());
                            }
                        }
                    });
            });

            if ui.button("Apply Feature Selection").clicked() {
                state.apply_feature_selection(ctx);
            }
        });
}

fn normalize_section(ui: &mut Ui, ctx: &egui::Context, state: &mut AppState) {
    ui.strong("Normalization");
    let current = state.pipeline.normalization_method();
    egui::ComboBox::from_id_salt("normalization")
        .selected_text(current.label())
        .show_ui(ui, |ui: &mut Ui| {
            for method in NormalizationMethod::ALL {
                if ui.selectable_label(current == method, method.label()).clicked() {
                    state.set_normalization_method(method);
                }
            }
        });
    ui.checkbox(&mut state.normalize_features_only, "Skip label column");
    if ui.button("Normalize").clicked() {
        state.normalize(ctx);
    }
}

fn split_section(ui: &mut Ui, ctx: &egui::Context, state: &mut AppState) {
    ui.strong("Train / test split");
    let mut test_size = state.pipeline.test_size();
    if ui
        .add(egui::Slider::new(&mut test_size, 0.05..=0.95).text("test size"))
        .changed()
    {
        state.set_test_size(test_size);
    }
    if ui.button("Split").clicked() {
        state.split(ctx);
    }
    if let Some(split) = state.pipeline.split_result() {
        ui.label(format!(
            "{} train / {} test rows, label '{}'",
            split.train_len(),
            split.test_len(),
            split.label_column
        ));
    }
}

fn model_section(ui: &mut Ui, ctx: &egui::Context, state: &mut AppState) {
    ui.strong("Model");
    let config = state.pipeline.model_config().clone();

    egui::ComboBox::from_id_salt("model_family")
        .selected_text(config.family().label())
        .show_ui(ui, |ui: &mut Ui| {
            for family in ModelFamily::ALL {
                if ui
                    .selectable_label(config.family() == family, family.label())
                    .clicked()
                {
                    state.set_model_family(family);
                }
            }
        });

    egui::ComboBox::from_id_salt("model_name")
        .selected_text(config.model().label())
        .show_ui(ui, |ui: &mut Ui| {
            for &model in config.family().models() {
                if ui
                    .selectable_label(config.model() == model, model.label())
                    .clicked()
                {
                    state.set_model_name(model);
                }
            }
        });

    for spec in config.model().params() {
        let mut value = config
            .hyperparameters()
            .get(spec.name)
            .map(|v| v.as_f64())
            .unwrap_or(spec.default);
        ui.horizontal(|ui: &mut Ui| {
            ui.label(spec.name);
            let drag = egui::DragValue::new(&mut value).range(spec.min..=spec.max);
            let drag = match spec.kind {
                ParamKind::Integer => drag.speed(1.0).fixed_decimals(0),
                ParamKind::Float => drag.speed(0.01),
            };
            if ui.add(drag).changed() {
                state.set_hyperparameter(spec.name, value);
            }
        });
    }

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Train").clicked() {
            state.train(ctx);
        }
        if ui.button("Evaluate").clicked() {
            state.evaluate(ctx);
        }
    });

    if state.pipeline.is_trained() {
        ui.label("Model trained.");
    }
    if let Some(score) = state.pipeline.score() {
        ui.label(RichText::new(format!("Score: {score:.4}")).strong());
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    let ctx = ui.ctx().clone();
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(&ctx, state);
                ui.close_menu();
            }
            if ui.button("New session").clicked() {
                state.new_session();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Export dataset…").clicked() {
                export_dialog(state, None);
                ui.close_menu();
            }
            let has_split = state.pipeline.split_result().is_some();
            if ui
                .add_enabled(has_split, egui::Button::new("Export train split…"))
                .clicked()
            {
                export_dialog(state, Some("train"));
                ui.close_menu();
            }
            if ui
                .add_enabled(has_split, egui::Button::new("Export test split…"))
                .clicked()
            {
                export_dialog(state, Some("test"));
                ui.close_menu();
            }
        });

        ui.menu_button("Config", |ui: &mut Ui| {
            if ui.button("Save to service").clicked() {
                state.save_config_remote(&ctx);
                ui.close_menu();
            }
            if ui.button("Load from service").clicked() {
                state.load_config_remote(&ctx);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Save to file…").clicked() {
                if let Some(path) = config_dialog().save_file() {
                    state.save_config_file(&path);
                }
                ui.close_menu();
            }
            if ui.button("Load from file…").clicked() {
                if let Some(path) = config_dialog().pick_file() {
                    state.load_config_file(&path);
                }
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = state.pipeline.dataset() {
            let (rows, cols) = ds.shape();
            ui.label(format!("{rows} rows × {cols} columns"));
            ui.separator();
        }

        if state.is_busy() {
            ui.spinner();
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if let Some(msg) = &state.info_message {
            ui.label(msg);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
            ui.weak(state.service_url());
        });
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(ctx: &egui::Context, state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter("CSV", &["csv", "txt"])
        .pick_file();

    if let Some(path) = file {
        log::info!("uploading {}", path.display());
        state.upload(ctx, &path);
    }
}

fn export_dialog(state: &mut AppState, partition: Option<&str>) {
    let name = match partition {
        Some(p) => format!("{p}.csv"),
        None => "dataset.csv".to_string(),
    };
    let file = rfd::FileDialog::new()
        .set_title("Export CSV")
        .add_filter("CSV", &["csv"])
        .set_file_name(name)
        .save_file();

    if let Some(path) = file {
        state.export_csv(&path, partition);
    }
}

fn config_dialog() -> rfd::FileDialog {
    rfd::FileDialog::new()
        .set_title("Session config")
        .add_filter("JSON", &["json"])
        .set_file_name("config.json")
}
