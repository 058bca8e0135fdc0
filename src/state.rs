use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui;

use rusty_playground::data::loader::{self, UploadFile};
use rusty_playground::model_config::{ModelFamily, ModelName};
use rusty_playground::pipeline::{
    NormalizationMethod, PipelineError, PipelineState, Ticket, Transition,
};
use rusty_playground::service::{HttpService, ProcessingService};
use rusty_playground::settings::Settings;
use rusty_playground::snapshot::{self, ConfigBlob};

use crate::worker::{Outcome, Worker};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// The session; changed only through transitions and its setters.
    pub pipeline: PipelineState,

    pub settings: Settings,

    /// Checkbox state per dataset column, in dataset order. Not applied
    /// until "Apply Feature Selection".
    pub draft_columns: Vec<(String, bool)>,

    /// Which drafted column becomes the label (sent last).
    pub draft_label: Option<String>,

    /// Leave the label column out when normalizing.
    pub normalize_features_only: bool,

    /// Error message shown in the UI.
    pub status_message: Option<String>,

    /// Last successful action, shown when there is no error.
    pub info_message: Option<String>,

    /// Session replaced by an upload still in flight; put back if it fails.
    previous_session: Option<PipelineState>,

    worker: Worker,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let service = HttpService::new(&settings).context("Failed to build service client")?;
        log::info!("processing service at {}", service.base_url());
        Ok(Self {
            pipeline: PipelineState::new(),
            settings,
            draft_columns: Vec::new(),
            draft_label: None,
            normalize_features_only: true,
            status_message: None,
            info_message: None,
            previous_session: None,
            worker: Worker::new(service),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn service_url(&self) -> &str {
        self.worker.service_url()
    }

    // ---- Completion ----

    /// Apply every finished call. Stale answers are dropped silently.
    pub fn poll(&mut self) {
        for outcome in self.worker.poll() {
            self.handle(outcome);
        }
    }

    fn handle(&mut self, outcome: Outcome) {
        let transition = outcome.transition();
        match outcome.apply(&mut self.pipeline) {
            Ok(applied) => {
                if applied == Transition::Upload {
                    self.previous_session = None;
                }
                self.on_applied(applied);
            }
            Err(e) if e.is_stale() => {}
            Err(e) => {
                if transition == Transition::Upload {
                    if let Some(previous) = self.previous_session.take() {
                        log::info!("upload failed, restoring the previous session");
                        self.pipeline.reinstate(previous);
                        self.sync_draft();
                    }
                }
                self.report(e);
            }
        }
    }

    fn on_applied(&mut self, transition: Transition) {
        self.status_message = None;
        if matches!(
            transition,
            Transition::Upload | Transition::SelectFeatures | Transition::LoadConfig
        ) {
            self.sync_draft();
        }
        self.info_message = Some(match (transition, self.pipeline.score()) {
            (Transition::Evaluate, Some(score)) => format!("Model score: {score:.4}"),
            (Transition::SaveConfig, _) => "Configuration saved".to_string(),
            (Transition::LoadConfig, _) => "Configuration loaded".to_string(),
            (t, _) => format!("{t} done"),
        });
    }

    fn report(&mut self, err: PipelineError) {
        log::error!("{:?}: {err}", err.kind());
        self.info_message = None;
        self.status_message = Some(format!("Error: {err}"));
    }

    fn report_anyhow(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.info_message = None;
        self.status_message = Some(format!("Error: {err:#}"));
    }

    /// Rebuild the checkboxes from the applied selection.
    fn sync_draft(&mut self) {
        let selected = self.pipeline.selected_columns();
        self.draft_columns = self
            .pipeline
            .dataset()
            .map(|ds| {
                ds.columns()
                    .iter()
                    .map(|c| (c.clone(), selected.contains(c)))
                    .collect()
            })
            .unwrap_or_default();
        self.draft_label = self.pipeline.label_column().map(str::to_string);
    }

    /// Checked columns in dataset order, label moved to the end.
    pub fn draft_selection(&self) -> Vec<String> {
        let label = self.draft_label.as_deref();
        let mut columns: Vec<String> = self
            .draft_columns
            .iter()
            .filter(|(name, checked)| *checked && Some(name.as_str()) != label)
            .map(|(name, _)| name.clone())
            .collect();
        if let Some(label) = label {
            if self.draft_columns.iter().any(|(n, c)| *c && n == label) {
                columns.push(label.to_string());
            }
        }
        columns
    }

    // ---- Transitions ----

    /// Upload a file, starting a new session if one is loaded. The replaced
    /// session comes back if the upload fails.
    pub fn upload(&mut self, ctx: &egui::Context, path: &Path) {
        let file = match loader::read_upload(path) {
            Ok(file) => file,
            Err(e) => return self.report_anyhow(e),
        };
        if let Some(ticket) = self.prepare_upload(&file) {
            self.worker.spawn(ctx, Transition::Upload, move |svc| {
                Outcome::Upload(ticket, svc.upload(&file))
            });
        }
    }

    fn prepare_upload(&mut self, file: &UploadFile) -> Option<Ticket> {
        let previous = self
            .pipeline
            .dataset()
            .is_some()
            .then(|| self.pipeline.clone());
        if previous.is_some() {
            self.new_session();
        }
        match self.pipeline.begin_upload(file) {
            Ok(ticket) => {
                if previous.is_some() {
                    self.previous_session = previous;
                }
                Some(ticket)
            }
            Err(e) => {
                if let Some(previous) = previous {
                    self.pipeline.reinstate(previous);
                    self.sync_draft();
                }
                self.report(e);
                None
            }
        }
    }

    pub fn apply_feature_selection(&mut self, ctx: &egui::Context) {
        let columns = self.draft_selection();
        match self.pipeline.begin_select_features(&columns) {
            Ok((ticket, req)) => {
                self.worker.spawn(ctx, Transition::SelectFeatures, move |svc| {
                    Outcome::SelectFeatures(ticket, svc.select_features(&req))
                })
            }
            Err(e) => self.report(e),
        }
    }

    pub fn normalize(&mut self, ctx: &egui::Context) {
        let columns = if self.normalize_features_only {
            self.pipeline.feature_columns().to_vec()
        } else {
            self.pipeline.selected_columns().to_vec()
        };
        match self.pipeline.begin_normalize(&columns) {
            Ok((ticket, req)) => self
                .worker
                .spawn(ctx, Transition::Normalize, move |svc| {
                    Outcome::Normalize(ticket, svc.normalize(&req))
                }),
            Err(e) => self.report(e),
        }
    }

    pub fn split(&mut self, ctx: &egui::Context) {
        match self.pipeline.begin_split() {
            Ok((ticket, req)) => self
                .worker
                .spawn(ctx, Transition::Split, move |svc| {
                    Outcome::Split(ticket, svc.split(&req))
                }),
            Err(e) => self.report(e),
        }
    }

    pub fn train(&mut self, ctx: &egui::Context) {
        match self.pipeline.begin_train() {
            Ok((ticket, req)) => self
                .worker
                .spawn(ctx, Transition::Train, move |svc| {
                    Outcome::Train(ticket, svc.train(&req))
                }),
            Err(e) => self.report(e),
        }
    }

    pub fn evaluate(&mut self, ctx: &egui::Context) {
        match self.pipeline.begin_evaluate() {
            Ok((ticket, req)) => self
                .worker
                .spawn(ctx, Transition::Evaluate, move |svc| {
                    Outcome::Evaluate(ticket, svc.evaluate(&req))
                }),
            Err(e) => self.report(e),
        }
    }

    pub fn save_config_remote(&mut self, ctx: &egui::Context) {
        match ConfigBlob::capture(&self.pipeline) {
            Ok(blob) => self
                .worker
                .spawn(ctx, Transition::SaveConfig, move |svc| {
                    Outcome::SaveConfig(svc.save_config(&blob))
                }),
            Err(e) => self.report(e),
        }
    }

    pub fn load_config_remote(&mut self, ctx: &egui::Context) {
        let ticket = self.pipeline.begin_load_config();
        self.worker.spawn(ctx, Transition::LoadConfig, move |svc| {
            Outcome::LoadConfig(ticket, svc.load_config())
        });
    }

    // ---- Local edits ----

    pub fn set_normalization_method(&mut self, method: NormalizationMethod) {
        self.pipeline.set_normalization_method(method);
    }

    pub fn set_test_size(&mut self, test_size: f64) {
        if let Err(e) = self.pipeline.set_test_size(test_size) {
            self.report(e);
        }
    }

    pub fn set_model_family(&mut self, family: ModelFamily) {
        self.pipeline.set_model_family(family);
    }

    pub fn set_model_name(&mut self, model: ModelName) {
        self.pipeline.set_model_name(model);
    }

    pub fn set_hyperparameter(&mut self, name: &str, value: f64) {
        if let Err(e) = self.pipeline.set_hyperparameter(name, value) {
            self.report(e);
        }
    }

    pub fn new_session(&mut self) {
        self.pipeline.reset();
        self.previous_session = None;
        self.draft_columns.clear();
        self.draft_label = None;
        self.status_message = None;
        self.info_message = None;
    }

    // ---- Files ----

    pub fn save_config_file(&mut self, path: &Path) {
        let result = ConfigBlob::capture(&self.pipeline)
            .map_err(anyhow::Error::from)
            .and_then(|blob| snapshot::save_to_file(&blob, path));
        match result {
            Ok(()) => self.info_message = Some(format!("Saved {}", path.display())),
            Err(e) => self.report_anyhow(e),
        }
    }

    pub fn load_config_file(&mut self, path: &Path) {
        let blob = match snapshot::load_from_file(path) {
            Ok(blob) => blob,
            Err(e) => return self.report_anyhow(e),
        };
        match self.pipeline.restore_snapshot(blob) {
            Ok(()) => {
                self.sync_draft();
                self.status_message = None;
                self.info_message = Some(format!("Loaded {}", path.display()));
            }
            Err(e) => self.report(e),
        }
    }

    /// Export the current dataset, or a split partition when `partition` names one.
    pub fn export_csv(&mut self, path: &Path, partition: Option<&str>) {
        let dataset = match (partition, self.pipeline.split_result()) {
            (Some("train"), Some(split)) => Some(&split.train_preview),
            (Some("test"), Some(split)) => Some(&split.test_preview),
            _ => self.pipeline.dataset(),
        };
        let Some(dataset) = dataset else {
            self.status_message = Some("Nothing to export".to_string());
            return;
        };
        match loader::write_csv(dataset, path) {
            Ok(()) => {
                log::info!("exported {} rows to {}", dataset.len(), path.display());
                self.info_message = Some(format!("Exported {}", path.display()));
            }
            Err(e) => self.report_anyhow(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_playground::pipeline::Stage;
    use rusty_playground::service::{ServiceError, TableResponse};
    use serde_json::json;

    use super::*;

    fn state_with_draft(draft: &[(&str, bool)], label: Option<&str>) -> AppState {
        let mut state = AppState::new(Settings::default()).unwrap();
        state.draft_columns = draft.iter().map(|(n, c)| (n.to_string(), *c)).collect();
        state.draft_label = label.map(str::to_string);
        state
    }

    #[test]
    fn draft_selection_moves_label_last() {
        let state = state_with_draft(
            &[("label", true), ("age", true), ("zip", false), ("income", true)],
            Some("label"),
        );
        assert_eq!(state.draft_selection(), vec!["age", "income", "label"]);
    }

    #[test]
    fn unchecked_label_is_left_out() {
        let state = state_with_draft(&[("age", true), ("label", false)], Some("label"));
        assert_eq!(state.draft_selection(), vec!["age"]);
    }

    fn record(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    fn csv(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            bytes: b"a,b\n1,2\n".to_vec(),
        }
    }

    fn loaded_state() -> AppState {
        let mut state = AppState::new(Settings::default()).unwrap();
        let ticket = state.prepare_upload(&csv("first.csv")).unwrap();
        let table = TableResponse {
            columns: vec!["a".to_string(), "b".to_string()],
            data: vec![record(json!({"a": 1, "b": 2})), record(json!({"a": 3, "b": 4}))],
            shape: None,
        };
        state.handle(Outcome::Upload(ticket, Ok(table)));
        assert_eq!(state.pipeline.stage(), Stage::Uploaded);
        state
    }

    #[test]
    fn failed_upload_restores_previous_session() {
        let mut state = loaded_state();
        let before = state.pipeline.dataset().cloned();

        let ticket = state.prepare_upload(&csv("second.csv")).unwrap();
        assert!(state.pipeline.dataset().is_none());

        let err = ServiceError::Status {
            status: 400,
            message: "bad file".to_string(),
        };
        state.handle(Outcome::Upload(ticket, Err(err)));

        assert_eq!(state.pipeline.stage(), Stage::Uploaded);
        assert_eq!(state.pipeline.dataset().cloned(), before);
        assert_eq!(state.draft_columns.len(), 2);
        assert!(state.status_message.is_some());
    }

    #[test]
    fn crashed_upload_restores_previous_session() {
        let mut state = loaded_state();
        let before = state.pipeline.dataset().cloned();

        state.prepare_upload(&csv("second.csv")).unwrap();
        state.handle(Outcome::Crashed(Transition::Upload));

        assert_eq!(state.pipeline.dataset().cloned(), before);
        assert!(state.status_message.is_some());
    }

    #[test]
    fn successful_upload_drops_previous_session() {
        let mut state = loaded_state();
        let ticket = state.prepare_upload(&csv("second.csv")).unwrap();
        let table = TableResponse {
            columns: vec!["x".to_string()],
            data: vec![record(json!({"x": 7}))],
            shape: None,
        };
        state.handle(Outcome::Upload(ticket, Ok(table)));

        assert_eq!(state.pipeline.dataset().unwrap().columns(), ["x".to_string()]);
        assert!(state.previous_session.is_none());
    }
}
