use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Dataset;
use crate::model_config::ModelConfig;
use crate::pipeline::{
    NormalizationMethod, PipelineError, PipelineState, Transition, ValidationError,
};
use crate::service::Records;

// ---------------------------------------------------------------------------
// ConfigBlob – what a saved session contains
// ---------------------------------------------------------------------------

/// Resumable part of a session: data, selection and configuration.
///
/// Split arrays, the trained flag and the score are derived and not
/// stored; a restored session has to split, train and evaluate again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBlob {
    pub columns: Vec<String>,
    pub data: Records,
    pub selected_columns: Vec<String>,
    pub normalization_method: NormalizationMethod,
    #[serde(default)]
    pub model: ModelConfig,
}

impl ConfigBlob {
    /// Capture the resumable part of `state`.
    pub fn capture(state: &PipelineState) -> Result<Self, PipelineError> {
        let Some(dataset) = state.dataset() else {
            return Err(ValidationError::NotReady {
                transition: Transition::SaveConfig,
                needs: "an uploaded dataset",
                stage: state.stage(),
            }
            .into());
        };
        Ok(Self {
            columns: dataset.columns().to_vec(),
            data: dataset.to_records(),
            selected_columns: state.selected_columns().to_vec(),
            normalization_method: state.normalization_method(),
            model: state.model_config().clone(),
        })
    }

    /// Rebuild a session at the FeaturesSelected stage.
    pub fn restore(self) -> Result<PipelineState, PipelineError> {
        let invalid = |msg: String| PipelineError::from(ValidationError::InvalidSnapshot(msg));

        let dataset = Dataset::from_records(self.columns, &self.data)
            .map_err(|e| invalid(e.to_string()))?;
        if self.selected_columns.is_empty() {
            return Err(invalid("no selected columns".into()));
        }
        dataset
            .column_indices(&self.selected_columns)
            .map_err(|e| invalid(e.to_string()))?;

        let state = PipelineState {
            dataset: Some(dataset),
            selected_columns: self.selected_columns,
            features_applied: true,
            normalization: self.normalization_method,
            model: self.model,
            ..PipelineState::default()
        };
        state.check_invariants().map_err(invalid)?;
        Ok(state)
    }
}

impl PipelineState {
    /// Replace the whole state with a restored snapshot. The version keeps
    /// counting up so responses to earlier requests are discarded.
    pub fn restore_snapshot(&mut self, blob: ConfigBlob) -> Result<(), PipelineError> {
        let mut restored = blob.restore()?;
        restored.test_size = self.test_size;
        restored.version = self.version;
        *self = restored;
        self.bump();
        log::info!(
            "restored session: {} columns selected, stage {:?}",
            self.selected_columns().len(),
            self.stage()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// Write a blob as pretty-printed JSON.
pub fn save_to_file(blob: &ConfigBlob, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(blob).context("serializing config")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<ConfigBlob> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;
    use crate::model_config::ModelName;
    use crate::pipeline::{ErrorKind, Stage};
    use serde_json::json;

    fn session() -> PipelineState {
        let ds = Dataset::from_rows(
            vec!["age".into(), "income".into(), "label".into()],
            vec![
                vec![CellValue::Float(0.25), CellValue::Float(0.5), "yes".into()],
                vec![CellValue::Float(0.75), CellValue::Null, "no".into()],
            ],
        )
        .unwrap();
        let mut state = PipelineState {
            selected_columns: vec!["income".into(), "label".into()],
            dataset: Some(ds),
            features_applied: true,
            ..PipelineState::default()
        };
        state.set_normalization_method(NormalizationMethod::Standard);
        state.set_model_name(ModelName::RandomForestClassifier);
        state.set_hyperparameter("max_depth", 8.0).unwrap();
        state
    }

    #[test]
    fn capture_requires_a_dataset() {
        let err = ConfigBlob::capture(&PipelineState::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn round_trip_reproduces_configuration() {
        let state = session();
        let restored = ConfigBlob::capture(&state).unwrap().restore().unwrap();

        assert_eq!(restored.dataset(), state.dataset());
        assert_eq!(restored.selected_columns(), state.selected_columns());
        assert_eq!(restored.normalization_method(), NormalizationMethod::Standard);
        assert_eq!(restored.model_config(), state.model_config());
        assert_eq!(restored.stage(), Stage::FeaturesSelected);
        assert!(!restored.is_trained());
        assert_eq!(restored.score(), None);
    }

    #[test]
    fn blob_uses_camel_case_keys() {
        let value = serde_json::to_value(ConfigBlob::capture(&session()).unwrap()).unwrap();
        assert_eq!(value["selectedColumns"], json!(["income", "label"]));
        assert_eq!(value["normalizationMethod"], json!("standard"));
        assert_eq!(value["data"][1]["income"], json!(null));
        assert_eq!(value["model"]["hyperparameters"]["max_depth"], json!(8));
    }

    #[test]
    fn restore_rejects_selection_outside_columns() {
        let mut blob = ConfigBlob::capture(&session()).unwrap();
        blob.selected_columns.push("zip".into());
        assert!(blob.restore().is_err());
    }

    #[test]
    fn restore_snapshot_bumps_version() {
        let blob = ConfigBlob::capture(&session()).unwrap();
        let mut state = PipelineState::new();
        state.set_test_size(0.4).unwrap();
        let before = state.version();

        state.restore_snapshot(blob).unwrap();
        assert!(state.version() > before);
        assert_eq!(state.test_size(), 0.4);
        assert_eq!(state.stage(), Stage::FeaturesSelected);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let blob = ConfigBlob::capture(&session()).unwrap();

        save_to_file(&blob, &path).unwrap();
        assert_eq!(load_from_file(&path).unwrap(), blob);
    }

    #[test]
    fn older_blobs_without_model_get_defaults() {
        let blob: ConfigBlob = serde_json::from_value(json!({
            "columns": ["a", "b"],
            "data": [{"a": 1, "b": "x"}],
            "selectedColumns": ["a", "b"],
            "normalizationMethod": "minmax"
        }))
        .unwrap();
        assert_eq!(blob.model, ModelConfig::default());
    }
}
