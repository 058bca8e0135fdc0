use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::encoder::LabelEncoding;
use crate::data::model::{CellValue, Dataset};
use crate::model_config::{ModelConfig, ModelFamily, ModelName};

use super::error::{PipelineError, ValidationError};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Where the pipeline is. Derived from which pieces of state are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Empty,
    Uploaded,
    FeaturesSelected,
    Normalized,
    Split,
    Trained,
    Evaluated,
}

// ---------------------------------------------------------------------------
// Normalization method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NormalizationMethod {
    /// (x - min) / (max - min)
    #[default]
    #[serde(rename = "minmax")]
    MinMax,
    /// (x - mean) / std
    #[serde(rename = "standard")]
    Standard,
}

impl NormalizationMethod {
    pub const ALL: [NormalizationMethod; 2] =
        [NormalizationMethod::MinMax, NormalizationMethod::Standard];

    pub fn label(self) -> &'static str {
        match self {
            NormalizationMethod::MinMax => "Min-Max Normalization",
            NormalizationMethod::Standard => "Standardization",
        }
    }
}

// ---------------------------------------------------------------------------
// Split result and training outcome
// ---------------------------------------------------------------------------

/// Parallel train/test arrays returned by the service.
///
/// The arrays are the data of record. `train_preview` / `test_preview` are
/// rebuilt from them for display and never fed back into training.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub feature_columns: Vec<String>,
    pub label_column: String,
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<CellValue>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<CellValue>,
    pub train_preview: Dataset,
    pub test_preview: Dataset,
}

impl SplitResult {
    pub fn train_len(&self) -> usize {
        self.x_train.len()
    }

    pub fn test_len(&self) -> usize {
        self.x_test.len()
    }
}

/// What Train left behind for Evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    /// Model configuration the service fitted.
    pub config: ModelConfig,
    /// Present iff the model is a classifier; reused verbatim for `y_test`.
    pub encoding: Option<LabelEncoding>,
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// The single source of truth for one session.
///
/// Mutated only through stage transitions and the setters below; every
/// mutation bumps `version` so responses issued against an older state can
/// be recognised and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub(crate) version: u64,
    pub(crate) dataset: Option<Dataset>,
    pub(crate) selected_columns: Vec<String>,
    pub(crate) features_applied: bool,
    pub(crate) normalization: NormalizationMethod,
    pub(crate) normalized: bool,
    pub(crate) test_size: f64,
    pub(crate) split: Option<SplitResult>,
    pub(crate) model: ModelConfig,
    pub(crate) trained: Option<TrainedModel>,
    pub(crate) score: Option<f64>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            version: 0,
            dataset: None,
            selected_columns: Vec::new(),
            features_applied: false,
            normalization: NormalizationMethod::default(),
            normalized: false,
            test_size: DEFAULT_TEST_SIZE,
            split: None,
            model: ModelConfig::default(),
            trained: None,
            score: None,
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Read access ----

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stage(&self) -> Stage {
        if self.dataset.is_none() {
            Stage::Empty
        } else if self.score.is_some() {
            Stage::Evaluated
        } else if self.trained.is_some() {
            Stage::Trained
        } else if self.split.is_some() {
            Stage::Split
        } else if self.normalized && self.features_applied {
            Stage::Normalized
        } else if self.features_applied {
            Stage::FeaturesSelected
        } else {
            Stage::Uploaded
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.selected_columns
    }

    /// The last selected column.
    pub fn label_column(&self) -> Option<&str> {
        self.selected_columns.last().map(String::as_str)
    }

    /// Selected columns minus the label, in selection order.
    pub fn feature_columns(&self) -> &[String] {
        match self.selected_columns.split_last() {
            Some((_, features)) => features,
            None => &[],
        }
    }

    pub fn normalization_method(&self) -> NormalizationMethod {
        self.normalization
    }

    pub fn test_size(&self) -> f64 {
        self.test_size
    }

    pub fn split_result(&self) -> Option<&SplitResult> {
        self.split.as_ref()
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model
    }

    pub fn trained_model(&self) -> Option<&TrainedModel> {
        self.trained.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    // ---- Local configuration edits ----

    pub fn set_normalization_method(&mut self, method: NormalizationMethod) {
        if method != self.normalization {
            self.normalization = method;
            self.bump();
        }
    }

    /// Store the test fraction used by the next Split; must lie in (0, 1).
    pub fn set_test_size(&mut self, test_size: f64) -> Result<(), PipelineError> {
        check_test_size(test_size)?;
        if test_size != self.test_size {
            self.test_size = test_size;
            self.bump();
        }
        Ok(())
    }

    /// Changing the model family drops any trained model.
    pub fn set_model_family(&mut self, family: ModelFamily) {
        if family != self.model.family() {
            self.model.set_family(family);
            self.invalidate_from(Stage::Trained);
            self.bump();
        }
    }

    /// Changing the model resets its hyperparameters and drops any trained model.
    pub fn set_model_name(&mut self, model: ModelName) {
        if model != self.model.model() {
            self.model.set_model(model);
            self.invalidate_from(Stage::Trained);
            self.bump();
        }
    }

    pub fn set_hyperparameter(&mut self, name: &str, value: f64) -> Result<(), PipelineError> {
        let mut next = self.model.clone();
        next.set_param(name, value)?;
        if next != self.model {
            self.model = next;
            self.invalidate_from(Stage::Trained);
            self.bump();
        }
        Ok(())
    }

    /// Start a new session. Configuration is kept; outstanding responses go stale.
    pub fn reset(&mut self) {
        let version = self.version;
        *self = PipelineState {
            version,
            normalization: self.normalization,
            test_size: self.test_size,
            model: self.model.clone(),
            ..PipelineState::default()
        };
        self.bump();
    }

    /// Put back a state captured earlier in this session. The version keeps
    /// counting up, so responses issued in between stay stale.
    pub fn reinstate(&mut self, previous: PipelineState) {
        let version = self.version.max(previous.version);
        *self = PipelineState {
            version,
            ..previous
        };
        self.bump();
    }

    // ---- Invariants ----

    /// Verify the cross-stage invariants.
    pub fn check_invariants(&self) -> Result<(), String> {
        let Some(dataset) = &self.dataset else {
            if self.split.is_some() || self.trained.is_some() || self.score.is_some() {
                return Err("derived state present without a dataset".into());
            }
            return Ok(());
        };

        let mut seen = HashSet::new();
        for col in &self.selected_columns {
            if !seen.insert(col) {
                return Err(format!("column '{col}' selected twice"));
            }
            if dataset.column_index(col).is_none() {
                return Err(format!("selected column '{col}' is not in the dataset"));
            }
        }

        if let Some(split) = &self.split {
            if split.x_train.len() != split.y_train.len() || split.x_test.len() != split.y_test.len() {
                return Err("feature and label arrays differ in length".into());
            }
            if split.train_len() + split.test_len() != dataset.len() {
                return Err(format!(
                    "split covers {} rows, dataset has {}",
                    split.train_len() + split.test_len(),
                    dataset.len()
                ));
            }
        }
        if self.trained.is_some() && self.split.is_none() {
            return Err("trained without a split".into());
        }
        if self.score.is_some() && self.trained.is_none() {
            return Err("evaluated without a trained model".into());
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(format!("test size {} outside (0, 1)", self.test_size));
        }
        Ok(())
    }

    // ---- Internal helpers for transitions ----

    pub(crate) fn bump(&mut self) {
        self.version += 1;
        debug_assert!(
            self.check_invariants().is_ok(),
            "pipeline invariant broken: {:?}",
            self.check_invariants()
        );
    }

    /// Clear `stage` and everything downstream of it.
    pub(crate) fn invalidate_from(&mut self, stage: Stage) {
        if stage <= Stage::FeaturesSelected {
            self.features_applied = false;
        }
        if stage <= Stage::Normalized {
            self.normalized = false;
        }
        if stage <= Stage::Split {
            self.split = None;
        }
        if stage <= Stage::Trained {
            self.trained = None;
        }
        self.score = None;
    }
}

pub(crate) fn check_test_size(test_size: f64) -> Result<(), ValidationError> {
    if test_size > 0.0 && test_size < 1.0 {
        Ok(())
    } else {
        Err(ValidationError::TestSizeOutOfRange(test_size))
    }
}
