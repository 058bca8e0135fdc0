//! Stage transitions.
//!
//! Each transition is split in two halves so the remote call can run
//! anywhere in between:
//!
//! * `begin_*` checks preconditions against the current state and builds the
//!   request plus a [`Ticket`] stamped with the state version. Nothing is
//!   mutated.
//! * `complete_*` takes the ticket and the service's answer. A ticket whose
//!   version no longer matches is rejected as stale. Otherwise the answer is
//!   validated in full before the new state is written, so a failure leaves
//!   the state exactly as it was.

use std::fmt;

use crate::data::encoder::LabelEncoding;
use crate::data::loader::UploadFile;
use crate::data::model::{CellValue, Dataset, DatasetError};
use crate::model_config::ModelFamily;
use crate::service::{
    EvaluateRequest, EvaluateResponse, Labels, NormalizeRequest, SelectFeaturesRequest,
    ServiceError, SplitRequest, SplitResponse, TableResponse, TrainRequest, TrainResponse,
};
use crate::snapshot::ConfigBlob;

use super::error::{PipelineError, ValidationError};
use super::state::{PipelineState, SplitResult, Stage, TrainedModel, check_test_size};

// ---------------------------------------------------------------------------
// Transition identity and tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Upload,
    SelectFeatures,
    Normalize,
    Split,
    Train,
    Evaluate,
    SaveConfig,
    LoadConfig,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::Upload => "upload",
            Transition::SelectFeatures => "feature selection",
            Transition::Normalize => "normalization",
            Transition::Split => "split",
            Transition::Train => "training",
            Transition::Evaluate => "evaluation",
            Transition::SaveConfig => "config save",
            Transition::LoadConfig => "config load",
        };
        f.write_str(name)
    }
}

/// Proof that a request was issued against a given state version, plus
/// whatever the completing half needs to remember.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket<C = ()> {
    transition: Transition,
    version: u64,
    context: C,
}

impl<C> Ticket<C> {
    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

impl PipelineState {
    fn ticket<C>(&self, transition: Transition, context: C) -> Ticket<C> {
        log::info!("issuing {transition} at version {}", self.version);
        Ticket {
            transition,
            version: self.version,
            context,
        }
    }

    /// Reject tickets for another transition or an older state.
    fn accept<C>(&self, ticket: &Ticket<C>, expected: Transition) -> Result<(), PipelineError> {
        if ticket.transition != expected {
            return Err(ValidationError::TicketMismatch {
                expected,
                got: ticket.transition,
            }
            .into());
        }
        if ticket.version != self.version {
            log::warn!(
                "dropping {expected} response for version {}, pipeline is at {}",
                ticket.version,
                self.version
            );
            return Err(PipelineError::Stale {
                transition: expected,
                issued: ticket.version,
                current: self.version,
            });
        }
        Ok(())
    }

    fn not_ready(&self, transition: Transition, needs: &'static str) -> PipelineError {
        let err = ValidationError::NotReady {
            transition,
            needs,
            stage: self.stage(),
        };
        log::debug!("rejected: {err}");
        err.into()
    }

    fn require_dataset(&self, transition: Transition) -> Result<&Dataset, PipelineError> {
        self.dataset
            .as_ref()
            .ok_or_else(|| self.not_ready(transition, "an uploaded dataset"))
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    pub fn begin_upload(&self, file: &UploadFile) -> Result<Ticket, PipelineError> {
        if self.dataset.is_some() {
            return Err(self.not_ready(Transition::Upload, "an empty pipeline"));
        }
        if file.bytes.is_empty() {
            return Err(self.not_ready(Transition::Upload, "a non-empty file"));
        }
        Ok(self.ticket(Transition::Upload, ()))
    }

    /// Install the parsed dataset; every column starts out selected.
    pub fn complete_upload(
        &mut self,
        ticket: Ticket,
        result: Result<TableResponse, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::Upload;
        self.accept(&ticket, T)?;
        let response = result.map_err(|e| PipelineError::service(T, e))?;
        let dataset = dataset_from_table(response, T)?;

        self.invalidate_from(Stage::FeaturesSelected);
        self.selected_columns = dataset.columns().to_vec();
        self.dataset = Some(dataset);
        self.bump();
        self.log_applied(T);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // SelectFeatures
    // -----------------------------------------------------------------------

    pub fn begin_select_features(
        &self,
        columns: &[String],
    ) -> Result<(Ticket<Vec<String>>, SelectFeaturesRequest), PipelineError> {
        let dataset = self.require_dataset(Transition::SelectFeatures)?;
        if columns.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        dataset.column_indices(columns)?;

        let request = SelectFeaturesRequest {
            columns: columns.to_vec(),
            data: dataset.to_records(),
        };
        Ok((self.ticket(Transition::SelectFeatures, columns.to_vec()), request))
    }

    /// Replace the selection and the projected dataset; everything
    /// downstream is cleared.
    pub fn complete_select_features(
        &mut self,
        ticket: Ticket<Vec<String>>,
        result: Result<TableResponse, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::SelectFeatures;
        self.accept(&ticket, T)?;
        let response = result.map_err(|e| PipelineError::service(T, e))?;
        let projected = dataset_from_table(response, T)?;

        let requested = ticket.context;
        if projected.columns() != requested.as_slice() {
            return Err(PipelineError::malformed(
                T,
                format!("asked for columns {requested:?}, got {:?}", projected.columns()),
            ));
        }
        self.check_row_count(&projected, T)?;

        self.invalidate_from(Stage::FeaturesSelected);
        self.dataset = Some(projected);
        self.selected_columns = requested;
        self.features_applied = true;
        self.bump();
        self.log_applied(T);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Normalize
    // -----------------------------------------------------------------------

    /// `columns` must be a subset of the selected columns; most callers pass
    /// `selected_columns()` or `feature_columns()`.
    pub fn begin_normalize(
        &self,
        columns: &[String],
    ) -> Result<(Ticket, NormalizeRequest), PipelineError> {
        let dataset = self.require_dataset(Transition::Normalize)?;
        if columns.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.selected_columns.contains(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::InvalidColumnSet { missing }.into());
        }
        dataset.column_indices(columns)?;

        let request = NormalizeRequest {
            columns: columns.to_vec(),
            data: dataset.to_records(),
            method: self.normalization,
        };
        Ok((self.ticket(Transition::Normalize, ()), request))
    }

    /// Swap in the normalized values. Columns and row count must not change.
    pub fn complete_normalize(
        &mut self,
        ticket: Ticket,
        result: Result<TableResponse, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::Normalize;
        self.accept(&ticket, T)?;
        let response = result.map_err(|e| PipelineError::service(T, e))?;
        let normalized = dataset_from_table(response, T)?;

        let current = self.require_dataset(T)?;
        if normalized.columns() != current.columns() {
            return Err(PipelineError::malformed(
                T,
                format!(
                    "columns changed from {:?} to {:?}",
                    current.columns(),
                    normalized.columns()
                ),
            ));
        }
        self.check_row_count(&normalized, T)?;

        self.invalidate_from(Stage::Normalized);
        self.dataset = Some(normalized);
        self.normalized = true;
        self.bump();
        self.log_applied(T);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Split
    // -----------------------------------------------------------------------

    pub fn begin_split(&self) -> Result<(Ticket, SplitRequest), PipelineError> {
        let dataset = self.require_dataset(Transition::Split)?;
        if !self.features_applied {
            return Err(self.not_ready(Transition::Split, "an applied feature selection"));
        }
        check_test_size(self.test_size)?;
        if self.selected_columns.len() < 2 {
            return Err(ValidationError::TooFewColumns(self.selected_columns.len()).into());
        }
        if dataset.is_empty() {
            return Err(self.not_ready(Transition::Split, "at least one row"));
        }

        let request = SplitRequest {
            columns: self.selected_columns.clone(),
            data: dataset.project(&self.selected_columns)?.to_records(),
            test_size: self.test_size,
        };
        Ok((self.ticket(Transition::Split, ()), request))
    }

    /// Store the train/test arrays and rebuild display previews from them.
    pub fn complete_split(
        &mut self,
        ticket: Ticket,
        result: Result<SplitResponse, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::Split;
        self.accept(&ticket, T)?;
        let response = result.map_err(|e| PipelineError::service(T, e))?;
        let split = self.build_split(response)?;

        log::debug!(
            "split {} rows at test_size {}: {} train / {} test (expected ~{} train)",
            split.train_len() + split.test_len(),
            self.test_size,
            split.train_len(),
            split.test_len(),
            expected_train_len(split.train_len() + split.test_len(), self.test_size)
        );

        self.invalidate_from(Stage::Split);
        self.split = Some(split);
        self.bump();
        self.log_applied(T);
        Ok(())
    }

    fn build_split(&self, response: SplitResponse) -> Result<SplitResult, PipelineError> {
        const T: Transition = Transition::Split;
        let dataset = self.require_dataset(T)?;
        let (label_column, feature_columns) = match self.selected_columns.split_last() {
            Some((label, features)) => (label.clone(), features.to_vec()),
            None => return Err(ValidationError::TooFewColumns(0).into()),
        };

        let SplitResponse {
            x_train,
            y_train,
            x_test,
            y_test,
        } = response;

        if x_train.len() != y_train.len() || x_test.len() != y_test.len() {
            return Err(PipelineError::malformed(
                T,
                format!(
                    "X_train/y_train = {}/{}, X_test/y_test = {}/{}",
                    x_train.len(),
                    y_train.len(),
                    x_test.len(),
                    y_test.len()
                ),
            ));
        }
        if x_train.len() + x_test.len() != dataset.len() {
            return Err(PipelineError::malformed(
                T,
                format!(
                    "{} train + {} test rows do not cover {} rows",
                    x_train.len(),
                    x_test.len(),
                    dataset.len()
                ),
            ));
        }
        if x_train.is_empty() {
            return Err(PipelineError::malformed(T, "training partition is empty"));
        }
        if let Some((i, row)) = x_train
            .iter()
            .chain(&x_test)
            .enumerate()
            .find(|(_, row)| row.len() != feature_columns.len())
        {
            return Err(PipelineError::malformed(
                T,
                format!(
                    "feature row {i} has {} values for {} feature columns",
                    row.len(),
                    feature_columns.len()
                ),
            ));
        }

        let y_train: Vec<CellValue> = y_train.iter().map(CellValue::from).collect();
        let y_test: Vec<CellValue> = y_test.iter().map(CellValue::from).collect();

        let train_preview = preview(&self.selected_columns, &x_train, &y_train, T)?;
        let test_preview = preview(&self.selected_columns, &x_test, &y_test, T)?;

        Ok(SplitResult {
            feature_columns,
            label_column,
            x_train,
            y_train,
            x_test,
            y_test,
            train_preview,
            test_preview,
        })
    }

    // -----------------------------------------------------------------------
    // Train
    // -----------------------------------------------------------------------

    /// Encode training labels (classification only) and build the request.
    /// The fitted encoding rides on the ticket until Train completes.
    pub fn begin_train(
        &self,
    ) -> Result<(Ticket<Option<LabelEncoding>>, TrainRequest), PipelineError> {
        let Some(split) = &self.split else {
            return Err(self.not_ready(Transition::Train, "a split dataset"));
        };

        let (y_train, encoding) = match self.model.family() {
            ModelFamily::Classification => {
                let (codes, encoding) = LabelEncoding::fit(&split.y_train);
                log::debug!("label encoding: {:?}", encoding.classes());
                (Labels::Codes(codes), Some(encoding))
            }
            ModelFamily::Regression => (
                Labels::Values(numeric_labels(&split.y_train, &split.label_column)?),
                None,
            ),
        };

        let request = TrainRequest {
            x_train: split.x_train.clone(),
            y_train,
            model_family: self.model.family(),
            model_name: self.model.model(),
            hyperparameters: self.model.hyperparameters().clone(),
        };
        Ok((self.ticket(Transition::Train, encoding), request))
    }

    pub fn complete_train(
        &mut self,
        ticket: Ticket<Option<LabelEncoding>>,
        result: Result<TrainResponse, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::Train;
        self.accept(&ticket, T)?;
        let response = result.map_err(|e| PipelineError::service(T, e))?;
        if self.split.is_none() {
            return Err(self.not_ready(T, "a split dataset"));
        }
        if let Some(message) = &response.message {
            log::info!("service: {message}");
        }

        self.invalidate_from(Stage::Trained);
        self.trained = Some(TrainedModel {
            config: self.model.clone(),
            encoding: ticket.context,
        });
        self.bump();
        self.log_applied(T);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Evaluate
    // -----------------------------------------------------------------------

    /// Test labels go through the encoding fitted at Train, never a new one.
    pub fn begin_evaluate(&self) -> Result<(Ticket, EvaluateRequest), PipelineError> {
        let (Some(trained), Some(split)) = (&self.trained, &self.split) else {
            return Err(self.not_ready(Transition::Evaluate, "a trained model"));
        };

        let y_test = match &trained.encoding {
            Some(encoding) => Labels::Codes(encoding.apply(&split.y_test)?),
            None => Labels::Values(numeric_labels(&split.y_test, &split.label_column)?),
        };

        let request = EvaluateRequest {
            x_test: split.x_test.clone(),
            y_test,
        };
        Ok((self.ticket(Transition::Evaluate, ()), request))
    }

    pub fn complete_evaluate(
        &mut self,
        ticket: Ticket,
        result: Result<EvaluateResponse, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::Evaluate;
        self.accept(&ticket, T)?;
        let response = result.map_err(|e| PipelineError::service(T, e))?;
        if !response.score.is_finite() {
            return Err(PipelineError::malformed(
                T,
                format!("score {} is not a finite number", response.score),
            ));
        }
        if self.trained.is_none() {
            return Err(self.not_ready(T, "a trained model"));
        }

        self.score = Some(response.score);
        self.bump();
        log::info!("evaluation score {:.4}", response.score);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // LoadConfig
    // -----------------------------------------------------------------------

    pub fn begin_load_config(&self) -> Ticket {
        self.ticket(Transition::LoadConfig, ())
    }

    pub fn complete_load_config(
        &mut self,
        ticket: Ticket,
        result: Result<ConfigBlob, ServiceError>,
    ) -> Result<(), PipelineError> {
        const T: Transition = Transition::LoadConfig;
        self.accept(&ticket, T)?;
        let blob = result.map_err(|e| PipelineError::service(T, e))?;
        self.restore_snapshot(blob)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn check_row_count(&self, next: &Dataset, transition: Transition) -> Result<(), PipelineError> {
        let current = self.require_dataset(transition)?;
        if next.len() != current.len() {
            return Err(PipelineError::malformed(
                transition,
                format!("row count changed from {} to {}", current.len(), next.len()),
            ));
        }
        Ok(())
    }

    fn log_applied(&self, transition: Transition) {
        let (rows, cols) = self.dataset.as_ref().map(Dataset::shape).unwrap_or((0, 0));
        log::info!(
            "applied {transition}: version {}, stage {:?}, shape ({rows}, {cols})",
            self.version,
            self.stage()
        );
    }
}

/// Build a dataset from a table answer.
///
/// The shape is derived from what was received. A reported column count
/// that disagrees is an error; a larger reported row count means the service
/// sent a preview of the file, which is logged and accepted as is.
fn dataset_from_table(response: TableResponse, transition: Transition) -> Result<Dataset, PipelineError> {
    let TableResponse {
        columns,
        data,
        shape,
    } = response;
    let dataset = Dataset::from_records(columns, &data)
        .map_err(|e| PipelineError::malformed(transition, e.to_string()))?;
    if let Some((rows, cols)) = shape {
        let (received_rows, received_cols) = dataset.shape();
        if cols != received_cols {
            return Err(PipelineError::malformed(
                transition,
                format!("service reports {cols} columns, sent {received_cols}"),
            ));
        }
        if rows != received_rows {
            log::warn!(
                "{transition}: service reports {rows} rows but sent {received_rows}; \
                 continuing with the rows received"
            );
        }
    }
    Ok(dataset)
}

/// Zip feature rows and labels back into records under `columns`
/// (features first, label last). Display only.
fn preview(
    columns: &[String],
    x: &[Vec<f64>],
    y: &[CellValue],
    transition: Transition,
) -> Result<Dataset, PipelineError> {
    let rows = x
        .iter()
        .zip(y)
        .map(|(features, label)| {
            features
                .iter()
                .map(|&v| CellValue::Float(v))
                .chain(std::iter::once(label.clone()))
                .collect()
        })
        .collect();
    Dataset::from_rows(columns.to_vec(), rows)
        .map_err(|e| PipelineError::malformed(transition, e.to_string()))
}

fn numeric_labels(labels: &[CellValue], column: &str) -> Result<Vec<f64>, DatasetError> {
    labels
        .iter()
        .enumerate()
        .map(|(row, label)| {
            label.as_f64().ok_or_else(|| DatasetError::NonNumericValue {
                row,
                column: column.to_string(),
                value: label.to_string(),
            })
        })
        .collect()
}

/// `round((1 - t) * n)`, the usual train-partition size.
pub fn expected_train_len(rows: usize, test_size: f64) -> usize {
    ((1.0 - test_size) * rows as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use serde_json::{Value as JsonValue, json};

    use super::*;
    use crate::pipeline::ErrorKind;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Four rows of `a, b, label`, every column selected and applied.
    fn selected() -> PipelineState {
        let ds = Dataset::from_rows(
            cols(&["a", "b", "label"]),
            (1..=4)
                .map(|i| {
                    let label = if i % 2 == 1 { "x" } else { "y" };
                    vec![
                        CellValue::Float(i as f64),
                        CellValue::Float(i as f64 * 10.0),
                        label.into(),
                    ]
                })
                .collect(),
        )
        .unwrap();
        PipelineState {
            selected_columns: ds.columns().to_vec(),
            dataset: Some(ds),
            features_applied: true,
            ..PipelineState::default()
        }
    }

    fn table(ds: &Dataset) -> TableResponse {
        TableResponse {
            columns: ds.columns().to_vec(),
            data: ds.to_records(),
            shape: None,
        }
    }

    fn feature_rows(range: std::ops::Range<usize>) -> Vec<Vec<f64>> {
        range.map(|i| vec![(i + 1) as f64, (i + 1) as f64 * 10.0]).collect()
    }

    fn labels(range: std::ops::Range<usize>) -> Vec<JsonValue> {
        range
            .map(|i| if i % 2 == 0 { json!("x") } else { json!("y") })
            .collect()
    }

    /// First `n_train` rows train, the rest test.
    fn split_response(n_train: usize) -> SplitResponse {
        SplitResponse {
            x_train: feature_rows(0..n_train),
            y_train: labels(0..n_train),
            x_test: feature_rows(n_train..4),
            y_test: labels(n_train..4),
        }
    }

    fn rejected_split(response: SplitResponse) {
        let mut state = selected();
        let (ticket, _) = state.begin_split().unwrap();
        let before = state.clone();
        let err = state.complete_split(ticket, Ok(response)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SplitError, "{err}");
        assert_eq!(state, before);
    }

    // ---- Split ----

    #[test]
    fn split_builds_aligned_previews() {
        let mut state = selected();
        let (ticket, req) = state.begin_split().unwrap();
        assert_eq!(req.columns, cols(&["a", "b", "label"]));
        state.complete_split(ticket, Ok(split_response(3))).unwrap();

        let split = state.split_result().unwrap();
        assert_eq!(split.feature_columns, cols(&["a", "b"]));
        assert_eq!(split.test_preview.rows()[0][1], CellValue::Float(40.0));
        assert_eq!(split.test_preview.rows()[0][2], CellValue::from("y"));
        assert_eq!(state.stage(), Stage::Split);
    }

    #[test]
    fn split_must_cover_every_row() {
        let mut response = split_response(3);
        response.x_test.clear();
        response.y_test.clear();
        rejected_split(response);
    }

    #[test]
    fn split_feature_and_label_lengths_must_match() {
        let mut response = split_response(3);
        response.y_train.pop();
        rejected_split(response);
    }

    #[test]
    fn split_rows_must_match_feature_columns() {
        let mut response = split_response(3);
        response.x_test[0].push(99.0);
        rejected_split(response);
    }

    #[test]
    fn split_training_partition_cannot_be_empty() {
        rejected_split(split_response(0));
    }

    // ---- SelectFeatures ----

    #[test]
    fn select_features_rejects_reordered_columns() {
        let mut state = selected();
        let requested = cols(&["a", "label"]);
        let (ticket, _) = state.begin_select_features(&requested).unwrap();
        let before = state.clone();

        let reordered = state
            .dataset()
            .unwrap()
            .project(&cols(&["label", "a"]))
            .unwrap();
        let err = state
            .complete_select_features(ticket, Ok(table(&reordered)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidColumnSet);
        assert_eq!(state, before);
    }

    #[test]
    fn select_features_rejects_dropped_rows() {
        let mut state = selected();
        let requested = cols(&["a", "label"]);
        let (ticket, _) = state.begin_select_features(&requested).unwrap();
        let before = state.clone();

        let mut response = table(&state.dataset().unwrap().project(&requested).unwrap());
        response.data.pop();
        let err = state.complete_select_features(ticket, Ok(response)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidColumnSet);
        assert_eq!(state, before);
    }

    // ---- Normalize ----

    #[test]
    fn normalize_rejects_changed_columns() {
        let mut state = selected();
        let (ticket, _) = state.begin_normalize(&cols(&["a"])).unwrap();
        let before = state.clone();

        let narrowed = state
            .dataset()
            .unwrap()
            .project(&cols(&["a", "label"]))
            .unwrap();
        let err = state.complete_normalize(ticket, Ok(table(&narrowed))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NormalizationError);
        assert_eq!(state, before);
    }

    #[test]
    fn normalize_rejects_changed_row_count() {
        let mut state = selected();
        let (ticket, _) = state.begin_normalize(&cols(&["a", "b"])).unwrap();
        let before = state.clone();

        let mut response = table(state.dataset().unwrap());
        response.data.truncate(2);
        let err = state.complete_normalize(ticket, Ok(response)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NormalizationError);
        assert_eq!(state, before);
    }

    #[test]
    fn normalize_rejects_label_outside_selection() {
        let mut state = selected();
        state.selected_columns = cols(&["a", "b"]);
        let err = state.begin_normalize(&cols(&["label"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidColumnSet);
    }

    // ---- Upload ----

    fn upload_file() -> UploadFile {
        UploadFile {
            file_name: "t.csv".into(),
            bytes: b"a,b,label\n".to_vec(),
        }
    }

    #[test]
    fn upload_rejects_reported_column_count_mismatch() {
        let mut state = PipelineState::new();
        let ticket = state.begin_upload(&upload_file()).unwrap();
        let mut response = table(selected().dataset().unwrap());
        response.shape = Some((4, 5));

        let err = state.complete_upload(ticket, Ok(response)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UploadRejected);
        assert_eq!(state, PipelineState::new());
    }

    #[test]
    fn upload_accepts_preview_of_a_longer_file() {
        let mut state = PipelineState::new();
        let ticket = state.begin_upload(&upload_file()).unwrap();
        let mut response = table(selected().dataset().unwrap());
        response.shape = Some((1_000, 3));

        state.complete_upload(ticket, Ok(response)).unwrap();
        assert_eq!(state.dataset().unwrap().shape(), (4, 3));
        assert_eq!(state.stage(), Stage::Uploaded);
    }

    #[test]
    fn upload_rejects_ragged_records() {
        let mut state = PipelineState::new();
        let ticket = state.begin_upload(&upload_file()).unwrap();
        let mut response = table(selected().dataset().unwrap());
        response.data[2].remove("b");

        let err = state.complete_upload(ticket, Ok(response)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UploadRejected);
        assert_eq!(state, PipelineState::new());
    }

    // ---- Evaluate ----

    #[test]
    fn evaluate_rejects_non_finite_score() {
        let mut state = selected();
        let (ticket, _) = state.begin_split().unwrap();
        state.complete_split(ticket, Ok(split_response(3))).unwrap();
        let (ticket, req) = state.begin_train().unwrap();
        assert_eq!(req.y_train, Labels::Codes(vec![0, 1, 0]));
        state.complete_train(ticket, Ok(TrainResponse::default())).unwrap();

        let (ticket, req) = state.begin_evaluate().unwrap();
        assert_eq!(req.y_test, Labels::Codes(vec![1]));
        let before = state.clone();
        let err = state
            .complete_evaluate(ticket, Ok(EvaluateResponse { score: f64::NAN }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvaluationError);
        assert_eq!(state, before);
        assert_eq!(state.stage(), Stage::Trained);
    }

    // ---- Tickets ----

    #[test]
    fn ticket_for_another_transition_is_refused() {
        let mut state = selected();
        let (split_ticket, _) = state.begin_split().unwrap();
        let before = state.clone();

        let err = state
            .complete_normalize(split_ticket, Ok(table(before.dataset().unwrap())))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::TicketMismatch {
                expected: Transition::Normalize,
                got: Transition::Split,
            })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn ticket_from_older_version_is_stale() {
        let mut state = selected();
        let (ticket, _) = state.begin_split().unwrap();
        state.set_test_size(0.5).unwrap();
        let before = state.clone();

        let err = state.complete_split(ticket, Ok(split_response(2))).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Stale {
                transition: Transition::Split,
                issued: 0,
                current: 1,
            }
        );
        assert_eq!(state, before);
    }
}
