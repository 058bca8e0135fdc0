use crate::data::encoder::EncodeError;
use crate::data::model::DatasetError;
use crate::model_config::ModelConfigError;
use crate::service::ServiceError;

use super::state::Stage;
use super::transitions::Transition;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// A precondition violated locally; raised before any remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{transition} needs {needs} (pipeline is at {stage:?})")]
    NotReady {
        transition: Transition,
        needs: &'static str,
        stage: Stage,
    },

    #[error("test size must lie strictly between 0 and 1, got {0}")]
    TestSizeOutOfRange(f64),

    #[error("no columns selected")]
    EmptySelection,

    #[error("split needs a label column plus at least one feature column, {0} selected")]
    TooFewColumns(usize),

    #[error("a {got} ticket cannot complete {expected}")]
    TicketMismatch {
        expected: Transition,
        got: Transition,
    },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Model(#[from] ModelConfigError),
}

/// Named failure reported to the caller, one per row of the stage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidColumnSet,
    NonNumericValue,
    UnknownLabel,
    UploadRejected,
    NormalizationError,
    SplitError,
    TrainingError,
    EvaluationError,
    ConfigError,
    StaleResponse,
}

/// Failure of a stage transition. The pipeline state is unchanged whenever
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{transition} failed: {source}")]
    Service {
        transition: Transition,
        #[source]
        source: ServiceError,
    },

    #[error("discarded stale {transition} response (issued at version {issued}, pipeline is at {current})")]
    Stale {
        transition: Transition,
        issued: u64,
        current: u64,
    },
}

impl PipelineError {
    pub(crate) fn service(transition: Transition, source: ServiceError) -> Self {
        PipelineError::Service { transition, source }
    }

    pub(crate) fn malformed(transition: Transition, detail: impl Into<String>) -> Self {
        PipelineError::Service {
            transition,
            source: ServiceError::Malformed(detail.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(v) => match v {
                ValidationError::Dataset(
                    DatasetError::InvalidColumnSet { .. } | DatasetError::DuplicateColumn(_),
                ) => ErrorKind::InvalidColumnSet,
                ValidationError::Dataset(DatasetError::NonNumericValue { .. }) => {
                    ErrorKind::NonNumericValue
                }
                ValidationError::Encode(EncodeError::UnknownLabel { .. }) => ErrorKind::UnknownLabel,
                _ => ErrorKind::Validation,
            },
            PipelineError::Service { transition, .. } => match transition {
                Transition::Upload => ErrorKind::UploadRejected,
                Transition::SelectFeatures => ErrorKind::InvalidColumnSet,
                Transition::Normalize => ErrorKind::NormalizationError,
                Transition::Split => ErrorKind::SplitError,
                Transition::Train => ErrorKind::TrainingError,
                Transition::Evaluate => ErrorKind::EvaluationError,
                Transition::SaveConfig | Transition::LoadConfig => ErrorKind::ConfigError,
            },
            PipelineError::Stale { .. } => ErrorKind::StaleResponse,
        }
    }

    /// Stale responses are dropped quietly rather than shown as errors.
    pub fn is_stale(&self) -> bool {
        matches!(self, PipelineError::Stale { .. })
    }
}

impl From<DatasetError> for PipelineError {
    fn from(e: DatasetError) -> Self {
        PipelineError::Validation(e.into())
    }
}

impl From<EncodeError> for PipelineError {
    fn from(e: EncodeError) -> Self {
        PipelineError::Validation(e.into())
    }
}

impl From<ModelConfigError> for PipelineError {
    fn from(e: ModelConfigError) -> Self {
        PipelineError::Validation(e.into())
    }
}
