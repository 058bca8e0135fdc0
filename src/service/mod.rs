//! Boundary to the remote processing service.
//!
//! The service owns parsing, normalization arithmetic, splitting, fitting and
//! scoring. This side only builds requests and decodes answers.

pub mod http;
pub mod wire;

pub use http::HttpService;
pub use wire::{
    EvaluateRequest, EvaluateResponse, Labels, NormalizeRequest, Records, SelectFeaturesRequest,
    SplitRequest, SplitResponse, TableResponse, TrainRequest, TrainResponse,
};

use crate::data::loader::UploadFile;
use crate::snapshot::ConfigBlob;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One request/response call per pipeline stage.
pub trait ProcessingService {
    fn upload(&self, file: &UploadFile) -> Result<TableResponse, ServiceError>;

    fn select_features(&self, req: &SelectFeaturesRequest) -> Result<TableResponse, ServiceError>;

    fn normalize(&self, req: &NormalizeRequest) -> Result<TableResponse, ServiceError>;

    fn split(&self, req: &SplitRequest) -> Result<SplitResponse, ServiceError>;

    fn train(&self, req: &TrainRequest) -> Result<TrainResponse, ServiceError>;

    fn evaluate(&self, req: &EvaluateRequest) -> Result<EvaluateResponse, ServiceError>;

    fn save_config(&self, blob: &ConfigBlob) -> Result<(), ServiceError>;

    fn load_config(&self) -> Result<ConfigBlob, ServiceError>;
}
