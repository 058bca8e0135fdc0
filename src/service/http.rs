use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::wire::{
    ErrorBody, EvaluateRequest, EvaluateResponse, NormalizeRequest, SelectFeaturesRequest,
    SplitRequest, SplitResponse, TableResponse, TrainRequest, TrainResponse,
};
use super::{ProcessingService, ServiceError};
use crate::data::loader::UploadFile;
use crate::settings::Settings;
use crate::snapshot::ConfigBlob;

// ---------------------------------------------------------------------------
// HTTP client for the Flask-style processing service
// ---------------------------------------------------------------------------

/// Blocking JSON client. Cloning is cheap (the connection pool is shared).
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base_url: String,
}

impl HttpService {
    pub fn new(settings: &Settings) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.service_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ServiceError> {
        log::debug!("POST {}", self.url(path));
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        decode(response)
    }
}

/// Turn a response into `R`, or into the service's error message.
fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ServiceError> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|e| ServiceError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| ServiceError::Malformed(e.to_string()))
}

/// `{"error": "..."}` if the body has that shape, the raw body otherwise.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => err.error,
        Err(_) if body.trim().is_empty() => "no error message".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

impl ProcessingService for HttpService {
    fn upload(&self, file: &UploadFile) -> Result<TableResponse, ServiceError> {
        log::debug!("POST {} ({} bytes)", self.url("upload"), file.bytes.len());
        let part = multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("upload"))
            .multipart(form)
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        decode(response)
    }

    fn select_features(&self, req: &SelectFeaturesRequest) -> Result<TableResponse, ServiceError> {
        self.post_json("select_features", req)
    }

    fn normalize(&self, req: &NormalizeRequest) -> Result<TableResponse, ServiceError> {
        self.post_json("normalize", req)
    }

    fn split(&self, req: &SplitRequest) -> Result<SplitResponse, ServiceError> {
        self.post_json("split", req)
    }

    fn train(&self, req: &TrainRequest) -> Result<TrainResponse, ServiceError> {
        self.post_json("train", req)
    }

    fn evaluate(&self, req: &EvaluateRequest) -> Result<EvaluateResponse, ServiceError> {
        self.post_json("evaluate", req)
    }

    fn save_config(&self, blob: &ConfigBlob) -> Result<(), ServiceError> {
        log::debug!("POST {}", self.url("save_config"));
        let response = self
            .client
            .post(self.url("save_config"))
            .json(blob)
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().unwrap_or_default();
        Err(ServiceError::Status {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }

    fn load_config(&self) -> Result<ConfigBlob, ServiceError> {
        log::debug!("GET {}", self.url("load_config"));
        let response = self
            .client
            .get(self.url("load_config"))
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        decode(response)
    }
}
