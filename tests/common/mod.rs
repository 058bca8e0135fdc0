//! In-memory stand-in for the processing service.

#![allow(dead_code)]

use std::cell::RefCell;

use serde_json::{Map, Value as JsonValue};

use rusty_playground::data::loader::UploadFile;
use rusty_playground::pipeline::{NormalizationMethod, expected_train_len};
use rusty_playground::service::{
    EvaluateRequest, EvaluateResponse, NormalizeRequest, ProcessingService, Records,
    SelectFeaturesRequest, ServiceError, SplitRequest, SplitResponse, TableResponse, TrainRequest,
    TrainResponse,
};
use rusty_playground::snapshot::ConfigBlob;

/// Calls that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Upload,
    Select,
    Normalize,
    Split,
    Train,
    Evaluate,
}

#[derive(Default)]
pub struct FakeService {
    pub fail_on: RefCell<Option<Call>>,
    pub train_requests: RefCell<Vec<TrainRequest>>,
    pub evaluate_requests: RefCell<Vec<EvaluateRequest>>,
    pub stored_config: RefCell<Option<ConfigBlob>>,
    pub score: f64,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            score: 0.9,
            ..Self::default()
        }
    }

    pub fn fail(&self, call: Call) {
        *self.fail_on.borrow_mut() = Some(call);
    }

    pub fn heal(&self) {
        *self.fail_on.borrow_mut() = None;
    }

    fn check(&self, call: Call) -> Result<(), ServiceError> {
        if *self.fail_on.borrow() == Some(call) {
            return Err(ServiceError::Status {
                status: 500,
                message: format!("{call:?} failed"),
            });
        }
        Ok(())
    }
}

fn bad_request(message: impl Into<String>) -> ServiceError {
    ServiceError::Status {
        status: 400,
        message: message.into(),
    }
}

fn guess_value(s: &str) -> JsonValue {
    if s.is_empty() {
        return JsonValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return JsonValue::from(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return JsonValue::from(f);
    }
    JsonValue::String(s.to_string())
}

fn project(columns: &[String], data: &Records) -> Result<Records, ServiceError> {
    data.iter()
        .map(|rec| {
            columns
                .iter()
                .map(|c| {
                    rec.get(c)
                        .cloned()
                        .map(|v| (c.clone(), v))
                        .ok_or_else(|| bad_request(format!("unknown column {c}")))
                })
                .collect()
        })
        .collect()
}

fn column_names(data: &Records) -> Vec<String> {
    data.first()
        .map(|rec| rec.keys().cloned().collect())
        .unwrap_or_default()
}

impl ProcessingService for FakeService {
    fn upload(&self, file: &UploadFile) -> Result<TableResponse, ServiceError> {
        self.check(Call::Upload)?;
        let mut reader = csv::Reader::from_reader(file.bytes.as_slice());
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| bad_request(e.to_string()))?
            .iter()
            .map(String::from)
            .collect();
        let mut data = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| bad_request(e.to_string()))?;
            let row: Map<String, JsonValue> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), guess_value(v)))
                .collect();
            data.push(row);
        }
        Ok(TableResponse {
            shape: Some((data.len(), headers.len())),
            columns: headers,
            data,
        })
    }

    fn select_features(&self, req: &SelectFeaturesRequest) -> Result<TableResponse, ServiceError> {
        self.check(Call::Select)?;
        Ok(TableResponse {
            columns: req.columns.clone(),
            data: project(&req.columns, &req.data)?,
            shape: None,
        })
    }

    fn normalize(&self, req: &NormalizeRequest) -> Result<TableResponse, ServiceError> {
        self.check(Call::Normalize)?;
        let mut data = req.data.clone();
        for col in &req.columns {
            let values: Vec<f64> = data
                .iter()
                .map(|rec| rec.get(col).and_then(JsonValue::as_f64))
                .collect::<Option<_>>()
                .ok_or_else(|| bad_request(format!("column '{col}' is not numeric")))?;
            let n = values.len() as f64;
            let (shift, scale) = match req.method {
                NormalizationMethod::MinMax => {
                    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    (min, (max - min).max(f64::EPSILON))
                }
                NormalizationMethod::Standard => {
                    let mean = values.iter().sum::<f64>() / n;
                    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                    (mean, var.sqrt().max(f64::EPSILON))
                }
            };
            for (rec, v) in data.iter_mut().zip(&values) {
                rec.insert(col.clone(), JsonValue::from((v - shift) / scale));
            }
        }
        Ok(TableResponse {
            columns: column_names(&data),
            data,
            shape: None,
        })
    }

    /// First `round((1 - t) * n)` rows train, the rest test; no shuffle.
    fn split(&self, req: &SplitRequest) -> Result<SplitResponse, ServiceError> {
        self.check(Call::Split)?;
        let (label, features) = req
            .columns
            .split_last()
            .ok_or_else(|| bad_request("no columns"))?;
        let n_train = expected_train_len(req.data.len(), req.test_size);

        let mut x = Vec::new();
        let mut y = Vec::new();
        for rec in &req.data {
            let row: Vec<f64> = features
                .iter()
                .map(|c| rec.get(c).and_then(JsonValue::as_f64))
                .collect::<Option<_>>()
                .ok_or_else(|| bad_request("non-numeric feature"))?;
            x.push(row);
            y.push(rec.get(label).cloned().unwrap_or(JsonValue::Null));
        }
        let x_test = x.split_off(n_train);
        let y_test = y.split_off(n_train);
        Ok(SplitResponse {
            x_train: x,
            y_train: y,
            x_test,
            y_test,
        })
    }

    fn train(&self, req: &TrainRequest) -> Result<TrainResponse, ServiceError> {
        self.check(Call::Train)?;
        self.train_requests.borrow_mut().push(req.clone());
        Ok(TrainResponse {
            message: Some("Model trained successfully".into()),
        })
    }

    fn evaluate(&self, req: &EvaluateRequest) -> Result<EvaluateResponse, ServiceError> {
        self.check(Call::Evaluate)?;
        self.evaluate_requests.borrow_mut().push(req.clone());
        Ok(EvaluateResponse { score: self.score })
    }

    fn save_config(&self, blob: &ConfigBlob) -> Result<(), ServiceError> {
        *self.stored_config.borrow_mut() = Some(blob.clone());
        Ok(())
    }

    fn load_config(&self) -> Result<ConfigBlob, ServiceError> {
        self.stored_config
            .borrow()
            .clone()
            .ok_or_else(|| bad_request("no saved configuration"))
    }
}

/// `age,income,label` with 10 rows; the first label seen is "yes".
pub fn people_csv() -> UploadFile {
    let text = "\
age,income,label
31,52000,yes
45,61000,no
27,38000,yes
52,87000,no
38,45000,yes
29,41000,no
61,93000,no
33,50000,yes
47,72000,no
25,30000,yes
";
    UploadFile {
        file_name: "people.csv".into(),
        bytes: text.as_bytes().to_vec(),
    }
}

pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
