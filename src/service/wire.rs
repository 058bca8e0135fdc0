use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::model_config::{ModelFamily, ModelName, ParamValue};
use crate::pipeline::NormalizationMethod;

/// Row-major records as they travel over the wire.
pub type Records = Vec<Map<String, JsonValue>>;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SelectFeaturesRequest {
    pub columns: Vec<String>,
    pub data: Records,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeRequest {
    pub columns: Vec<String>,
    pub data: Records,
    pub method: NormalizationMethod,
}

/// The label is the last entry of `columns`.
#[derive(Debug, Clone, Serialize)]
pub struct SplitRequest {
    pub columns: Vec<String>,
    pub data: Records,
    pub test_size: f64,
}

/// Label vector: dense codes for classification, raw numbers for regression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Labels {
    Codes(Vec<i64>),
    Values(Vec<f64>),
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainRequest {
    #[serde(rename = "X_train")]
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Labels,
    pub model_family: ModelFamily,
    pub model_name: ModelName,
    pub hyperparameters: std::collections::BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateRequest {
    #[serde(rename = "X_test")]
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Labels,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Upload / select / normalize answer: ordered columns plus records.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableResponse {
    pub columns: Vec<String>,
    #[serde(alias = "rows")]
    pub data: Records,
    #[serde(default)]
    pub shape: Option<(usize, usize)>,
}

/// Parallel train/test arrays. Any preview records the service adds are
/// ignored; previews are rebuilt from these arrays.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplitResponse {
    #[serde(rename = "X_train")]
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<JsonValue>,
    #[serde(rename = "X_test")]
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TrainResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluateResponse {
    #[serde(alias = "accuracy")]
    pub score: f64,
}

/// Error payload the service sends with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_response_uses_uppercase_feature_keys() {
        let resp: SplitResponse = serde_json::from_value(json!({
            "X_train": [[1.0, 2.0]],
            "y_train": ["yes"],
            "X_test": [[3.0, 4.0]],
            "y_test": ["no"],
            "train_data": [{"a": 1.0, "b": 2.0, "label": "yes"}]
        }))
        .unwrap();
        assert_eq!(resp.x_train, vec![vec![1.0, 2.0]]);
        assert_eq!(resp.y_test, vec![json!("no")]);
    }

    #[test]
    fn evaluate_accepts_accuracy_alias() {
        let resp: EvaluateResponse = serde_json::from_value(json!({"accuracy": 0.75})).unwrap();
        assert_eq!(resp.score, 0.75);
    }

    #[test]
    fn table_response_shape_is_optional() {
        let resp: TableResponse =
            serde_json::from_value(json!({"columns": ["a"], "data": [{"a": 1}]})).unwrap();
        assert_eq!(resp.shape, None);

        let resp: TableResponse = serde_json::from_value(
            json!({"columns": ["a"], "data": [{"a": 1}], "shape": [1, 1]}),
        )
        .unwrap();
        assert_eq!(resp.shape, Some((1, 1)));
    }

    #[test]
    fn labels_serialize_as_plain_arrays() {
        assert_eq!(serde_json::to_value(Labels::Codes(vec![0, 1])).unwrap(), json!([0, 1]));
        assert_eq!(serde_json::to_value(Labels::Values(vec![2.5])).unwrap(), json!([2.5]));
    }
}
