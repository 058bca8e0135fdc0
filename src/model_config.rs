use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Model families and names
// ---------------------------------------------------------------------------

/// Kind of learning task the service is asked to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Classification,
    Regression,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 2] = [ModelFamily::Classification, ModelFamily::Regression];

    /// Models offered for this family; the first one is the default.
    pub fn models(self) -> &'static [ModelName] {
        use ModelName::*;
        match self {
            ModelFamily::Classification => &[
                LogisticRegression,
                DecisionTreeClassifier,
                RandomForestClassifier,
            ],
            ModelFamily::Regression => &[
                LinearRegression,
                Ridge,
                Lasso,
                DecisionTreeRegressor,
                RandomForestRegressor,
            ],
        }
    }

    pub fn default_model(self) -> ModelName {
        self.models()[0]
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelFamily::Classification => "Classification",
            ModelFamily::Regression => "Regression",
        }
    }
}

/// Model identifiers understood by the processing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    LogisticRegression,
    DecisionTreeClassifier,
    RandomForestClassifier,
    LinearRegression,
    Ridge,
    Lasso,
    DecisionTreeRegressor,
    RandomForestRegressor,
}

impl ModelName {
    pub fn family(self) -> ModelFamily {
        use ModelName::*;
        match self {
            LogisticRegression | DecisionTreeClassifier | RandomForestClassifier => {
                ModelFamily::Classification
            }
            LinearRegression | Ridge | Lasso | DecisionTreeRegressor | RandomForestRegressor => {
                ModelFamily::Regression
            }
        }
    }

    /// Hyperparameter schema for this model.
    pub fn params(self) -> &'static [ParamSpec] {
        use ModelName::*;
        match self {
            LogisticRegression => &[C, MAX_ITER],
            DecisionTreeClassifier | DecisionTreeRegressor => &[MAX_DEPTH],
            RandomForestClassifier | RandomForestRegressor => &[N_ESTIMATORS, MAX_DEPTH],
            LinearRegression => &[],
            Ridge | Lasso => &[ALPHA],
        }
    }

    pub fn label(self) -> &'static str {
        use ModelName::*;
        match self {
            LogisticRegression => "Logistic Regression",
            DecisionTreeClassifier => "Decision Tree",
            RandomForestClassifier => "Random Forest",
            LinearRegression => "Linear Regression",
            Ridge => "Ridge",
            Lasso => "Lasso",
            DecisionTreeRegressor => "Decision Tree",
            RandomForestRegressor => "Random Forest",
        }
    }
}

// ---------------------------------------------------------------------------
// Hyperparameter schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Float,
}

/// One recognised hyperparameter: name, kind, default and inclusive range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

const C: ParamSpec = ParamSpec {
    name: "C",
    kind: ParamKind::Float,
    default: 1.0,
    min: 1e-4,
    max: 1e4,
};

const MAX_ITER: ParamSpec = ParamSpec {
    name: "max_iter",
    kind: ParamKind::Integer,
    default: 100.0,
    min: 1.0,
    max: 10_000.0,
};

const MAX_DEPTH: ParamSpec = ParamSpec {
    name: "max_depth",
    kind: ParamKind::Integer,
    default: 5.0,
    min: 1.0,
    max: 100.0,
};

const N_ESTIMATORS: ParamSpec = ParamSpec {
    name: "n_estimators",
    kind: ParamKind::Integer,
    default: 100.0,
    min: 1.0,
    max: 1_000.0,
};

const ALPHA: ParamSpec = ParamSpec {
    name: "alpha",
    kind: ParamKind::Float,
    default: 1.0,
    min: 0.0,
    max: 1e4,
};

impl ParamSpec {
    fn check(&self, value: f64) -> Result<ParamValue, ModelConfigError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ModelConfigError::OutOfRange {
                name: self.name.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        match self.kind {
            ParamKind::Float => Ok(ParamValue::Float(value)),
            ParamKind::Integer if value.fract() == 0.0 => Ok(ParamValue::Integer(value as i64)),
            ParamKind::Integer => Err(ModelConfigError::NotAnInteger {
                name: self.name.to_string(),
                value,
            }),
        }
    }

    fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Integer => ParamValue::Integer(self.default as i64),
            ParamKind::Float => ParamValue::Float(self.default),
        }
    }
}

/// A hyperparameter value as sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Integer(i) => i as f64,
            ParamValue::Float(f) => f,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelConfigError {
    #[error("model {model:?} does not belong to the {family:?} family")]
    FamilyMismatch { family: ModelFamily, model: ModelName },

    #[error("unknown hyperparameter '{name}' for {model:?}")]
    UnknownParam { model: ModelName, name: String },

    #[error("hyperparameter '{name}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("hyperparameter '{name}' must be an integer, got {value}")]
    NotAnInteger { name: String, value: f64 },
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Family, model name and the hyperparameters recognised by that model.
///
/// The key set of `hyperparameters` always equals `model.params()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModelConfig")]
pub struct ModelConfig {
    family: ModelFamily,
    model: ModelName,
    hyperparameters: BTreeMap<String, ParamValue>,
}

#[derive(Deserialize)]
struct RawModelConfig {
    family: ModelFamily,
    model: ModelName,
    #[serde(default)]
    hyperparameters: BTreeMap<String, ParamValue>,
}

impl TryFrom<RawModelConfig> for ModelConfig {
    type Error = ModelConfigError;

    fn try_from(raw: RawModelConfig) -> Result<Self, Self::Error> {
        if raw.model.family() != raw.family {
            return Err(ModelConfigError::FamilyMismatch {
                family: raw.family,
                model: raw.model,
            });
        }
        // Absent keys keep their defaults.
        let mut config = ModelConfig::new(raw.model);
        for (name, value) in raw.hyperparameters {
            config.set_param(&name, value.as_f64())?;
        }
        Ok(config)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::for_family(ModelFamily::Classification)
    }
}

impl ModelConfig {
    /// `model` with its default hyperparameters.
    pub fn new(model: ModelName) -> Self {
        Self {
            family: model.family(),
            model,
            hyperparameters: default_params(model),
        }
    }

    /// The family's default model with default hyperparameters.
    pub fn for_family(family: ModelFamily) -> Self {
        Self::new(family.default_model())
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn model(&self) -> ModelName {
        self.model
    }

    pub fn hyperparameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.hyperparameters
    }

    /// Switch model; hyperparameters reset to the new model's defaults.
    pub fn set_model(&mut self, model: ModelName) {
        *self = ModelConfig::new(model);
    }

    /// Switch family; the family's default model is selected.
    pub fn set_family(&mut self, family: ModelFamily) {
        if family != self.family {
            *self = ModelConfig::for_family(family);
        }
    }

    /// Set one hyperparameter, validated against the model's schema.
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<(), ModelConfigError> {
        let spec = self
            .model
            .params()
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ModelConfigError::UnknownParam {
                model: self.model,
                name: name.to_string(),
            })?;
        let checked = spec.check(value)?;
        self.hyperparameters.insert(spec.name.to_string(), checked);
        Ok(())
    }
}

fn default_params(model: ModelName) -> BTreeMap<String, ParamValue> {
    model
        .params()
        .iter()
        .map(|spec| (spec.name.to_string(), spec.default_value()))
        .collect()
}
