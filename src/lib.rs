//! Tabular ML playground: upload a dataset, prepare it, train and evaluate a
//! model, with every computation delegated to a remote processing service.

pub mod data;
pub mod model_config;
pub mod pipeline;
pub mod service;
pub mod settings;
pub mod snapshot;
