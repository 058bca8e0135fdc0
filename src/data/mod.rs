//! Data layer: table model, label encoding, file I/O.
//!
//! Architecture:
//! ```text
//!   .csv on disk
//!        │  loader: read raw bytes
//!        ▼
//!   processing service ──► columns + records
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset  │  columns, positional rows (schema checked once)
//!   └──────────┘
//!        │  project / to_feature_matrix
//!        ▼
//!   ┌──────────┐
//!   │ encoder  │  labels → dense codes, fit once at Train
//!   └──────────┘
//! ```

pub mod encoder;
pub mod loader;
pub mod model;
