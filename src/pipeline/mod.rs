//! Pipeline orchestration: session state and the stage transitions that
//! move it forward.
//!
//! ```text
//!   Empty ─upload─► Uploaded ─select─► FeaturesSelected ─split─► Split ─train─► Trained ─evaluate─► Evaluated
//!                                        │        ▲
//!                                   normalize     │
//!                                        ▼        │
//!                                     Normalized ─┘ (split)
//! ```
//!
//! Re-running a stage clears every stage after it.

mod error;
mod orchestrator;
mod state;
mod transitions;

pub use error::{ErrorKind, PipelineError, ValidationError};
pub use orchestrator::Orchestrator;
pub use state::{
    DEFAULT_TEST_SIZE, NormalizationMethod, PipelineState, SplitResult, Stage, TrainedModel,
};
pub use transitions::{Ticket, Transition, expected_train_len};
