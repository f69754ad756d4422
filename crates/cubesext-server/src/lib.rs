//! Cubesext Server
//!
//! Runtime surfaces around a generated model: the slicer process
//! orchestrator, the static viewer server and notebook embeds.

pub mod notebook;
pub mod orchestrator;
pub mod templates;
pub mod viewer;

pub use notebook::{NotebookError, NotebookSession};
pub use orchestrator::{
    Capture, LaunchOutcome, OrchestratorError, ServerCommand, SlicerConfig, SlicerOrchestrator,
};
pub use viewer::{viewer_url, StaticViewer, ViewerError};
