//! Analysis lifecycle: trigger, poll, derive progress, terminate.

pub mod controller;
pub mod progress;

pub use controller::{
    AnalysisController, AnalysisEvent, AnalysisSession, AnalysisSnapshot, ControllerConfig,
    LifecycleState,
};
pub use progress::{derive_phases, derive_progress, PhaseStatus, PhaseView, PROGRESS_FLOOR};
