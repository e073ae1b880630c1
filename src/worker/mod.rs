//! Worker lifecycle and request interception

mod controller;
mod registration;
mod state;

pub use controller::{
    ActivateReport, ControllerConfig, FetchOutcome, InstallReport, OfflineCacheController,
    ResponseSource,
};
pub use registration::{Registration, RegistrationState, WorkerRecord};
pub use state::{LifecycleHooks, WorkerState};
