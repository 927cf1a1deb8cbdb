#![forbid(unsafe_code)]

mod config;
mod error;
mod lifecycle;
mod ports;
mod reconcile;
mod schedules;
mod visits;

pub use config::{ClosePolicy, ServiceConfig};
pub use error::ServiceError;
pub use lifecycle::LifecycleController;
pub use ports::{ScheduleStore, TerritoryStore};
pub use reconcile::{AssignmentReconciler, RestoreReport, ScheduleOutcome, ScheduleRestore};
pub use schedules::ScheduleBook;
pub use visits::{ToggleOutcome, VisitTracker};
