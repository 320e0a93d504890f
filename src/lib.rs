// Core layer - configuration, errors, shared formatting
pub mod core;

// Features layer - all feature modules
pub mod features;

// Re-export core items for convenience
pub use crate::core::{Config, ParseError, TimerError};

// Re-export feature items
pub use features::{
    // Timers
    plan_sweep, Alert, AlertKind, Notifier, NullStore, PlannedAlert, Presence, SweepScheduler,
    Timer, TimerRegistry, TimerStore,
};
