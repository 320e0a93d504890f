//! # Features Module
//!
//! Feature modules for the chime reminder core. Each feature lives in its
//! own submodule with a header documenting version and toggleability.

pub mod timers;

pub use timers::{
    plan_sweep, Alert, AlertKind, Notifier, NullStore, PlannedAlert, Presence, SweepScheduler,
    Timer, TimerRegistry, TimerStore,
};
