//! # Timers Feature
//!
//! Natural-language reminder timers with acknowledgement and throttled
//! re-alerting.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Pure plan/commit sweep with per-delivery failure isolation
//! - 1.0.0: Initial release with six timespec grammars and ack lifecycle

pub mod parser;
pub mod registry;
pub mod scheduler;
pub mod timer;

pub use parser::{parse_clocktime, parse_timer, timer_help};
pub use registry::{Alert, NullStore, TimerRegistry, TimerStore};
pub use scheduler::{
    apply_alert, plan_sweep, AlertKind, Notifier, PlannedAlert, Presence, SweepScheduler,
};
pub use timer::Timer;
