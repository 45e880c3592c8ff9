//! Services module
//!
//! Business logic services that sit between the command surface and storage.

pub mod persister;
pub mod settings;
pub mod tags;
pub mod ticker;
pub mod timer;

pub use persister::Persister;
pub use settings::{AppSettings, SettingsService, TimerMode};
pub use tags::TagRegistry;
pub use ticker::Ticker;
pub use timer::{EngineEvent, TimerEngine, TimerSnapshot, TimerState};
