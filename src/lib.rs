//! MIDI Binder
//!
//! Binds knobs, faders and pads of a MIDI controller to host actions
//! (volume, mute, console commands, opening files). One device profile is
//! active at a time; profiles are stored in a YAML document keyed by device
//! name.

pub mod actions;
pub mod engine;
pub mod error;
pub mod midi;
pub mod paths;
pub mod profile;
pub mod store;
pub mod transport;

pub use actions::Actions;
pub use engine::{DeviceState, DispatchOutcome, Engine, OutputHandle};
pub use error::{Error, Result};
pub use midi::RawMessage;
pub use paths::AppPaths;
pub use profile::{Action, ActionType, Binding, BindingId, DeviceProfile, MidiMessageType};
pub use store::ProfileStore;
pub use transport::{MidiBackend, MidirBackend};
