//! Inbound message routing: recording capture and action dispatch

use tracing::{debug, trace, warn};

use crate::actions::Actions;
use crate::midi::{format_hex, is_on_edge, to_unit, RawMessage};
use crate::profile::{Action, Binding, DeviceProfile, MidiMessageType};

/// What happened to one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Captured by at least one recording binding; nothing dispatched
    Recorded,
    /// This many capability calls were made
    Dispatched(usize),
    /// Bindings matched but none fired (off-edge, message type without
    /// meaning for the action, capability unavailable)
    Ignored,
    /// No binding matched. The common case, not an error.
    Unmatched,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched(_))
    }
}

/// Store `message` in every recording binding and stop their recording.
///
/// Returns true if any binding consumed the message.
pub(crate) fn record(profile: &mut DeviceProfile, message: &RawMessage) -> bool {
    let mut recorded = false;
    for binding in profile.bindings.iter_mut().filter(|b| b.is_recording) {
        binding.message = *message;
        binding.is_recording = false;
        recorded = true;
        debug!(
            "Recorded {} into binding {} of '{}'",
            format_hex(message),
            binding.id(),
            profile.name
        );
    }
    recorded
}

/// Fire every binding whose pattern matches `message`.
pub(crate) fn dispatch(
    bindings: &mut [Binding],
    actions: &Actions,
    message: &RawMessage,
) -> DispatchOutcome {
    let mut matched = false;
    let mut fired = 0;

    for binding in bindings.iter_mut().filter(|b| b.matches(message)) {
        matched = true;
        if fire(binding, actions, message) {
            fired += 1;
        }
    }

    match (matched, fired) {
        (false, _) => {
            trace!("No binding for {}", format_hex(message));
            DispatchOutcome::Unmatched
        }
        (true, 0) => DispatchOutcome::Ignored,
        (true, n) => DispatchOutcome::Dispatched(n),
    }
}

/// Run one binding's action. Returns true if a capability was called.
fn fire(binding: &mut Binding, actions: &Actions, message: &RawMessage) -> bool {
    let Some(action) = binding.action() else {
        return false;
    };
    let note = binding.message_type == MidiMessageType::NoteOnOff;
    let on_edge = is_on_edge(message);

    match action {
        Action::Volume => {
            let Some(volume) = &actions.volume else {
                return false;
            };
            report("volume", volume.set_volume(to_unit(message[2])));
            true
        }

        Action::Mute { .. } if !note => false,
        Action::Mute { toggle: true } => {
            let Some(mute) = &actions.mute else {
                return false;
            };
            if !on_edge {
                return false;
            }
            match mute.is_muted() {
                Ok(muted) => {
                    report("mute", mute.set_muted(!muted));
                    true
                }
                Err(e) => {
                    warn!("Cannot read mute state: {:#}", e);
                    false
                }
            }
        }
        Action::Mute { toggle: false } => {
            let Some(mute) = &actions.mute else {
                return false;
            };
            report("mute", mute.set_muted(on_edge));
            true
        }

        Action::ConsoleCommand { command, toggle } => {
            let Some(console) = &actions.console_command else {
                return false;
            };
            let value = match binding.message_type {
                MidiMessageType::ControlChange => f32::from(message[2]),
                MidiMessageType::NoteOnOff if !on_edge => return false,
                MidiMessageType::NoteOnOff if toggle => {
                    if binding.is_toggle_active {
                        0.0
                    } else {
                        1.0
                    }
                }
                MidiMessageType::NoteOnOff => 1.0,
                MidiMessageType::None => return false,
            };
            report("console command", console.execute(command, value));
            if note && toggle {
                binding.is_toggle_active = !binding.is_toggle_active;
            }
            true
        }

        Action::OpenFile { path } => {
            let Some(opener) = &actions.open_file else {
                return false;
            };
            if !note || !on_edge {
                return false;
            }
            report("open file", opener.open(path));
            true
        }
    }
}

/// Capability failures are logged, never propagated.
fn report(action: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        warn!("{} action failed: {:#}", action, e);
    }
}
