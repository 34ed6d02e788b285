//! Device profile and binding types
//!
//! A [`DeviceProfile`] owns the bindings of one MIDI controller. Each
//! [`Binding`] maps the first two bytes of a message to an action.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::midi::RawMessage;

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(0);

/// How the value byte of a matched message is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MidiMessageType {
    #[default]
    None,
    /// Buttons and pads: the value byte is an on/off edge
    NoteOnOff,
    /// Knobs and faders: the value byte is a continuous value
    ControlChange,
}

impl MidiMessageType {
    pub const ALL: [MidiMessageType; 3] = [
        MidiMessageType::None,
        MidiMessageType::NoteOnOff,
        MidiMessageType::ControlChange,
    ];

    /// Numeric code used in the profiles file
    pub fn code(self) -> u8 {
        match self {
            MidiMessageType::None => 0,
            MidiMessageType::NoteOnOff => 1,
            MidiMessageType::ControlChange => 2,
        }
    }

    /// Unknown codes fall back to `None`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => MidiMessageType::NoteOnOff,
            2 => MidiMessageType::ControlChange,
            _ => MidiMessageType::None,
        }
    }
}

impl fmt::Display for MidiMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessageType::None => write!(f, "none"),
            MidiMessageType::NoteOnOff => write!(f, "note on/off"),
            MidiMessageType::ControlChange => write!(f, "control change"),
        }
    }
}

/// Which capability a binding drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ActionType {
    #[default]
    None,
    Volume,
    Mute,
    ConsoleCommand,
    OpenFile,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::None,
        ActionType::Volume,
        ActionType::Mute,
        ActionType::ConsoleCommand,
        ActionType::OpenFile,
    ];

    /// Numeric code used in the profiles file
    pub fn code(self) -> u8 {
        match self {
            ActionType::None => 0,
            ActionType::Volume => 1,
            ActionType::Mute => 2,
            ActionType::ConsoleCommand => 3,
            ActionType::OpenFile => 4,
        }
    }

    /// Unknown codes fall back to `None`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ActionType::Volume,
            2 => ActionType::Mute,
            3 => ActionType::ConsoleCommand,
            4 => ActionType::OpenFile,
            _ => ActionType::None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::None => write!(f, "none"),
            ActionType::Volume => write!(f, "volume"),
            ActionType::Mute => write!(f, "mute"),
            ActionType::ConsoleCommand => write!(f, "console command"),
            ActionType::OpenFile => write!(f, "open file"),
        }
    }
}

/// Action a binding resolves to, borrowing its parameters from the binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    Volume,
    Mute { toggle: bool },
    ConsoleCommand { command: &'a str, toggle: bool },
    OpenFile { path: &'a str },
}

/// Process-local identity of a binding. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        BindingId(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One controller knob or button bound to one action.
///
/// Equality and hashing use the runtime id only: two bindings with the
/// same bytes are distinct entities.
#[derive(Debug, Clone)]
pub struct Binding {
    id: BindingId,
    pub owner_device_name: String,
    pub message_type: MidiMessageType,
    pub action_type: ActionType,
    pub console_command: String,
    pub open_file_path: String,
    /// Last recorded or entered message. Bytes 0 and 1 form the match key.
    pub message: RawMessage,
    pub toggle: bool,

    /// Capture the next inbound message into `message`
    pub is_recording: bool,
    /// Latched state of a toggle-mode console command
    pub is_toggle_active: bool,
}

impl Binding {
    pub fn new(owner_device_name: impl Into<String>) -> Self {
        Self {
            id: BindingId::next(),
            owner_device_name: owner_device_name.into(),
            message_type: MidiMessageType::None,
            action_type: ActionType::None,
            console_command: String::new(),
            open_file_path: String::new(),
            message: [0; 3],
            toggle: false,
            is_recording: false,
            is_toggle_active: false,
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    /// Copy of the persisted fields under a fresh id.
    pub fn duplicate(&self) -> Self {
        Self {
            id: BindingId::next(),
            is_recording: false,
            is_toggle_active: false,
            ..self.clone()
        }
    }

    /// The status and data-1 bytes that inbound messages are matched on
    pub fn match_pattern(&self) -> [u8; 2] {
        [self.message[0], self.message[1]]
    }

    /// True if `message` has this binding's status and data-1 bytes.
    /// The value byte is ignored.
    pub fn matches(&self, message: &RawMessage) -> bool {
        message[0] == self.message[0] && message[1] == self.message[1]
    }

    pub fn action(&self) -> Option<Action<'_>> {
        match self.action_type {
            ActionType::None => None,
            ActionType::Volume => Some(Action::Volume),
            ActionType::Mute => Some(Action::Mute {
                toggle: self.toggle,
            }),
            ActionType::ConsoleCommand => Some(Action::ConsoleCommand {
                command: &self.console_command,
                toggle: self.toggle,
            }),
            ActionType::OpenFile => Some(Action::OpenFile {
                path: &self.open_file_path,
            }),
        }
    }

    /// Compare everything that is written to the profiles file.
    pub fn same_persisted_fields(&self, other: &Binding) -> bool {
        self.owner_device_name == other.owner_device_name
            && self.message_type == other.message_type
            && self.action_type == other.action_type
            && self.console_command == other.console_command
            && self.open_file_path == other.open_file_path
            && self.message == other.message
            && self.toggle == other.toggle
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Binding {}

impl Hash for Binding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Bindings and startup messages of one named MIDI controller.
///
/// Equality and hashing use `name` only.
#[derive(Debug, Clone, Default)]
pub struct DeviceProfile {
    /// Sanitized device name, also the key in the profiles file
    pub name: String,
    input_port: usize,
    output_port: usize,
    /// Sent once, in order, right after activation
    pub initial_output_messages: Vec<RawMessage>,
    pub bindings: Vec<Binding>,
}

impl DeviceProfile {
    pub fn new(name: impl Into<String>, input_port: usize, output_port: usize) -> Self {
        Self {
            name: name.into(),
            input_port,
            output_port,
            initial_output_messages: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// A profile that is not bound to any port, for store access.
    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(name, 0, 0)
    }

    pub fn input_port(&self) -> usize {
        self.input_port
    }

    pub fn output_port(&self) -> usize {
        self.output_port
    }

    /// Append an empty binding owned by this device and return its id.
    pub fn add_binding(&mut self) -> BindingId {
        let binding = Binding::new(self.name.clone());
        let id = binding.id();
        self.bindings.push(binding);
        id
    }

    pub fn remove_binding(&mut self, id: BindingId) -> Option<Binding> {
        let index = self.bindings.iter().position(|b| b.id() == id)?;
        Some(self.bindings.remove(index))
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.id() == id)
    }

    pub fn binding_mut(&mut self, id: BindingId) -> Option<&mut Binding> {
        self.bindings.iter_mut().find(|b| b.id() == id)
    }

    pub fn add_initial_output_message(&mut self, message: RawMessage) {
        self.initial_output_messages.push(message);
    }

    pub fn remove_initial_output_message(&mut self, index: usize) -> Option<RawMessage> {
        (index < self.initial_output_messages.len())
            .then(|| self.initial_output_messages.remove(index))
    }

    /// True if any binding is waiting to capture a message.
    pub fn is_recording(&self) -> bool {
        self.bindings.iter().any(|b| b.is_recording)
    }
}

impl PartialEq for DeviceProfile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DeviceProfile {}

impl Hash for DeviceProfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
