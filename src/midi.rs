//! Raw MIDI message helpers
//!
//! The engine only ever handles 3-byte channel messages. This module holds
//! the fixed-size message type, conversion from transport buffers and
//! formatting used by logs and the monitor view.

use std::fmt;

/// Number of bytes in every message the engine handles.
pub const MIDI_MESSAGE_BYTE_COUNT: usize = 3;

/// A status byte, data-1 byte and value byte.
pub type RawMessage = [u8; MIDI_MESSAGE_BYTE_COUNT];

/// Convert a transport buffer into a [`RawMessage`].
///
/// Returns `None` for anything that is not exactly 3 bytes long (SysEx,
/// program change, realtime bytes, ...).
pub fn to_raw_message(data: &[u8]) -> Option<RawMessage> {
    data.try_into().ok()
}

/// A Note On/Off message with a non-zero value byte.
pub fn is_on_edge(message: &RawMessage) -> bool {
    message[2] != 0
}

/// Scale a 7-bit value byte to `[0.0, 1.0]`.
pub fn to_unit(value: u8) -> f32 {
    f32::from(value.min(127)) / 127.0
}

/// Human readable view of a raw message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Note On with non-zero velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Note Off, or Note On with velocity 0
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Control Change
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Any other 3-byte message
    Other { status: u8, data1: u8, data2: u8 },
}

impl MessageKind {
    pub fn of(message: &RawMessage) -> Self {
        let [status, data1, data2] = *message;
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x90 if data2 != 0 => MessageKind::NoteOn {
                channel,
                note: data1 & 0x7F,
                velocity: data2 & 0x7F,
            },
            0x80 | 0x90 => MessageKind::NoteOff {
                channel,
                note: data1 & 0x7F,
                velocity: data2 & 0x7F,
            },
            0xB0 => MessageKind::ControlChange {
                channel,
                cc: data1 & 0x7F,
                value: data2 & 0x7F,
            },
            _ => MessageKind::Other {
                status,
                data1,
                data2,
            },
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageKind::NoteOn {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity),
            MessageKind::NoteOff {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity),
            MessageKind::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MessageKind::Other {
                status,
                data1,
                data2,
            } => write!(f, "status:{:02X} d1:{} d2:{}", status, data1, data2),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a message for the monitor output
pub fn format_monitor(timestamp: &str, message: &RawMessage) -> String {
    format!(
        "[{}] {} => {}",
        timestamp,
        format_hex(message),
        MessageKind::of(message)
    )
}
