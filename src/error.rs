//! Error types for the profile engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No input/output port pair resolves to the requested device.
    #[error("no MIDI port pairing found for device '{device}'")]
    NotFound { device: String },

    /// No connected device has a stored profile to activate.
    #[error("no connected MIDI device has a stored profile")]
    NoStoredProfile,

    /// The operation needs an active device profile.
    #[error("no device profile is active")]
    NotActive,

    #[error("profile store I/O failed for {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile store {} is malformed: {source}", path.display())]
    ProfileFormat {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("MIDI transport error: {0}")]
    Transport(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Error::ProfileFormat {
            path: path.into(),
            source,
        }
    }
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
