//! Host actions driven by bindings (volume, mute, console commands, files)
//!
//! Each capability is a small trait so platform backends can be plugged in.
//! A capability that is missing on the host is simply `None` in [`Actions`]
//! and the matching bindings do nothing.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;

pub mod command;
pub mod console;
pub mod open_file;

pub use command::{substitute_value, ShellCommand, VALUE_TOKEN};
pub use console::{ConsoleCommandLogger, ConsoleMute, ConsoleOpener, ConsoleVolume};
pub use open_file::SystemOpener;

/// Called with the new volume in `[0.0, 1.0]`
pub type VolumeCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Called with the new mute state
pub type MuteCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Output volume of the default audio device
pub trait VolumeAction: Send + Sync {
    /// Current volume in `[0.0, 1.0]`
    fn volume(&self) -> Result<f32>;

    /// Set the volume, `volume` in `[0.0, 1.0]`
    fn set_volume(&self, volume: f32) -> Result<()>;

    /// Register for volume changes. Default: no notifications.
    fn on_change(&self, _callback: VolumeCallback) {}
}

/// Mute state of the default audio device
pub trait MuteAction: Send + Sync {
    fn is_muted(&self) -> Result<bool>;

    fn set_muted(&self, muted: bool) -> Result<()>;

    /// Register for mute changes. Default: no notifications.
    fn on_change(&self, _callback: MuteCallback) {}
}

/// Runs a shell command line
pub trait ConsoleCommandAction: Send + Sync {
    /// Run `command` with every [`VALUE_TOKEN`] replaced by `value`.
    fn execute(&self, command: &str, value: f32) -> Result<()>;
}

/// Opens a file with the host's default handler
pub trait OpenFileAction: Send + Sync {
    fn open(&self, path: &str) -> Result<()>;
}

/// The set of capabilities available to the engine
#[derive(Clone, Default)]
pub struct Actions {
    pub volume: Option<Arc<dyn VolumeAction>>,
    pub mute: Option<Arc<dyn MuteAction>>,
    pub console_command: Option<Arc<dyn ConsoleCommandAction>>,
    pub open_file: Option<Arc<dyn OpenFileAction>>,
}

impl Actions {
    /// No capabilities: every binding is a no-op.
    pub fn none() -> Self {
        Self::default()
    }

    /// Capabilities that work on any host without an audio backend.
    pub fn host() -> Self {
        Self {
            volume: None,
            mute: None,
            console_command: Some(Arc::new(ShellCommand::new())),
            open_file: Some(Arc::new(SystemOpener::new())),
        }
    }

    /// Logging stand-ins for everything; nothing leaves the process.
    pub fn dry_run() -> Self {
        Self {
            volume: Some(Arc::new(ConsoleVolume::new(1.0))),
            mute: Some(Arc::new(ConsoleMute::new(false))),
            console_command: Some(Arc::new(ConsoleCommandLogger::new())),
            open_file: Some(Arc::new(ConsoleOpener::new())),
        }
    }

    pub fn with_volume(mut self, volume: Arc<dyn VolumeAction>) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_mute(mut self, mute: Arc<dyn MuteAction>) -> Self {
        self.mute = Some(mute);
        self
    }

    pub fn with_console_command(mut self, console_command: Arc<dyn ConsoleCommandAction>) -> Self {
        self.console_command = Some(console_command);
        self
    }

    pub fn with_open_file(mut self, open_file: Arc<dyn OpenFileAction>) -> Self {
        self.open_file = Some(open_file);
        self
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("volume", &self.volume.is_some())
            .field("mute", &self.mute.is_some())
            .field("console_command", &self.console_command.is_some())
            .field("open_file", &self.open_file.is_some())
            .finish()
    }
}
