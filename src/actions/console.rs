//! Console actions - log instead of touching the host
//!
//! Useful for:
//! - Trying out a profile without changing the system volume
//! - Hosts where no audio backend is available
//! - Tests that need to observe what the engine dispatched

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use tracing::info;

use super::{
    substitute_value, ConsoleCommandAction, MuteAction, MuteCallback, OpenFileAction,
    VolumeAction, VolumeCallback,
};

/// In-memory volume level that logs every change
pub struct ConsoleVolume {
    level: Mutex<f32>,
    callbacks: RwLock<Vec<VolumeCallback>>,
}

impl ConsoleVolume {
    pub fn new(level: f32) -> Self {
        Self {
            level: Mutex::new(level.clamp(0.0, 1.0)),
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl VolumeAction for ConsoleVolume {
    fn volume(&self) -> Result<f32> {
        Ok(*self.level.lock())
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        let changed = {
            let mut level = self.level.lock();
            let changed = *level != volume;
            *level = volume;
            changed
        };

        info!("🔊 Volume → {:.0}%", volume * 100.0);
        if changed {
            for callback in self.callbacks.read().iter() {
                callback(volume);
            }
        }
        Ok(())
    }

    fn on_change(&self, callback: VolumeCallback) {
        self.callbacks.write().push(callback);
    }
}

/// In-memory mute flag that logs every change
pub struct ConsoleMute {
    muted: Mutex<bool>,
    callbacks: RwLock<Vec<MuteCallback>>,
}

impl ConsoleMute {
    pub fn new(muted: bool) -> Self {
        Self {
            muted: Mutex::new(muted),
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl MuteAction for ConsoleMute {
    fn is_muted(&self) -> Result<bool> {
        Ok(*self.muted.lock())
    }

    fn set_muted(&self, muted: bool) -> Result<()> {
        let changed = std::mem::replace(&mut *self.muted.lock(), muted) != muted;

        info!("🔇 Mute → {}", if muted { "on" } else { "off" });
        if changed {
            for callback in self.callbacks.read().iter() {
                callback(muted);
            }
        }
        Ok(())
    }

    fn on_change(&self, callback: MuteCallback) {
        self.callbacks.write().push(callback);
    }
}

/// Logs the command line that would run
#[derive(Default)]
pub struct ConsoleCommandLogger {
    executed: Mutex<Vec<String>>,
}

impl ConsoleCommandLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command lines seen so far, after value substitution
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl ConsoleCommandAction for ConsoleCommandLogger {
    fn execute(&self, command: &str, value: f32) -> Result<()> {
        let command_line = substitute_value(command, value);
        info!("🎮 Console command (dry run): {}", command_line);
        self.executed.lock().push(command_line);
        Ok(())
    }
}

/// Logs the path that would open
#[derive(Default)]
pub struct ConsoleOpener {
    opened: Mutex<Vec<String>>,
}

impl ConsoleOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl OpenFileAction for ConsoleOpener {
    fn open(&self, path: &str) -> Result<()> {
        info!("📂 Open file (dry run): {}", path);
        self.opened.lock().push(path.to_string());
        Ok(())
    }
}
