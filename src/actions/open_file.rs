//! Open a file with the host's default handler

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

use super::OpenFileAction;

#[derive(Debug, Default)]
pub struct SystemOpener;

impl SystemOpener {
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn opener(path: &Path) -> Command {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    }

    #[cfg(target_os = "macos")]
    fn opener(path: &Path) -> Command {
        let mut command = Command::new("open");
        command.arg(path);
        command
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn opener(path: &Path) -> Command {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}

impl OpenFileAction for SystemOpener {
    /// Missing paths are logged and ignored.
    fn open(&self, path: &str) -> Result<()> {
        let path = Path::new(path);
        if !path.exists() {
            warn!("Not opening missing file: {}", path.display());
            return Ok(());
        }

        let mut child = Self::opener(path)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to open {}", path.display()))?;
        info!("Opened {}", path.display());

        std::thread::Builder::new()
            .name("open-file".to_string())
            .spawn(move || {
                let _ = child.wait();
            })
            .context("Failed to spawn opener reaper thread")?;

        Ok(())
    }
}
