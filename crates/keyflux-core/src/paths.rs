// Keyflux Configuration Paths

use std::io;
use std::path::{Path, PathBuf};

/// Where layouts and persisted state live on disk. Defaults to
/// `$XDG_CONFIG_HOME/keyflux`, overridable for tests and the CLI.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    root: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Option<Self> {
        dirs::config_dir().map(|base| Self {
            root: base.join("keyflux"),
        })
    }

    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.root.join("layouts")
    }

    pub fn layout_file(&self, name: &str) -> PathBuf {
        self.layouts_dir().join(format!("{}.toml", name))
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.toml")
    }

    /// Create the directory tree if it does not exist yet.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.layouts_dir())
    }
}
