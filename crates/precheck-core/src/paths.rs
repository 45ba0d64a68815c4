//! Standard paths used by precheck

use std::path::{Path, PathBuf};

/// Standard precheck paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Data directory (~/.local/share/precheck)
    pub data: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("precheck");

        Self { data }
    }

    /// Paths rooted under a single directory instead of the user's home
    pub fn at(root: &Path) -> Self {
        Self {
            data: root.join("data"),
        }
    }

    /// Get state file path for a named record
    pub fn state(&self, name: &str) -> PathBuf {
        self.data.join(name)
    }
}
