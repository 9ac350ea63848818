use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::flow_utils::state::DEFAULT_SPAWN_EXTENT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, use OS default autosave directory
    pub autosave_override: Option<PathBuf>,
    // Side length of the square freshly created nodes are scattered over
    #[serde(default = "AppSettings::default_spawn_extent")]
    pub spawn_extent: f32,
    // Draw user-drawn connections with the animated dash treatment
    #[serde(default = "AppSettings::default_animate_new_edges")]
    pub animate_new_edges: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autosave_override: None,
            spawn_extent: Self::default_spawn_extent(),
            animate_new_edges: Self::default_animate_new_edges(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Flow-Pad
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Flow-Pad");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Flow-Pad
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Flow-Pad");
            }
            return PathBuf::from("Flow-Pad");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Flow-Pad or ~/.config/Flow-Pad
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Flow-Pad");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Flow-Pad");
        }
    }

    fn autosave_default_dir() -> PathBuf {
        // Cross-platform user-writable autosave dir
        #[cfg(target_os = "macos")]
        {
            let tmp = std::env::var_os("TMPDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
            return tmp.join("Flow-Pad");
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Flow-Pad\Autosave else TEMP
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join("Flow-Pad").join("Autosave");
            }
            if let Ok(temp) = std::env::var("TEMP") {
                return PathBuf::from(temp).join("Flow-Pad");
            }
            return PathBuf::from("Flow-Pad");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_STATE_HOME/flow-pad or ~/.local/state/flow-pad, else /tmp/Flow-Pad
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("flow-pad");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("flow-pad");
            }
            return PathBuf::from("/tmp").join("Flow-Pad");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let json_path = Self::config_dir().join("settings.json");
        if json_path.exists() {
            let mut f = std::fs::File::open(json_path)?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            let v: Self = serde_json::from_str(&s)?;
            return Ok(v);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = std::fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn autosave_dir(&self) -> PathBuf {
        if let Some(p) = &self.autosave_override { return p.clone(); }
        Self::autosave_default_dir()
    }

    /// Return the directory where the settings file (settings.json) is stored.
    /// This is OS-specific and resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    pub(crate) fn default_spawn_extent() -> f32 { DEFAULT_SPAWN_EXTENT }
    pub(crate) fn default_animate_new_edges() -> bool { true }
}
