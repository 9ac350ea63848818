use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ron::ser::PrettyConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::flow_utils::state::{FlowEdge, FlowNode};
use super::settings::AppSettings;

// Fixed slot names; each maps to a JSON-encoded array on disk.
pub const NODES_SLOT: &str = "flow-nodes";
pub const EDGES_SLOT: &str = "flow-edges";

/// Whole-board snapshot written by the manual "Save Version" action.
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

static SETTINGS_OVERRIDE: OnceLock<AppSettings> = OnceLock::new();

pub fn set_settings_override(settings: AppSettings) {
    let _ = SETTINGS_OVERRIDE.set(settings);
}

fn autosave_dir() -> PathBuf {
    // If an override is set (e.g. from main.rs or a test harness), use it.
    if let Some(settings) = SETTINGS_OVERRIDE.get() {
        return settings.autosave_dir();
    }
    // Load settings if present; else use defaults
    let settings = AppSettings::load().unwrap_or_default();
    settings.autosave_dir()
}

pub fn slot_path(slot: &str) -> PathBuf {
    autosave_dir().join(format!("{}.json", slot))
}

pub fn versioned_board_path_now() -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    autosave_dir().join(format!("board_{}.ron", stamp))
}

fn ensure_autosave_dir() -> std::io::Result<()> {
    fs::create_dir_all(autosave_dir())
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

/// Serialize one sequence into its slot file. Called once per observed
/// state transition; callers surface failures but never retry.
pub fn save_slot<T: Serialize>(slot: &str, value: &[T]) -> anyhow::Result<PathBuf> {
    ensure_autosave_dir()?;
    let s = serde_json::to_string_pretty(value)?;
    let path = slot_path(slot);
    atomic_write(&path, s.as_bytes())?;
    Ok(path)
}

/// Read a slot back. A missing file is `None`; a parse failure bubbles up
/// so the caller can decide to degrade.
pub fn load_slot<T: DeserializeOwned>(slot: &str) -> anyhow::Result<Option<Vec<T>>> {
    let path = slot_path(slot);
    if !path.exists() {
        return Ok(None);
    }
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let value = serde_json::from_str(&buf)?;
    Ok(Some(value))
}

pub fn save_nodes(nodes: &[FlowNode]) -> anyhow::Result<PathBuf> {
    save_slot(NODES_SLOT, nodes)
}

pub fn save_edges(edges: &[FlowEdge]) -> anyhow::Result<PathBuf> {
    save_slot(EDGES_SLOT, edges)
}

// Absent or unreadable slots degrade to an empty sequence; startup never
// fails on bad board files.
pub fn load_nodes() -> Vec<FlowNode> {
    load_slot(NODES_SLOT).ok().flatten().unwrap_or_default()
}

pub fn load_edges() -> Vec<FlowEdge> {
    load_slot(EDGES_SLOT).ok().flatten().unwrap_or_default()
}

pub fn save_versioned(snapshot: &BoardSnapshot) -> anyhow::Result<PathBuf> {
    ensure_autosave_dir()?;
    let pretty = PrettyConfig::new()
        .separate_tuple_members(true)
        .enumerate_arrays(true);
    let s = ron::ser::to_string_pretty(snapshot, pretty)?;
    let path = versioned_board_path_now();
    atomic_write(&path, s.as_bytes())?;
    Ok(path)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<BoardSnapshot> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let snapshot: BoardSnapshot = ron::from_str(&buf)?;
    Ok(snapshot)
}

pub fn list_versions() -> anyhow::Result<Vec<PathBuf>> {
    let dir = autosave_dir();
    let mut entries: Vec<PathBuf> = Vec::new();
    if dir.exists() {
        for e in fs::read_dir(dir)? {
            let p = e?.path();
            if let Some(name) = p.file_name().and_then(|s| s.to_str())
                && name.starts_with("board_") && name.ends_with(".ron")
            {
                entries.push(p);
            }
        }
    }
    // sort descending by filename (timestamp)
    entries.sort();
    entries.reverse();
    Ok(entries)
}
