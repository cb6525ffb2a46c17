//! Engine state snapshots on disk.
//!
//! A snapshot captures position, peak, monthly flags and price history so a
//! later run resumes exactly where the previous one stopped.

use std::fs;
use std::path::Path;

use crate::domain::engine::EngineState;
use crate::domain::error::AlloctraderError;

pub fn save_state(state: &EngineState, path: &Path) -> Result<(), AlloctraderError> {
    let json = serde_json::to_string_pretty(state).map_err(|e| AlloctraderError::State {
        reason: format!("failed to serialise state: {e}"),
    })?;
    fs::write(path, json)?;
    Ok(())
}

/// `Ok(None)` when no snapshot exists yet.
pub fn load_state(path: &Path) -> Result<Option<EngineState>, AlloctraderError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| AlloctraderError::State {
            reason: format!("{}: {e}", path.display()),
        })
}
