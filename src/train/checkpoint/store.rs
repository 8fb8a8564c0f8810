//! Checkpoint storage backends
//!
//! Checkpoints are JSON documents named `step=<n>.ckpt`. The filesystem
//! store writes to a temporary file and renames it into place, so a crash
//! mid-write never leaves a truncated checkpoint under a valid name.

use crate::error::{Error, Result};
use crate::optim::Param;
use crate::train::state::{TrainingState, WeightsFile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of every checkpoint
pub const CHECKPOINT_EXT: &str = "ckpt";

/// Persistent storage for training states, keyed by step
pub trait CheckpointStore: Send {
    fn save(&mut self, state: &TrainingState) -> Result<()>;

    fn load(&self, step: u64) -> Result<TrainingState>;

    fn delete(&mut self, step: u64) -> Result<()>;

    /// Stored steps in ascending order
    fn list(&self) -> Result<Vec<u64>>;

    /// Highest stored step
    fn latest_step(&self) -> Result<Option<u64>> {
        Ok(self.list()?.last().copied())
    }

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Name of the checkpoint file for a step
pub fn checkpoint_file_name(step: u64) -> String {
    format!("step={step}.{CHECKPOINT_EXT}")
}

/// Step encoded in a checkpoint file name, if it is one
pub fn parse_checkpoint_step(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("step=")?
        .strip_suffix(&format!(".{CHECKPOINT_EXT}"))?
        .parse()
        .ok()
}

/// Checkpoints under `<root>/<model_name>/`
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store for a run: `<ckpt_root>/<model_name>/`
    pub fn for_model(ckpt_root: &Path, model_name: &str) -> Self {
        Self::new(ckpt_root.join(model_name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, step: u64) -> PathBuf {
        self.dir.join(checkpoint_file_name(step))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, state: &TrainingState) -> Result<()> {
        let path = self.path_for(state.step);
        write_json_atomic(&path, state)?;
        tracing::debug!(path = %path.display(), step = state.step, "checkpoint written");
        Ok(())
    }

    fn load(&self, step: u64) -> Result<TrainingState> {
        let path = self.path_for(step);
        let content = fs::read_to_string(&path).map_err(|e| Error::checkpoint_io(&path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::checkpoint_io(&path, format!("corrupt checkpoint: {e}")))
    }

    fn delete(&mut self, step: u64) -> Result<()> {
        let path = self.path_for(step);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::checkpoint_io(&path, e.to_string())),
        }
    }

    fn list(&self) -> Result<Vec<u64>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::checkpoint_io(&self.dir, e.to_string())),
        };
        let mut steps = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::checkpoint_io(&self.dir, e.to_string()))?;
            if let Some(step) = entry.file_name().to_str().and_then(parse_checkpoint_step) {
                steps.push(step);
            }
        }
        steps.sort_unstable();
        Ok(steps)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::checkpoint_io(parent, e.to_string()))?;
    }
    let json = serde_json::to_string(value)?;
    let tmp = path.with_extension(format!("{CHECKPOINT_EXT}.tmp"));
    fs::write(&tmp, json).map_err(|e| Error::checkpoint_io(&tmp, e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| Error::checkpoint_io(path, e.to_string()))
}

/// In-process store holding serialized checkpoints
///
/// `fail_next_saves` makes the next saves fail, for exercising the
/// trainer's retry and continue-on-failure paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpointStore {
    entries: BTreeMap<u64, String>,
    failures_left: usize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_saves(&mut self, count: usize) {
        self.failures_left = count;
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&mut self, state: &TrainingState) -> Result<()> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(Error::checkpoint_io(
                format!("memory://{}", checkpoint_file_name(state.step)),
                "injected failure",
            ));
        }
        self.entries.insert(state.step, serde_json::to_string(state)?);
        Ok(())
    }

    fn load(&self, step: u64) -> Result<TrainingState> {
        let json = self
            .entries
            .get(&step)
            .ok_or_else(|| Error::checkpoint_io(format!("memory://{}", checkpoint_file_name(step)), "not found"))?;
        Ok(serde_json::from_str(json)?)
    }

    fn delete(&mut self, step: u64) -> Result<()> {
        self.entries.remove(&step);
        Ok(())
    }

    fn list(&self) -> Result<Vec<u64>> {
        Ok(self.entries.keys().copied().collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Weights-only checkpoint path for fine-tune runs: `<ckpt_root>/<model_name>.ckpt`
pub fn weights_path(ckpt_root: &Path, model_name: &str) -> PathBuf {
    ckpt_root.join(format!("{model_name}.{CHECKPOINT_EXT}"))
}

pub fn save_weights(path: &Path, weights: &WeightsFile) -> Result<()> {
    write_json_atomic(path, weights)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyCheckpoint {
    Full(Box<TrainingState>),
    Weights(WeightsFile),
}

/// Parameters from either a full checkpoint or a weights-only file
pub fn load_weights(path: &Path) -> Result<Vec<Param>> {
    let content = fs::read_to_string(path).map_err(|e| Error::checkpoint_io(path, e.to_string()))?;
    let parsed: AnyCheckpoint = serde_json::from_str(&content)
        .map_err(|e| Error::checkpoint_io(path, format!("not a checkpoint: {e}")))?;
    Ok(match parsed {
        AnyCheckpoint::Full(state) => state.params,
        AnyCheckpoint::Weights(weights) => weights.params,
    })
}
