//! Example sources
//!
//! A source exposes cheap metadata for every example (used by the sampler
//! to plan batches) and materialises the payload on demand (called from
//! loader worker threads).

use super::example::{Example, ExampleMeta, LabelRegime};
use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Read-only collection of examples
pub trait ExampleSource: Send + Sync {
    /// Number of examples
    fn len(&self) -> usize;

    /// Metadata of example `index`
    fn meta(&self, index: usize) -> &ExampleMeta;

    /// Materialise example `index`
    fn load(&self, index: usize) -> Result<Example>;

    /// Phoneme vocabulary size including blank (id 0)
    fn vocab_size(&self) -> usize;

    /// Width of a feature frame
    fn feature_dim(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source over examples already held in memory
#[derive(Debug, Clone)]
pub struct InMemorySource {
    examples: Vec<Example>,
    vocab_size: usize,
    feature_dim: usize,
}

impl InMemorySource {
    pub fn new(examples: Vec<Example>, vocab_size: usize) -> Self {
        let feature_dim = examples.first().map_or(0, Example::feature_dim);
        Self { examples, vocab_size, feature_dim }
    }
}

impl ExampleSource for InMemorySource {
    fn len(&self) -> usize {
        self.examples.len()
    }

    fn meta(&self, index: usize) -> &ExampleMeta {
        &self.examples[index].meta
    }

    fn load(&self, index: usize) -> Result<Example> {
        self.examples
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Data(format!("example index {index} out of range")))
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }
}

/// One line of a JSON-lines manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub id: String,
    pub regime: LabelRegime,
    pub duration: f64,
    /// Frame-major feature rows
    pub features: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augmented: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    pub phonemes: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_labels: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<f32>>,
}

impl ExampleRecord {
    /// Convert to an example, checking that the payload matches the regime
    pub fn into_example(self) -> Result<Example> {
        let features = rows_to_array(&self.id, &self.features)?;
        let augmented = match &self.augmented {
            Some(rows) => {
                let aug = rows_to_array(&self.id, rows)?;
                if aug.dim() != features.dim() {
                    return Err(Error::Data(format!(
                        "{}: augmented features shape {:?} differs from {:?}",
                        self.id,
                        aug.dim(),
                        features.dim()
                    )));
                }
                Some(aug)
            }
            None => None,
        };

        let frames = features.nrows();
        let (frame_labels, edges) = match self.regime {
            LabelRegime::Full => {
                let labels = self.frame_labels.ok_or_else(|| {
                    Error::Data(format!("{}: full-label example without frame_labels", self.id))
                })?;
                let edges = self.edges.ok_or_else(|| {
                    Error::Data(format!("{}: full-label example without edges", self.id))
                })?;
                if labels.len() != frames || edges.len() != frames {
                    return Err(Error::Data(format!(
                        "{}: {frames} frames but {} labels and {} edges",
                        self.id,
                        labels.len(),
                        edges.len()
                    )));
                }
                (Some(labels), Some(edges))
            }
            LabelRegime::Weak | LabelRegime::None => (None, None),
        };
        if self.regime.has_phonemes() && self.phonemes.is_empty() {
            return Err(Error::Data(format!("{}: {} example without phonemes", self.id, self.regime)));
        }
        let phonemes = if self.regime.has_phonemes() { self.phonemes } else { Vec::new() };

        Ok(Example {
            meta: ExampleMeta { id: self.id, regime: self.regime, duration: self.duration },
            features,
            augmented,
            phonemes,
            frame_labels,
            edges,
        })
    }

    /// Inverse of [`ExampleRecord::into_example`]
    pub fn from_example(example: &Example) -> Self {
        let rows = |a: &Array2<f32>| a.rows().into_iter().map(|r| r.to_vec()).collect();
        Self {
            id: example.meta.id.clone(),
            regime: example.meta.regime,
            duration: example.meta.duration,
            features: rows(&example.features),
            augmented: example.augmented.as_ref().map(rows),
            phonemes: example.phonemes.clone(),
            frame_labels: example.frame_labels.clone(),
            edges: example.edges.clone(),
        }
    }
}

fn rows_to_array(id: &str, rows: &[Vec<f32>]) -> Result<Array2<f32>> {
    let width = rows.first().map_or(0, Vec::len);
    if rows.is_empty() || width == 0 {
        return Err(Error::Data(format!("{id}: example has no feature frames")));
    }
    let mut flat = Vec::with_capacity(rows.len() * width);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(Error::Data(format!(
                "{id}: feature row {i} has width {} (expected {width})",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| Error::Data(format!("{id}: {e}")))
}

/// Only the fields needed for planning; the payload is parsed lazily
#[derive(Deserialize)]
struct RecordHeader {
    id: String,
    regime: LabelRegime,
    duration: f64,
    #[serde(default)]
    phonemes: Vec<usize>,
    #[serde(default)]
    frame_labels: Option<Vec<usize>>,
}

/// Source backed by a JSON-lines manifest
///
/// Headers are parsed up front. The full record of an example is parsed in
/// [`ExampleSource::load`], i.e. on a loader worker.
#[derive(Debug)]
pub struct JsonlSource {
    lines: Vec<String>,
    metas: Vec<ExampleMeta>,
    vocab_size: usize,
    feature_dim: usize,
}

impl JsonlSource {
    /// Open a manifest; blank lines are ignored
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Data(format!("Failed to read manifest {}: {e}", path.display())))?;
        Self::parse(&content)
            .map_err(|e| Error::Data(format!("{}: {e}", path.display())))
    }

    /// Parse manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = Vec::new();
        let mut metas = Vec::new();
        let mut max_phoneme = 0;
        let mut feature_dim = 0;

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let header: RecordHeader = serde_json::from_str(line)
                .map_err(|e| Error::Data(format!("line {}: {e}", lineno + 1)))?;
            if !(header.duration.is_finite() && header.duration >= 0.0) {
                return Err(Error::Data(format!(
                    "line {}: invalid duration {}",
                    lineno + 1,
                    header.duration
                )));
            }
            if feature_dim == 0 {
                let record: ExampleRecord = serde_json::from_str(line)?;
                feature_dim = record.features.first().map_or(0, Vec::len);
            }
            let labels = header.frame_labels.iter().flatten();
            max_phoneme = header.phonemes.iter().chain(labels).fold(max_phoneme, |m, &p| m.max(p));
            metas.push(ExampleMeta { id: header.id, regime: header.regime, duration: header.duration });
            lines.push(line.to_string());
        }

        Ok(Self { lines, metas, vocab_size: max_phoneme + 1, feature_dim })
    }

    /// Override the vocabulary size inferred from the manifest
    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }
}

impl ExampleSource for JsonlSource {
    fn len(&self) -> usize {
        self.metas.len()
    }

    fn meta(&self, index: usize) -> &ExampleMeta {
        &self.metas[index]
    }

    fn load(&self, index: usize) -> Result<Example> {
        let line = self
            .lines
            .get(index)
            .ok_or_else(|| Error::Data(format!("example index {index} out of range")))?;
        let record: ExampleRecord = serde_json::from_str(line)?;
        record.into_example()
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }
}
