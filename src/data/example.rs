//! Examples, label regimes and batches

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supervision tier of an example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelRegime {
    /// Frame labels, boundaries and phoneme sequence
    Full,
    /// Phoneme sequence only
    Weak,
    /// Audio features only
    None,
}

impl LabelRegime {
    /// All regimes in `oversampling_weights` order
    pub const ALL: [LabelRegime; 3] = [LabelRegime::Full, LabelRegime::Weak, LabelRegime::None];

    /// Position in `oversampling_weights`
    pub fn index(self) -> usize {
        match self {
            LabelRegime::Full => 0,
            LabelRegime::Weak => 1,
            LabelRegime::None => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LabelRegime::Full => "full",
            LabelRegime::Weak => "weak",
            LabelRegime::None => "none",
        }
    }

    /// Whether examples of this regime carry a phoneme sequence
    pub fn has_phonemes(self) -> bool {
        matches!(self, LabelRegime::Full | LabelRegime::Weak)
    }
}

impl fmt::Display for LabelRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the sampler needs to know about an example without loading it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleMeta {
    pub id: String,
    pub regime: LabelRegime,
    /// Duration in the same unit as `batch_max_length`
    pub duration: f64,
}

/// One materialised training example
#[derive(Debug, Clone)]
pub struct Example {
    pub meta: ExampleMeta,
    /// Frame features, shape `(frames, feature_dim)`
    pub features: Array2<f32>,
    /// Augmented copy of `features`, same shape
    pub augmented: Option<Array2<f32>>,
    /// Phoneme ids (full and weak regimes); 0 is reserved for blank
    pub phonemes: Vec<usize>,
    /// Per-frame phoneme class (full regime)
    pub frame_labels: Option<Vec<usize>>,
    /// Per-frame boundary target in `[0, 1]` (full regime)
    pub edges: Option<Vec<f32>>,
}

impl Example {
    pub fn regime(&self) -> LabelRegime {
        self.meta.regime
    }

    pub fn num_frames(&self) -> usize {
        self.features.nrows()
    }

    pub fn feature_dim(&self) -> usize {
        self.features.ncols()
    }
}

/// Duration-bounded group of examples from one duration bin
#[derive(Debug, Clone)]
pub struct Batch {
    pub examples: Vec<Example>,
    /// Epoch the batch was planned in
    pub epoch: u64,
    /// Position of the batch within its epoch
    pub index: usize,
    /// Duration bin the examples were drawn from
    pub bin: u64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Sum of example durations
    pub fn total_duration(&self) -> f64 {
        self.examples.iter().map(|e| e.meta.duration).sum()
    }

    /// Number of examples per regime, in `LabelRegime::ALL` order
    pub fn regime_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for example in &self.examples {
            counts[example.regime().index()] += 1;
        }
        counts
    }
}
