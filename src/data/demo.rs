//! Synthetic example source
//!
//! Used when a data folder has no manifest, so the pipeline can run end to
//! end. Examples are generated from the seed and their index alone, so any
//! worker can materialise any example.

use super::example::{Example, ExampleMeta, LabelRegime};
use super::source::ExampleSource;
use crate::error::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shape of the generated corpus
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub num_examples: usize,
    /// Phoneme vocabulary size including blank
    pub vocab_size: usize,
    pub feature_dim: usize,
    /// Frames per unit of duration
    pub frame_rate: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Attach an augmented copy of the features
    pub augment: bool,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_examples: 96,
            vocab_size: 12,
            feature_dim: 16,
            frame_rate: 10.0,
            min_duration: 2.0,
            max_duration: 12.0,
            augment: false,
            seed: 42,
        }
    }
}

/// Deterministic synthetic corpus covering all three regimes
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SyntheticConfig,
    metas: Vec<ExampleMeta>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let metas = (0..config.num_examples)
            .map(|i| {
                let regime = LabelRegime::ALL[rng.random_range(0..LabelRegime::ALL.len())];
                let duration = if config.max_duration > config.min_duration {
                    rng.random_range(config.min_duration..config.max_duration)
                } else {
                    config.min_duration
                };
                ExampleMeta { id: format!("synthetic-{i:05}"), regime, duration }
            })
            .collect();
        Self { config, metas }
    }

    fn prototype(&self, phoneme: usize, dim: usize) -> f32 {
        (((phoneme + 1) * (dim + 1)) as f32 * 0.7).cos()
    }
}

impl ExampleSource for SyntheticSource {
    fn len(&self) -> usize {
        self.metas.len()
    }

    fn meta(&self, index: usize) -> &ExampleMeta {
        &self.metas[index]
    }

    fn load(&self, index: usize) -> Result<Example> {
        let meta = self
            .metas
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Data(format!("example index {index} out of range")))?;
        let cfg = &self.config;
        if cfg.vocab_size < 2 {
            return Err(Error::Data("synthetic vocabulary needs at least one phoneme".into()));
        }
        let mut rng = StdRng::seed_from_u64(cfg.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));

        let frames = ((meta.duration * cfg.frame_rate).round() as usize).max(1);
        let num_segments = (frames / 8).max(1);

        // Segment phonemes, no two neighbours equal
        let mut phonemes = Vec::with_capacity(num_segments);
        for _ in 0..num_segments {
            let mut p = rng.random_range(1..cfg.vocab_size);
            if cfg.vocab_size > 2 && phonemes.last() == Some(&p) {
                p = p % (cfg.vocab_size - 1) + 1;
            }
            phonemes.push(p);
        }

        let mut frame_labels = Vec::with_capacity(frames);
        let mut edges = Vec::with_capacity(frames);
        for f in 0..frames {
            let segment = f * num_segments / frames;
            let starts_segment = f > 0 && (f - 1) * num_segments / frames != segment;
            frame_labels.push(phonemes[segment]);
            edges.push(if starts_segment { 1.0 } else { 0.0 });
        }

        let features = Array2::from_shape_fn((frames, cfg.feature_dim), |(f, d)| {
            self.prototype(frame_labels[f], d) + rng.random_range(-0.1..0.1)
        });
        let augmented = cfg
            .augment
            .then(|| features.mapv(|x| x + rng.random_range(-0.05f32..0.05)));

        let (frame_labels, edges) = match meta.regime {
            LabelRegime::Full => (Some(frame_labels), Some(edges)),
            LabelRegime::Weak | LabelRegime::None => (None, None),
        };
        let phonemes = if meta.regime.has_phonemes() { phonemes } else { Vec::new() };

        Ok(Example { meta, features, augmented, phonemes, frame_labels, edges })
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn feature_dim(&self) -> usize {
        self.config.feature_dim
    }
}
