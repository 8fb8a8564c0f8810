//! Training data: examples, sources and the batch sampler

pub mod demo;
pub mod example;
pub mod sampler;
pub mod source;

pub use demo::{SyntheticConfig, SyntheticSource};
pub use example::{Batch, Example, ExampleMeta, LabelRegime};
pub use sampler::{BatchSource, Sampler, SamplerConfig, SamplerPosition};
pub use source::{ExampleRecord, ExampleSource, InMemorySource, JsonlSource};

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Manifest file names inside a data folder
pub const TRAIN_MANIFEST: &str = "train.jsonl";
pub const VALID_MANIFEST: &str = "valid.jsonl";

/// Open `<data_folder>/<manifest>`, or fall back to a synthetic corpus
pub fn open_source(
    data_folder: &Path,
    manifest: &str,
    fallback: SyntheticConfig,
) -> Result<Arc<dyn ExampleSource>> {
    let path = data_folder.join(manifest);
    if path.exists() {
        let source = JsonlSource::open(&path)?;
        tracing::info!(path = %path.display(), examples = source.len(), "opened manifest");
        Ok(Arc::new(source))
    } else {
        tracing::warn!(
            path = %path.display(),
            examples = fallback.num_examples,
            "manifest not found, using synthetic examples"
        );
        Ok(Arc::new(SyntheticSource::new(fallback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_synthetic_source_is_deterministic() {
        let source = SyntheticSource::new(SyntheticConfig::default());
        let a = source.load(5).unwrap();
        let b = source.load(5).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.meta, b.meta);
    }

    #[test]
    fn test_synthetic_payload_matches_regime() {
        let source = SyntheticSource::new(SyntheticConfig { augment: true, ..Default::default() });
        for i in 0..source.len() {
            let ex = source.load(i).unwrap();
            assert_eq!(ex.feature_dim(), 16);
            assert!(ex.augmented.is_some());
            match ex.regime() {
                LabelRegime::Full => {
                    assert_eq!(ex.frame_labels.as_ref().map(Vec::len), Some(ex.num_frames()));
                    assert_eq!(ex.edges.as_ref().map(Vec::len), Some(ex.num_frames()));
                    assert!(!ex.phonemes.is_empty());
                }
                LabelRegime::Weak => {
                    assert!(ex.frame_labels.is_none());
                    assert!(!ex.phonemes.is_empty());
                }
                LabelRegime::None => assert!(ex.phonemes.is_empty()),
            }
            assert!(ex.phonemes.iter().all(|&p| p > 0 && p < source.vocab_size()));
        }
    }

    #[test]
    fn test_jsonl_round_trip() {
        let synthetic = SyntheticSource::new(SyntheticConfig { num_examples: 9, ..Default::default() });
        let manifest: String = (0..synthetic.len())
            .map(|i| {
                let record = ExampleRecord::from_example(&synthetic.load(i).unwrap());
                serde_json::to_string(&record).unwrap() + "\n"
            })
            .collect();

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TRAIN_MANIFEST), manifest).unwrap();
        let source = open_source(dir.path(), TRAIN_MANIFEST, SyntheticConfig::default()).unwrap();

        assert_eq!(source.len(), 9);
        assert_eq!(source.feature_dim(), 16);
        for i in 0..9 {
            let loaded = source.load(i).unwrap();
            let original = synthetic.load(i).unwrap();
            assert_eq!(loaded.meta, original.meta);
            assert_eq!(loaded.features, original.features);
            assert_eq!(loaded.frame_labels, original.frame_labels);
        }
    }

    #[test]
    fn test_jsonl_rejects_full_example_without_labels() {
        let line = r#"{"id":"a","regime":"full","duration":1.0,"features":[[0.0,1.0]],"phonemes":[1]}"#;
        let source = JsonlSource::parse(line).unwrap();
        assert_eq!(source.len(), 1);
        assert!(source.load(0).is_err());
    }

    #[test]
    fn test_jsonl_rejects_bad_duration() {
        let line = r#"{"id":"a","regime":"none","duration":-1.0,"features":[[0.0]]}"#;
        assert!(JsonlSource::parse(line).is_err());
    }

    #[test]
    fn test_missing_manifest_falls_back_to_synthetic() {
        let dir = TempDir::new().unwrap();
        let fallback = SyntheticConfig { num_examples: 7, ..Default::default() };
        let source = open_source(dir.path(), VALID_MANIFEST, fallback).unwrap();
        assert_eq!(source.len(), 7);
    }

    #[test]
    fn test_batch_helpers() {
        let source = SyntheticSource::new(SyntheticConfig { num_examples: 6, ..Default::default() });
        let examples: Vec<_> = (0..6).map(|i| source.load(i).unwrap()).collect();
        let expected: f64 = examples.iter().map(|e| e.meta.duration).sum();
        let batch = Batch { examples, epoch: 0, index: 0, bin: 0 };
        assert_eq!(batch.len(), 6);
        assert!((batch.total_duration() - expected).abs() < 1e-12);
        assert_eq!(batch.regime_counts().iter().sum::<usize>(), 6);
    }
}
