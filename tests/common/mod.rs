#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nlclassifier::{
    BundleMetadata, ClassifierError, InferenceEngine, ModelBundle, ModelInput, ScoreTransform,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NEGATIVE_TEXT: &str = "unflinchingly bleak and desperate";
pub const POSITIVE_TEXT: &str = "it's a charming and often affecting journey";

pub fn sentiment_tokenizer() -> serde_json::Value {
    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
                "unflinchingly": 4, "bleak": 5, "and": 6, "desperate": 7,
                "it": 8, "'": 9, "s": 10, "a": 11, "charming": 12,
                "often": 13, "affecting": 14, "journey": 15
            },
            "unk_token": "[UNK]"
        }
    })
}

/// Model bytes understood by [`LexiconEngine`]: per-token logit contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconSpec {
    pub outputs: usize,
    pub weights: HashMap<i64, Vec<f32>>,
    #[serde(default)]
    pub static_length: Option<usize>,
}

impl LexiconSpec {
    pub fn sentiment() -> Self {
        let weights = HashMap::from([
            (4, vec![0.5, 0.0]),  // unflinchingly
            (5, vec![2.0, 0.0]),  // bleak
            (7, vec![2.0, 0.0]),  // desperate
            (12, vec![0.0, 2.0]), // charming
            (14, vec![0.0, 1.0]), // affecting
            (15, vec![0.0, 0.5]), // journey
        ]);
        Self {
            outputs: 2,
            weights,
            static_length: None,
        }
    }

    pub fn with_static_length(mut self, n: usize) -> Self {
        self.static_length = Some(n);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }
}

/// Counts models that are loaded and not yet dropped
#[derive(Debug)]
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct LexiconModel {
    spec: LexiconSpec,
    _guard: LiveGuard,
}

/// A lexicon scorer standing in for a neural engine: each known token adds
/// a fixed contribution to every output.
#[derive(Debug, Clone, Default)]
pub struct LexiconEngine {
    live: Arc<AtomicUsize>,
}

impl LexiconEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loaded models that have not been released
    pub fn live_models(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for LexiconEngine {
    type Model = LexiconModel;

    fn name(&self) -> &str {
        "lexicon"
    }

    fn load(&self, model: &[u8]) -> Result<LexiconModel, ClassifierError> {
        let spec: LexiconSpec = serde_json::from_slice(model)
            .map_err(|e| ClassifierError::ModelLoad(format!("Not a lexicon model: {}", e)))?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(LexiconModel {
            spec,
            _guard: LiveGuard(Arc::clone(&self.live)),
        })
    }

    fn input_length(&self, model: &LexiconModel) -> Option<usize> {
        model.spec.static_length
    }

    fn run(&self, model: &LexiconModel, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        if let Some(n) = model.spec.static_length {
            if input.len() != n {
                return Err(ClassifierError::Inference(format!(
                    "Expected {} positions, got {}",
                    n,
                    input.len()
                )));
            }
        }
        if input.mask.len() != input.len() || input.segment_ids.len() != input.len() {
            return Err(ClassifierError::Inference("Ragged input tensors".into()));
        }

        let mut logits = vec![0.0f32; model.spec.outputs];
        for (id, mask) in input.ids.iter().zip(&input.mask) {
            if *mask == 0 {
                continue;
            }
            if let Some(weights) = model.spec.weights.get(id) {
                for (logit, w) in logits.iter_mut().zip(weights) {
                    *logit += w;
                }
            }
        }
        Ok(logits)
    }
}

pub fn sentiment_metadata() -> BundleMetadata {
    BundleMetadata::new(sentiment_tokenizer())
        .with_name("sentiment-lexicon")
        .with_labels(vec!["negative", "positive"])
        .with_score_transform(ScoreTransform::Softmax)
}

pub fn bundle_bytes(metadata: BundleMetadata, spec: &LexiconSpec) -> Vec<u8> {
    ModelBundle::new(metadata, spec.to_bytes()).encode().unwrap()
}

pub fn sentiment_bundle() -> Vec<u8> {
    bundle_bytes(sentiment_metadata(), &LexiconSpec::sentiment())
}
