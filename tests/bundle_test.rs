mod common;

use std::fs;

use common::*;
use nlclassifier::{
    AssetContext, ClassifierError, ModelBundle, ModelHandle, ScoreTransform, TextClassifier,
};

#[test]
fn test_pack_from_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let model_path = dir.path().join("model.bin");
    let tokenizer_path = dir.path().join("tokenizer.json");
    fs::write(&model_path, LexiconSpec::sentiment().to_bytes())?;
    fs::write(&tokenizer_path, serde_json::to_vec(&sentiment_tokenizer())?)?;

    let mut bundle = ModelBundle::from_files(&model_path, &tokenizer_path)?;
    bundle.metadata = bundle
        .metadata
        .with_labels(vec!["negative", "positive"])
        .with_score_transform(ScoreTransform::Softmax);
    bundle.write_to(dir.path().join("assets/sentiment.nlcb"))?;

    let context = AssetContext::new(dir.path().join("assets"));
    let handle = ModelHandle::from_path_with(LexiconEngine::new(), &context, "sentiment.nlcb")?;
    assert_eq!(handle.labels(), ["negative", "positive"]);
    assert_eq!(handle.metadata().score_transform, ScoreTransform::Softmax);

    let classifier = TextClassifier::new(handle);
    let result = classifier.classify(NEGATIVE_TEXT)?;
    assert_eq!(result.top().map(|c| c.label()), Some("negative"));
    Ok(())
}

#[test]
fn test_pack_rejects_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let tokenizer_path = dir.path().join("tokenizer.json");
    fs::write(&tokenizer_path, serde_json::to_vec(&sentiment_tokenizer()).unwrap()).unwrap();

    let result = ModelBundle::from_files(dir.path().join("missing.onnx"), &tokenizer_path);
    assert!(matches!(result, Err(ClassifierError::ResourceNotFound(_))));
}

#[test]
fn test_pack_rejects_invalid_tokenizer() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.bin");
    let tokenizer_path = dir.path().join("tokenizer.json");
    fs::write(&model_path, b"weights").unwrap();
    fs::write(&tokenizer_path, b"{ not json").unwrap();

    let result = ModelBundle::from_files(&model_path, &tokenizer_path);
    assert!(matches!(result, Err(ClassifierError::Tokenizer(_))));
}

#[test]
fn test_decode_preserves_metadata() {
    let bytes = sentiment_bundle();
    let bundle = ModelBundle::decode(&bytes).unwrap();
    assert_eq!(bundle.metadata, sentiment_metadata());
    assert_eq!(bundle.encode().unwrap(), bytes);
}
