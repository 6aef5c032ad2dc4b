use std::borrow::Cow;

use log::debug;
use tokenizers::Tokenizer;

use super::error::ClassifierError;
use crate::engine::ModelInput;

/// How many token positions a model input may occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceLength {
    /// The model only accepts exactly this many positions; shorter inputs are padded
    Fixed(usize),
    /// The model accepts any length up to this many positions
    UpTo(usize),
}

impl SequenceLength {
    pub fn limit(&self) -> usize {
        match *self {
            Self::Fixed(n) | Self::UpTo(n) => n,
        }
    }
}

/// Converts text into model input tensors.
///
/// The process involves:
/// 1. Optional ASCII lowercasing
/// 2. Tokenization, including the special tokens the tokenizer's
///    post-processor adds (`[CLS]`, `[SEP]` for BERT vocabularies)
/// 3. Truncation to the sequence limit, keeping a trailing special token
/// 4. Zero padding up to a fixed sequence length
///
/// ```text
///                  |<------------ fixed length ------------>|
/// ids              [CLS] t1  t2 ...  tn [SEP]  0   0 ...   0
/// mask               1    1   1 ...   1   1    0   0 ...   0
/// segment_ids        0    0   0 ...   0   0    0   0 ...   0
/// ```
pub(crate) trait TextEncoding {
    fn tokenizer(&self) -> &Tokenizer;

    fn sequence_length(&self) -> SequenceLength;

    fn lowercase(&self) -> bool;

    fn preprocess<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.lowercase() {
            Cow::Owned(text.to_ascii_lowercase())
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Counts the tokens the text produces before truncation, special tokens
    /// included and padding excluded.
    fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        self.tokenizer()
            .encode(self.preprocess(text).as_ref(), true)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))
            .map(|encoding| encoding.get_attention_mask().iter().filter(|&&m| m == 1).count())
    }

    fn encode(&self, text: &str) -> Result<ModelInput, ClassifierError> {
        let tokenizer = self.tokenizer();
        let encoding = tokenizer
            .encode(self.preprocess(text).as_ref(), true)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let mut mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| i64::from(m)).collect();
        let mut segment_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| i64::from(t)).collect();

        let sequence_length = self.sequence_length();
        let limit = sequence_length.limit();
        if limit == 0 {
            return Err(ClassifierError::Inference("Model accepts no input positions".into()));
        }
        if ids.len() > limit {
            debug!("Truncating {} tokens to {}", ids.len(), limit);
            // Padding from the tokenizer's own config sits after the last real token
            let keep = mask
                .iter()
                .rposition(|&m| m == 1)
                .filter(|&last| last >= limit && encoding.get_special_tokens_mask().get(last) == Some(&1));
            for values in [&mut ids, &mut mask, &mut segment_ids] {
                let kept = keep.map(|last| values[last]);
                values.truncate(limit);
                if let Some(value) = kept {
                    values[limit - 1] = value;
                }
            }
        }

        if let SequenceLength::Fixed(n) = sequence_length {
            let pad_id = tokenizer.get_padding().map_or(0, |p| i64::from(p.pad_id));
            ids.resize(n, pad_id);
            mask.resize(n, 0);
            segment_ids.resize(n, 0);
        }

        Ok(ModelInput {
            ids,
            mask,
            segment_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const BERT_LIKE_TOKENIZER: &str = r#"{
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
                "good": 4, "morning": 5, "friend": 6
            },
            "unk_token": "[UNK]"
        }
    }"#;

    struct Encoder {
        tokenizer: Tokenizer,
        length: SequenceLength,
        lowercase: bool,
    }

    impl TextEncoding for Encoder {
        fn tokenizer(&self) -> &Tokenizer {
            &self.tokenizer
        }

        fn sequence_length(&self) -> SequenceLength {
            self.length
        }

        fn lowercase(&self) -> bool {
            self.lowercase
        }
    }

    fn encoder(length: SequenceLength) -> Encoder {
        Encoder {
            tokenizer: Tokenizer::from_str(BERT_LIKE_TOKENIZER).unwrap(),
            length,
            lowercase: true,
        }
    }

    #[test]
    fn test_adds_special_tokens_and_pads() {
        let input = encoder(SequenceLength::Fixed(8)).encode("Good morning friend").unwrap();
        assert_eq!(input.ids, vec![2, 4, 5, 6, 3, 0, 0, 0]);
        assert_eq!(input.mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(input.segment_ids, vec![0; 8]);
    }

    #[test]
    fn test_dynamic_length_is_not_padded() {
        let input = encoder(SequenceLength::UpTo(8)).encode("good morning").unwrap();
        assert_eq!(input.ids, vec![2, 4, 5, 3]);
        assert_eq!(input.token_count(), 4);
    }

    #[test]
    fn test_truncation_keeps_separator() {
        let input = encoder(SequenceLength::Fixed(4)).encode("good morning good friend").unwrap();
        assert_eq!(input.ids, vec![2, 4, 5, 3]);
        assert_eq!(input.mask, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_lowercase_is_optional() {
        let mut e = encoder(SequenceLength::UpTo(8));
        assert_eq!(e.encode("GOOD").unwrap().ids, vec![2, 4, 3]);
        e.lowercase = false;
        assert_eq!(e.encode("GOOD").unwrap().ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_token_counting() {
        let e = encoder(SequenceLength::Fixed(4));
        assert_eq!(e.count_tokens("good morning good friend").unwrap(), 6);
    }

    #[test]
    fn test_truncation_skips_tokenizer_padding() {
        let padded = BERT_LIKE_TOKENIZER.replace(
            r#""padding": null"#,
            r#""padding": {
                "strategy": { "Fixed": 16 },
                "direction": "Right",
                "pad_to_multiple_of": null,
                "pad_id": 0,
                "pad_type_id": 0,
                "pad_token": "[PAD]"
            }"#,
        );
        let mut e = encoder(SequenceLength::Fixed(4));
        e.tokenizer = Tokenizer::from_str(&padded).unwrap();

        let input = e.encode("good morning good friend").unwrap();
        assert_eq!(input.ids, vec![2, 4, 5, 3]);
        assert_eq!(input.mask, vec![1, 1, 1, 1]);
        assert_eq!(e.count_tokens("good morning good friend").unwrap(), 6);

        e.length = SequenceLength::Fixed(8);
        let input = e.encode("good morning").unwrap();
        assert_eq!(input.ids, vec![2, 4, 5, 3, 0, 0, 0, 0]);
        assert_eq!(input.mask, vec![1, 1, 1, 1, 0, 0, 0, 0]);
    }
}
