use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use nlclassifier::{AssetContext, ModelBundle, RuntimeConfig, ScoreTransform, TextClassifier};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify text with a model bundle
    Classify {
        /// Asset name of the bundle, resolved against the asset directories
        #[arg(short, long)]
        model: PathBuf,
        /// Asset directory; defaults to $NLCLASSIFIER_ASSETS or the platform data dir
        #[arg(short, long)]
        assets: Vec<PathBuf>,
        /// Text to classify
        #[arg(short, long)]
        text: String,
        /// Override the bundle's maximum sequence length
        #[arg(long)]
        max_seq_len: Option<usize>,
        /// Print the categories as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pack an ONNX model and a tokenizer.json into a bundle
    Pack {
        #[arg(long)]
        onnx: PathBuf,
        #[arg(long)]
        tokenizer: PathBuf,
        /// Comma-separated labels in model output order
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = nlclassifier::bundle::DEFAULT_MAX_SEQ_LEN)]
        max_seq_len: usize,
        /// Keep input case instead of lowercasing before tokenizing
        #[arg(long)]
        no_lowercase: bool,
        #[arg(long, default_value_t = ScoreTransform::None)]
        score_transform: ScoreTransform,
    },
    /// Print the metadata of a bundle file
    Inspect {
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Classify {
            model,
            assets,
            text,
            max_seq_len,
            json,
        } => classify(model, assets, &text, max_seq_len, json),
        Command::Pack {
            onnx,
            tokenizer,
            labels,
            output,
            name,
            max_seq_len,
            no_lowercase,
            score_transform,
        } => {
            let mut bundle = ModelBundle::from_files(&onnx, &tokenizer)
                .with_context(|| format!("Failed to pack {:?} with {:?}", onnx, tokenizer))?;
            bundle.metadata = bundle
                .metadata
                .with_labels(labels)
                .with_max_seq_len(max_seq_len)
                .with_lowercase(!no_lowercase)
                .with_score_transform(score_transform);
            if let Some(name) = name {
                bundle.metadata = bundle.metadata.with_name(name);
            }
            bundle.write_to(&output)?;
            println!("Wrote {}", output.display());
            Ok(())
        }
        Command::Inspect { model } => {
            let bytes = fs::read(&model).with_context(|| format!("Failed to read {:?}", model))?;
            let bundle = ModelBundle::decode(&bytes)?;
            let meta = &bundle.metadata;
            println!("name:            {}", meta.name.as_deref().unwrap_or("-"));
            println!("labels:          {}", meta.labels.join(", "));
            println!("max_seq_len:     {}", meta.max_seq_len);
            println!("lowercase:       {}", meta.lowercase);
            println!("score_transform: {}", meta.score_transform);
            println!("model bytes:     {}", bundle.model.len());
            Ok(())
        }
    }
}

fn classify(
    model: PathBuf,
    assets: Vec<PathBuf>,
    text: &str,
    max_seq_len: Option<usize>,
    json: bool,
) -> Result<()> {
    if text.is_empty() {
        bail!("Missing mandatory 'text' argument");
    }

    let mut roots = assets.into_iter();
    let context = match roots.next() {
        Some(first) => roots.fold(AssetContext::new(first), |ctx, root| ctx.with_root(root)),
        None => AssetContext::from_env(),
    };

    let start_time = Instant::now();
    let mut builder = TextClassifier::builder().with_runtime_config(RuntimeConfig::from_env());
    if let Some(n) = max_seq_len {
        builder = builder.with_max_seq_len(n)?;
    }
    let classifier = builder
        .build_from_path(&context, &model)
        .with_context(|| format!("Failed to load model {:?} from {:?}", model, context.roots()))?;
    info!("Classifier ready (took {:.2?})", start_time.elapsed());

    let classify_start = Instant::now();
    let categories = classifier.classify(text).context("Classification failed")?;
    info!("Classification took {:.2?}", classify_start.elapsed());

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for (i, category) in categories.iter().enumerate() {
            println!("category[{}]: '{}' : '{:.5}'", i, category.label(), category.score());
        }
    }
    Ok(())
}
