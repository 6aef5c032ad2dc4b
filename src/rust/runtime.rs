use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use std::env;
use std::sync::OnceLock;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

pub const INTER_THREADS_ENV: &str = "NLCLASSIFIER_INTER_THREADS";
pub const INTRA_THREADS_ENV: &str = "NLCLASSIFIER_INTRA_THREADS";
pub const OPT_LEVEL_ENV: &str = "NLCLASSIFIER_OPT_LEVEL";

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

impl RuntimeConfig {
    /// Reads thread counts and the optimization level from the environment,
    /// keeping defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = env_usize(INTER_THREADS_ENV) {
            config.inter_threads = n;
        }
        if let Some(n) = env_usize(INTRA_THREADS_ENV) {
            config.intra_threads = n;
        }
        if let Ok(level) = env::var(OPT_LEVEL_ENV) {
            match parse_optimization_level(&level) {
                Some(level) => config.optimization_level = level,
                None => log::warn!("Ignoring unknown {} value '{}'", OPT_LEVEL_ENV, level),
            }
        }
        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let value = env::var(key).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("Ignoring non-numeric {} value '{}'", key, value);
            None
        }
    }
}

/// Parses `disable`, `0`-`3` or `level1`-`level3`
pub fn parse_optimization_level(value: &str) -> Option<GraphOptimizationLevel> {
    match value.trim().to_ascii_lowercase().as_str() {
        "disable" | "0" => Some(GraphOptimizationLevel::Disable),
        "level1" | "1" => Some(GraphOptimizationLevel::Level1),
        "level2" | "2" => Some(GraphOptimizationLevel::Level2),
        "level3" | "3" => Some(GraphOptimizationLevel::Level3),
        _ => None,
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("nlclassifier")
        .commit()?;
    Ok(())
}

pub fn ensure_initialized() -> Result<(), ClassifierError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| ClassifierError::ModelLoad(format!("Failed to initialize ONNX Runtime: {}", e)))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: GraphOptimizationLevel::Level1,
        };
        let builder = create_session_builder(&config);
        assert!(builder.is_ok());
    }

    #[test]
    fn test_parse_optimization_level() {
        assert!(matches!(parse_optimization_level("disable"), Some(GraphOptimizationLevel::Disable)));
        assert!(matches!(parse_optimization_level(" 2 "), Some(GraphOptimizationLevel::Level2)));
        assert!(matches!(parse_optimization_level("Level3"), Some(GraphOptimizationLevel::Level3)));
        assert!(parse_optimization_level("fast").is_none());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var(INTRA_THREADS_ENV, "4");
        env::set_var(INTER_THREADS_ENV, "many");
        env::set_var(OPT_LEVEL_ENV, "1");
        let config = RuntimeConfig::from_env();
        env::remove_var(INTRA_THREADS_ENV);
        env::remove_var(INTER_THREADS_ENV);
        env::remove_var(OPT_LEVEL_ENV);

        assert_eq!(config.intra_threads, 4);
        assert_eq!(config.inter_threads, 0);
        assert!(matches!(config.optimization_level, GraphOptimizationLevel::Level1));

        let cloned = config.clone();
        assert!(matches!(cloned.optimization_level, GraphOptimizationLevel::Level1));
    }
}
