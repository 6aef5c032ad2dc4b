use std::env;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use crate::classifier::ClassifierError;

/// Environment variable naming the primary asset directory
pub const ASSETS_ENV: &str = "NLCLASSIFIER_ASSETS";

/// The host application's packaged resources.
///
/// An `AssetContext` only resolves names to files. It never owns a loaded
/// model, so it can be dropped as soon as a handle has been created.
#[derive(Debug, Clone)]
pub struct AssetContext {
    roots: Vec<PathBuf>,
}

impl AssetContext {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            roots: vec![root.as_ref().to_path_buf()],
        }
    }

    /// Adds another root, searched after the existing ones
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.roots.push(root.as_ref().to_path_buf());
        self
    }

    /// Creates a context rooted at the default asset directory
    pub fn from_env() -> Self {
        Self::new(Self::get_default_assets_dir())
    }

    /// Returns the default asset directory path
    pub fn get_default_assets_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(ASSETS_ENV) {
            return PathBuf::from(path);
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("nlclassifier").join("assets");
        }

        // 3. Fall back to the working directory
        PathBuf::from("assets")
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolves a relative asset name to the first matching file.
    ///
    /// Absolute names and names that climb out of a root with `..` never
    /// resolve.
    pub fn resolve<P: AsRef<Path>>(&self, name: P) -> Result<PathBuf, ClassifierError> {
        let name = name.as_ref();
        let contained = !name.as_os_str().is_empty()
            && name.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            log::warn!("Refusing to resolve asset outside of the asset roots: {:?}", name);
            return Err(ClassifierError::ResourceNotFound(name.to_path_buf()));
        }

        for root in &self.roots {
            let candidate = root.join(name);
            log::debug!("Looking for asset at {:?}", candidate);
            if fs::metadata(&candidate).map(|m| m.is_file()).unwrap_or(false) {
                return Ok(candidate);
            }
        }
        Err(ClassifierError::ResourceNotFound(name.to_path_buf()))
    }

    /// Resolves and opens an asset for reading
    pub fn open<P: AsRef<Path>>(&self, name: P) -> Result<File, ClassifierError> {
        let path = self.resolve(name)?;
        Ok(File::open(path)?)
    }
}

impl Default for AssetContext {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_searches_roots_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("model.nlcb"), b"second").unwrap();

        let context = AssetContext::new(first.path()).with_root(second.path());
        assert_eq!(context.resolve("model.nlcb").unwrap(), second.path().join("model.nlcb"));

        fs::write(first.path().join("model.nlcb"), b"first").unwrap();
        assert_eq!(context.resolve("model.nlcb").unwrap(), first.path().join("model.nlcb"));
    }

    #[test]
    fn test_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let context = AssetContext::new(dir.path());
        let err = context.resolve("i/do/not/exist.nlcb").unwrap_err();
        assert!(matches!(err, ClassifierError::ResourceNotFound(p) if p == Path::new("i/do/not/exist.nlcb")));
    }

    #[test]
    fn test_directories_are_not_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("models")).unwrap();
        let context = AssetContext::new(dir.path());
        assert!(context.resolve("models").is_err());
    }

    #[test]
    fn test_escaping_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("assets");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("secret.nlcb"), b"x").unwrap();

        let context = AssetContext::new(&nested);
        assert!(context.resolve("../secret.nlcb").is_err());
        assert!(context.resolve(dir.path().join("secret.nlcb")).is_err());
        assert!(context.resolve("").is_err());
    }

    #[test]
    fn test_open_reads_asset() {
        use std::io::Read;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("labels.txt"), b"negative\npositive\n").unwrap();
        let mut contents = String::new();
        AssetContext::new(dir.path())
            .open("labels.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "negative\npositive\n");
    }

    #[test]
    fn test_default_assets_dir() {
        env::set_var(ASSETS_ENV, "/tmp/test-assets");
        let path = AssetContext::get_default_assets_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-assets"));
        env::remove_var(ASSETS_ENV);

        let path = AssetContext::get_default_assets_dir();
        assert!(path.ends_with("assets"));
    }
}
