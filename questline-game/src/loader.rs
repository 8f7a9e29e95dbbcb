//! JSON-backed content loader
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::CatalogLoader;
use crate::catalog::{Catalog, CatalogError};

/// Sample Istanbul catalog shipped with the crate.
pub const BUNDLED_CATALOG: &str = include_str!("../assets/data/catalog.json");

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Unknown config: {0}")]
    UnknownConfig(String),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loader over an in-memory catalog document plus named config documents.
#[derive(Debug, Clone)]
pub struct JsonLoader {
    catalog: String,
    configs: HashMap<String, String>,
}

impl JsonLoader {
    pub fn new(catalog_json: impl Into<String>) -> Self {
        Self {
            catalog: catalog_json.into(),
            configs: HashMap::new(),
        }
    }

    /// Loader for the catalog compiled into the crate.
    #[must_use]
    pub fn bundled() -> Self {
        Self::new(BUNDLED_CATALOG)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        read(path.as_ref()).map(Self::new)
    }

    /// Register the document returned for `name`.
    #[must_use]
    pub fn with_config(mut self, name: impl Into<String>, json: impl Into<String>) -> Self {
        self.configs.insert(name.into(), json.into());
        self
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn with_config_file(
        self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, LoaderError> {
        let json = read(path.as_ref())?;
        Ok(self.with_config(name, json))
    }
}

fn read(path: &Path) -> Result<String, LoaderError> {
    fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl CatalogLoader for JsonLoader {
    type Error = LoaderError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Ok(Catalog::from_json(&self.catalog)?)
    }

    fn has_config(&self, config_name: &str) -> bool {
        self.configs.contains_key(config_name)
    }

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        let json = self
            .configs
            .get(config_name)
            .ok_or_else(|| LoaderError::UnknownConfig(config_name.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ThemeKind;
    use crate::config::GameConfig;

    #[test]
    fn bundled_catalog_is_valid() {
        let catalog = JsonLoader::bundled().load_catalog().unwrap();
        assert_eq!(catalog.theme_count(), 5);
        assert_eq!(catalog.themes[0].checkpoint_question, 3);
        assert_eq!(catalog.themes[2].kind, ThemeKind::HeartGame);
        assert_eq!(catalog.themes[4].kind, ThemeKind::ChoiceGame);
        assert!(catalog.is_finale(4));
        assert_eq!(catalog.map_for(4), "images/maps/map-final.png");
        assert_eq!(catalog.reunion_image, "images/reunion.png");
    }

    #[test]
    fn named_configs_are_served() {
        let loader = JsonLoader::bundled().with_config("game", r#"{ "save_key": "alt" }"#);
        let cfg: GameConfig = loader.load_config("game").unwrap();
        assert_eq!(cfg.save_key, "alt");
        assert!(matches!(
            loader.load_config::<GameConfig>("weather"),
            Err(LoaderError::UnknownConfig(name)) if name == "weather"
        ));
    }

    #[test]
    fn invalid_catalog_surfaces_catalog_error() {
        let loader = JsonLoader::new(r#"{ "themes": [] }"#);
        assert!(matches!(
            loader.load_catalog(),
            Err(LoaderError::Catalog(CatalogError::Empty))
        ));
        let loader = JsonLoader::new("not json");
        assert!(matches!(
            loader.load_catalog(),
            Err(LoaderError::Catalog(CatalogError::Json(_)))
        ));
    }

    #[test]
    fn config_files_are_read_eagerly() {
        let path = std::env::temp_dir().join(format!(
            "questline-loader-config-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::write(&path, r#"{ "timings": { "reward_unlock_ms": 40 } }"#).unwrap();
        let loader = JsonLoader::bundled().with_config_file("game", &path).unwrap();
        let _ = fs::remove_file(&path);

        assert!(loader.has_config("game"));
        assert!(!loader.has_config("weather"));
        let cfg: GameConfig = loader.load_config("game").unwrap();
        assert_eq!(cfg.timings.reward_unlock_ms, 40);
        assert!(matches!(
            JsonLoader::bundled().with_config_file("game", &path),
            Err(LoaderError::Io { .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = JsonLoader::from_path("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
