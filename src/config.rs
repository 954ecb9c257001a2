use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use crate::assets::Assets;
use crate::error::ConfigError;
use crate::quiz::bundled::BundledTestSource;
use crate::quiz::firestore::{FirestoreClient, DEFAULT_BASE_URL};
use crate::quiz::remote::RemoteTestSource;
use crate::quiz::TestDataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSourceKind {
    Bundled,
    Remote,
}

impl std::str::FromStr for TestSourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bundled" | "local" | "json" => Ok(TestSourceKind::Bundled),
            "remote" | "firestore" => Ok(TestSourceKind::Remote),
            _ => Err(ConfigError::UnknownTestSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub assets_dir: PathBuf,
    pub test_source: TestSourceKind,
    pub firestore_project_id: Option<String>,
    pub firestore_api_key: Option<String>,
    pub firestore_base_url: String,
    pub dialogue_db: String,
    /// Whether the test generator also writes to the document store.
    pub upload_to_store: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            test_source: TestSourceKind::Bundled,
            firestore_project_id: None,
            firestore_api_key: None,
            firestore_base_url: DEFAULT_BASE_URL.to_string(),
            dialogue_db: "db.sqlite".to_string(),
            upload_to_store: false,
        }
    }
}

impl Config {
    /// Reads the process environment (call `dotenv()` first to pick up `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let test_source = match non_empty("TEST_SOURCE") {
            Some(value) => value.parse()?,
            None => defaults.test_source,
        };
        let upload_to_store = match non_empty("UPLOAD_TO_STORE") {
            Some(value) => parse_flag("UPLOAD_TO_STORE", &value)?,
            None => defaults.upload_to_store,
        };
        let firestore_project_id = non_empty("FIRESTORE_PROJECT_ID");
        if (test_source == TestSourceKind::Remote || upload_to_store) && firestore_project_id.is_none() {
            return Err(ConfigError::Missing("FIRESTORE_PROJECT_ID"));
        }

        Ok(Self {
            assets_dir: non_empty("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            test_source,
            firestore_project_id,
            firestore_api_key: non_empty("FIRESTORE_API_KEY"),
            firestore_base_url: non_empty("FIRESTORE_BASE_URL").unwrap_or(defaults.firestore_base_url),
            dialogue_db: non_empty("DIALOGUE_DB").unwrap_or(defaults.dialogue_db),
            upload_to_store,
        })
    }

    pub fn assets(&self) -> Assets {
        Assets::new(&self.assets_dir)
    }

    /// The test source selected by `TEST_SOURCE`.
    pub fn test_source(&self) -> Result<Arc<dyn TestDataSource>, ConfigError> {
        match self.test_source {
            TestSourceKind::Bundled => {
                info!("Loading tests from bundled file in {}", self.assets_dir.display());
                Ok(Arc::new(BundledTestSource::new(self.assets())))
            }
            TestSourceKind::Remote => {
                let client = self.document_store()?;
                info!("Loading tests from Firestore project {}", client.project_id());
                Ok(Arc::new(RemoteTestSource::new(client)))
            }
        }
    }

    pub fn document_store(&self) -> Result<FirestoreClient, ConfigError> {
        let project_id = self
            .firestore_project_id
            .as_deref()
            .ok_or(ConfigError::Missing("FIRESTORE_PROJECT_ID"))?;
        Ok(FirestoreClient::new(
            &self.firestore_base_url,
            project_id,
            self.firestore_api_key.clone(),
        )?)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}
