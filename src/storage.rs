use log::{debug, info};
use serde::{Deserialize, Serialize};

use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use directories::ProjectDirs;

use crate::{
    gemini::{DEFAULT_BASE_URL, DEFAULT_SCRIPT_MODEL, DEFAULT_SPEECH_MODEL},
    generation::Voice,
    wav::WavBlob,
};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BatmiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub script_model: String,
    pub speech_model: String,
    pub voice: Voice,
    pub output_dir: Option<PathBuf>,
}

impl Default for BatmiConfig {
    fn default() -> Self {
        BatmiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            script_model: DEFAULT_SCRIPT_MODEL.into(),
            speech_model: DEFAULT_SPEECH_MODEL.into(),
            voice: Voice::default(),
            output_dir: None,
        }
    }
}

impl BatmiConfig {
    /// Applies environment overrides on top of the file contents.
    pub fn with_env_overrides(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }
}

fn project_dirs() -> Result<ProjectDirs, Box<dyn std::error::Error>> {
    ProjectDirs::from("com", "batmi", "batmi").ok_or_else(|| "could not determine home directory".into())
}

pub fn load_config() -> Result<BatmiConfig, Box<dyn std::error::Error>> {
    let config_path = project_dirs()?.config_dir().join("config.json");

    let config = match load_config_from(&config_path)? {
        Some(config) => {
            info!("loaded config from {}", config_path.display());
            config
        }
        None => {
            info!("creating and saving default config");
            let config = BatmiConfig::default();
            save_config_to(&config_path, &config)?;
            config
        }
    };

    Ok(config.with_env_overrides(std::env::var(API_KEY_ENV).ok()))
}

/// `None` when the file does not exist yet.
pub fn load_config_from(path: &Path) -> Result<Option<BatmiConfig>, Box<dyn std::error::Error>> {
    match File::open(path) {
        Ok(config_file) => Ok(Some(serde_json::from_reader(config_file)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn save_config_to(path: &Path, config: &BatmiConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    debug!("saving config to {}", path.display());
    let config_file = File::create(path)?;
    serde_json::to_writer_pretty(config_file, config)?;
    Ok(())
}

/// Where downloads go when the config does not name a directory.
pub fn default_output_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let proj_dirs = project_dirs()?;
    Ok(proj_dirs.data_local_dir().join("narrations"))
}

pub fn wav_file_name(at: SystemTime) -> String {
    let millis = at.duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
    format!("marathi-news-{}.wav", millis)
}

pub fn save_wav(dir: &Path, blob: &WavBlob) -> Result<PathBuf, Box<dyn std::error::Error>> {
    create_dir_all(dir)?;
    let path = dir.join(wav_file_name(SystemTime::now()));
    std::fs::write(&path, &blob.bytes)?;
    info!("saved {} bytes of {} to {}", blob.len(), blob.content_type(), path.display());
    Ok(path)
}
