use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use drill_core::{SessionConfig, DEFAULT_DECK_FILE, DEFAULT_LOG_FILE};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to encode default config: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub session: SessionConfig,
}

pub fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "drill", "Drill")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let io_err = |source: io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        let content = fs::read_to_string(path).map_err(io_err)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    } else {
        let cfg = ConfigFile::default();
        let content = toml::to_string_pretty(&cfg)?;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, content).map_err(io_err)?;
        log::info!("Wrote default config to {}", path.display());
        Ok(cfg)
    }
}

pub fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}

/// Flag, then config, then `cards.yaml` beside the executable, then the working directory.
pub fn resolve_deck_path(
    flag: Option<&Path>,
    session: &SessionConfig,
    exe_dir: Option<&Path>,
) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(path) = &session.deck_path {
        return path.clone();
    }
    if let Some(candidate) = exe_dir.map(|dir| dir.join(DEFAULT_DECK_FILE)) {
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from(DEFAULT_DECK_FILE)
}

pub fn resolve_log_path(flag: Option<&Path>, session: &SessionConfig) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| session.log_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::RatingCode;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_written_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let cfg = load_config(&path).unwrap();
        assert!(cfg.session.require_section);
        assert!(path.exists());

        let again = load_config(&path).unwrap();
        assert_eq!(again.session.rating_code, RatingCode::Letter);
    }

    #[test]
    fn test_partial_session_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[session]\nrating_code = \"word\"\nlog_path = \"answers.log\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.session.rating_code, RatingCode::Word);
        assert_eq!(cfg.session.log_path, Some(PathBuf::from("answers.log")));
        assert!(cfg.session.require_section);
        assert!(cfg.session.deck_path.is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "").unwrap();
        assert!(load_config(&path).unwrap().session.require_section);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[session]\nrating_code = \"loud\"\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_deck_path_precedence() {
        let temp = TempDir::new().unwrap();
        let mut session = SessionConfig::default();

        assert_eq!(
            resolve_deck_path(None, &session, Some(temp.path())),
            PathBuf::from("cards.yaml")
        );

        fs::write(temp.path().join("cards.yaml"), "cards:\n").unwrap();
        assert_eq!(
            resolve_deck_path(None, &session, Some(temp.path())),
            temp.path().join("cards.yaml")
        );

        session.deck_path = Some(PathBuf::from("from-config.yaml"));
        assert_eq!(
            resolve_deck_path(None, &session, Some(temp.path())),
            PathBuf::from("from-config.yaml")
        );
        assert_eq!(
            resolve_deck_path(Some(Path::new("flag.yaml")), &session, None),
            PathBuf::from("flag.yaml")
        );
    }

    #[test]
    fn test_log_path_precedence() {
        let mut session = SessionConfig::default();
        assert_eq!(resolve_log_path(None, &session), PathBuf::from("ratings.log"));
        session.log_path = Some(PathBuf::from("answers.log"));
        assert_eq!(resolve_log_path(None, &session), PathBuf::from("answers.log"));
        assert_eq!(
            resolve_log_path(Some(Path::new("x.log")), &session),
            PathBuf::from("x.log")
        );
    }
}
