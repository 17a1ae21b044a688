use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "pocketlm";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path error: {0}")]
    PathError(String),
}

/// Returns the platform-specific data directory for pocketlm.
///
/// - macOS: `~/Library/Application Support/pocketlm`
/// - Linux: `$XDG_DATA_HOME/pocketlm` (defaults to `~/.local/share/pocketlm`)
/// - Windows: `%APPDATA%\pocketlm`
pub fn data_dir() -> Result<PathBuf, PathError> {
    Ok(dirs::data_dir()
        .ok_or_else(|| PathError::PathError("could not determine data directory".into()))?
        .join(APP_NAME))
}

/// Returns the directory where downloaded model artifacts (GGUF files) live.
///
/// Located at `data_dir()/models`.
pub fn models_dir() -> Result<PathBuf, PathError> {
    Ok(data_dir()?.join("models"))
}

/// Returns the path to the entity store file.
///
/// Located at `data_dir()/store.json`.
pub fn store_file() -> Result<PathBuf, PathError> {
    Ok(data_dir()?.join("store.json"))
}

/// Creates all pocketlm directories if they do not already exist.
pub fn ensure_dirs() -> Result<(), PathError> {
    fs::create_dir_all(data_dir()?).map_err(|e| PathError::PathError(e.to_string()))?;
    fs::create_dir_all(models_dir()?).map_err(|e| PathError::PathError(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_dir_is_under_data_dir() {
        let data = data_dir().unwrap();
        let models = models_dir().unwrap();
        assert!(models.starts_with(&data));
        assert!(models.ends_with("models"));
    }

    #[test]
    fn store_file_name() {
        let file = store_file().unwrap();
        assert_eq!(file.file_name().unwrap(), "store.json");
    }
}
