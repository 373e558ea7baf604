use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use super::{StateBackend, StoreError, StoreState};

/// Pretty-printed JSON document on local disk.
///
/// Saves go to a temp file in the same directory which is then renamed over
/// the target, so a crash mid-write leaves the previous document in place.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, data: &[u8]) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(data).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<StoreState>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(state).map_err(StoreError::Encode)?;
        self.write_atomic(data.as_bytes())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
