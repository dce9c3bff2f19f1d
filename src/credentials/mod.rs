//! Credential rotation for the API embedding provider.
//!
//! A line-oriented text file, one credential per line. Callers ask for the
//! "current" credential and may invalidate it after an `AUTH_FAILED`
//! response, which atomically rewrites the file without that line and
//! advances to the next. Grounded on the same hot-swap contract as
//! `original_source/src/embedding/providers/key_manager.py`'s `KeyManager`.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials file not found: {0}")]
    Missing(PathBuf),

    #[error("credentials file is empty: {0}")]
    Empty(PathBuf),

    #[error("credentials file io error: {0}")]
    Io(#[source] std::io::Error),
}

struct State {
    path: PathBuf,
    credentials: Vec<String>,
}

/// Thread-safe rotation over a credentials file. Cheap to clone (shares
/// state via `Arc` internally is unnecessary here — callers hold one
/// instance behind an `Arc` themselves).
pub struct CredentialFile {
    state: Mutex<State>,
}

impl CredentialFile {
    /// Load and validate the file. Fails if missing or empty, per contract.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref().to_path_buf();
        let credentials = read_lines(&path)?;
        if credentials.is_empty() {
            return Err(CredentialError::Empty(path));
        }
        Ok(Self {
            state: Mutex::new(State { path, credentials }),
        })
    }

    /// The credential currently in use.
    pub fn current(&self) -> Result<String, CredentialError> {
        let state = self.state.lock().expect("credential mutex poisoned");
        state
            .credentials
            .first()
            .cloned()
            .ok_or_else(|| CredentialError::Empty(state.path.clone()))
    }

    /// Drop the current (now-known-invalid) credential and advance to the
    /// next, rewriting the file atomically. Fails if no credentials remain.
    pub fn invalidate_current(&self) -> Result<(), CredentialError> {
        let mut state = self.state.lock().expect("credential mutex poisoned");
        if !state.credentials.is_empty() {
            state.credentials.remove(0);
        }
        if state.credentials.is_empty() {
            return Err(CredentialError::Empty(state.path.clone()));
        }
        write_atomic(&state.path, &state.credentials)?;
        Ok(())
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>, CredentialError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CredentialError::Missing(path.to_path_buf())
        } else {
            CredentialError::Io(e)
        }
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn write_atomic(path: &Path, credentials: &[String]) -> Result<(), CredentialError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(CredentialError::Io)?;
    for line in credentials {
        writeln!(tmp, "{line}").map_err(CredentialError::Io)?;
    }
    tmp.persist(path)
        .map_err(|e| CredentialError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = CredentialFile::load("/nonexistent/path/creds.txt").unwrap_err();
        assert!(matches!(err, CredentialError::Missing(_)));
    }

    #[test]
    fn empty_file_is_fatal() {
        let f = write_file("\n\n   \n");
        let err = CredentialFile::load(f.path()).unwrap_err();
        assert!(matches!(err, CredentialError::Empty(_)));
    }

    #[test]
    fn current_returns_first_credential() {
        let f = write_file("key-a\nkey-b\nkey-c\n");
        let creds = CredentialFile::load(f.path()).unwrap();
        assert_eq!(creds.current().unwrap(), "key-a");
    }

    #[test]
    fn invalidate_advances_and_persists() {
        let f = write_file("key-a\nkey-b\n");
        let creds = CredentialFile::load(f.path()).unwrap();
        creds.invalidate_current().unwrap();
        assert_eq!(creds.current().unwrap(), "key-b");

        let reloaded = CredentialFile::load(f.path()).unwrap();
        assert_eq!(reloaded.current().unwrap(), "key-b");
    }

    #[test]
    fn invalidating_last_credential_is_fatal() {
        let f = write_file("key-a\n");
        let creds = CredentialFile::load(f.path()).unwrap();
        let err = creds.invalidate_current().unwrap_err();
        assert!(matches!(err, CredentialError::Empty(_)));
    }
}
