// Session store abstraction
//
// The request client needs exactly two things from the session layer:
// the current bearer token (if any) and a way to invalidate it after a
// 401. Everything else about credential management lives behind this
// trait, so tests can inject a fixed token and the binary can use a
// file under the platform config directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Injectable session provider. The core depends only on this interface,
/// never on a concrete storage mechanism.
pub trait SessionStore: Send + Sync {
    /// Current bearer token, if a session exists.
    fn token(&self) -> Option<String>;

    /// Discard the stored credentials. Called on HTTP 401.
    fn invalidate(&self);
}

/// Token stored in a plain file (one line) under the config directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist a token, creating parent directories as needed.
    pub fn save(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token.trim())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SessionStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(_) => None,
        }
    }

    fn invalidate(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("could not remove token file {:?}: {}", self.path, e);
            }
        }
    }
}

/// In-memory session, used for env-provided tokens and in tests.
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl SessionStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn invalidate(&self) {
        self.token.lock().unwrap().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_invalidate() {
        let store = MemoryTokenStore::new(Some("tok".to_string()));
        assert_eq!(store.token().as_deref(), Some("tok"));
        store.invalidate();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("lookbook-test-{}", std::process::id()));
        let store = FileTokenStore::new(dir.join("token"));
        assert_eq!(store.token(), None);

        store.save("  abc123\n").unwrap();
        assert_eq!(store.token().as_deref(), Some("abc123"));

        store.invalidate();
        assert_eq!(store.token(), None);
        // Invalidating twice is a no-op.
        store.invalidate();

        let _ = std::fs::remove_dir_all(dir);
    }
}
