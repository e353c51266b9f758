//! Access/refresh token persistence
//!
//! [`TokenStore`] is the storage seam; [`TokenManager`] is the handle the rest
//! of the client uses. Both tokens are always written and cleared together.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "jobdm_access_token";
/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "jobdm_refresh_token";

/// Persistence medium for the current token pair
///
/// Implementations never fail: when the medium is unavailable, reads return
/// `None` and writes are dropped.
pub trait TokenStore: Send + Sync {
    /// Current access token
    fn access_token(&self) -> Option<String>;

    /// Current refresh token
    fn refresh_token(&self) -> Option<String>;

    /// Replace both tokens
    fn set_tokens(&self, access_token: &str, refresh_token: &str);

    /// Delete both tokens; a no-op when none are stored
    fn remove_tokens(&self);
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(rename = "jobdm_access_token", default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "jobdm_refresh_token", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// In-process token store
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token pair
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        store.set_tokens(access_token, refresh_token);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens.read().ok()?.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens.read().ok()?.refresh_token.clone()
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        if let Ok(mut tokens) = self.tokens.write() {
            *tokens = StoredTokens {
                access_token: Some(access_token.to_string()),
                refresh_token: Some(refresh_token.to_string()),
            };
        }
    }

    fn remove_tokens(&self) {
        if let Ok(mut tokens) = self.tokens.write() {
            *tokens = StoredTokens::default();
        }
    }
}

/// Token store backed by a JSON file
///
/// The file holds one object keyed by [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`]. Writes go to a sibling temp file that is renamed
/// over the original.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// File name used inside a data directory
    pub const FILE_NAME: &'static str = "session.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `<data_dir>/session.json`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoredTokens {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                StoredTokens::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => StoredTokens::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Token storage unavailable");
                StoredTokens::default()
            }
        }
    }

    fn persist(&self, tokens: &StoredTokens) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(tokens)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;

        // Owner read/write only; the file holds bearer credentials
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &self.path)
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        let tokens = StoredTokens {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
        };
        if let Err(e) = self.persist(&tokens) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist tokens");
        }
    }

    fn remove_tokens(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove tokens"),
        }
    }
}

/// Shared handle over a [`TokenStore`]
///
/// Every write bumps a generation counter so cached views of the session
/// (see [`super::auth_check::AuthCheck`]) can tell the tokens changed.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    generation: Arc<watch::Sender<u64>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            store,
            generation: Arc::new(generation),
        }
    }

    /// Manager over a fresh [`MemoryTokenStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.refresh_token()
    }

    /// Whether a non-empty access token is stored; says nothing about validity
    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some_and(|t| !t.is_empty())
    }

    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.store.set_tokens(access_token, refresh_token);
        self.bump();
    }

    pub fn remove_tokens(&self) {
        self.store.remove_tokens();
        self.bump();
    }

    /// Number of completed writes so far
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("has_access_token", &self.has_access_token())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip(store: &dyn TokenStore) {
        store.set_tokens("access-1", "refresh-1");
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));

        store.set_tokens("access-2", "refresh-2");
        assert_eq!(store.access_token().as_deref(), Some("access-2"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-2"));

        store.remove_tokens();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);

        store.remove_tokens();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_memory_store_round_trip() {
        assert_round_trip(&MemoryTokenStore::new());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        assert_round_trip(&FileTokenStore::in_dir(dir.path()));
    }

    #[test]
    fn test_file_store_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        store.set_tokens("a", "r");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[ACCESS_TOKEN_KEY], "a");
        assert_eq!(raw[REFRESH_TOKEN_KEY], "r");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        store.set_tokens("a", "r");
        store.set_tokens("a2", "r2");

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "session file mode is {mode:o}");
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileTokenStore::in_dir(dir.path()).set_tokens("a", "r");

        let reopened = FileTokenStore::in_dir(dir.path());
        assert_eq!(reopened.access_token().as_deref(), Some("a"));
    }

    #[test]
    fn test_file_store_degrades_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        fs::write(store.path(), "not json").unwrap();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_file_store_unavailable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let store = FileTokenStore::in_dir(&blocker);

        store.set_tokens("a", "r");
        assert_eq!(store.access_token(), None);
        store.remove_tokens();
    }

    #[test]
    fn test_manager_bumps_generation_on_writes() {
        let manager = TokenManager::in_memory();
        assert_eq!(manager.generation(), 0);
        assert!(!manager.has_access_token());

        manager.set_tokens("a", "r");
        assert_eq!(manager.generation(), 1);
        assert!(manager.has_access_token());

        manager.remove_tokens();
        assert_eq!(manager.generation(), 2);
        assert!(!manager.has_access_token());
    }

    #[test]
    fn test_manager_treats_empty_token_as_absent() {
        let manager = TokenManager::new(Arc::new(MemoryTokenStore::with_tokens("", "r")));
        assert!(!manager.has_access_token());
    }
}
