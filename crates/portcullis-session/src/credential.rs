//! Credential storage: where the proof of a session lives between requests.
//!
//! A deployment picks exactly one [`CredentialMode`]:
//!
//! - **Cookie** — the server sets an HttpOnly cookie and the transport's
//!   cookie jar replays it. The client never sees it, so every
//!   [`CookieCredentials`] operation is a no-op.
//! - **Token** — the server returns a bearer token on login. The client
//!   keeps it in a durable [`KeySlot`] under [`TOKEN_KEY`] and sends it as
//!   `Authorization: Bearer <token>`.
//!
//! Both implement the one [`CredentialStore`] trait, so the rest of the
//! session layer only branches on [`CredentialStore::mode`] where the two
//! genuinely behave differently (resolve short-circuit, token persistence).

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::SessionError;

/// Fixed key the bearer token is stored under.
pub const TOKEN_KEY: &str = "auth_token";

/// Which persistence mechanism this deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialMode {
    /// Server-managed cookies, attached by the transport.
    #[default]
    Cookie,
    /// Client-held bearer token.
    Token,
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cookie => write!(f, "cookie"),
            Self::Token => write!(f, "token"),
        }
    }
}

impl std::str::FromStr for CredentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" | "cookies" => Ok(Self::Cookie),
            "token" | "bearer" => Ok(Self::Token),
            other => Err(format!("unknown credential mode `{other}`")),
        }
    }
}

/// The artifact proving a session to the server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A server-managed cookie, attached by the transport. Opaque: the
    /// client only knows it is in play.
    Ambient,
    /// A client-held bearer token.
    Bearer(String),
}

impl Credential {
    /// The bearer token, if this is one.
    pub fn bearer(&self) -> Option<&str> {
        match self {
            Self::Bearer(token) => Some(token),
            Self::Ambient => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient => write!(f, "Ambient"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Where the current credential is kept.
///
/// Synchronous on purpose: token storage is a small local slot, and a
/// synchronous `read` lets `resolve` decide "no token, no request" without
/// ever suspending.
pub trait CredentialStore: Send + Sync + 'static {
    /// The persistence mechanism this store implements.
    fn mode(&self) -> CredentialMode;

    /// Returns the locally held credential, or `None` when there is none.
    ///
    /// Absence is a normal state, not an error. A slot that cannot be read
    /// is reported as absent (and logged).
    fn read(&self) -> Option<Credential>;

    /// Persists a credential.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the durable slot cannot be written.
    fn write(&self, credential: Credential) -> Result<(), SessionError>;

    /// Forgets the local credential.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the durable slot cannot be cleared.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Cookie deployments: the browser/network stack owns the credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieCredentials;

impl CredentialStore for CookieCredentials {
    fn mode(&self) -> CredentialMode {
        CredentialMode::Cookie
    }

    /// Always [`Credential::Ambient`]: whether a cookie is actually set is
    /// for the server to judge.
    fn read(&self) -> Option<Credential> {
        Some(Credential::Ambient)
    }

    fn write(&self, _credential: Credential) -> Result<(), SessionError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Token deployments: the bearer token lives in a durable [`KeySlot`].
pub struct TokenCredentials<K: KeySlot> {
    slot: K,
}

impl<K: KeySlot> TokenCredentials<K> {
    pub fn new(slot: K) -> Self {
        Self { slot }
    }

    /// The underlying slot.
    pub fn slot(&self) -> &K {
        &self.slot
    }
}

impl<K: KeySlot> CredentialStore for TokenCredentials<K> {
    fn mode(&self) -> CredentialMode {
        CredentialMode::Token
    }

    fn read(&self) -> Option<Credential> {
        match self.slot.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                Some(Credential::Bearer(token))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "token slot unreadable, treating as absent");
                None
            }
        }
    }

    fn write(&self, credential: Credential) -> Result<(), SessionError> {
        match credential {
            Credential::Bearer(token) => {
                self.slot
                    .set(TOKEN_KEY, &token)
                    .map_err(SessionError::Storage)?;
                tracing::debug!("bearer token stored");
                Ok(())
            }
            Credential::Ambient => Ok(()),
        }
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.slot.remove(TOKEN_KEY).map_err(SessionError::Storage)?;
        tracing::debug!("bearer token cleared");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeySlot
// ---------------------------------------------------------------------------

/// A small string key-value store that token credentials are kept in.
pub trait KeySlot: Send + Sync + 'static {
    /// Returns the stored value, `Ok(None)` when the key is unset.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Removes the key. Removing an unset key is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// A process-local [`KeySlot`]. Does not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySlot for MemorySlot {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut values =
            self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut values =
            self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// A durable [`KeySlot`]: one file per key inside a directory.
///
/// The directory is created on first write. On Unix the files are
/// readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid slot key `{key}`"),
            ));
        }
        Ok(self.dir.join(key))
    }
}

impl KeySlot for FileSlot {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value.trim_end().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;

        // `mode` only applies on creation; a pre-existing file keeps its own.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(value.as_bytes())?;
        file.sync_all()
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // CredentialMode
    // =====================================================================

    #[test]
    fn test_mode_from_str_accepts_both_modes() {
        assert_eq!("cookie".parse::<CredentialMode>(), Ok(CredentialMode::Cookie));
        assert_eq!(" Token ".parse::<CredentialMode>(), Ok(CredentialMode::Token));
        assert_eq!("bearer".parse::<CredentialMode>(), Ok(CredentialMode::Token));
        assert!("jwt-in-url".parse::<CredentialMode>().is_err());
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let debug = format!("{:?}", Credential::Bearer("s3cret".into()));
        assert!(!debug.contains("s3cret"));
    }

    // =====================================================================
    // CookieCredentials
    // =====================================================================

    #[test]
    fn test_cookie_store_is_inert() {
        let store = CookieCredentials;
        store.write(Credential::Bearer("ignored".into())).unwrap();

        assert_eq!(store.mode(), CredentialMode::Cookie);
        assert_eq!(store.read(), Some(Credential::Ambient));
        assert!(store.clear().is_ok());
        assert_eq!(store.read(), Some(Credential::Ambient));
    }

    // =====================================================================
    // TokenCredentials
    // =====================================================================

    #[test]
    fn test_token_store_empty_reads_none() {
        let store = TokenCredentials::new(MemorySlot::new());
        assert!(store.read().is_none());
    }

    #[test]
    fn test_token_store_write_then_read() {
        let store = TokenCredentials::new(MemorySlot::new());
        store.write(Credential::Bearer("t1".into())).unwrap();

        assert_eq!(store.read(), Some(Credential::Bearer("t1".into())));
        assert_eq!(
            store.slot().get(TOKEN_KEY).unwrap().as_deref(),
            Some("t1")
        );
    }

    #[test]
    fn test_token_store_clear_removes_token() {
        let store = TokenCredentials::new(MemorySlot::new());
        store.write(Credential::Bearer("t1".into())).unwrap();

        store.clear().unwrap();

        assert!(store.read().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_token_store_empty_string_is_absent() {
        let slot = MemorySlot::new();
        slot.set(TOKEN_KEY, "").unwrap();
        let store = TokenCredentials::new(slot);

        assert!(store.read().is_none());
    }

    // =====================================================================
    // FileSlot
    // =====================================================================

    #[test]
    fn test_file_slot_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let first = TokenCredentials::new(FileSlot::new(dir.path()));
        first.write(Credential::Bearer("durable".into())).unwrap();

        // A fresh store over the same directory is what a restart sees.
        let second = TokenCredentials::new(FileSlot::new(dir.path()));
        assert_eq!(second.read(), Some(Credential::Bearer("durable".into())));
    }

    #[test]
    fn test_file_slot_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let slot = FileSlot::new(&nested);

        slot.set(TOKEN_KEY, "x").unwrap();

        assert!(nested.join(TOKEN_KEY).exists());
    }

    #[test]
    fn test_file_slot_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path());

        assert!(slot.remove(TOKEN_KEY).is_ok());
        assert_eq!(slot.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_slot_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path());

        let err = slot.set("../escape", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_slot_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path());
        slot.set(TOKEN_KEY, "x").unwrap();

        let mode = std::fs::metadata(dir.path().join(TOKEN_KEY))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_slot_tightens_existing_file_before_writing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_KEY);
        std::fs::write(&path, "old-token-with-a-longer-value").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .unwrap();

        let slot = FileSlot::new(dir.path());
        slot.set(TOKEN_KEY, "new").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(slot.get(TOKEN_KEY).unwrap().as_deref(), Some("new"));
    }
}
