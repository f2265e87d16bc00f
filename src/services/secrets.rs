// Secret storage for SteamCMD login passwords
//
// Passwords never live inside the config record. They are addressed like an
// OS keychain entry, by (service, account), behind the `SecretStore` trait;
// the default backing is a JSON file under the managed data directory. A
// `CredentialStore` layers the "remember password" semantics on top.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use crate::SERVICE_ID;

/// Keyed secret storage scoped to a fixed service identifier
///
/// Mirrors the (service, account) addressing of an OS keychain so one can
/// be substituted behind this seam without touching callers.
pub trait SecretStore: Send + Sync {
    /// Fetch the secret for an account, `None` when absent
    fn get(&self, account: &str) -> Result<Option<String>>;

    /// Store or overwrite the secret for an account
    fn set(&self, account: &str, secret: &str) -> Result<()>;

    /// Remove the secret for an account; removing an absent entry is fine
    fn delete(&self, account: &str) -> Result<()>;
}

/// JSON-file-backed secret store
///
/// Entries are keyed `<service>/<account>` in a flat JSON object. The file
/// is written with owner-only permissions on Unix.
pub struct FileSecretStore {
    path: Utf8PathBuf,
    service: String,
}

impl FileSecretStore {
    /// Create a store over the given secrets file (usually `secrets.json`
    /// under the data directory). The file is created lazily on first `set`.
    pub fn new<P: AsRef<Utf8Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            service: SERVICE_ID.to_string(),
        }
    }

    fn key(&self, account: &str) -> String {
        format!("{}/{}", self.service, account)
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read secrets file: {}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse secrets file: {}", self.path))
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)
            .context("Failed to serialize secrets")?;
        write_owner_only(&self.path, &content)
            .with_context(|| format!("Failed to write secrets file: {}", self.path))?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, account: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(&self.key(account)).cloned())
    }

    fn set(&self, account: &str, secret: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(self.key(account), secret.to_string());
        self.save(&entries)
    }

    fn delete(&self, account: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(&self.key(account)).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Write `contents` to `path` readable and writable by the owner only
#[cfg(unix)]
fn write_owner_only(path: &Utf8Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())?;

    // The mode above only applies at creation; repair pre-existing files too
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn write_owner_only(path: &Utf8Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}

/// In-memory secret store for tests and ephemeral use
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, account: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(account).cloned())
    }

    fn set(&self, account: &str, secret: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(account.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, account: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(account);
        Ok(())
    }
}

/// Session-aware credential access over a [`SecretStore`]
///
/// "Remember password" means "persist across restarts": a password entered
/// with remember off stays usable for the rest of the session through the
/// in-memory cache but never reaches the backing store. Turning remember
/// off deletes the persisted copy and keeps the session copy.
pub struct CredentialStore {
    store: Box<dyn SecretStore>,
    session: Mutex<HashMap<String, String>>,
}

impl CredentialStore {
    pub fn new(store: Box<dyn SecretStore>) -> Self {
        Self {
            store,
            session: Mutex::new(HashMap::new()),
        }
    }

    /// Record a password for an account
    ///
    /// Always updates the session cache. Persists when `remember` is true;
    /// otherwise any previously persisted copy is cleared so a stale
    /// password cannot outlive the session.
    pub fn store(&self, account: &str, secret: &str, remember: bool) -> Result<()> {
        self.session
            .lock()
            .unwrap()
            .insert(account.to_string(), secret.to_string());

        if remember {
            self.store.set(account, secret)?;
        } else {
            self.store.delete(account)?;
        }
        Ok(())
    }

    /// Apply a change of the remember flag to an already-stored password
    ///
    /// Turning remember on persists the session copy if one exists; turning
    /// it off deletes the persisted copy but leaves the session copy alone.
    pub fn set_remember(&self, account: &str, remember: bool) -> Result<()> {
        if remember {
            let cached = self.session.lock().unwrap().get(account).cloned();
            if let Some(secret) = cached {
                self.store.set(account, &secret)?;
            }
        } else {
            self.store.delete(account)?;
        }
        Ok(())
    }

    /// Fetch the password for an account: session cache first, then the
    /// backing store. A store hit is cached for the rest of the session.
    pub fn lookup(&self, account: &str) -> Result<Option<String>> {
        if let Some(secret) = self.session.lock().unwrap().get(account).cloned() {
            return Ok(Some(secret));
        }

        match self.store.get(account)? {
            Some(secret) => {
                self.session
                    .lock()
                    .unwrap()
                    .insert(account.to_string(), secret.clone());
                Ok(Some(secret))
            }
            None => Ok(None),
        }
    }

    /// Drop the password everywhere: session cache and backing store
    pub fn forget(&self, account: &str) -> Result<()> {
        self.session.lock().unwrap().remove(account);
        self.store.delete(account)
    }
}
