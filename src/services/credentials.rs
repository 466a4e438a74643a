//! Admin credential resolution
//!
//! The persisted bearer token is session-wide mutable state. Only
//! [`CredentialProvider`] writes it; coordinators receive a
//! [`CredentialSource`] and go through `resolve`, `reject` and `invalidate`.

use std::{
    fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{error::AppResult, models::Credential};

/// What the coordinators see of the credential store
#[cfg_attr(test, mockall::automock)]
pub trait CredentialSource: Send + Sync {
    /// Cached or persisted token, else ask the user. `None` if they decline.
    fn resolve(&self) -> Option<Credential>;

    /// Forget the token; the next `resolve` asks again
    fn invalidate(&self);

    /// The server refused `rejected`. Forget it, unless a newer token has
    /// already replaced it.
    fn reject(&self, rejected: &Credential);
}

/// Persistence for the token between sessions
pub trait TokenStore: Send + Sync {
    fn load(&self) -> AppResult<Option<Credential>>;
    fn save(&self, credential: &Credential) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

/// Interactive source of a fresh token
pub trait TokenPrompt: Send + Sync {
    fn prompt(&self) -> Option<String>;
}

impl<F> TokenPrompt for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn prompt(&self) -> Option<String> {
        self()
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Token kept in a file readable only by the current user
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> AppResult<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Credential::new(raw))
    }

    fn save(&self, credential: &Credential) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, credential.expose())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session-only store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Credential>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> AppResult<Option<Credential>> {
        Ok(lock(&self.token).clone())
    }

    fn save(&self, credential: &Credential) -> AppResult<()> {
        *lock(&self.token) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        lock(&self.token).take();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Reads the token from the terminal without echo
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TokenPrompt for TerminalPrompt {
    fn prompt(&self) -> Option<String> {
        match rpassword::prompt_password("Admin token (leave empty to cancel): ") {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("Could not read admin token: {}", e);
                None
            }
        }
    }
}

/// Always declines; for non-interactive runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl TokenPrompt for NoPrompt {
    fn prompt(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct CredentialProvider {
    store: Box<dyn TokenStore>,
    prompt: Box<dyn TokenPrompt>,
    cached: Mutex<Option<Credential>>,
    /// Serialises store reads and prompts; `cached` is never held across one
    prompting: Mutex<()>,
}

impl CredentialProvider {
    pub fn new(store: impl TokenStore + 'static, prompt: impl TokenPrompt + 'static) -> Self {
        Self {
            store: Box::new(store),
            prompt: Box::new(prompt),
            cached: Mutex::new(None),
            prompting: Mutex::new(()),
        }
    }

    fn cached(&self) -> Option<Credential> {
        lock(&self.cached).clone()
    }

    fn forget(&self) {
        lock(&self.cached).take();
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored admin token: {}", e);
        }
        tracing::info!("Admin token invalidated");
    }
}

impl CredentialSource for CredentialProvider {
    fn resolve(&self) -> Option<Credential> {
        if let Some(credential) = self.cached() {
            return Some(credential);
        }

        // Concurrent callers wait here and then share the answer
        let _prompting = lock(&self.prompting);
        if let Some(credential) = self.cached() {
            return Some(credential);
        }

        match self.store.load() {
            Ok(Some(credential)) => {
                tracing::debug!("Loaded admin token from store");
                *lock(&self.cached) = Some(credential.clone());
                return Some(credential);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read stored admin token: {}", e),
        }

        let Some(credential) = self.prompt.prompt().and_then(Credential::new) else {
            tracing::info!("No admin token supplied");
            return None;
        };

        if let Err(e) = self.store.save(&credential) {
            // Still usable for this session
            tracing::warn!("Failed to persist admin token: {}", e);
        }
        *lock(&self.cached) = Some(credential.clone());
        Some(credential)
    }

    fn invalidate(&self) {
        self.forget();
    }

    fn reject(&self, rejected: &Credential) {
        if self.cached().is_some_and(|current| current != *rejected) {
            tracing::debug!("Ignoring rejection of a replaced admin token");
            return;
        }
        self.forget();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
