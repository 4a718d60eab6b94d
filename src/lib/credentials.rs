//! Ambient session credential storage. The backend identifies the session with
//! cookies, so the store keeps the cookie jar the gateway replays on every call.
//! Values are session secrets: they are never logged and `Debug` only shows
//! cookie names.

use cookie::{
    Cookie, CookieJar,
    time::{Duration, OffsetDateTime},
};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, warn};

/// Storage for the cookie-equivalent credential the transport carries automatically.
pub trait CredentialStore: Send + Sync {
    /// Returns the `Cookie` header value to send, if any credential is held.
    fn read(&self) -> Option<String>;
    /// Records the `Set-Cookie` header values of a response.
    fn store(&self, set_cookies: &[String]);
    /// Forgets every held credential.
    fn clear(&self);
}

/// Cookie jar kept in process memory. Expired cookies are never replayed.
#[derive(Default)]
pub struct MemoryCredentialStore {
    jar: Mutex<CookieJar>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_cookies(cookies: impl IntoIterator<Item = Cookie<'static>>) -> Self {
        let mut jar = CookieJar::new();
        for cookie in cookies {
            jar.add(cookie);
        }
        Self {
            jar: Mutex::new(jar),
        }
    }

    /// Returns the value of a single live cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        let now = OffsetDateTime::now_utc();
        self.jar()
            .get(name)
            .filter(|cookie| !is_expired(cookie, now))
            .map(|cookie| cookie.value().to_string())
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live cookies in `Set-Cookie` form, with `Max-Age` already turned into `Expires`.
    fn snapshot(&self) -> Vec<String> {
        let now = OffsetDateTime::now_utc();
        let mut cookies: Vec<String> = self
            .jar()
            .iter()
            .filter(|cookie| !is_expired(cookie, now))
            .map(ToString::to_string)
            .collect();
        cookies.sort();
        cookies
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self) -> Option<String> {
        let now = OffsetDateTime::now_utc();
        let mut pairs: Vec<String> = self
            .jar()
            .iter()
            .filter(|cookie| !is_expired(cookie, now))
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        Some(pairs.join("; "))
    }

    fn store(&self, set_cookies: &[String]) {
        let now = OffsetDateTime::now_utc();
        let mut jar = self.jar();
        for header in set_cookies {
            match Cookie::parse(header.clone()) {
                Ok(cookie) => apply_set_cookie(&mut jar, cookie, now),
                Err(err) => debug!("ignoring malformed Set-Cookie header: {err}"),
            }
        }
    }

    fn clear(&self) {
        *self.jar() = CookieJar::new();
    }
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .jar()
            .iter()
            .map(|cookie| cookie.name().to_string())
            .collect();
        names.sort();
        formatter
            .debug_struct("MemoryCredentialStore")
            .field("cookies", &names)
            .finish()
    }
}

/// Cookie jar persisted to a JSON file so a session survives process restarts.
///
/// The file is written with owner-only permissions on unix. Persistence failures
/// are logged and the in-memory jar keeps working.
pub struct FileCredentialStore {
    path: PathBuf,
    inner: MemoryCredentialStore,
}

impl FileCredentialStore {
    /// Opens the store, loading any previously persisted jar. Cookies that
    /// expired while the process was not running are dropped.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let headers: Vec<String> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err),
        };

        let now = OffsetDateTime::now_utc();
        let cookies = headers
            .into_iter()
            .filter_map(|header| match Cookie::parse(header) {
                Ok(cookie) => Some(cookie),
                Err(err) => {
                    debug!("dropping unreadable persisted cookie: {err}");
                    None
                }
            })
            .filter(|cookie| !is_expired(cookie, now));

        Ok(Self {
            path,
            inner: MemoryCredentialStore::with_cookies(cookies),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        if let Err(err) = write_jar(&self.path, &self.inner.snapshot()) {
            warn!(path = %self.path.display(), "Failed to persist session credential: {err}");
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self) -> Option<String> {
        self.inner.read()
    }

    fn store(&self, set_cookies: &[String]) {
        self.inner.store(set_cookies);
        self.persist();
    }

    fn clear(&self) {
        self.inner.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), "Failed to remove session file: {err}");
            }
        }
    }
}

impl fmt::Debug for FileCredentialStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FileCredentialStore")
            .field("path", &self.path)
            .field("inner", &self.inner)
            .finish()
    }
}

fn write_jar(path: &Path, cookies: &[String]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_vec_pretty(cookies)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    io::Write::write_all(&mut file, &payload)
}

/// Applies one `Set-Cookie`. An empty value, a non-positive `Max-Age` or an
/// `Expires` in the past deletes the cookie.
fn apply_set_cookie(jar: &mut CookieJar, mut cookie: Cookie<'static>, now: OffsetDateTime) {
    if cookie.value_trimmed().is_empty() || is_expired(&cookie, now) {
        jar.remove(Cookie::new(cookie.name().to_string(), ""));
        return;
    }

    // Max-Age is relative to receipt; pin it so a persisted jar stays correct.
    if let Some(expires) = cookie.max_age().and_then(|max_age| now.checked_add(max_age)) {
        cookie.set_expires(expires);
        cookie.set_max_age(None);
    }
    jar.add(cookie);
}

fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    cookie.max_age().is_some_and(|max_age| max_age <= Duration::ZERO)
        || cookie.expires_datetime().is_some_and(|expires| expires <= now)
}
