//! Auth token persistence on top of a secure key-value store.
//!
//! The platform keychain is out of scope; anything implementing `SecureStore`
//! can back the credentials. `MemoryStore` is the in-process implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const AUTH_TOKEN_EXPIRE_DATE_KEY: &str = "authTokenExpireDate";

/// Tokens expiring within this window are treated as already expired.
const EXPIRY_LOOKAHEAD_SECS: i64 = 3600;

/// Secure string storage, partitioned by a scope identifier.
pub trait SecureStore: Send + Sync {
    fn get(&self, scope: &str, key: &str) -> Option<String>;
    fn set(&self, scope: &str, key: &str, value: &str);
    fn remove(&self, scope: &str, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, scope: &str, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&(scope.to_string(), key.to_string())).cloned()
    }

    fn set(&self, scope: &str, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert((scope.to_string(), key.to_string()), value.to_string());
    }

    fn remove(&self, scope: &str, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&(scope.to_string(), key.to_string()));
    }
}

/// The auth token and its expiration, as seen by the rest of the client.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecureStore>,
    scope: String,
    date_format: String,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn SecureStore>, scope: &str, date_format: &str) -> Self {
        Self {
            store,
            scope: scope.to_string(),
            date_format: date_format.to_string(),
        }
    }

    /// `None` for either value removes it from the store.
    pub fn set_auth_token(&self, token: Option<&str>, expiration: Option<&str>) {
        self.put(AUTH_TOKEN_KEY, token);
        self.put(AUTH_TOKEN_EXPIRE_DATE_KEY, expiration);
    }

    pub fn auth_token(&self) -> Option<String> {
        self.store.get(&self.scope, AUTH_TOKEN_KEY)
    }

    pub fn expiration(&self) -> Option<String> {
        self.store.get(&self.scope, AUTH_TOKEN_EXPIRE_DATE_KEY)
    }

    pub fn token_exists(&self) -> bool {
        self.auth_token().is_some()
    }

    pub fn token_expired(&self) -> bool {
        self.token_expired_at(Utc::now())
    }

    /// True when there is no expiration, it cannot be parsed, or it falls
    /// within an hour of `now`.
    pub fn token_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(raw) = self.expiration() else {
            return true;
        };
        match self.parse_expiration(&raw) {
            Some(expires) => expires < now + Duration::seconds(EXPIRY_LOOKAHEAD_SECS),
            None => {
                tracing::warn!(expiration = %raw, format = %self.date_format, "unparseable token expiration");
                true
            }
        }
    }

    /// The stored token, provided it has not expired.
    pub fn valid_token(&self) -> Option<String> {
        self.valid_token_at(Utc::now())
    }

    pub fn valid_token_at(&self, now: DateTime<Utc>) -> Option<String> {
        let token = self.auth_token()?;
        if self.token_expired_at(now) {
            tracing::debug!("stored auth token is expired, not attaching");
            return None;
        }
        Some(token)
    }

    pub fn clear(&self) {
        self.store.remove(&self.scope, AUTH_TOKEN_KEY);
        self.store.remove(&self.scope, AUTH_TOKEN_EXPIRE_DATE_KEY);
    }

    fn put(&self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => self.store.set(&self.scope, key, v),
            None => self.store.remove(&self.scope, key),
        }
    }

    fn parse_expiration(&self, raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_str(raw, &self.date_format) {
            return Some(dt.with_timezone(&Utc));
        }
        // Formats without an offset are read as UTC.
        NaiveDateTime::parse_from_str(raw, &self.date_format)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("scope", &self.scope)
            .field("date_format", &self.date_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new()), "TestID", FORMAT)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn set_and_read_token() {
        let creds = store();
        creds.set_auth_token(Some("abc"), Some("2024-05-02T12:00:00+0000"));
        assert_eq!(creds.auth_token().as_deref(), Some("abc"));
        assert!(creds.token_exists());
        assert!(!creds.token_expired_at(now()));
        assert_eq!(creds.valid_token_at(now()).as_deref(), Some("abc"));
    }

    #[test]
    fn missing_expiration_counts_as_expired() {
        let creds = store();
        creds.set_auth_token(Some("abc"), None);
        assert!(creds.token_expired_at(now()));
        assert!(creds.valid_token_at(now()).is_none());
    }

    #[test]
    fn expiry_inside_lookahead_window_is_expired() {
        let creds = store();
        creds.set_auth_token(Some("abc"), Some("2024-05-01T12:30:00+0000"));
        assert!(creds.token_expired_at(now()));
    }

    #[test]
    fn unparseable_expiration_is_expired() {
        let creds = store();
        creds.set_auth_token(Some("abc"), Some("next tuesday"));
        assert!(creds.token_expired_at(now()));
    }

    #[test]
    fn offsetless_format_is_read_as_utc() {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()), "TestID", "%Y-%m-%d %H:%M:%S");
        creds.set_auth_token(Some("abc"), Some("2024-05-01 14:00:00"));
        assert!(!creds.token_expired_at(now()));
    }

    #[test]
    fn clear_removes_token_and_expiration() {
        let creds = store();
        creds.set_auth_token(Some("abc"), Some("2024-05-02T12:00:00+0000"));
        creds.clear();
        assert!(!creds.token_exists());
        assert!(creds.expiration().is_none());
    }

    #[test]
    fn scopes_are_isolated() {
        let backing: Arc<dyn SecureStore> = Arc::new(MemoryStore::new());
        let a = CredentialStore::new(backing.clone(), "A", FORMAT);
        let b = CredentialStore::new(backing, "B", FORMAT);
        a.set_auth_token(Some("token-a"), None);
        assert!(b.auth_token().is_none());
    }
}
