use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::claims::TokenClaims;

/// Session file name in cache directory
pub const SESSION_FILE: &str = "session.json";

/// Buffer time before expiry to trigger a proactive refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Access/refresh token pair as issued by the accounts API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Taken from the access token's `exp` claim; None for opaque tokens.
    pub expiry: Option<DateTime<Utc>>,
}

impl CredentialPair {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        let expiry = TokenClaims::decode(&access_token).and_then(|c| c.expires_at());
        Self {
            access_token,
            refresh_token,
            expiry,
        }
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        TokenClaims::decode(&self.access_token)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.claims().and_then(|c| c.user_id)
    }

    pub fn is_expired(&self) -> bool {
        self.expiry.map(|e| Utc::now() >= e).unwrap_or(false)
    }

    /// Check if the access token will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        self.expiry
            .map(|e| Utc::now() + Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES) >= e)
            .unwrap_or(false)
    }
}

/// What a request was sent with, so a later 401 can be matched against
/// the credentials that were current at the time.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialSnapshot {
    pub access_token: Option<String>,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    credentials: Option<CredentialPair>,
    /// Bumped on every login, refresh and logout.
    generation: u64,
}

/// Session-scoped credential store shared by every request of one
/// signed-in user. Share it behind an `Arc`.
#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Open the store persisted in `cache_dir`, loading any saved session.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(SESSION_FILE);
        let credentials = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let pair: CredentialPair = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;
            debug!(expired = pair.is_expired(), "Session loaded from disk");
            Some(pair)
        } else {
            None
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(SessionState {
                credentials,
                generation: 0,
            }),
        })
    }

    pub async fn snapshot(&self) -> CredentialSnapshot {
        let state = self.state.read().await;
        CredentialSnapshot {
            access_token: state.credentials.as_ref().map(|c| c.access_token.clone()),
            generation: state.generation,
        }
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    pub async fn credentials(&self) -> Option<CredentialPair> {
        self.state.read().await.credentials.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .credentials
            .as_ref()
            .map(|c| c.refresh_token.clone())
    }

    pub async fn user_id(&self) -> Option<i64> {
        self.state
            .read()
            .await
            .credentials
            .as_ref()
            .and_then(|c| c.user_id())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.credentials.is_some()
    }

    /// Replace the stored pair (login or refresh). Returns the new generation.
    pub async fn set_credentials(&self, pair: CredentialPair) -> u64 {
        let mut state = self.state.write().await;
        state.credentials = Some(pair);
        state.generation += 1;
        debug!(generation = state.generation, "Credentials updated");
        if let Some(ref pair) = state.credentials {
            self.persist(Some(pair));
        }
        state.generation
    }

    /// Clear the stored pair. Returns false if there was nothing to clear.
    pub async fn clear(&self) -> bool {
        let mut state = self.state.write().await;
        if state.credentials.take().is_none() {
            return false;
        }
        state.generation += 1;
        info!(generation = state.generation, "Session cleared");
        self.persist(None);
        true
    }

    fn persist(&self, pair: Option<&CredentialPair>) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Err(e) = Self::write_file(path, pair) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn write_file(path: &Path, pair: Option<&CredentialPair>) -> Result<()> {
        match pair {
            Some(pair) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let contents = serde_json::to_string_pretty(pair)?;
                std::fs::write(path, contents)?;
            }
            None => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::fake_jwt;

    fn temp_cache_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("internboard-session-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_credential_pair_reads_expiry_and_user() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let access = fake_jwt(&serde_json::json!({"exp": exp, "user_id": 7}));
        let pair = CredentialPair::new(access, "refresh".to_string());

        assert_eq!(pair.expiry.map(|e| e.timestamp()), Some(exp));
        assert_eq!(pair.user_id(), Some(7));
        assert!(!pair.is_expired());
        assert!(!pair.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_within_buffer() {
        let exp = (Utc::now() + Duration::minutes(2)).timestamp();
        let pair = CredentialPair::new(fake_jwt(&serde_json::json!({"exp": exp})), "r".to_string());
        assert!(pair.needs_refresh());
        assert!(!pair.is_expired());
    }

    #[test]
    fn test_opaque_token_has_unknown_expiry() {
        let pair = CredentialPair::new("opaque".to_string(), "r".to_string());
        assert_eq!(pair.expiry, None);
        assert!(!pair.is_expired());
        assert!(!pair.needs_refresh());
        assert_eq!(pair.user_id(), None);
    }

    #[tokio::test]
    async fn test_generation_bumps_on_every_mutation() {
        let store = SessionStore::in_memory();
        assert_eq!(store.generation().await, 0);
        assert!(!store.clear().await);
        assert_eq!(store.generation().await, 0);

        let generation = store.set_credentials(CredentialPair::new("a".into(), "r".into())).await;
        assert_eq!(generation, 1);
        let snap = store.snapshot().await;
        assert_eq!(snap.access_token.as_deref(), Some("a"));
        assert_eq!(snap.generation, 1);

        assert!(store.clear().await);
        assert_eq!(store.generation().await, 2);
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_session_persists_and_clears_file() {
        let dir = temp_cache_dir("persist");
        let store = SessionStore::open(&dir).unwrap();
        assert!(!store.is_authenticated().await);

        store.set_credentials(CredentialPair::new("access".into(), "refresh".into())).await;
        assert!(dir.join(SESSION_FILE).exists());

        let reopened = SessionStore::open(&dir).unwrap();
        assert_eq!(reopened.refresh_token().await.as_deref(), Some("refresh"));

        assert!(reopened.clear().await);
        assert!(!dir.join(SESSION_FILE).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
