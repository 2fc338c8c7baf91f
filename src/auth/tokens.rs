//! Access and refresh token lifecycle.
//!
//! Access tokens are stateless. Every refresh token belongs to a session row
//! that stores the SHA-256 of the one refresh token currently valid for it;
//! rotation swaps that hash with a compare-and-swap update, so a token can be
//! exchanged at most once.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::jwt::{JwtError, JwtManager};
use crate::db::error::RepositoryError;
use crate::db::models::session::NewSession;
use crate::db::repositories::SessionRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPolicy {
    /// Issuing a refresh token ends every other session of the user.
    #[default]
    Single,
    /// Each login keeps its own session.
    PerDevice,
}

impl FromStr for SessionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "per_device" | "per-device" => Ok(Self::PerDevice),
            other => Err(format!("unknown session policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Token expired")]
    Expired,
    #[error("Refresh token revoked or already used")]
    Revoked,
    #[error("Token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => TokenError::Expired,
            JwtError::Invalid(_) => TokenError::Invalid,
            JwtError::GenerationFailed(e) => TokenError::Signing(e.to_string()),
        }
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn expiry(exp: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(exp, 0).ok_or_else(|| TokenError::Signing(format!("exp {exp} out of range")))
}

pub struct TokenService {
    access: JwtManager,
    refresh: JwtManager,
    policy: SessionPolicy,
    sessions: Arc<dyn SessionRepository>,
}

impl TokenService {
    pub fn new(
        access: JwtManager,
        refresh: JwtManager,
        policy: SessionPolicy,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            access,
            refresh,
            policy,
            sessions,
        }
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let (token, _) = self.access.sign(user_id, None)?;
        Ok(token)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let session_id = Uuid::new_v4();
        let (token, claims) = self.refresh.sign(user_id, Some(session_id))?;

        self.sessions.create_session(&NewSession {
            id: session_id,
            user_id,
            token_hash: hash_token(&token),
            expires_at: expiry(claims.exp)?,
        })?;

        // The new session exists before the others go, so the user is never
        // left with more than one valid refresh token.
        if self.policy == SessionPolicy::Single {
            let ended = self.sessions.delete_other_sessions(user_id, session_id)?;
            if ended > 0 {
                tracing::debug!(%user_id, %session_id, ended, "Ended previous sessions");
            }
        }

        Ok(token)
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user_id)?,
            refresh_token: self.issue_refresh_token(user_id)?,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.access.verify(token)?;
        Ok(claims.sub)
    }

    pub fn rotate_refresh_token(&self, token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.refresh.verify(token)?;
        let session_id = claims.sid.ok_or(TokenError::Invalid)?;
        let presented_hash = hash_token(token);

        let session = self
            .sessions
            .find_session(session_id)?
            .ok_or(TokenError::Revoked)?;
        if session.user_id != claims.sub || session.token_hash != presented_hash {
            tracing::warn!(user_id = %claims.sub, %session_id, "Stale refresh token presented");
            return Err(TokenError::Revoked);
        }

        let (refresh_token, new_claims) = self.refresh.sign(claims.sub, Some(session_id))?;
        let swapped = self.sessions.replace_token(
            session_id,
            &presented_hash,
            &hash_token(&refresh_token),
            expiry(new_claims.exp)?,
        )?;
        if !swapped {
            return Err(TokenError::Revoked);
        }

        Ok(TokenPair {
            access_token: self.issue_access_token(claims.sub)?,
            refresh_token,
        })
    }

    /// Ends every session of the user; outstanding refresh tokens stop working.
    pub fn revoke(&self, user_id: Uuid) -> Result<usize, TokenError> {
        let ended = self.sessions.delete_user_sessions(user_id)?;
        tracing::debug!(%user_id, ended, "Revoked sessions");
        Ok(ended)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::token_service;
    use super::*;
    use crate::db::MemoryStore;
    use crate::db::models::user::NewUser;
    use crate::db::repositories::UserRepository;
    use std::thread;

    fn setup(policy: SessionPolicy) -> (Arc<MemoryStore>, TokenService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(&NewUser {
                username: "tok".to_string(),
                email: "tok@example.com".to_string(),
                full_name: "Tok".to_string(),
                password_hash: "hash".to_string(),
            })
            .unwrap();
        let service = token_service(store.clone(), policy);
        (store, service, user.id)
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn session_policy_parses() {
        assert_eq!("single".parse::<SessionPolicy>().unwrap(), SessionPolicy::Single);
        assert_eq!("PER_DEVICE".parse::<SessionPolicy>().unwrap(), SessionPolicy::PerDevice);
        assert!("sometimes".parse::<SessionPolicy>().is_err());
    }

    #[test]
    fn access_token_verifies_to_subject() {
        let (_, service, user_id) = setup(SessionPolicy::Single);
        let token = service.issue_access_token(user_id).unwrap();
        assert_eq!(service.verify_access_token(&token).unwrap(), user_id);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let (_, service, user_id) = setup(SessionPolicy::Single);
        let pair = service.issue_pair(user_id).unwrap();
        assert!(matches!(
            service.verify_access_token(&pair.refresh_token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn rotation_succeeds_once() {
        let (_, service, user_id) = setup(SessionPolicy::Single);
        let pair = service.issue_pair(user_id).unwrap();

        let rotated = service.rotate_refresh_token(&pair.refresh_token).unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert_eq!(service.verify_access_token(&rotated.access_token).unwrap(), user_id);

        assert!(matches!(
            service.rotate_refresh_token(&pair.refresh_token),
            Err(TokenError::Revoked)
        ));
        assert!(service.rotate_refresh_token(&rotated.refresh_token).is_ok());
    }

    #[test]
    fn single_policy_keeps_only_latest_session() {
        let (_, service, user_id) = setup(SessionPolicy::Single);
        let first = service.issue_refresh_token(user_id).unwrap();
        let second = service.issue_refresh_token(user_id).unwrap();

        assert!(matches!(service.rotate_refresh_token(&first), Err(TokenError::Revoked)));
        assert!(service.rotate_refresh_token(&second).is_ok());
    }

    #[test]
    fn per_device_sessions_rotate_independently() {
        let (_, service, user_id) = setup(SessionPolicy::PerDevice);
        let laptop = service.issue_refresh_token(user_id).unwrap();
        let phone = service.issue_refresh_token(user_id).unwrap();

        assert!(service.rotate_refresh_token(&laptop).is_ok());
        assert!(service.rotate_refresh_token(&phone).is_ok());
        assert!(matches!(service.rotate_refresh_token(&laptop), Err(TokenError::Revoked)));
    }

    #[test]
    fn revoke_invalidates_outstanding_refresh_tokens() {
        let (_, service, user_id) = setup(SessionPolicy::PerDevice);
        let a = service.issue_refresh_token(user_id).unwrap();
        let b = service.issue_refresh_token(user_id).unwrap();

        assert_eq!(service.revoke(user_id).unwrap(), 2);
        assert!(matches!(service.rotate_refresh_token(&a), Err(TokenError::Revoked)));
        assert!(matches!(service.rotate_refresh_token(&b), Err(TokenError::Revoked)));
    }

    #[test]
    fn expired_refresh_token_is_expired() {
        let store = Arc::new(MemoryStore::new());
        let service = TokenService::new(
            JwtManager::new("access_secret_for_tests_0123456789", chrono::Duration::minutes(15)),
            JwtManager::new("refresh_secret_for_tests_0123456789", chrono::Duration::seconds(-30)),
            SessionPolicy::Single,
            store.clone(),
        );
        let user = store
            .create_user(&NewUser {
                username: "late".to_string(),
                email: "late@example.com".to_string(),
                full_name: "Late".to_string(),
                password_hash: "hash".to_string(),
            })
            .unwrap();

        let token = service.issue_refresh_token(user.id).unwrap();
        assert!(matches!(service.rotate_refresh_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn concurrent_rotations_of_one_token_have_one_winner() {
        let (_, service, user_id) = setup(SessionPolicy::Single);
        let service = Arc::new(service);
        let token = Arc::new(service.issue_refresh_token(user_id).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let token = Arc::clone(&token);
                thread::spawn(move || service.rotate_refresh_token(&token).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
