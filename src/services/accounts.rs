use std::sync::Arc;

use uuid::Uuid;
use vidhub_api::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateAccountRequest};

use crate::auth::password::{PasswordManager, is_strong_password, is_valid_email};
use crate::auth::{Identity, TokenPair, TokenService};
use crate::db::error::RepositoryError;
use crate::db::models::user::{AccountChanges, NewUser, User};
use crate::db::repositories::{UserRepository, WatchHistoryRepository};
use crate::error::AppError;
use crate::media::{MediaStorage, StagedFile, remove_best_effort};

const WEAK_PASSWORD: &str =
    "Password must be at least 8 characters with uppercase, lowercase and numbers";

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    pub fn field_name(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::CoverImage => "coverImage",
        }
    }
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    history: Arc<dyn WatchHistoryRepository>,
    tokens: Arc<TokenService>,
    passwords: PasswordManager,
    media: Arc<dyn MediaStorage>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        history: Arc<dyn WatchHistoryRepository>,
        tokens: Arc<TokenService>,
        passwords: PasswordManager,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        Self {
            users,
            history,
            tokens,
            passwords,
            media,
        }
    }

    pub fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let fields = (
            non_blank(&request.full_name),
            non_blank(&request.email),
            non_blank(&request.username),
        );
        let (Some(full_name), Some(email), Some(username)) = fields else {
            return Err(AppError::invalid_argument("All fields are required"));
        };
        let username = username.to_lowercase();
        let email = email.to_lowercase();

        if !is_valid_email(&email) {
            return Err(AppError::invalid_argument("Invalid email format"));
        }
        if !is_strong_password(&request.password) {
            return Err(AppError::invalid_argument(WEAK_PASSWORD));
        }

        if self.users.find_user_by_email(&email)?.is_some()
            || self.users.find_user_by_username(&username)?.is_some()
        {
            return Err(AppError::conflict("User with email or username already exists"));
        }

        let new_user = NewUser {
            username,
            email,
            full_name,
            password_hash: self.passwords.hash(&request.password)?,
        };

        // A concurrent registration still surfaces as Conflict.
        let user = self.users.create_user(&new_user)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub fn login(&self, request: &LoginRequest) -> Result<(User, TokenPair), AppError> {
        let email = request.email.as_deref().and_then(non_blank);
        let username = request.username.as_deref().and_then(non_blank);

        let user = match (email, username) {
            (Some(email), _) => self.users.find_user_by_email(&email.to_lowercase())?,
            (None, Some(username)) => self.users.find_user_by_username(&username.to_lowercase())?,
            (None, None) => return Err(AppError::invalid_argument("Username or email is required")),
        }
        .ok_or_else(|| AppError::not_found("User does not exist"))?;

        if !self.passwords.verify(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Rejected login with wrong password");
            return Err(AppError::unauthorized("Invalid user credentials"));
        }

        let pair = self.tokens.issue_pair(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, pair))
    }

    pub fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, AppError> {
        let token = refresh_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Refresh token is required"))?;

        Ok(self.tokens.rotate_refresh_token(token)?)
    }

    pub fn logout(&self, identity: Identity) -> Result<(), AppError> {
        self.tokens.revoke(identity.user_id)?;
        tracing::info!(user_id = %identity.user_id, "User logged out");
        Ok(())
    }

    pub fn change_password(
        &self,
        identity: Identity,
        request: &ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let user = self.current_user(identity)?;

        if !self.passwords.verify(&request.old_password, &user.password_hash)? {
            return Err(AppError::invalid_argument("Invalid old password"));
        }
        if !is_strong_password(&request.new_password) {
            return Err(AppError::invalid_argument(WEAK_PASSWORD));
        }

        let new_hash = self.passwords.hash(&request.new_password)?;
        self.users.update_password(user.id, &new_hash)?;
        Ok(())
    }

    pub fn current_user(&self, identity: Identity) -> Result<User, AppError> {
        self.users
            .find_user(identity.user_id)?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub fn watch_history(&self, identity: Identity) -> Result<Vec<Uuid>, AppError> {
        Ok(self.history.watched_video_ids(identity.user_id)?)
    }

    pub fn update_account(
        &self,
        identity: Identity,
        request: &UpdateAccountRequest,
    ) -> Result<User, AppError> {
        let (Some(full_name), Some(email)) = (non_blank(&request.full_name), non_blank(&request.email))
        else {
            return Err(AppError::invalid_argument("All fields are required"));
        };
        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::invalid_argument("Invalid email format"));
        }

        let changes = AccountChanges {
            full_name: Some(full_name),
            email: Some(email),
            ..Default::default()
        };
        match self.users.update_account(identity.user_id, &changes) {
            Ok(user) => Ok(user),
            Err(RepositoryError::UniqueViolation(_)) => {
                Err(AppError::conflict("Email is already in use"))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn update_image(
        &self,
        identity: Identity,
        kind: ProfileImage,
        file: Option<StagedFile>,
    ) -> Result<User, AppError> {
        let file = file.ok_or_else(|| {
            AppError::invalid_argument(format!("{} file is missing", kind.field_name()))
        })?;

        let current = self.current_user(identity)?;
        let previous_key = match kind {
            ProfileImage::Avatar => current.avatar_key,
            ProfileImage::CoverImage => current.cover_image_key,
        };

        let stored = self.media.store(file.path(), file.extension())?;
        let changes = match kind {
            ProfileImage::Avatar => AccountChanges {
                avatar: Some(stored.url.clone()),
                avatar_key: Some(stored.key.clone()),
                ..Default::default()
            },
            ProfileImage::CoverImage => AccountChanges {
                cover_image: Some(stored.url.clone()),
                cover_image_key: Some(stored.key.clone()),
                ..Default::default()
            },
        };

        match self.users.update_account(identity.user_id, &changes) {
            Ok(user) => {
                if let Some(key) = previous_key.filter(|key| *key != stored.key) {
                    remove_best_effort(self.media.as_ref(), &key);
                }
                Ok(user)
            }
            Err(err) => {
                remove_best_effort(self.media.as_ref(), &stored.key);
                Err(err.into())
            }
        }
    }
}
