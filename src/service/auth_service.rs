//! Account registration, login, token refresh and user administration.

use std::sync::Arc;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::{ADMIN_ONLY, TokenIssuer, TokenKind, TokenPair};
use crate::domain::{Actor, NewUser, Role, User, UserId};
use crate::error::ApiError;
use crate::persistence::{Page, UserRepository};

use super::FieldChecks;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

const BAD_CREDENTIALS: &str = "invalid email or password";

/// Input for [`AuthService::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    /// Email address; stored lower-cased.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Requested role; defaults to PARTICIPANT.
    pub role: Option<Role>,
}

/// Identity and account management.
#[derive(Debug, Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn plausible_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    /// Creates an account and signs the new user in.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for a malformed email, short password or
    ///   blank name.
    /// - [`ApiError::Forbidden`] when SUPER_ADMIN is requested.
    /// - [`ApiError::Conflict`] if the email is taken.
    pub async fn register(&self, input: Registration) -> Result<(User, TokenPair), ApiError> {
        let email = normalize_email(&input.email);
        FieldChecks::new()
            .require(plausible_email(&email), "email", "must be a valid email address")
            .require(
                input.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "must be at least 8 characters",
            )
            .not_blank(&input.name, "name")
            .finish()?;

        let role = input.role.unwrap_or(Role::Participant);
        if role == Role::SuperAdmin {
            return Err(ApiError::Forbidden(
                "SUPER_ADMIN cannot be self-assigned".to_string(),
            ));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict(format!("email already registered: {email}")));
        }

        let password_hash = hash_password_blocking(input.password).await?;
        let user = self
            .users
            .insert(NewUser {
                id: UserId::new(),
                email,
                password_hash,
                name: input.name.trim().to_string(),
                phone: input.phone,
                role,
            })
            .await?;
        let tokens = self.tokens.issue_pair(actor_of(&user))?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok((user, tokens))
    }

    /// Makes sure `email` belongs to a SUPER_ADMIN, creating the account
    /// with `password` if it does not exist. An existing account keeps its
    /// password and is promoted if needed.
    ///
    /// Public registration cannot create administrators, so this is how the
    /// first one comes to exist.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] for a malformed email or short password;
    /// propagates storage failures.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let email = normalize_email(email);
        FieldChecks::new()
            .require(plausible_email(&email), "email", "must be a valid email address")
            .require(
                password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "must be at least 8 characters",
            )
            .finish()?;

        if let Some(existing) = self.users.find_by_email(&email).await? {
            if existing.role == Role::SuperAdmin {
                tracing::debug!(user_id = %existing.id, "admin account present");
                return Ok(existing);
            }
            let promoted = self
                .users
                .update_role(existing.id, Role::SuperAdmin)
                .await?
                .ok_or_else(|| ApiError::not_found("user", existing.id))?;
            tracing::warn!(user_id = %promoted.id, "existing account promoted to SUPER_ADMIN");
            return Ok(promoted);
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let user = self
            .users
            .insert(NewUser {
                id: UserId::new(),
                email,
                password_hash,
                name: "Administrator".to_string(),
                phone: None,
                role: Role::SuperAdmin,
            })
            .await?;
        tracing::info!(user_id = %user.id, "admin account created");
        Ok(user)
    }

    /// Verifies credentials and issues a token pair.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] with the same message whether the email
    /// is unknown or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), ApiError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("login for unknown email");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        let verified =
            verify_password_blocking(password.to_string(), user.password_hash.clone()).await?;
        if !verified {
            tracing::info!(user_id = %user.id, "login rejected");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }
        let tokens = self.tokens.issue_pair(actor_of(&user))?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The refresh token itself is returned unchanged. The role is re-read
    /// from storage, so role changes apply from the next refresh.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] if the token is invalid, expired, not a
    /// refresh token, or its user no longer exists.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;
        Ok(TokenPair {
            access_token: self.tokens.issue(actor_of(&user), TokenKind::Access)?,
            refresh_token: refresh_token.to_string(),
            token_type: "Bearer",
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    /// Profile of the calling user.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the account was deleted.
    pub async fn me(&self, actor: &Actor) -> Result<User, ApiError> {
        self.users
            .find_by_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("user", actor.user_id))
    }

    /// Updates the caller's name and/or phone.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] for a blank name, [`ApiError::NotFound`] if
    /// the account was deleted.
    pub async fn update_profile(
        &self,
        actor: &Actor,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<User, ApiError> {
        if let Some(name) = &name {
            FieldChecks::new().not_blank(name, "name").finish()?;
        }
        self.users
            .update_profile(actor.user_id, name.map(|n| n.trim().to_string()), phone)
            .await?
            .ok_or_else(|| ApiError::not_found("user", actor.user_id))
    }

    /// Replaces the caller's password after checking the current one.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] if the new password is too short.
    /// - [`ApiError::Unauthorized`] if `current` does not match.
    pub async fn change_password(
        &self,
        actor: &Actor,
        current: &str,
        new_password: String,
    ) -> Result<(), ApiError> {
        FieldChecks::new()
            .require(
                new_password.chars().count() >= MIN_PASSWORD_LEN,
                "newPassword",
                "must be at least 8 characters",
            )
            .finish()?;
        let user = self.me(actor).await?;
        if !verify_password_blocking(current.to_string(), user.password_hash).await? {
            return Err(ApiError::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }
        let hash = hash_password_blocking(new_password).await?;
        if !self.users.update_password(user.id, hash).await? {
            return Err(ApiError::not_found("user", user.id));
        }
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Lists all users, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless the caller is SUPER_ADMIN.
    pub async fn list_users(&self, actor: &Actor, page: Page) -> Result<(Vec<User>, u64), ApiError> {
        actor.require_any(ADMIN_ONLY)?;
        self.users.list(page).await
    }

    /// Loads any user.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless SUPER_ADMIN; [`ApiError::NotFound`].
    pub async fn get_user(&self, actor: &Actor, id: UserId) -> Result<User, ApiError> {
        actor.require_any(ADMIN_ONLY)?;
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("user", id))
    }

    /// Changes a user's role.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless SUPER_ADMIN; [`ApiError::NotFound`].
    pub async fn update_user_role(
        &self,
        actor: &Actor,
        id: UserId,
        role: Role,
    ) -> Result<User, ApiError> {
        actor.require_any(ADMIN_ONLY)?;
        let user = self
            .users
            .update_role(id, role)
            .await?
            .ok_or_else(|| ApiError::not_found("user", id))?;
        tracing::info!(user_id = %id, %role, by = %actor.user_id, "user role changed");
        Ok(user)
    }

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Forbidden`] unless SUPER_ADMIN.
    /// - [`ApiError::NotFound`] if missing.
    /// - [`ApiError::Conflict`] while the user organizes events.
    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> Result<(), ApiError> {
        actor.require_any(ADMIN_ONLY)?;
        if !self.users.delete(id).await? {
            return Err(ApiError::not_found("user", id));
        }
        tracing::info!(user_id = %id, by = %actor.user_id, "user deleted");
        Ok(())
    }
}

fn actor_of(user: &User) -> Actor {
    Actor {
        user_id: user.id,
        role: user.role,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::persistence::Repositories;

    fn service() -> AuthService {
        let repos = Repositories::in_memory();
        let tokens = Arc::new(TokenIssuer::new(
            "test-secret",
            Duration::from_secs(900),
            Duration::from_secs(3600),
        ));
        AuthService::new(repos.users, tokens)
    }

    fn registration(email: &str, role: Option<Role>) -> Registration {
        Registration {
            email: email.to_string(),
            password: "password123".to_string(),
            name: "Alice".to_string(),
            phone: None,
            role,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = service();
        let (user, _) = assert_ok!(auth.register(registration("Alice@Example.com", None)).await);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::Participant);
        assert_ne!(user.password_hash, "password123");

        let (logged_in, tokens) = assert_ok!(auth.login("alice@example.com", "password123").await);
        assert_eq!(logged_in.id, user.id);
        assert!(!tokens.access_token.is_empty());
        assert!(!tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        assert_ok!(auth.register(registration("bob@example.com", None)).await);

        let Err(ApiError::Unauthorized(wrong)) = auth.login("bob@example.com", "nope-nope").await
        else {
            panic!("wrong password must be unauthorized");
        };
        let Err(ApiError::Unauthorized(unknown)) =
            auth.login("ghost@example.com", "password123").await
        else {
            panic!("unknown email must be unauthorized");
        };
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let auth = service();
        assert_ok!(auth.register(registration("dup@example.com", None)).await);
        let result = auth.register(registration("DUP@example.com", None)).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn super_admin_cannot_self_register() {
        let auth = service();
        let result = auth
            .register(registration("root@example.com", Some(Role::SuperAdmin)))
            .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let auth = service();
        let mut input = registration("not-an-email", None);
        input.password = "short".to_string();
        let Err(ApiError::Validation(errors)) = auth.register(input).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn refresh_rereads_role() {
        let auth = service();
        let (user, tokens) = assert_ok!(
            auth.register(registration("carol@example.com", Some(Role::EventOrganizer)))
                .await
        );
        let admin = Actor {
            user_id: UserId::new(),
            role: Role::SuperAdmin,
        };
        assert_ok!(
            auth.update_user_role(&admin, user.id, Role::SecurityStaff)
                .await
        );

        let refreshed = assert_ok!(auth.refresh(&tokens.refresh_token).await);
        assert_eq!(refreshed.refresh_token, tokens.refresh_token);
        let claims = assert_ok!(auth.tokens.verify(&refreshed.access_token, TokenKind::Access));
        assert_eq!(claims.role, Role::SecurityStaff);

        assert_err!(auth.refresh(&tokens.access_token).await);
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let auth = service();
        let (user, _) = assert_ok!(auth.register(registration("dave@example.com", None)).await);
        let actor = actor_of(&user);

        let wrong = auth
            .change_password(&actor, "incorrect", "newpassword1".to_string())
            .await;
        assert!(matches!(wrong, Err(ApiError::Unauthorized(_))));

        assert_ok!(
            auth.change_password(&actor, "password123", "newpassword1".to_string())
                .await
        );
        assert_err!(auth.login("dave@example.com", "password123").await);
        assert_ok!(auth.login("dave@example.com", "newpassword1").await);
    }

    #[tokio::test]
    async fn admin_endpoints_require_super_admin() {
        let auth = service();
        let (user, _) = assert_ok!(auth.register(registration("erin@example.com", None)).await);
        let actor = actor_of(&user);
        let page = Page { offset: 0, limit: 10 };
        assert!(matches!(
            auth.list_users(&actor, page).await,
            Err(ApiError::Forbidden(_))
        ));

        let admin = Actor {
            user_id: UserId::new(),
            role: Role::SuperAdmin,
        };
        let (users, total) = assert_ok!(auth.list_users(&admin, page).await);
        assert_eq!(total, 1);
        assert_eq!(users.len(), 1);

        assert_ok!(auth.delete_user(&admin, user.id).await);
        assert!(matches!(
            auth.get_user(&admin, user.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn bootstrapped_admin_can_log_in_and_manage_users() {
        let auth = service();
        let admin = assert_ok!(auth.ensure_admin("Root@Example.com", "admin-password").await);
        assert_eq!(admin.role, Role::SuperAdmin);
        assert_eq!(admin.email, "root@example.com");

        let again = assert_ok!(auth.ensure_admin("root@example.com", "other-password").await);
        assert_eq!(again.id, admin.id);

        let (logged_in, _) = assert_ok!(auth.login("root@example.com", "admin-password").await);
        let page = Page { offset: 0, limit: 10 };
        let (_, total) = assert_ok!(auth.list_users(&actor_of(&logged_in), page).await);
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn bootstrap_promotes_existing_account() {
        let auth = service();
        let (user, _) = assert_ok!(auth.register(registration("frank@example.com", None)).await);
        let promoted = assert_ok!(auth.ensure_admin("frank@example.com", "ignored-pass").await);
        assert_eq!(promoted.id, user.id);
        assert_eq!(promoted.role, Role::SuperAdmin);
        assert_ok!(auth.login("frank@example.com", "password123").await);

        assert!(matches!(
            auth.ensure_admin("not-an-email", "admin-password").await,
            Err(ApiError::Validation(_))
        ));
    }
}
