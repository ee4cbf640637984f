//! Registration, login and token verification over the `users` table.

use hospital_storage::{DynRecordStore, Filter, Insert, Select};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwt::{JwtService, TokenClaims};
use crate::password::{hash_password, verify_password};

const USERS: &str = "users";

/// Body of `POST /register`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: String,
    /// Patient or employee id the account belongs to.
    pub id: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub username: String,
    pub role: String,
}

/// What a verified caller may see about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    pub username: String,
    pub role: String,
    pub patient_id: String,
}

impl From<&TokenClaims> for Profile {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            username: claims.username.clone(),
            role: claims.role.clone(),
            patient_id: claims.patient_id.clone(),
        }
    }
}

/// Registers users and exchanges credentials for bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    store: DynRecordStore,
    jwt: JwtService,
}

impl AuthService {
    /// Creates the service from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration does not validate.
    pub fn new(store: DynRecordStore, config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;
        let jwt = JwtService::new(&config.jwt_secret, config.issuer.clone(), config.token_ttl)?;
        Ok(Self { store, jwt })
    }

    /// Returns the token service.
    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Stores a new user with an Argon2id password hash.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if any field is blank, `UsernameTaken` if the
    /// username exists or is inserted concurrently.
    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role))]
    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<()> {
        let username = request.username.trim();
        let role = request.role.trim();
        let id = request.id.trim();
        if username.is_empty() || request.password.is_empty() || role.is_empty() || id.is_empty() {
            return Err(AuthError::invalid_request(
                "username, password, role and id must be provided",
            ));
        }

        if self.find(username).await?.is_some() {
            return Err(AuthError::username_taken(username));
        }

        let password_hash = hash_blocking(request.password.clone()).await?;
        self.store
            .insert(
                &Insert::into(USERS)
                    .value("username", username)
                    .value("password_hash", password_hash)
                    .value("role", role)
                    .value("id", id),
            )
            .await
            .map_err(|err| {
                // Lost a race with a concurrent registration of the same name.
                if err.is_unique_violation() {
                    AuthError::username_taken(username)
                } else {
                    AuthError::from(err)
                }
            })?;

        info!("user registered");
        Ok(())
    }

    /// Checks credentials and issues a token.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for blank fields, `InvalidCredentials` for an
    /// unknown username or wrong password.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(AuthError::invalid_request(
                "username and password must be provided",
            ));
        }

        let Some(user) = self.find(username).await? else {
            debug!("unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_blocking(request.password.clone(), user.password_hash.clone()).await? {
            warn!("password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.jwt.issue(&user.id, &user.username, &user.role)?;
        info!("user logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.ttl().as_secs(),
            username: user.username,
            role: user.role,
        })
    }

    /// Verifies a bearer token and returns its claims.
    ///
    /// # Errors
    ///
    /// `InvalidToken` or `TokenExpired`.
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        Ok(self.jwt.verify(token)?)
    }

    async fn find(&self, username: &str) -> AuthResult<Option<StoredUser>> {
        let rows = self
            .store
            .select(&Select::from(USERS).filter(Filter::eq("username", username)))
            .await?;

        Ok(rows.first().map(|row| StoredUser {
            username: row.value("username").render_text(),
            password_hash: row.value("password_hash").render_text(),
            role: row.value("role").render_text(),
            id: row.value("id").render_text(),
        }))
    }
}

struct StoredUser {
    username: String,
    password_hash: String,
    role: String,
    id: String,
}

async fn hash_blocking(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::hashing(e.to_string()))?
}

async fn verify_blocking(password: String, hash: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::hashing(e.to_string()))?
}
