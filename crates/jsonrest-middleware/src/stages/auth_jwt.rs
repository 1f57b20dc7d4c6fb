//! JSON Web Token authentication.
//!
//! Tokens are HMAC-signed (HS256, HS384 or HS512) and carry three claims
//! of their own:
//!
//! | Claim | Meaning |
//! |---|---|
//! | `id` | user id, stored in `env.remote_user` |
//! | `exp` | expiry, Unix seconds |
//! | `orig_iat` | first issue time, present when refresh is enabled |
//!
//! Claims added by the payload function travel alongside them and are
//! available to handlers through [`extract_claims`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use http::header::{self, HeaderName, HeaderValue};
use http::StatusCode;
use jsonrest_core::{
    write_error, ConfigError, Handler, HttpError, Request, ResponseWriter,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::auth_basic::{Authenticator, Authorizator};
use crate::middleware::{Middleware, Next};

const NAME: &str = "auth-jwt";

/// Extra claims added to each new token for a user id.
pub type PayloadFunc = Arc<dyn Fn(&str) -> Map<String, Value> + Send + Sync>;

/// Verified token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id.
    pub id: String,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// When the first token of this refresh chain was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_iat: Option<i64>,
    /// Claims added by the payload function.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Returns the claims of the token that authenticated `request`.
#[must_use]
pub fn extract_claims(request: &Request) -> Option<&JwtClaims> {
    request.env.get::<JwtClaims>()
}

#[derive(Deserialize)]
struct Login {
    username: String,
    password: String,
}

struct JwtConfig {
    challenge: HeaderValue,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    timeout: Duration,
    max_refresh: Duration,
    token_lookup: HeaderName,
    authenticator: Authenticator,
    authorizator: Authorizator,
    payload_func: Option<PayloadFunc>,
}

impl JwtConfig {
    fn unauthorized(&self, writer: &mut dyn ResponseWriter) {
        writer
            .headers()
            .insert(header::WWW_AUTHENTICATE, self.challenge.clone());
        HttpError::unauthorized().write_to(writer);
    }

    fn parse_token(&self, request: &Request) -> Option<JwtClaims> {
        let value = request.header_str(&self.token_lookup)?;
        let (scheme, token) = value.split_once(' ')?;
        if scheme != "Bearer" {
            return None;
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        match decode::<JwtClaims>(token.trim(), &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "rejected JWT");
                None
            }
        }
    }

    fn sign(&self, claims: &JwtClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
    }

    fn new_claims(&self, id: &str, orig_iat: Option<i64>) -> JwtClaims {
        let now = Utc::now().timestamp();
        let mut extra = self
            .payload_func
            .as_ref()
            .map(|payload| payload(id))
            .unwrap_or_default();
        for reserved in ["id", "exp", "orig_iat"] {
            extra.remove(reserved);
        }

        JwtClaims {
            id: id.to_string(),
            exp: now.saturating_add(secs(self.timeout)),
            orig_iat: if self.max_refresh.is_zero() {
                None
            } else {
                Some(orig_iat.unwrap_or(now))
            },
            extra,
        }
    }

    fn write_token(&self, writer: &mut dyn ResponseWriter, claims: &JwtClaims) {
        match self.sign(claims) {
            Ok(token) => {
                if let Err(e) = writer.write_json(&json!({ "token": token })) {
                    tracing::error!(error = %e, "failed to write token");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sign token");
                write_error(writer, "Token signing failed", StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }
}

fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Requires `Authorization: Bearer <token>`.
///
/// # Example
///
/// ```
/// use jsonrest_middleware::stages::AuthJwtMiddleware;
/// use std::time::Duration;
///
/// let jwt = AuthJwtMiddleware::builder()
///     .realm("jwt auth")
///     .key(b"secret key".to_vec())
///     .timeout(Duration::from_secs(3600))
///     .max_refresh(Duration::from_secs(24 * 3600))
///     .authenticator(|user, password| user == "admin" && password == "admin")
///     .build()
///     .unwrap();
///
/// // Routes: POST /login → jwt.login_handler(), GET /refresh_token → jwt.refresh_handler()
/// let _login = jwt.login_handler();
/// ```
#[derive(Clone)]
pub struct AuthJwtMiddleware {
    config: Arc<JwtConfig>,
}

impl AuthJwtMiddleware {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> AuthJwtBuilder {
        AuthJwtBuilder::default()
    }

    /// Handler exchanging `{"username": .., "password": ..}` for
    /// `{"token": ..}`.
    pub fn login_handler(&self) -> impl Handler {
        let config = Arc::clone(&self.config);
        move |writer: &mut dyn ResponseWriter, request: &mut Request| {
            let login: Login = match request.decode_json_payload() {
                Ok(login) => login,
                Err(e) => {
                    tracing::debug!(error = %e, "invalid login payload");
                    config.unauthorized(writer);
                    return;
                }
            };
            if !(config.authenticator)(&login.username, &login.password) {
                tracing::warn!(user = %login.username, "JWT login failed");
                config.unauthorized(writer);
                return;
            }
            let claims = config.new_claims(&login.username, None);
            config.write_token(writer, &claims);
        }
    }

    /// Handler re-issuing a valid token while the refresh window is open.
    ///
    /// The window is `max_refresh` after the first issue time.
    pub fn refresh_handler(&self) -> impl Handler {
        let config = Arc::clone(&self.config);
        move |writer: &mut dyn ResponseWriter, request: &mut Request| {
            let Some(claims) = config.parse_token(request) else {
                config.unauthorized(writer);
                return;
            };
            let Some(orig_iat) = claims.orig_iat else {
                config.unauthorized(writer);
                return;
            };
            if orig_iat.saturating_add(secs(config.max_refresh)) < Utc::now().timestamp() {
                tracing::debug!(user = %claims.id, "refresh window closed");
                config.unauthorized(writer);
                return;
            }

            let mut refreshed = config.new_claims(&claims.id, Some(orig_iat));
            refreshed.extra = claims.extra;
            config.write_token(writer, &refreshed);
        }
    }
}

impl fmt::Debug for AuthJwtMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthJwtMiddleware")
            .field("challenge", &self.config.challenge)
            .field("algorithm", &self.config.algorithm)
            .field("timeout", &self.config.timeout)
            .field("max_refresh", &self.config.max_refresh)
            .finish_non_exhaustive()
    }
}

impl Middleware for AuthJwtMiddleware {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let Some(claims) = self.config.parse_token(request) else {
            self.config.unauthorized(writer);
            return;
        };

        if !(self.config.authorizator)(&claims.id, request) {
            tracing::warn!(user = %claims.id, "JWT authorization denied");
            self.config.unauthorized(writer);
            return;
        }

        request.env.remote_user = Some(claims.id.clone());
        request.env.insert(claims);
        next.run(writer, request);
    }
}

/// Builder for [`AuthJwtMiddleware`].
#[must_use]
pub struct AuthJwtBuilder {
    realm: Option<String>,
    key: Option<Vec<u8>>,
    algorithm: Algorithm,
    timeout: Duration,
    max_refresh: Duration,
    token_lookup: String,
    authenticator: Option<Authenticator>,
    authorizator: Option<Authorizator>,
    payload_func: Option<PayloadFunc>,
}

impl Default for AuthJwtBuilder {
    fn default() -> Self {
        Self {
            realm: None,
            key: None,
            algorithm: Algorithm::HS256,
            timeout: Duration::from_secs(3600),
            max_refresh: Duration::ZERO,
            token_lookup: header::AUTHORIZATION.as_str().to_string(),
            authenticator: None,
            authorizator: None,
            payload_func: None,
        }
    }
}

impl AuthJwtBuilder {
    /// Realm sent in the challenge. Required.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// HMAC secret. Required.
    pub fn key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Signing algorithm, one of HS256 (default), HS384 or HS512.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Token lifetime. Defaults to one hour.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Refresh window after the first issue. Zero, the default, disables refresh.
    pub fn max_refresh(mut self, max_refresh: Duration) -> Self {
        self.max_refresh = max_refresh;
        self
    }

    /// Request header carrying the token. Defaults to `Authorization`.
    pub fn token_lookup(mut self, header: impl Into<String>) -> Self {
        self.token_lookup = header.into();
        self
    }

    /// Credential check used by the login handler. Required.
    pub fn authenticator<F>(mut self, authenticator: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Per-request access check. Defaults to allowing everything.
    pub fn authorizator<F>(mut self, authorizator: F) -> Self
    where
        F: Fn(&str, &Request) -> bool + Send + Sync + 'static,
    {
        self.authorizator = Some(Arc::new(authorizator));
        self
    }

    /// Adds custom claims to each new token.
    pub fn payload_func<F>(mut self, payload_func: F) -> Self
    where
        F: Fn(&str) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.payload_func = Some(Arc::new(payload_func));
        self
    }

    /// Builds the middleware.
    pub fn build(self) -> Result<AuthJwtMiddleware, ConfigError> {
        let realm = self
            .realm
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ConfigError::missing_option(NAME, "realm"))?;
        let key = self
            .key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::missing_option(NAME, "key"))?;
        let authenticator = self
            .authenticator
            .ok_or_else(|| ConfigError::missing_option(NAME, "authenticator"))?;

        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::invalid_option(
                NAME,
                "algorithm",
                format!("{:?} is not an HMAC algorithm", self.algorithm),
            ));
        }
        let challenge = HeaderValue::from_str(&format!("JWT realm={realm}"))
            .map_err(|e| ConfigError::invalid_option(NAME, "realm", e.to_string()))?;
        let token_lookup = HeaderName::try_from(self.token_lookup.as_str())
            .map_err(|e| ConfigError::invalid_option(NAME, "token_lookup", e.to_string()))?;

        Ok(AuthJwtMiddleware {
            config: Arc::new(JwtConfig {
                challenge,
                algorithm: self.algorithm,
                encoding_key: EncodingKey::from_secret(&key),
                decoding_key: DecodingKey::from_secret(&key),
                timeout: self.timeout,
                max_refresh: self.max_refresh,
                token_lookup,
                authenticator,
                authorizator: self
                    .authorizator
                    .unwrap_or_else(|| Arc::new(|_: &str, _: &Request| true)),
                payload_func: self.payload_func,
            }),
        })
    }
}
