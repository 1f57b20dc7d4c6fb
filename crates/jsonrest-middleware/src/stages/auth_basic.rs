//! HTTP Basic authentication.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::{self, HeaderValue};
use jsonrest_core::{ConfigError, HttpError, Request, ResponseWriter};

use crate::middleware::{Middleware, Next};

const NAME: &str = "auth-basic";

/// Checks a user id and password.
pub type Authenticator = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Checks that an authenticated user may access a request.
pub type Authorizator = Arc<dyn Fn(&str, &Request) -> bool + Send + Sync>;

/// Requires `Authorization: Basic` credentials.
///
/// On success the user id is stored in `env.remote_user`. Missing or
/// rejected credentials get a 401 with a `WWW-Authenticate` challenge;
/// a malformed header gets a 400.
///
/// # Example
///
/// ```
/// use jsonrest_middleware::stages::AuthBasicMiddleware;
///
/// let auth = AuthBasicMiddleware::builder()
///     .realm("test zone")
///     .authenticator(|user, password| user == "admin" && password == "admin")
///     .build()
///     .unwrap();
/// # let _ = auth;
/// ```
#[derive(Clone)]
pub struct AuthBasicMiddleware {
    challenge: HeaderValue,
    authenticator: Authenticator,
    authorizator: Authorizator,
}

impl AuthBasicMiddleware {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> AuthBasicBuilder {
        AuthBasicBuilder::default()
    }

    fn unauthorized(&self, writer: &mut dyn ResponseWriter) {
        writer
            .headers()
            .insert(header::WWW_AUTHENTICATE, self.challenge.clone());
        HttpError::unauthorized().write_to(writer);
    }
}

impl fmt::Debug for AuthBasicMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthBasicMiddleware")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// Splits `Basic <base64(user:password)>`.
fn decode_basic_auth(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.split_once(' ')?;
    if scheme != "Basic" {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

impl Middleware for AuthBasicMiddleware {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&self, writer: &mut dyn ResponseWriter, request: &mut Request, next: Next<'_>) {
        let auth_header = request.header_str(header::AUTHORIZATION).unwrap_or_default();
        if auth_header.is_empty() {
            self.unauthorized(writer);
            return;
        }

        let Some((user, password)) = decode_basic_auth(auth_header) else {
            HttpError::BadRequest("Invalid authentication".to_string()).write_to(writer);
            return;
        };

        if !(self.authenticator)(&user, &password) {
            tracing::warn!(user = %user, "basic authentication failed");
            self.unauthorized(writer);
            return;
        }

        if !(self.authorizator)(&user, request) {
            tracing::warn!(user = %user, "basic authorization denied");
            self.unauthorized(writer);
            return;
        }

        request.env.remote_user = Some(user);
        next.run(writer, request);
    }
}

/// Builder for [`AuthBasicMiddleware`].
#[derive(Default)]
#[must_use]
pub struct AuthBasicBuilder {
    realm: Option<String>,
    authenticator: Option<Authenticator>,
    authorizator: Option<Authorizator>,
}

impl AuthBasicBuilder {
    /// Realm sent in the challenge. Required.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Credential check. Required.
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

    /// Builds the middleware.
    pub fn build(self) -> Result<AuthBasicMiddleware, ConfigError> {
        let realm = self
            .realm
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ConfigError::missing_option(NAME, "realm"))?;
        let authenticator = self
            .authenticator
            .ok_or_else(|| ConfigError::missing_option(NAME, "authenticator"))?;
        let challenge = HeaderValue::from_str(&format!("Basic realm={realm}"))
            .map_err(|e| ConfigError::invalid_option(NAME, "realm", e.to_string()))?;

        Ok(AuthBasicMiddleware {
            challenge,
            authenticator,
            authorizator: self
                .authorizator
                .unwrap_or_else(|| Arc::new(|_: &str, _: &Request| true)),
        })
    }
}
