//! Bearer-token gate for the archive download endpoint
//!
//! Every download request must carry an HS256-signed JWT in the configured
//! header (default `Authorization`, with or without a `Bearer ` prefix). The
//! token must grant at least one of the configured capabilities (default
//! `ORG` or `APPS`) in its `access` claim, otherwise the request is rejected
//! with 401 Unauthorized.
//!
//! On success the caller is attached to the request twice: as a
//! [`CallerIdentity`] extension for handlers, and as `user-id` /
//! `organization-id` headers for anything downstream that only sees headers.

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Header carrying the caller's user id after a successful check
pub const USER_ID_HEADER: &str = "user-id";

/// Header carrying the caller's organization id after a successful check
pub const ORGANIZATION_ID_HEADER: &str = "organization-id";

/// Claims carried by a download token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier
    #[serde(rename = "userID", default)]
    pub user_id: String,
    /// Capabilities granted to the user
    #[serde(default)]
    pub access: Vec<String>,
    /// Role name
    #[serde(default)]
    pub role: String,
    /// Organization the user belongs to
    #[serde(rename = "organizationID", default)]
    pub organization_id: String,
    /// Expiration (seconds since the Unix epoch); checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// User identifier
    pub user_id: String,
    /// Organization the user belongs to
    pub organization_id: String,
    /// Role name
    pub role: String,
    /// Capabilities granted to the user
    pub access: Vec<String>,
}

impl From<Claims> for CallerIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            organization_id: claims.organization_id,
            role: claims.role,
            access: claims.access,
        }
    }
}

/// Token verifier shared by every request (cheap to clone)
#[derive(Clone)]
pub struct AuthGate {
    decoding_key: DecodingKey,
    validation: Arc<Validation>,
    header: HeaderName,
    permissions: Arc<[String]>,
}

impl AuthGate {
    /// Build a gate from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the header name is not a valid HTTP header.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let header = HeaderName::from_bytes(config.auth_header.to_ascii_lowercase().as_bytes())
            .map_err(|e| Error::Config {
                message: format!("invalid auth header name: {e}"),
                key: Some("auth.auth_header".to_string()),
            })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Arc::new(validation),
            header,
            permissions: config.permissions.iter().cloned().collect(),
        })
    }

    /// Verify the token found in `headers` and return the caller
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] when the token is missing, fails
    /// verification, or grants none of the allowed capabilities.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity> {
        let raw = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::Unauthenticated("token is not supplied".to_string()))?;

        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim();

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| Error::Unauthenticated(format!("invalid token: {e}")))?
            .claims;

        if !claims
            .access
            .iter()
            .any(|granted| self.permissions.contains(granted))
        {
            return Err(Error::Unauthenticated(
                "insufficient permissions to access this resource".to_string(),
            ));
        }

        Ok(claims.into())
    }
}

/// Middleware rejecting requests without a valid download token
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use log_download_manager::api::auth::{AuthGate, require_token};
/// use log_download_manager::config::AuthConfig;
///
/// # fn example() -> log_download_manager::Result<()> {
/// let gate = AuthGate::new(&AuthConfig {
///     secret: "s3cret".to_string(),
///     ..Default::default()
/// })?;
/// let router: Router = Router::new().layer(middleware::from_fn_with_state(gate, require_token));
/// # Ok(())
/// # }
/// ```
pub async fn require_token(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = match gate.authenticate(request.headers()) {
        Ok(caller) => caller,
        Err(e) => {
            tracing::debug!(uri = %request.uri(), error = %e, "download request rejected");
            return e.into_response();
        }
    };

    // Never let client-supplied identity headers through
    let headers = request.headers_mut();
    headers.remove(USER_ID_HEADER);
    headers.remove(ORGANIZATION_ID_HEADER);
    for (name, value) in [
        (USER_ID_HEADER, &caller.user_id),
        (ORGANIZATION_ID_HEADER, &caller.organization_id),
    ] {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
    request.extensions_mut().insert(caller);

    next.run(request).await
}
