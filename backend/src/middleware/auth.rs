//! Authentication middleware
//!
//! Verifies identity-provider JWTs and checks roles for each route.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{Caller, UserRole};
use uuid::Uuid;

use crate::audit::{self, AuditEvent};
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::external::IdentityProviderClient;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthUser {
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.user_id,
            role: self.role,
        }
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
}

impl Claims {
    /// Highest known realm role; ADMIN outranks WAREHOUSE_MANAGER outranks CLIENT
    pub fn role(&self) -> Option<UserRole> {
        self.realm_access
            .as_ref()?
            .roles
            .iter()
            .filter_map(|r| UserRole::from_claim(r))
            .max()
    }

    pub fn into_auth_user(self) -> AppResult<AuthUser> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid subject in token".into()))?;
        let role = self
            .role()
            .ok_or_else(|| AppError::Forbidden("Token carries no known role".into()))?;

        Ok(AuthUser {
            user_id,
            role,
            email: self.email,
            name: self.name.or(self.preferred_username),
        })
    }
}

/// Token verification key and rules
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_rsa_pem(pem: &str, config: &AuthConfig) -> AppResult<Self> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AppError::Internal(format!("invalid RS256 public key: {e}")))?;
        Ok(Self::with_rules(key, Algorithm::RS256, config))
    }

    pub fn from_secret(secret: &str, config: &AuthConfig) -> Self {
        Self::with_rules(
            DecodingKey::from_secret(secret.as_bytes()),
            Algorithm::HS256,
            config,
        )
    }

    fn with_rules(key: DecodingKey, algorithm: Algorithm, config: &AuthConfig) -> Self {
        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self { key, validation }
    }

    /// Build a verifier from configuration, fetching the realm key when needed
    pub async fn from_config(config: &AuthConfig) -> AppResult<Self> {
        if let Some(pem) = &config.public_key_pem {
            return Self::from_rsa_pem(pem, config);
        }
        if let Some(secret) = &config.hmac_secret {
            tracing::warn!("Verifying tokens with a shared HS256 secret");
            return Ok(Self::from_secret(secret, config));
        }

        match (&config.issuer, config.fetch_realm_key) {
            (Some(issuer), true) => {
                let pem = IdentityProviderClient::new(issuer.clone())?
                    .fetch_public_key()
                    .await?;
                Self::from_rsa_pem(&pem, config)
            }
            _ => Err(AppError::Internal(
                "no token verification key configured".into(),
            )),
        }
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid Authorization header".into()))?;

    let auth_user = state
        .verifier
        .verify(token)
        .and_then(Claims::into_auth_user)
        .map_err(|e| {
            audit::emit(AuditEvent::TokenRejected {
                reason: e.to_string(),
            });
            e
        })?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Extractor for authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Role guard for use in handlers
pub fn require_role(user: &AuthUser, roles: &[UserRole], action: &str) -> AppResult<()> {
    if user.has_any_role(roles) {
        return Ok(());
    }

    audit::emit(AuditEvent::AccessDenied {
        user_id: user.user_id,
        role: user.role,
        path: action.to_string(),
    });
    Err(AppError::Forbidden(format!(
        "Role {} may not {}",
        user.role, action
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn auth_config() -> AuthConfig {
        AuthConfig {
            issuer: Some("http://idp.local/realms/logistics".into()),
            audience: None,
            public_key_pem: None,
            hmac_secret: Some("dev-secret".into()),
            fetch_realm_key: false,
        }
    }

    fn claims(roles: &[&str], exp: i64) -> serde_json::Value {
        serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": exp,
            "iss": "http://idp.local/realms/logistics",
            "aud": "account",
            "email": "ops@example.com",
            "preferred_username": "ops",
            "realm_access": { "roles": roles },
        })
    }

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_highest_role_wins() {
        let verifier = TokenVerifier::from_secret("dev-secret", &auth_config());
        let token = sign(
            &claims(&["offline_access", "client", "ROLE_WAREHOUSE_MANAGER"], future()),
            "dev-secret",
        );

        let user = verifier.verify(&token).unwrap().into_auth_user().unwrap();
        assert_eq!(user.role, UserRole::WarehouseManager);
        assert_eq!(user.name.as_deref(), Some("ops"));
        assert_eq!(user.caller().role, UserRole::WarehouseManager);
    }

    #[test]
    fn test_token_without_role_is_forbidden() {
        let verifier = TokenVerifier::from_secret("dev-secret", &auth_config());
        let token = sign(&claims(&["offline_access"], future()), "dev-secret");

        let result = verifier.verify(&token).unwrap().into_auth_user();
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = TokenVerifier::from_secret("dev-secret", &auth_config());
        let token = sign(&claims(&["admin"], future()), "other-secret");
        assert!(matches!(verifier.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::from_secret("dev-secret", &auth_config());
        let token = sign(&claims(&["admin"], 1_000), "dev-secret");
        assert!(matches!(verifier.verify(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let verifier = TokenVerifier::from_secret("dev-secret", &auth_config());
        let mut body = claims(&["admin"], future());
        body["iss"] = "http://evil.local/realms/logistics".into();
        let token = sign(&body, "dev-secret");
        assert!(matches!(verifier.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_require_role() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Client,
            email: None,
            name: None,
        };
        assert!(require_role(&user, &[UserRole::Admin, UserRole::Client], "create orders").is_ok());
        assert!(matches!(
            require_role(&user, &[UserRole::Admin], "update purchase orders"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_without_key_fails() {
        let config = AuthConfig {
            issuer: None,
            audience: None,
            public_key_pem: None,
            hmac_secret: None,
            fetch_realm_key: true,
        };
        assert!(TokenVerifier::from_config(&config).await.is_err());
    }
}
