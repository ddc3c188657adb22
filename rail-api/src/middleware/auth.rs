use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use rail_shared::{Requester, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn requester(&self) -> Requester {
        Requester::new(self.sub, self.role)
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims, AppError> {
    let Authorization(bearer) = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Not authorized to access this route".into()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected token");
        AppError::AuthenticationError("Not authorized to access this route".into())
    })?;

    Ok(token_data.claims)
}

/// Any authenticated user. Injects [`Claims`] and [`Requester`].
pub async fn require_user(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = authenticate(&state, req.headers())?;
    req.extensions_mut().insert(claims.requester());
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Administrators only.
pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = authenticate(&state, req.headers())?;
    if claims.role != Role::Admin {
        return Err(AppError::AuthorizationError(format!(
            "User role {} is not authorized to access this route",
            claims.role
        )));
    }
    req.extensions_mut().insert(claims.requester());
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
