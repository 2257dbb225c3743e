// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

// O guardião das rotas protegidas: exige `Authorization: Bearer <token>`
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let bearer = request.headers().typed_get::<Authorization<Bearer>>();

    let Some(Authorization(bearer)) = bearer else {
        return AppError::InvalidToken.to_api_error(&locale).into_response();
    };

    match app_state.auth_service.validate_token(bearer.token()).await {
        Ok(user) => {
            // Insere o usuário nos "extensions" da requisição
            request.extensions_mut().insert(AuthenticatedUser(user));
            next.run(request).await
        }
        Err(e) => e.to_api_error(&locale).into_response(),
    }
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
