// src/handlers/auth.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::validate_payload,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermUsersManage, RequirePermission},
    },
    models::auth::{AuthResponse, LoginUserPayload, RegisterUserPayload, UpdateRolePayload, UserProfile},
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário registrado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterUserPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let response = app_state
        .auth_service
        .register_user(&payload.email, &payload.password, payload.name.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Json(payload), _): WithRejection<Json<LoginUserPayload>, AppError>,
) -> Result<Json<AuthResponse>, ApiError> {
    validate_payload(&payload, &locale)?;

    let response = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário autenticado", body = UserProfile),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserProfile> {
    Json(user.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    responses(
        (status = 200, description = "Usuários cadastrados", body = Vec<UserProfile>),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermUsersManage>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = app_state
        .auth_service
        .list_users()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/role",
    tag = "Users",
    request_body = UpdateRolePayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Papel alterado", body = UserProfile),
        (status = 403, description = "Apenas administradores"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user_role(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermUsersManage>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateRolePayload>, AppError>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = app_state
        .auth_service
        .update_role(id, payload.role)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(user.into()))
}
