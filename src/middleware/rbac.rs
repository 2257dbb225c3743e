// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{PERM_DELETE, PERM_FINANCE, PERM_USERS_MANAGE, PERM_WRITE},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

        let required_perm = T::slug();

        // O papel já veio do banco junto com o usuário no auth_guard
        if !user.0.role.has_permission(required_perm) {
            tracing::warn!(
                user_id = %user.0.id,
                role = ?user.0.role,
                permission = required_perm,
                "Acesso negado"
            );
            return Err(AppError::Forbidden(required_perm).to_api_error(&locale));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermWrite;
impl PermissionDef for PermWrite {
    fn slug() -> &'static str { PERM_WRITE }
}

pub struct PermDelete;
impl PermissionDef for PermDelete {
    fn slug() -> &'static str { PERM_DELETE }
}

pub struct PermFinance;
impl PermissionDef for PermFinance {
    fn slug() -> &'static str { PERM_FINANCE }
}

pub struct PermUsersManage;
impl PermissionDef for PermUsersManage {
    fn slug() -> &'static str { PERM_USERS_MANAGE }
}
