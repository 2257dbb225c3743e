// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const PERM_READ: &str = "read";
pub const PERM_WRITE: &str = "write";
pub const PERM_DELETE: &str = "delete";
pub const PERM_FINANCE: &str = "finance";
pub const PERM_USERS_MANAGE: &str = "users:manage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Viewer,
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::Viewer => &[PERM_READ],
            Role::User => &[PERM_READ, PERM_WRITE, PERM_DELETE],
            Role::Manager => &[PERM_READ, PERM_WRITE, PERM_DELETE, PERM_FINANCE],
            Role::Admin => &[PERM_READ, PERM_WRITE, PERM_DELETE, PERM_FINANCE, PERM_USERS_MANAGE],
        }
    }

    pub fn has_permission(self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usuário como o front-end enxerga: sem hash, com a lista de permissões.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    #[schema(example = json!(["read", "write"]))]
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            permissions: user.role.permissions().iter().map(|p| p.to_string()).collect(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "gestor@fazenda.com.br")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "O nome deve ter entre 1 e 120 caracteres."))]
    pub name: Option<String>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRolePayload {
    pub role: Role,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::User);
        assert!(Role::User > Role::Viewer);
    }

    #[test]
    fn viewer_is_read_only() {
        assert!(Role::Viewer.has_permission(PERM_READ));
        assert!(!Role::Viewer.has_permission(PERM_WRITE));
        assert!(!Role::Viewer.has_permission(PERM_DELETE));
    }

    #[test]
    fn only_admin_manages_users() {
        assert!(Role::Admin.has_permission(PERM_USERS_MANAGE));
        assert!(!Role::Manager.has_permission(PERM_USERS_MANAGE));
    }

    #[test]
    fn register_payload_rejects_short_password_and_bad_email() {
        let payload = RegisterUserPayload {
            email: "not-an-email".into(),
            password: "123".into(),
            name: None,
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
