// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::UserRepository,
    models::auth::{AuthResponse, Claims, Role, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    jwt_expiration_hours: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, jwt_expiration_hours: i64, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, jwt_expiration_hours, pool }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse, AppError> {
        // 1. Hashing (fora da transação, não toca no banco)
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))?
            ?;

        let mut tx = self.pool.begin().await?;

        // 2. O primeiro usuário do sistema vira administrador
        // Com a tabela travada, dois cadastros simultâneos não veem ambos zero usuários
        self.user_repo.lock_for_registration(&mut *tx).await?;
        let role = if self.user_repo.count(&mut *tx).await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let new_user = self.user_repo
            .create_user(&mut *tx, &normalize_email(email), name, &hashed_password, role)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %new_user.id, role = ?new_user.role, "Usuário registrado");

        let token = issue_token(&self.jwt_secret, &new_user, self.jwt_expiration_hours)?;
        Ok(AuthResponse { token, user: new_user.into() })
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self.user_repo
            .find_by_email(&self.pool, &normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?
        ?;

        if !is_password_valid || !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let token = issue_token(&self.jwt_secret, &user, self.jwt_expiration_hours)?;
        Ok(AuthResponse { token, user: user.into() })
    }

    /// Decodifica o token e recarrega o usuário (o papel vem sempre do banco).
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(&self.pool, claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::InvalidToken)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list(&self.pool).await
    }

    pub async fn update_role(&self, user_id: Uuid, role: Role) -> Result<User, AppError> {
        let user = self.user_repo
            .update_role(&self.pool, user_id, role)
            .await?
            .ok_or(AppError::NotFound(Resource::User))?;

        tracing::info!(user_id = %user.id, role = ?user.role, "Papel do usuário alterado");
        Ok(user)
    }
}

/// E-mails são comparados e gravados sem espaços e em minúsculas.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Gera um JWT HS256 para o usuário.
pub fn issue_token(secret: &str, user: &User, expiration_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

/// Valida assinatura e expiração. Qualquer falha vira `InvalidToken`.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "vaqueiro@fazenda.com.br".into(),
            name: Some("Vaqueiro".into()),
            password_hash: "hash".into(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_decodes_with_the_same_secret() {
        let user = user(Role::Manager);
        let token = issue_token("segredo", &user, 24).unwrap();

        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Manager);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = issue_token("segredo", &user(Role::User), 24).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("segredo", &user(Role::User), -2).unwrap();
        assert!(matches!(decode_token("segredo", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn emails_are_normalized_before_storage_and_lookup() {
        assert_eq!(normalize_email("  Vaqueiro@Fazenda.COM.br "), "vaqueiro@fazenda.com.br");
        assert_eq!(normalize_email("vaqueiro@fazenda.com.br"), "vaqueiro@fazenda.com.br");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(decode_token("segredo", "abc.def.ghi"), Err(AppError::InvalidToken)));
    }
}
