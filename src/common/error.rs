// src/common/error.rs

use std::collections::HashMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Recursos que podem aparecer em mensagens de "não encontrado" / "em uso"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Partner,
    PayerAccount,
    CattlePurchase,
    Lot,
    Pen,
    PenAllocation,
    Expense,
    Revenue,
    Sale,
    Intervention,
}

impl Resource {
    fn not_found(self, english: bool) -> &'static str {
        match (self, english) {
            (Resource::User, false) => "Usuário não encontrado.",
            (Resource::User, true) => "User not found.",
            (Resource::Partner, false) => "Parceiro não encontrado.",
            (Resource::Partner, true) => "Partner not found.",
            (Resource::PayerAccount, false) => "Conta pagadora não encontrada.",
            (Resource::PayerAccount, true) => "Payer account not found.",
            (Resource::CattlePurchase, false) => "Compra não encontrada.",
            (Resource::CattlePurchase, true) => "Cattle purchase not found.",
            (Resource::Lot, false) => "Lote não encontrado.",
            (Resource::Lot, true) => "Lot not found.",
            (Resource::Pen, false) => "Curral não encontrado.",
            (Resource::Pen, true) => "Pen not found.",
            (Resource::PenAllocation, false) => "Alocação não encontrada.",
            (Resource::PenAllocation, true) => "Pen allocation not found.",
            (Resource::Expense, false) => "Despesa não encontrada.",
            (Resource::Expense, true) => "Expense not found.",
            (Resource::Revenue, false) => "Receita não encontrada.",
            (Resource::Revenue, true) => "Revenue not found.",
            (Resource::Sale, false) => "Venda não encontrada.",
            (Resource::Sale, true) => "Sale not found.",
            (Resource::Intervention, false) => "Intervenção não encontrada.",
            (Resource::Intervention, true) => "Health intervention not found.",
        }
    }

    fn label(self, english: bool) -> &'static str {
        match (self, english) {
            (Resource::User, false) => "usuário",
            (Resource::User, true) => "user",
            (Resource::Partner, false) => "parceiro",
            (Resource::Partner, true) => "partner",
            (Resource::PayerAccount, false) => "conta pagadora",
            (Resource::PayerAccount, true) => "payer account",
            (Resource::CattlePurchase, false) => "compra",
            (Resource::CattlePurchase, true) => "cattle purchase",
            (Resource::Lot, false) => "lote",
            (Resource::Lot, true) => "lot",
            (Resource::Pen, false) => "curral",
            (Resource::Pen, true) => "pen",
            (Resource::PenAllocation, false) => "alocação",
            (Resource::PenAllocation, true) => "pen allocation",
            (Resource::Expense, false) => "despesa",
            (Resource::Expense, true) => "expense",
            (Resource::Revenue, false) => "receita",
            (Resource::Revenue, true) => "revenue",
            (Resource::Sale, false) => "venda",
            (Resource::Sale, true) => "sale",
            (Resource::Intervention, false) => "intervenção",
            (Resource::Intervention, true) => "health intervention",
        }
    }
}

// Regras de negócio violadas (sempre 400)
#[derive(Debug, Clone, PartialEq)]
pub enum BusinessRule {
    PenCapacityExceeded { available: i64, requested: i64 },
    PenUnavailable,
    PenNotEmpty,
    CapacityBelowOccupancy { capacity: i32, occupied: i64 },
    InsufficientAnimals { available: i64, requested: i64 },
    InvalidStatusTransition { from: String, to: String },
    PurchaseNotConfirmed,
    ReceivedQuantityExceedsInitial,
    InvalidCategory(String),
    AlreadyPaid,
    AlreadyReceived,
    NonCashExpense,
    PayerAccountRequired,
    SettledRecordLocked,
    CompletedSaleLocked,
    SamePen,
    AmountOutOfRange,
    PurchaseHasPaidExpenses,
    InvalidPeriod,
    ExpectedBelowLost { lost: i32 },
    LotNotActive,
}

impl BusinessRule {
    fn message(&self, english: bool) -> String {
        match self {
            BusinessRule::PenCapacityExceeded { available, requested } => {
                if english {
                    format!("Pen capacity exceeded. Available: {available}, requested: {requested}.")
                } else {
                    format!("Capacidade do curral excedida. Disponível: {available}, solicitado: {requested}.")
                }
            }
            BusinessRule::PenUnavailable => {
                if english {
                    "Pen is under maintenance or quarantine.".into()
                } else {
                    "Curral em manutenção ou quarentena.".into()
                }
            }
            BusinessRule::PenNotEmpty => {
                if english {
                    "Pen still has animals allocated.".into()
                } else {
                    "Curral ainda possui animais alocados.".into()
                }
            }
            BusinessRule::CapacityBelowOccupancy { capacity, occupied } => {
                if english {
                    format!("New capacity ({capacity}) is below the current occupancy ({occupied}).")
                } else {
                    format!("Nova capacidade ({capacity}) é menor que a ocupação atual ({occupied}).")
                }
            }
            BusinessRule::InsufficientAnimals { available, requested } => {
                if english {
                    format!("Not enough animals. Available: {available}, requested: {requested}.")
                } else {
                    format!("Quantidade de animais insuficiente. Disponível: {available}, solicitado: {requested}.")
                }
            }
            BusinessRule::InvalidStatusTransition { from, to } => {
                if english {
                    format!("Cannot change status from {from} to {to}.")
                } else {
                    format!("Não é possível mudar de {from} para {to}.")
                }
            }
            BusinessRule::PurchaseNotConfirmed => {
                if english {
                    "Only confirmed purchases can be received.".into()
                } else {
                    "Apenas compras confirmadas podem ser recepcionadas.".into()
                }
            }
            BusinessRule::ReceivedQuantityExceedsInitial => {
                if english {
                    "Received quantity exceeds the purchased quantity.".into()
                } else {
                    "Quantidade recebida excede a quantidade comprada.".into()
                }
            }
            BusinessRule::InvalidCategory(category) => {
                if english {
                    format!("Invalid category: {category}.")
                } else {
                    format!("Categoria inválida: {category}.")
                }
            }
            BusinessRule::AlreadyPaid => {
                if english { "Expense already paid.".into() } else { "Despesa já paga.".into() }
            }
            BusinessRule::AlreadyReceived => {
                if english { "Revenue already received.".into() } else { "Receita já recebida.".into() }
            }
            BusinessRule::NonCashExpense => {
                if english {
                    "This expense does not impact cash flow.".into()
                } else {
                    "Esta despesa não impacta o caixa.".into()
                }
            }
            BusinessRule::PayerAccountRequired => {
                if english {
                    "A payer account is required.".into()
                } else {
                    "Conta pagadora é obrigatória.".into()
                }
            }
            BusinessRule::SettledRecordLocked => {
                if english {
                    "Settled records cannot be changed.".into()
                } else {
                    "Lançamentos quitados não podem ser alterados.".into()
                }
            }
            BusinessRule::CompletedSaleLocked => {
                if english {
                    "Completed sales cannot be changed or deleted.".into()
                } else {
                    "Vendas concluídas não podem ser alteradas ou excluídas.".into()
                }
            }
            BusinessRule::SamePen => {
                if english {
                    "Source and destination pens must differ.".into()
                } else {
                    "Curral de origem e destino devem ser diferentes.".into()
                }
            }
            BusinessRule::PurchaseHasPaidExpenses => {
                if english {
                    "Purchases with paid expenses cannot be deleted.".into()
                } else {
                    "Compras com despesas já pagas não podem ser excluídas.".into()
                }
            }
            BusinessRule::AmountOutOfRange => {
                if english {
                    "The computed amount exceeds the supported range.".into()
                } else {
                    "O valor calculado excede o limite suportado.".into()
                }
            }
            BusinessRule::InvalidPeriod => {
                if english {
                    "The period must stay between the years 1900 and 9999 and span at most 10 years.".into()
                } else {
                    "O período deve ficar entre os anos 1900 e 9999 e abranger no máximo 10 anos.".into()
                }
            }
            BusinessRule::LotNotActive => {
                if english {
                    "Only active lots accept this operation.".into()
                } else {
                    "Somente lotes ativos aceitam esta operação.".into()
                }
            }
            BusinessRule::ExpectedBelowLost { lost } => {
                if english {
                    format!("Expected animals cannot be lower than the {lost} already lost or sold.")
                } else {
                    format!("A quantidade prevista não pode ser menor que os {lost} animais já baixados ou vendidos.")
                }
            }
        }
    }
}

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Permissão '{0}' necessária")]
    Forbidden(&'static str),

    #[error("Recurso não encontrado: {0:?}")]
    NotFound(Resource),

    #[error("Valor duplicado para {field}: {value}")]
    DuplicateValue { field: &'static str, value: String },

    #[error("Recurso em uso: {0:?}")]
    ResourceInUse(Resource),

    #[error("Referência inválida: {0}")]
    InvalidReference(&'static str),

    #[error("Regra de negócio violada: {0:?}")]
    BusinessRule(BusinessRule),

    #[error("Corpo da requisição inválido: {0}")]
    MalformedBody(String),

    #[error("Parâmetro inválido: {0}")]
    InvalidParameter(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<BusinessRule> for AppError {
    fn from(rule: BusinessRule) -> Self {
        AppError::BusinessRule(rule)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidParameter(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidParameter(rejection.body_text())
    }
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "message": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidReference(_)
            | AppError::BusinessRule(_)
            | AppError::MalformedBody(_)
            | AppError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::DuplicateValue { .. }
            | AppError::ResourceInUse(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Traduz o erro para o idioma pedido no `Accept-Language`.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let en = locale.is_english();
        let status = self.status_code();

        let (error, details) = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let message = if en {
                    "One or more fields are invalid."
                } else {
                    "Um ou mais campos são inválidos."
                };
                (message.to_string(), Some(json!(details)))
            }
            AppError::EmailAlreadyExists => {
                let message = if en { "This e-mail is already in use." } else { "Este e-mail já está em uso." };
                (message.to_string(), None)
            }
            AppError::InvalidCredentials => {
                let message = if en { "Invalid e-mail or password." } else { "E-mail ou senha inválidos." };
                (message.to_string(), None)
            }
            AppError::InvalidToken => {
                let message = if en {
                    "Missing or invalid authentication token."
                } else {
                    "Token de autenticação inválido ou ausente."
                };
                (message.to_string(), None)
            }
            AppError::Forbidden(permission) => {
                let message = if en {
                    format!("You need the '{permission}' permission to perform this action.")
                } else {
                    format!("Você precisa da permissão '{permission}' para realizar esta ação.")
                };
                (message, None)
            }
            AppError::NotFound(resource) => (resource.not_found(en).to_string(), None),
            AppError::DuplicateValue { field, value } => {
                let message = if en {
                    format!("A record with {field} '{value}' already exists.")
                } else {
                    format!("Já existe um registro com {field} '{value}'.")
                };
                let details = json!({ *field: [message.clone()] });
                (message, Some(details))
            }
            AppError::ResourceInUse(resource) => {
                let label = resource.label(en);
                let message = if en {
                    format!("This {label} is referenced by other records and cannot be removed.")
                } else {
                    format!("Este registro ({label}) está vinculado a outros e não pode ser removido.")
                };
                (message, None)
            }
            AppError::InvalidReference(field) => {
                let message = if en {
                    format!("Field '{field}' references a record that does not exist.")
                } else {
                    format!("O campo '{field}' referencia um registro inexistente.")
                };
                let details = json!({ *field: [message.clone()] });
                (message, Some(details))
            }
            AppError::BusinessRule(rule) => (rule.message(en), None),
            AppError::MalformedBody(reason) => {
                let message = if en { "Invalid request body." } else { "Corpo da requisição inválido." };
                (message.to_string(), Some(json!({ "body": [reason] })))
            }
            AppError::InvalidParameter(reason) => {
                let message = if en { "Invalid URL parameter." } else { "Parâmetro da URL inválido." };
                (message.to_string(), Some(json!({ "params": [reason] })))
            }
            // Todos os outros erros viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                let message = if en { "An unexpected error occurred." } else { "Ocorreu um erro inesperado." };
                (message.to_string(), None)
            }
        };

        ApiError { status, error, details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn english() -> Locale {
        Locale("en".to_string())
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("required");
        err.message = Some("O campo 'name' é obrigatório.".into());
        errors.add("name", err);

        let api = AppError::ValidationError(errors).to_api_error(&Locale::default());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert_eq!(details["name"][0], "O campo 'name' é obrigatório.");
    }

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound(Resource::Lot).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Forbidden("users:manage").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::BusinessRule(BusinessRule::PenNotEmpty).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn messages_follow_the_locale() {
        let pt = AppError::NotFound(Resource::Pen).to_api_error(&Locale::default());
        let en = AppError::NotFound(Resource::Pen).to_api_error(&english());

        assert_eq!(pt.error, "Curral não encontrado.");
        assert_eq!(en.error, "Pen not found.");
    }

    #[test]
    fn capacity_message_reports_available_space() {
        let err = AppError::from(BusinessRule::PenCapacityExceeded { available: 3, requested: 10 });
        let api = err.to_api_error(&english());
        assert!(api.error.contains("Available: 3"));
        assert!(api.error.contains("requested: 10"));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("pool exploded"));
        let api = err.to_api_error(&english());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("pool"));
    }

    #[test]
    fn bad_url_parameters_are_json_bad_requests() {
        let api = AppError::InvalidParameter("UUID parsing failed".into()).to_api_error(&english());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "Invalid URL parameter.");
        assert_eq!(api.details.expect("details")["params"][0], "UUID parsing failed");
    }
}
