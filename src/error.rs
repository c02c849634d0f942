use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error as ThisError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("dotenv error: {0}")]
    DotEnvError(#[from] dotenv::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("organization mismatch: {0}")]
    OrganizationMismatch(String),

    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("discriminator mismatch: {0}")]
    DiscriminatorMismatch(String),

    #[error("{entity} {id} cannot be deleted while {dependents} dependent record(s) reference it")]
    ReferentialProtect { entity: &'static str, id: i32, dependents: i64 },

    #[error("record is still referenced: {0}")]
    ForeignKeyViolation(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("bussiness error: {0}")]
    BusinessError(String),

    #[error("batch aborted at item {index}: {source}")]
    BatchAborted { index: usize, source: Box<Error> },

    #[error("server error: {0}")]
    ServerError(String),
}

impl Error {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Error::NotFound { entity, key: key.to_string() }
    }

    /// Machine-readable error kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::OrganizationMismatch(_) => "OrganizationMismatch",
            Error::DuplicateRegistration(_) => "DuplicateRegistration",
            Error::DiscriminatorMismatch(_) => "DiscriminatorMismatch",
            Error::ReferentialProtect { .. } | Error::ForeignKeyViolation(_) => "ReferentialProtect",
            Error::UniqueViolation(_) => "Conflict",
            Error::BusinessError(_) => "ValidationError",
            Error::BatchAborted { .. } => "BatchAborted",
            Error::DatabaseError(_) | Error::MigrateError(_) => "DatabaseError",
            Error::DotEnvError(_) | Error::ServerError(_) => "ServerError",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_owned();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return Error::UniqueViolation(constraint),
                Some(FOREIGN_KEY_VIOLATION) => return Error::ForeignKeyViolation(constraint),
                _ => {}
            }
        }
        if let sqlx::Error::RowNotFound = err {
            return Error::not_found("record", "no matching row");
        }
        Error::DatabaseError(err)
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::OrganizationMismatch(_) | Error::DiscriminatorMismatch(_) | Error::BusinessError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DuplicateRegistration(_) | Error::UniqueViolation(_) | Error::ReferentialProtect { .. } | Error::ForeignKeyViolation(_) => StatusCode::CONFLICT,
            Error::BatchAborted { source, .. } => source.status_code(),
            Error::DatabaseError(_) | Error::MigrateError(_) | Error::DotEnvError(_) | Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            Error::ReferentialProtect { dependents, .. } => {
                body["dependents"] = json!(dependents);
            }
            Error::BatchAborted { index, source } => {
                body["index"] = json!(index);
                body["cause"] = json!({ "kind": source.kind(), "message": source.to_string() });
            }
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
