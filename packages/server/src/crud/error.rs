use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrudError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("'{relationship}' is not a relationship of {entity}")]
    UnknownRelationship {
        entity: &'static str,
        relationship: String,
    },

    #[error("'{column}' is not a column of {entity}")]
    UnknownColumn { entity: &'static str, column: String },

    #[error("'{attribute}' is not an attribute of {entity}")]
    UnknownAttribute {
        entity: &'static str,
        attribute: String,
    },

    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

impl CrudError {
    /// True when the store rejected a write on a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            CrudError::Db(err) => matches!(
                err.sql_err(),
                Some(SqlErr::UniqueConstraintViolation(_))
            ),
            _ => false,
        }
    }
}
