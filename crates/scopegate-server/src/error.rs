use scopegate_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid request: {0}")]
    InvalidParameter(String),

    #[error("unsupported operation: {0}")]
    InvalidOperation(String),

    #[error("access to {entity} record is forbidden")]
    Forbidden { entity: String, id: String },

    #[error("{entity} record '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("store operation failed: {0}")]
    Upstream(StorageError),
}

impl GatewayError {
    pub fn forbidden(entity: &str, id: &str) -> Self {
        GatewayError::Forbidden {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => GatewayError::NotFound { entity, id },
            // The ownership guard failed at write time: the record changed hands
            // between the check and the mutation.
            StorageError::PreconditionFailed { entity, id } => {
                GatewayError::Forbidden { entity, id }
            }
            other @ StorageError::Internal(_) => GatewayError::Upstream(other),
        }
    }
}
