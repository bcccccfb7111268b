use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use laundry_payment_engine::traits::{OrderApiError, ReconciliationError};
use paystack_tools::PaystackApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Access token invalid or not provided")]
    CouldNotDeserializeAccessToken,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The payment gateway could not complete the request. {0}")]
    GatewayError(String),
    #[error("The order could not be accepted. {0}")]
    InvalidOrder(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializeAccessToken => StatusCode::UNAUTHORIZED,
            Self::AuthenticationError(e) => match e {
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            ServerError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Webhook signature is invalid.")]
    InvalidSignature,
    #[error("Request origin is not on the gateway whitelist.")]
    ForbiddenPeer,
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::MigrationError(e) | ReconciliationError::DatabaseError(e) => Self::BackendError(e),
            ReconciliationError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            ReconciliationError::UnsupportedEventKind(kind) => {
                Self::InvalidRequestBody(format!("'{kind}' events cannot be reconciled"))
            },
            ReconciliationError::InvalidOrder(e) => Self::InvalidOrder(e.to_string()),
        }
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            OrderApiError::DatabaseError(e) => Self::BackendError(e),
            OrderApiError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
        }
    }
}

impl From<PaystackApiError> for ServerError {
    fn from(e: PaystackApiError) -> Self {
        match e {
            // The provider reports an unknown reference as a 404 on the verify call. That is a
            // caller mistake, not a gateway fault.
            PaystackApiError::QueryError { status: 404, message } => Self::NoRecordFound(message),
            e => Self::GatewayError(e.to_string()),
        }
    }
}
