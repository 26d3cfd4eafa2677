use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::CheckoutGatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Webhook key invalid or not provided")]
    InvalidWebhookKey,
    #[error("{0}")]
    CheckoutError(#[from] CheckoutGatewayError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidWebhookKey => StatusCode::UNAUTHORIZED,
            Self::CheckoutError(e) => match e {
                // Contention: the caller may retry after re-reading stock.
                CheckoutGatewayError::LockUnavailable(_) => StatusCode::CONFLICT,
                CheckoutGatewayError::VersionConflict(_) => StatusCode::CONFLICT,
                // Validation: the request itself is unserviceable; nothing was committed.
                CheckoutGatewayError::CartItemNotFound => StatusCode::BAD_REQUEST,
                CheckoutGatewayError::OutOfStock { .. } => StatusCode::BAD_REQUEST,
                CheckoutGatewayError::ProductUnavailable(_) => StatusCode::BAD_REQUEST,
                CheckoutGatewayError::SellerMismatch { .. } => StatusCode::BAD_REQUEST,
                CheckoutGatewayError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
                CheckoutGatewayError::InvalidReference(_) => StatusCode::BAD_REQUEST,
                // Idempotency and state guards.
                CheckoutGatewayError::DuplicateTransaction(_) => StatusCode::CONFLICT,
                CheckoutGatewayError::PaymentNotPending { .. } => StatusCode::CONFLICT,
                CheckoutGatewayError::CannotCancel { .. } => StatusCode::CONFLICT,
                CheckoutGatewayError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutGatewayError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutGatewayError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
