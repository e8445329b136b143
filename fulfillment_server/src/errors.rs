use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fulfillment_engine::FulfillmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The record changed concurrently. {0}")]
    Conflict(String),
    #[error("The payment gateway integration is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        use FulfillmentError::*;
        match e {
            OrderNotFound(_) | CourierNotFound(_) | PaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            EmptyCart | InvalidCoupon(_) | InvalidOrderContents(_) | InvalidPaymentSignature | ManualAssignmentForbidden(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            TransitionNotAllowed { .. } | StatusUnchanged(_) | NothingToRefund(_) | OrderAlreadyExists(_) => {
                Self::Conflict(e.to_string())
            },
            GatewayNotConfigured => Self::GatewayUnavailable(e.to_string()),
            DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fulfillment_errors_map_to_sensible_status_codes() {
        use fulfillment_engine::db_types::OrderId;
        let e: ServerError = FulfillmentError::OrderNotFound(OrderId::from("ord-x".to_string())).into();
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
        let e: ServerError = FulfillmentError::InvalidPaymentSignature.into();
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        let e: ServerError = FulfillmentError::StatusUnchanged(OrderId::from("ord-x".to_string())).into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e: ServerError = FulfillmentError::GatewayNotConfigured.into();
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let e: ServerError = FulfillmentError::DatabaseError("disk on fire".to_string()).into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
