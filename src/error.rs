use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    response::{ApiResponse, Meta},
    services::checkout_service::CheckoutError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::ProductNotFound { .. } => StatusCode::NOT_FOUND,
                CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CheckoutError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Category, ProductRef},
        store::StoreError,
    };

    #[test]
    fn checkout_errors_map_to_statuses() {
        let chips = ProductRef::new(Category::SnackAttack, "chips");
        let cases = [
            (CheckoutError::EmptyCart, StatusCode::BAD_REQUEST),
            (
                CheckoutError::ProductNotFound {
                    product: chips.clone(),
                    name: "Chips".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                CheckoutError::InsufficientStock {
                    product: chips,
                    name: "Chips".into(),
                    requested: 2,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                CheckoutError::Store(StoreError::Conflict),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn rejected_store_write_is_a_bad_request() {
        let err = CheckoutError::from(StoreError::Rejected("too large".into()));
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(
            AppError::from(err).into_response().status(),
            StatusCode::BAD_REQUEST
        );

        let err = CheckoutError::from(StoreError::Unavailable("down".into()));
        assert!(matches!(err, CheckoutError::Store(_)));
    }

    #[test]
    fn out_of_stock_message_names_the_item() {
        let err = AppError::from(CheckoutError::InsufficientStock {
            product: ProductRef::new(Category::Smokes, "x"),
            name: "Blue Pack".into(),
            requested: 3,
            available: 0,
        });
        assert_eq!(err.to_string(), "Item Blue Pack is out of stock.");
    }
}
