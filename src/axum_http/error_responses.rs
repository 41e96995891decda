use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::usecases::payments::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Display strings on the internal variants are generic, so the
        // underlying provider or database error never reaches the client.
        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
