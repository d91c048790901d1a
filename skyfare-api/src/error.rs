use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyfare_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    Booking(BookingError),
    BadRequest(String),
}

fn status_for(err: &BookingError) -> StatusCode {
    match err {
        BookingError::FlightNotFound(_) | BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::NoSeatsAvailable(_)
        | BookingError::SeatTaken(_)
        | BookingError::AlreadyCancelled(_) => StatusCode::CONFLICT,
        BookingError::FlightDeparted(_) => StatusCode::GONE,
        BookingError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
        BookingError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::InvalidSeat(_) | BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        BookingError::IntegrityViolation(_) | BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, retryable) = match self {
            AppError::Booking(err) => {
                let status = status_for(&err);
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    "Internal Server Error".to_string()
                } else {
                    err.to_string()
                };
                (status, message, err.code(), err.is_retryable())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "INVALID_REQUEST", false),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfare_core::{LedgerError, PaymentError, Pnr};
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        let cases = [
            (BookingError::FlightNotFound(id), StatusCode::NOT_FOUND),
            (BookingError::BookingNotFound(Pnr::new("ABC123")), StatusCode::NOT_FOUND),
            (BookingError::NoSeatsAvailable(id), StatusCode::CONFLICT),
            (BookingError::AlreadyCancelled(Pnr::new("ABC123")), StatusCode::CONFLICT),
            (BookingError::FlightDeparted(id), StatusCode::GONE),
            (
                BookingError::PaymentFailed(PaymentError::Timeout(5000)),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (BookingError::Busy(id), StatusCode::SERVICE_UNAVAILABLE),
            (BookingError::InvalidSeat("99Z".to_string()), StatusCode::BAD_REQUEST),
            (
                BookingError::Storage(LedgerError::Backend("connection reset".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "{}", err);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response =
            AppError::from(BookingError::IntegrityViolation("flight x drifted".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
