//! Maps the five error kinds from the error-handling design onto HTTP
//! status codes and a `{code, message}` JSON body. This is the one
//! place a domain `Error` becomes a transport concern; everything
//! upstream of here only ever sees `stakeboard_core::Error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use stakeboard_core::{Error, ErrorKind};

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

fn error_code(e: &Error) -> &'static str {
    match e {
        Error::MalformedPhone => "malformed_phone",
        Error::StakeOutOfRange => "stake_out_of_range",
        Error::MalformedCard => "malformed_card",
        Error::ShotParamOutOfBounds(_) => "shot_param_out_of_bounds",
        Error::MalformedPin => "malformed_pin",
        Error::InvalidCredentials => "invalid_credentials",
        Error::AccountLocked(_) => "account_locked",
        Error::UnknownToken => "unknown_token",
        Error::TokenScopeMismatch => "token_scope_mismatch",
        Error::InsufficientFunds => "insufficient_funds",
        Error::UnknownAccount => "unknown_account",
        Error::NonPositiveAmount => "non_positive_amount",
        Error::AlreadyQueued => "already_queued",
        Error::QueueEntryNotFound => "queue_entry_not_found",
        Error::QueueEntryNotLive => "queue_entry_not_live",
        Error::StakeMismatch => "stake_mismatch",
        Error::MatchCodeNotLive => "match_code_not_live",
        Error::MatchNotFound => "match_not_found",
        Error::MatchFinished => "match_finished",
        Error::NotYourTurn => "not_your_turn",
        Error::IllegalMove(_) => "illegal_move",
        Error::WithdrawalBelowMinimum => "withdrawal_below_minimum",
        Error::ProviderUnavailable => "provider_unavailable",
        Error::SmsDeliveryFailed => "sms_delivery_failed",
        Error::Storage(_) => "storage_error",
        Error::Internal(_) => "internal_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::Domain => StatusCode::CONFLICT,
            ErrorKind::External => StatusCode::BAD_GATEWAY,
            ErrorKind::System => {
                tracing::error!("system error: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody { code: error_code(&self.0).to_owned(), message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
