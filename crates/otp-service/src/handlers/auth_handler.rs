use crate::errors::OtpError;
use crate::handlers::{bad_body, observe_error};
use crate::models::{RequestOtpRequest, RequestOtpResponse, VerifyOtpRequest, VerifyOtpResponse};
use crate::routes::AppState;
use crate::validation;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

/// Handle OTP request
///
/// POST /api/v1/auth/request-otp
pub async fn request_otp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RequestOtpRequest>, JsonRejection>,
) -> Result<Json<RequestOtpResponse>, OtpError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let phone_number = validation::validate_phone_number(&payload.phone_number)?;

    let response = state
        .auth_service
        .request_otp(&phone_number)
        .await
        .map_err(observe_error("request_otp"))?;

    Ok(Json(response))
}

/// Handle OTP verification
///
/// POST /api/v1/auth/verify-otp
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, OtpError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let phone_number = validation::validate_phone_number(&payload.phone_number)?;
    let otp = validation::validate_otp(&payload.otp)?;

    let response = state
        .auth_service
        .verify_otp(&phone_number, &otp)
        .await
        .map_err(observe_error("verify_otp"))?;

    Ok(Json(response))
}
