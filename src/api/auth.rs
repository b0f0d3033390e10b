// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet sign-in endpoints.
//!
//! Sessions are carried in the `wallet_auth_session` cookie. Non-browser
//! clients may send the same token as `Authorization: Bearer <token>`.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::{
    auth::AuthenticationRequest,
    error::{ApiError, ErrorBody, AUTHENTICATION_FAILED_MESSAGE, INVALID_ADDRESS_MESSAGE},
    models::{
        AuthenticateRequest, AuthenticateResponse, LogoutResponse, NonceQuery, NonceRequest,
        NonceResponse, PublicConfigResponse, SessionResponse,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditLog},
};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "wallet_auth_session";

/// Session token from the cookie or a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn issue_nonce(state: &AppState, wallet_address: &str) -> Result<Json<NonceResponse>, ApiError> {
    let issued = state
        .authenticator
        .issue_nonce(wallet_address)
        .map_err(|e| {
            if !matches!(e, crate::auth::AuthError::InvalidAddressFormat) {
                warn!(error = %e, "Failed to issue nonce");
            }
            ApiError::from(e)
        })?;
    Ok(Json(NonceResponse {
        success: true,
        wallet_address: issued.wallet_address.checksummed(),
        nonce: issued.token,
        expires_at: issued.expires_at,
    }))
}

#[utoipa::path(
    get,
    path = "/wallet-auth/nonce",
    params(NonceQuery),
    tag = "Wallet Auth",
    responses(
        (status = 200, description = "Nonce issued", body = NonceResponse),
        (status = 400, description = "Invalid wallet address", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn get_nonce(
    State(state): State<AppState>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>, ApiError> {
    issue_nonce(&state, &query.wallet_address)
}

#[utoipa::path(
    post,
    path = "/wallet-auth/nonce",
    request_body = NonceRequest,
    tag = "Wallet Auth",
    responses(
        (status = 200, description = "Nonce issued", body = NonceResponse),
        (status = 400, description = "Invalid wallet address", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn post_nonce(
    State(state): State<AppState>,
    body: Result<Json<NonceRequest>, JsonRejection>,
) -> Result<Json<NonceResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        warn!(error = %e, "Malformed nonce request body");
        ApiError::bad_request(INVALID_ADDRESS_MESSAGE)
    })?;
    issue_nonce(&state, &request.wallet_address)
}

/// Verify a signed sign-in message and start a session.
#[utoipa::path(
    post,
    path = "/wallet-auth/authenticate",
    request_body = AuthenticateRequest,
    tag = "Wallet Auth",
    responses(
        (status = 200, description = "Authenticated; session cookie set", body = AuthenticateResponse),
        (status = 400, description = "Invalid wallet address", body = ErrorBody),
        (status = 401, description = "Invalid signature", body = ErrorBody),
        (status = 500, description = "Authentication failed", body = ErrorBody)
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| {
        warn!(error = %e, "Malformed authentication request body");
        ApiError::bad_request(INVALID_ADDRESS_MESSAGE)
    })?;

    let authenticated = state.authenticator.authenticate(&AuthenticationRequest {
        wallet_address: request.wallet_address,
        message: request.message,
        signature: request.signature,
        nonce: request.nonce,
    })?;

    let session = state
        .sessions
        .finalize_login(&authenticated.account, &authenticated.wallet_address)
        .map_err(|e| {
            warn!(uid = authenticated.account.uid, error = %e, "Failed to establish session");
            ApiError::internal(AUTHENTICATION_FAILED_MESSAGE)
        })?;

    let cookie = session_cookie(
        &session.token,
        state.sessions.ttl().num_seconds(),
        state.secure_cookies,
    );
    let body = AuthenticateResponse {
        success: true,
        uid: authenticated.account.uid,
        username: authenticated.account.username,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/wallet-auth/session",
    tag = "Wallet Auth",
    responses(
        (status = 200, description = "Logged-in account", body = SessionResponse),
        (status = 401, description = "Anonymous", body = ErrorBody)
    )
)]
pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let not_authenticated = || ApiError::unauthorized("Not authenticated");
    let token = session_token(&headers).ok_or_else(not_authenticated)?;
    let account = state
        .sessions
        .current_account(&token)
        .map_err(|e| {
            warn!(error = %e, "Session lookup failed");
            ApiError::internal(AUTHENTICATION_FAILED_MESSAGE)
        })?
        .ok_or_else(not_authenticated)?;

    Ok(Json(SessionResponse {
        success: true,
        uid: account.uid,
        username: account.username,
    }))
}

#[utoipa::path(
    post,
    path = "/wallet-auth/logout",
    tag = "Wallet Auth",
    responses(
        (status = 200, description = "Session ended; cookie cleared", body = LogoutResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        let account = state.sessions.current_account(&token).ok().flatten();
        let ended = state.sessions.logout(&token).map_err(|e| {
            warn!(error = %e, "Failed to delete session");
            ApiError::internal(AUTHENTICATION_FAILED_MESSAGE)
        })?;
        if ended {
            if let Some(account) = account {
                info!(uid = account.uid, "Logged out");
                let event =
                    AuditEvent::new(AuditEventType::Logout, state.clock.now()).with_uid(account.uid);
                if let Err(e) = state.db.record(&event) {
                    warn!(error = %e, "Failed to write audit event");
                }
            }
        }
    }

    let cleared = session_cookie("", 0, state.secure_cookies);
    Ok(([(SET_COOKIE, cleared)], Json(LogoutResponse { success: true })).into_response())
}

/// Settings the browser wallet connector reads on page load.
#[utoipa::path(
    get,
    path = "/wallet-auth/config",
    tag = "Wallet Auth",
    responses((status = 200, body = PublicConfigResponse))
)]
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    let settings = &state.settings;
    Json(PublicConfigResponse {
        network: settings.network,
        chain_id: settings.network.chain_id(),
        nonce_lifetime: settings.nonce_lifetime.as_secs(),
        enable_auto_connect: settings.enable_auto_connect,
        redirect_on_success: settings.redirect_on_success.clone(),
    })
}
