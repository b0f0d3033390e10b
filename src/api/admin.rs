// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator endpoints for wallet bindings.
//!
//! Guarded by `WALLET_AUTH_ADMIN_TOKEN`, sent as `Authorization: Bearer`.
//! When the token is not configured every admin route answers 404.
//!
//! - Inspect a wallet binding with its audit trail
//! - Revoke or reinstate a wallet
//! - Unbind a wallet from its account
//! - Query the audit log

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};

use crate::{
    auth::{token::digest, AuthError, WalletAddress},
    error::{ApiError, ErrorBody, INVALID_ADDRESS_MESSAGE},
    models::{AuditQuery, SetWalletStatusRequest, WalletDetailsResponse},
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditLog, WalletIdentity},
};

const WALLET_NOT_FOUND: &str = "Wallet not found";

/// Check the bearer token against the configured admin token.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::not_found("Not found"));
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    // Compared as digests; timing must not leak the token prefix.
    match presented {
        Some(token) if digest(token) == digest(expected) => Ok(()),
        _ => {
            warn!("Rejected admin request with missing or invalid token");
            Err(ApiError::unauthorized("Invalid admin token"))
        }
    }
}

fn parse_address(raw: &str) -> Result<WalletAddress, ApiError> {
    WalletAddress::parse(raw).map_err(|_| ApiError::bad_request(INVALID_ADDRESS_MESSAGE))
}

fn map_admin_error(e: AuthError) -> ApiError {
    match e {
        AuthError::UnknownWallet => ApiError::not_found(WALLET_NOT_FOUND),
        other => {
            warn!(error = %other, "Admin operation failed");
            ApiError::internal("Storage failure")
        }
    }
}

fn record(state: &AppState, event: AuditEvent) {
    if let Err(e) = state.db.record(&event) {
        warn!(error = %e, "Failed to write audit event");
    }
}

/// Show a wallet binding and its recent audit events.
#[utoipa::path(
    get,
    path = "/wallet-auth/admin/wallets/{wallet_address}",
    tag = "Admin",
    params(("wallet_address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, body = WalletDetailsResponse),
        (status = 400, description = "Invalid wallet address", body = ErrorBody),
        (status = 401, description = "Invalid admin token", body = ErrorBody),
        (status = 404, description = "Wallet not bound", body = ErrorBody)
    )
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet_address): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<WalletDetailsResponse>, ApiError> {
    require_admin(&state, &headers)?;
    let address = parse_address(&wallet_address)?;

    let identity = state
        .authenticator
        .binder()
        .load_by_address(&address)
        .map_err(map_admin_error)?
        .ok_or_else(|| ApiError::not_found(WALLET_NOT_FOUND))?;
    let recent_events = state
        .db
        .audit_events_for_wallet(address.as_str(), query.limit())
        .map_err(|e| map_admin_error(e.into()))?;

    Ok(Json(WalletDetailsResponse {
        identity,
        recent_events,
    }))
}

/// Revoke or reinstate a wallet. A revoked wallet cannot sign in.
#[utoipa::path(
    put,
    path = "/wallet-auth/admin/wallets/{wallet_address}/status",
    tag = "Admin",
    params(("wallet_address" = String, Path, description = "Wallet address")),
    request_body = SetWalletStatusRequest,
    responses(
        (status = 200, body = WalletIdentity),
        (status = 400, description = "Invalid wallet address", body = ErrorBody),
        (status = 401, description = "Invalid admin token", body = ErrorBody),
        (status = 404, description = "Wallet not bound", body = ErrorBody)
    )
)]
pub async fn set_wallet_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet_address): Path<String>,
    Json(request): Json<SetWalletStatusRequest>,
) -> Result<Json<WalletIdentity>, ApiError> {
    require_admin(&state, &headers)?;
    let address = parse_address(&wallet_address)?;

    let identity = state
        .authenticator
        .binder()
        .set_active(&address, request.active)
        .map_err(map_admin_error)?;

    let event_type = if request.active {
        AuditEventType::WalletReinstated
    } else {
        AuditEventType::WalletRevoked
    };
    record(
        &state,
        AuditEvent::new(event_type, state.clock.now())
            .with_wallet(address.as_str())
            .with_uid(identity.owner_uid),
    );

    Ok(Json(identity))
}

/// Remove a wallet binding. The account is kept.
#[utoipa::path(
    delete,
    path = "/wallet-auth/admin/wallets/{wallet_address}",
    tag = "Admin",
    params(("wallet_address" = String, Path, description = "Wallet address")),
    responses(
        (status = 204, description = "Binding removed"),
        (status = 400, description = "Invalid wallet address", body = ErrorBody),
        (status = 401, description = "Invalid admin token", body = ErrorBody),
        (status = 404, description = "Wallet not bound", body = ErrorBody)
    )
)]
pub async fn delete_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet_address): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    let address = parse_address(&wallet_address)?;

    let removed = state
        .authenticator
        .binder()
        .delete(&address)
        .map_err(map_admin_error)?;
    if !removed {
        return Err(ApiError::not_found(WALLET_NOT_FOUND));
    }

    info!(wallet_address = %address, "Admin unbound wallet");
    record(
        &state,
        AuditEvent::new(AuditEventType::WalletUnbound, state.clock.now())
            .with_wallet(address.as_str()),
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/wallet-auth/admin/audit",
    tag = "Admin",
    params(AuditQuery),
    responses(
        (status = 200, body = Vec<AuditEvent>),
        (status = 401, description = "Invalid admin token", body = ErrorBody)
    )
)]
pub async fn list_audit_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    require_admin(&state, &headers)?;
    let events = state
        .db
        .recent_audit_events(query.limit())
        .map_err(|e| map_admin_error(e.into()))?;
    Ok(Json(events))
}
