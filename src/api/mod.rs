// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Network,
    error::ErrorBody,
    models::{
        AuthenticateRequest, AuthenticateResponse, LogoutResponse, NonceRequest, NonceResponse,
        PublicConfigResponse, SessionResponse, SetWalletStatusRequest, WalletDetailsResponse,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType, WalletIdentity},
};

pub mod admin;
pub mod auth;
pub mod health;

/// Build the HTTP router.
///
/// An empty `cors_allowed_origins` list keeps CORS permissive; otherwise
/// only those origins may call the API, with credentials.
pub fn router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let wallet_auth_routes = Router::new()
        .route("/nonce", get(auth::get_nonce).post(auth::post_nonce))
        .route("/authenticate", post(auth::authenticate))
        .route("/session", get(auth::current_session))
        .route("/logout", post(auth::logout))
        .route("/config", get(auth::public_config))
        .route(
            "/admin/wallets/{wallet_address}",
            get(admin::get_wallet).delete(admin::delete_wallet),
        )
        .route(
            "/admin/wallets/{wallet_address}/status",
            put(admin::set_wallet_status),
        )
        .route("/admin/audit", get(admin::list_audit_events));

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/wallet-auth", wallet_auth_routes)
        .with_state(state);

    Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(cors_allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::get_nonce,
        auth::post_nonce,
        auth::authenticate,
        auth::current_session,
        auth::logout,
        auth::public_config,
        admin::get_wallet,
        admin::set_wallet_status,
        admin::delete_wallet,
        admin::list_audit_events,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            NonceRequest,
            NonceResponse,
            AuthenticateRequest,
            AuthenticateResponse,
            SessionResponse,
            LogoutResponse,
            PublicConfigResponse,
            Network,
            ErrorBody,
            SetWalletStatusRequest,
            WalletDetailsResponse,
            WalletIdentity,
            AuditEvent,
            AuditEventType,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Wallet Auth", description = "Wallet signature sign-in and sessions"),
        (name = "Admin", description = "Wallet revocation and audit trail"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::testing::{sign, siwe_message, DEV_ADDRESS_0, DEV_ADDRESS_1, DEV_KEY_0};
    use crate::config::AuthSettings;
    use crate::storage::AuthDatabase;

    const ADMIN_TOKEN: &str = "admin-secret";

    fn test_state() -> (AppState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap(),
        ));
        let db = Arc::new(AuthDatabase::in_memory().unwrap());
        let state = AppState::new(db, AuthSettings::default(), clock.clone())
            .with_admin_token(Some(ADMIN_TOKEN.to_string()));
        (state, clock)
    }

    fn app() -> Router {
        router(test_state().0, &[])
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session_cookie_value(response: &Response) -> String {
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = header.split(';').next().unwrap();
        pair.split_once('=').unwrap().1.to_string()
    }

    /// Issue a nonce; returns it with the address form to sign over.
    async fn issue_challenge(app: &Router, address: &str) -> (String, String) {
        let response = send(
            app,
            post_json("/wallet-auth/nonce", json!({ "wallet_address": address })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        (
            body["nonce"].as_str().unwrap().to_string(),
            body["wallet_address"].as_str().unwrap().to_string(),
        )
    }

    async fn issue_nonce(app: &Router, address: &str) -> String {
        issue_challenge(app, address).await.0
    }

    async fn sign_in(app: &Router, key: &str, address: &str) -> Response {
        let (nonce, message_address) = issue_challenge(app, address).await;
        let message = siwe_message(&message_address, &nonce);
        let signature = sign(key, &message);
        send(
            app,
            post_json(
                "/wallet-auth/authenticate",
                json!({
                    "wallet_address": address,
                    "signature": signature,
                    "message": message,
                    "nonce": nonce,
                }),
            ),
        )
        .await
    }

    fn admin_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"));
        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn nonce_is_issued_via_get_and_post() {
        let app = app();

        let response = send(
            &app,
            get_request(&format!("/wallet-auth/nonce?wallet_address={DEV_ADDRESS_0}")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["nonce"].as_str().unwrap().len(), 64);
        assert!(body["expires_at"].is_string());

        let nonce = issue_nonce(&app, DEV_ADDRESS_0).await;
        assert_ne!(nonce, body["nonce"].as_str().unwrap());
    }

    #[tokio::test]
    async fn nonce_response_carries_checksummed_address() {
        let app = app();
        let lowercase = DEV_ADDRESS_0.to_ascii_lowercase();

        let (_, address) = issue_challenge(&app, &lowercase).await;
        assert_eq!(address, DEV_ADDRESS_0);

        // A lowercase submission still signs in through the returned form.
        let response = sign_in(&app, DEV_KEY_0, &lowercase).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn nonce_for_invalid_address_is_rejected() {
        let app = app();

        let response = send(
            &app,
            post_json("/wallet-auth/nonce", json!({ "wallet_address": "0x123" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "error": "Invalid wallet address" })
        );

        let response = send(&app, get_request("/wallet-auth/nonce")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn authenticate_sets_session_and_rejects_replay() {
        let app = app();
        let nonce = issue_nonce(&app, DEV_ADDRESS_0).await;
        let message = siwe_message(DEV_ADDRESS_0, &nonce);
        let body = json!({
            "wallet_address": DEV_ADDRESS_0,
            "signature": sign(DEV_KEY_0, &message),
            "message": message,
            "nonce": nonce,
        });

        let response = send(&app, post_json("/wallet-auth/authenticate", body.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("wallet_auth_session="));
        assert!(cookie.contains("HttpOnly"));
        let token = session_cookie_value(&response);
        let signed_in = json_body(response).await;
        assert_eq!(signed_in["success"], true);
        assert!(signed_in["username"].as_str().unwrap().starts_with("wallet_"));

        let response = send(
            &app,
            Request::get("/wallet-auth/session")
                .header(COOKIE, format!("wallet_auth_session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let session = json_body(response).await;
        assert_eq!(session["uid"], signed_in["uid"]);

        let replay = send(&app, post_json("/wallet-auth/authenticate", body)).await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(replay).await,
            json!({ "success": false, "error": "Invalid signature" })
        );
    }

    #[tokio::test]
    async fn same_wallet_keeps_its_account() {
        let app = app();

        let first = json_body(sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await).await;
        let second = json_body(sign_in(&app, DEV_KEY_0, &DEV_ADDRESS_0.to_lowercase()).await).await;

        assert_eq!(first["uid"], second["uid"]);
        assert_eq!(first["username"], second["username"]);
    }

    #[tokio::test]
    async fn signature_from_another_key_is_unauthorized() {
        let app = app();
        let nonce = issue_nonce(&app, DEV_ADDRESS_1).await;
        let message = siwe_message(DEV_ADDRESS_1, &nonce);

        let response = send(
            &app,
            post_json(
                "/wallet-auth/authenticate",
                json!({
                    "wallet_address": DEV_ADDRESS_1,
                    "signature": sign(DEV_KEY_0, &message),
                    "message": message,
                    "nonce": nonce,
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_authenticate_bodies_are_bad_requests() {
        let app = app();

        let response = send(
            &app,
            Request::post("/wallet-auth/authenticate")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, post_json("/wallet-auth/authenticate", json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid wallet address");
    }

    #[tokio::test]
    async fn expired_nonce_is_unauthorized() {
        let (state, clock) = test_state();
        let app = router(state, &[]);
        let nonce = issue_nonce(&app, DEV_ADDRESS_0).await;
        let message = siwe_message(DEV_ADDRESS_0, &nonce);

        clock.advance(chrono::Duration::seconds(301));

        let response = send(
            &app,
            post_json(
                "/wallet-auth/authenticate",
                json!({
                    "wallet_address": DEV_ADDRESS_0,
                    "signature": sign(DEV_KEY_0, &message),
                    "message": message,
                    "nonce": nonce,
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_requires_a_token() {
        let app = app();

        let response = send(&app, get_request("/wallet-auth/session")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            Request::get("/wallet-auth/session")
                .header(AUTHORIZATION, "Bearer not-a-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let app = app();
        let response = sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await;
        let token = session_cookie_value(&response);

        let response = send(
            &app,
            Request::post("/wallet-auth/logout")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let response = send(
            &app,
            Request::get("/wallet-auth/session")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn public_config_reports_settings() {
        let response = send(&app(), get_request("/wallet-auth/config")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let defaults = AuthSettings::default();
        assert_eq!(body["network"], defaults.network.as_str());
        assert_eq!(body["chain_id"], defaults.network.chain_id());
        assert_eq!(body["nonce_lifetime"], 300);
        assert_eq!(body["redirect_on_success"], defaults.redirect_on_success);
    }

    #[tokio::test]
    async fn health_endpoints_report_ok() {
        let app = app();

        let response = send(&app, get_request("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checks"]["database"], "ok");

        let response = send(&app, get_request("/health/live")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn openapi_document_lists_auth_routes() {
        let response = send(&app(), get_request("/api-doc/openapi.json")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = json_body(response).await;
        assert!(doc["paths"]["/wallet-auth/authenticate"].is_object());
        assert!(doc["paths"]["/wallet-auth/nonce"]["get"].is_object());
    }

    #[tokio::test]
    async fn admin_routes_require_token() {
        let app = app();

        let response = send(&app, get_request("/wallet-auth/admin/audit")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            Request::get("/wallet-auth/admin/audit")
                .header(AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let disabled = router(
            AppState::new(
                Arc::new(AuthDatabase::in_memory().unwrap()),
                AuthSettings::default(),
                Arc::new(crate::auth::SystemClock),
            ),
            &[],
        );
        let response = send(
            &disabled,
            admin_request(Method::GET, "/wallet-auth/admin/audit", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_can_revoke_and_reinstate_a_wallet() {
        let app = app();
        assert_eq!(
            sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await.status(),
            StatusCode::OK
        );
        let status_uri = format!("/wallet-auth/admin/wallets/{DEV_ADDRESS_0}/status");

        let response = send(
            &app,
            admin_request(Method::PUT, &status_uri, Some(json!({ "active": false }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["active"], false);

        let response = sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            admin_request(Method::PUT, &status_uri, Some(json!({ "active": true }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await.status(),
            StatusCode::OK
        );

        let response = send(
            &app,
            admin_request(
                Method::GET,
                &format!("/wallet-auth/admin/wallets/{DEV_ADDRESS_0}"),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let details = json_body(response).await;
        assert_eq!(details["identity"]["active"], true);
        let event_types: Vec<&str> = details["recent_events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|event| event["event_type"].as_str())
            .collect();
        assert!(event_types.contains(&"wallet_revoked"));
        assert!(event_types.contains(&"wallet_reinstated"));
        assert!(event_types.contains(&"auth_failure"));
    }

    #[tokio::test]
    async fn revoked_wallet_loses_its_session() {
        let app = app();
        let response = sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await;
        assert_eq!(response.status(), StatusCode::OK);
        let token = session_cookie_value(&response);
        let session_request = || {
            Request::get("/wallet-auth/session")
                .header(COOKIE, format!("wallet_auth_session={token}"))
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(send(&app, session_request()).await.status(), StatusCode::OK);

        let status_uri = format!("/wallet-auth/admin/wallets/{DEV_ADDRESS_0}/status");
        let response = send(
            &app,
            admin_request(Method::PUT, &status_uri, Some(json!({ "active": false }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            send(&app, session_request()).await.status(),
            StatusCode::UNAUTHORIZED
        );

        // Reinstating the wallet requires a fresh sign-in.
        send(
            &app,
            admin_request(Method::PUT, &status_uri, Some(json!({ "active": true }))),
        )
        .await;
        assert_eq!(
            send(&app, session_request()).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn unbound_wallet_loses_its_session() {
        let app = app();
        let token = session_cookie_value(&sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await);

        let uri = format!("/wallet-auth/admin/wallets/{DEV_ADDRESS_0}");
        let response = send(&app, admin_request(Method::DELETE, &uri, None)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(
            &app,
            Request::get("/wallet-auth/session")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_unbinds_wallet() {
        let app = app();
        let uri = format!("/wallet-auth/admin/wallets/{DEV_ADDRESS_0}");

        let response = send(&app, admin_request(Method::DELETE, &uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        sign_in(&app, DEV_KEY_0, DEV_ADDRESS_0).await;
        let response = send(&app, admin_request(Method::DELETE, &uri, None)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, admin_request(Method::GET, &uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            admin_request(Method::GET, "/wallet-auth/admin/wallets/not-an-address", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            admin_request(Method::GET, "/wallet-auth/admin/audit?limit=100", None),
        )
        .await;
        let events = json_body(response).await;
        assert!(events
            .as_array()
            .unwrap()
            .iter()
            .any(|event| event["event_type"] == "wallet_unbound"));
    }
}
