//! Shared fixtures for integration tests.
//!
//! Builds the bank-accounts mock the demo driver serves, plus a helper for
//! firing requests at a router without opening sockets.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use renkon::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

/// The canned account list used by the demo endpoint.
pub fn account(balance: i64) -> Value {
    json!([{
        "name": "Annabelle Citizen",
        "bsb": "000123",
        "number": "123456789",
        "balance": balance,
    }])
}

/// `GET /accounts` with `zero-balance` and `millionaire` responses.
pub fn accounts_endpoint() -> Endpoint {
    Endpoint::json(Method::GET, "/accounts")
        .with_response(MockResponse::json("zero-balance", account(0)))
        .with_response(MockResponse::json("millionaire", account(1_000_000)))
}

/// A server with the accounts endpoint registered and no scenarios yet.
pub fn accounts_server() -> Renkon {
    let server = Renkon::with_defaults();
    server
        .add_endpoint(accounts_endpoint())
        .expect("fresh server accepts the accounts endpoint");
    server
}

/// The `[return-response(zero-balance)]` scenario.
pub fn flat_broke() -> Scenario {
    Scenario::new("flat-broke").with_actions(
        "GET-/accounts",
        vec![ReturnResponse::configuration("zero-balance")],
    )
}

/// The `[zero-balance, millionaire]` alternating scenario.
pub fn millionaires_row() -> Scenario {
    Scenario::new("millionaires-row").with_actions(
        "GET-/accounts",
        vec![
            ReturnResponse::configuration("zero-balance"),
            ReturnResponse::configuration("millionaire"),
        ],
    )
}

/// A `[wait, millionaire]` scenario with the given wait.
pub fn super_rich(wait: Delay) -> Scenario {
    Scenario::new("super-rich").with_actions(
        "GET-/accounts",
        vec![
            Wait::configuration(wait),
            ReturnResponse::configuration("millionaire"),
        ],
    )
}

/// Fires one request at the router and decodes the response.
///
/// The body comes back as JSON when it parses, `Value::Null` otherwise.
pub async fn call(
    router: &Router,
    method: Method,
    path: &str,
    headers: &[(&str, &str)],
    body: Body,
) -> (StatusCode, HeaderMap, Value) {
    let mut request = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = router
        .clone()
        .oneshot(request.body(body).expect("test request builds"))
        .await
        .expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("test response body reads");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

/// `GET` with a scenario and session header.
pub async fn get_accounts(
    router: &Router,
    scenario: &str,
    session: &str,
) -> (StatusCode, HeaderMap, Value) {
    call(
        router,
        Method::GET,
        "/accounts",
        &[
            ("x-renkon-scenario", scenario),
            ("x-renkon-session", session),
        ],
        Body::empty(),
    )
    .await
}

/// The balance of the first account in a response body.
pub fn balance_of(body: &Value) -> i64 {
    body[0]["balance"].as_i64().expect("body carries a balance")
}
