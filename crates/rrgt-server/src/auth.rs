//! Identity resolution at the HTTP edge.
//!
//! Authentication itself happens upstream; by the time a request reaches
//! this service, the gateway has already verified the session and stamped
//! the resolved caller onto trusted headers. This middleware parses those
//! headers into an [`Identity`] request extension so handlers can pass an
//! explicit caller into the core. Anything missing or malformed is a 401
//! before any handler runs.

use std::str::FromStr;

use axum::{
    body::Body,
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use rrgt_core::{Identity, Role};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const TEAM_MEMBER_ID_HEADER: &str = "x-team-member-id";
pub const TEAM_ID_HEADER: &str = "x-team-id";
pub const ROLE_HEADER: &str = "x-role";

pub async fn identity_middleware(mut req: Request, next: Next) -> Response {
    match resolve_identity(req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(message) => unauthorized(message),
    }
}

fn resolve_identity(headers: &HeaderMap) -> Result<Identity, &'static str> {
    let user_id = header_uuid(headers, USER_ID_HEADER)?;
    let team_member_id = header_uuid(headers, TEAM_MEMBER_ID_HEADER)?;
    let team_id = header_uuid(headers, TEAM_ID_HEADER)?;

    let role = headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing role header")?;
    let role = Role::from_str(role).map_err(|_| "unknown role")?;

    Ok(Identity {
        user_id,
        team_member_id,
        team_id,
        role,
    })
}

fn header_uuid(headers: &HeaderMap, name: &'static str) -> Result<Uuid, &'static str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing identity header")
        .and_then(|v| Uuid::parse_str(v).map_err(|_| "malformed identity header"))
}

fn unauthorized(message: &str) -> Response {
    let body = serde_json::json!({ "error": "Unauthorized", "message": message });
    Response::builder()
        .status(401)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("infallible: all header values are valid ASCII")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
