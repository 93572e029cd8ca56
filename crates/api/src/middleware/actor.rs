//! Caller identity for floor operations.
//!
//! Authentication is done upstream; the gateway forwards the caller's
//! Buildline user id in `X-Buildline-User`. This middleware resolves it to an
//! active actor record and enforces the role required by the route group.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::{BuildlineRole, Technician};
use persistence::repositories::TechnicianRepository;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the caller's Buildline user id.
pub const ACTOR_HEADER: &str = "X-Buildline-User";

/// Resolved caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: BuildlineRole,
}

impl Actor {
    pub fn is_supervisor(&self) -> bool {
        self.role == BuildlineRole::Supervisor
    }

    /// An empty list admits every role.
    pub fn has_any_role(&self, roles: &[BuildlineRole]) -> bool {
        roles.is_empty() || roles.contains(&self.role)
    }
}

impl From<Technician> for Actor {
    fn from(t: Technician) -> Self {
        Self {
            id: t.id,
            name: t.name,
            role: t.buildline_role,
        }
    }
}

fn actor_id_from(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", ACTOR_HEADER)))?;
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::Unauthorized(format!("Malformed {} header", ACTOR_HEADER)))
}

async fn resolve_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = actor_id_from(headers)?;
    let repo = TechnicianRepository::new(state.pool.clone());
    match repo.find_by_id(id).await? {
        Some(entity) if entity.is_active => Ok(Technician::from(entity).into()),
        _ => Err(ApiError::Unauthorized("Unknown or inactive user".into())),
    }
}

async fn authorize(
    state: AppState,
    mut req: Request<Body>,
    next: Next,
    roles: &[BuildlineRole],
) -> Response {
    let actor = match resolve_actor(&state, req.headers()).await {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    if !actor.has_any_role(roles) {
        tracing::debug!(actor_id = %actor.id, role = %actor.role, "Role not permitted");
        return ApiError::Forbidden(format!("Role {} may not perform this action", actor.role))
            .into_response();
    }

    req.extensions_mut().insert(actor);
    next.run(req).await
}

/// Any active actor.
pub async fn require_actor(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    authorize(state, req, next, &[]).await
}

pub async fn require_supervisor(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    authorize(state, req, next, &[BuildlineRole::Supervisor]).await
}

/// Assembly work: only technicians hold units.
pub async fn require_technician(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    authorize(state, req, next, &[BuildlineRole::Technician]).await
}

/// Side flags: the owning technician or any supervisor.
pub async fn require_floor_staff(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    authorize(
        state,
        req,
        next,
        &[BuildlineRole::Technician, BuildlineRole::Supervisor],
    )
    .await
}

/// QC submissions: inspectors, or a supervisor standing in.
pub async fn require_qc_inspector(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    authorize(
        state,
        req,
        next,
        &[BuildlineRole::QcInspector, BuildlineRole::Supervisor],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn actor(role: BuildlineRole) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            name: "Sam".into(),
            role,
        }
    }

    #[test]
    fn test_empty_role_list_admits_everyone() {
        assert!(actor(BuildlineRole::QcInspector).has_any_role(&[]));
    }

    #[test]
    fn test_role_list_is_enforced() {
        let tech = actor(BuildlineRole::Technician);
        assert!(tech.has_any_role(&[BuildlineRole::Technician, BuildlineRole::Supervisor]));
        assert!(!tech.has_any_role(&[BuildlineRole::Supervisor]));
        assert!(!tech.is_supervisor());
        assert!(actor(BuildlineRole::Supervisor).is_supervisor());
    }

    #[test]
    fn test_actor_id_from_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(actor_id_from(&headers).unwrap(), id);
    }

    #[test]
    fn test_actor_id_missing_or_malformed() {
        let headers = HeaderMap::new();
        assert!(matches!(
            actor_id_from(&headers),
            Err(ApiError::Unauthorized(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            actor_id_from(&headers),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
