use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_actor, require_floor_staff,
    require_qc_inspector, require_supervisor, require_technician, trace_id,
};
use crate::routes::{bins, boards, health, journeys, locations, qc, technicians};

/// Prefix of every floor endpoint.
pub const API_PREFIX: &str = "/api/v1/buildline";

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

fn api(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);
    let state = AppState {
        pool,
        config: config.clone(),
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Read access for any active actor.
    let floor_routes = Router::new()
        .route(&api("/scan/:barcode"), get(journeys::scan))
        .route(&api("/checklist/schema"), get(journeys::checklist_schema))
        .route(&api("/checklist/:barcode"), get(journeys::checklist_progress))
        .route(&api("/can-invoice/:barcode"), get(journeys::can_invoice))
        .route(&api("/kanban"), get(boards::kanban))
        .route(&api("/dashboard"), get(boards::dashboard))
        .route(&api("/bike/:barcode"), get(boards::bike_detail))
        .route(&api("/history/:journey_id"), get(boards::journey_history))
        .route(&api("/my-queue"), get(boards::my_queue))
        .route(&api("/technicians"), get(technicians::list_technicians))
        .route(&api("/technicians/:id/workload"), get(technicians::workload))
        .route(&api("/locations"), get(locations::list_locations))
        .route(&api("/locations/:id"), get(locations::get_location))
        .route(&api("/bins"), get(bins::list_bins))
        .route(&api("/bins/statistics"), get(bins::statistics))
        .route(&api("/bins/:id"), get(bins::get_bin))
        .route(
            &api("/bins/movement-history/:journey_id"),
            get(bins::movement_history),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_actor));

    let supervisor_routes = Router::new()
        .route(&api("/inward"), post(journeys::inward))
        .route(&api("/inward/bulk"), post(journeys::bulk_inward))
        .route(&api("/assign"), post(journeys::assign))
        .route(&api("/assign-bulk"), post(journeys::assign_bulk))
        .route(&api("/set-priority"), post(journeys::set_priority))
        .route(&api("/technicians"), post(technicians::create_technician))
        .route(&api("/locations"), post(locations::create_location))
        .route(&api("/bins"), post(bins::create_bin))
        .route(&api("/bins/:id"), patch(bins::update_bin))
        .route(&api("/bins/move"), post(bins::move_unit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_supervisor,
        ));

    // Ownership of the unit is checked by the engine.
    let technician_routes = Router::new()
        .route(&api("/start"), post(journeys::start))
        .route(&api("/checklist"), put(journeys::update_checklist))
        .route(&api("/complete"), post(journeys::complete))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_technician,
        ));

    let flag_routes = Router::new()
        .route(&api("/flag-parts-missing"), post(journeys::flag_parts_missing))
        .route(&api("/report-damage"), post(journeys::report_damage))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_floor_staff,
        ));

    let qc_routes = Router::new()
        .route(&api("/qc/submit"), post(qc::submit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_qc_inspector,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(floor_routes)
        .merge(supervisor_routes)
        .merge(technician_routes)
        .merge(flag_routes)
        .merge(qc_routes)
        // Global middleware (bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
