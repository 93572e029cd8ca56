//! HTTP middleware components.

pub mod actor;
pub mod logging;
pub mod metrics;
pub mod trace_id;

pub use actor::{
    require_actor, require_floor_staff, require_qc_inspector, require_supervisor,
    require_technician, Actor, ACTOR_HEADER,
};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
