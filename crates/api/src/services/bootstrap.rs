//! First-run supervisor bootstrap.
//!
//! Creates the first supervisor on startup when configured, so the first
//! caller can register technicians. Does nothing once any active supervisor
//! exists.

use domain::models::BuildlineRole;
use persistence::repositories::TechnicianRepository;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::BuildlineConfig;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Returns the id of the supervisor created, if one was.
pub async fn bootstrap_supervisor(
    pool: &PgPool,
    config: &BuildlineConfig,
) -> Result<Option<Uuid>, BootstrapError> {
    let name = config.bootstrap_supervisor_name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    if name.chars().count() > 100 {
        return Err(BootstrapError::Config(
            "BL__BUILDLINE__BOOTSTRAP_SUPERVISOR_NAME must be at most 100 characters".to_string(),
        ));
    }

    let technicians = TechnicianRepository::new(pool.clone());
    let role = BuildlineRole::Supervisor.as_str();
    if technicians.exists_active_with_role(role).await? {
        info!("Active supervisor already exists - skipping bootstrap");
        return Ok(None);
    }

    let supervisor = technicians.create(name, role).await?;
    info!(
        supervisor_id = %supervisor.id,
        name = %supervisor.name,
        "Bootstrapped first supervisor; send this id in X-Buildline-User"
    );
    Ok(Some(supervisor.id))
}
