//! HTTP route handlers.

pub mod bins;
pub mod boards;
pub mod health;
pub mod journeys;
pub mod locations;
pub mod qc;
pub mod technicians;
