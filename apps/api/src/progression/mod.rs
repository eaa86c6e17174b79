// Progression engine: evidence → competency bands → readiness → exit gate,
// plus the workspace phase tracker that gates which activities are open.
// Storage goes through `store::ProgressStore` only; no module here touches
// sqlx directly except `store::postgres`.

pub mod aggregator;
pub mod bands;
pub mod errors;
pub mod evidence;
pub mod exit_gate;
pub mod handlers;
pub mod journey;
pub mod models;
pub mod phase;
pub mod policy;
pub mod readiness;
pub mod service;
pub mod sprint;
pub mod store;
