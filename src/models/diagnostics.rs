use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for diagnostics information
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub n_participants: u32,
    pub n_state_keys: u32,
    pub n_saved_states: u32,
    /// Newest saved states generation handed to the writer
    pub latest_generation: u64,
    /// Newest saved states generation known to be on disk
    pub persisted_generation: u64,
    pub started_at: DateTime<Utc>,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
