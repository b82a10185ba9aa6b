use crate::{models::DiagnosticsResponse, AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Report room counters and process host load
pub async fn diagnostics(
    State(state): State<AppState>,
) -> (StatusCode, Json<DiagnosticsResponse>) {

    let stats = state.room.stats().await;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Participants: {}, Saved states: {} (persisted gen {}/{})",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        stats.participants,
        stats.saved_states,
        stats.persisted_generation,
        stats.latest_generation,
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_participants: stats.participants as u32,
            n_state_keys: stats.state_keys as u32,
            n_saved_states: stats.saved_states as u32,
            latest_generation: stats.latest_generation,
            persisted_generation: stats.persisted_generation,
            started_at: state.room.started_at(),
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
