//! Public `/health` snapshot.
//!
//! The snapshot never fails as a whole: a store check that errors is
//! reported as `null` (or `false` for `redis_ping`) and logged.

use axum::extract::State;
use axum::Json;
use qadash_db::repositories::{SessionRepo, StatsRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Marker file present inside Docker containers.
const DOCKERENV_PATH: &str = "/.dockerenv";

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub app_status: &'static str,
    pub container_status: &'static str,
    /// 1-minute load average as a percentage of available cores.
    pub cpu: Option<f64>,
    pub os: String,
    /// Percentage of RAM in use.
    pub memory: Option<f64>,
    pub pg_in_recovery: Option<bool>,
    pub pg_connections: Option<i64>,
    /// Whether the token-session store answers.
    pub redis_ping: bool,
}

/// Host readings gathered off the async runtime.
#[derive(Debug)]
struct HostReadings {
    container_status: &'static str,
    cpu: Option<f64>,
    memory: Option<f64>,
    os: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthSnapshot>> {
    let host = tokio::task::spawn_blocking(read_host)
        .await
        .map_err(|e| AppError::InternalError(format!("Host stats task failed: {e}")))?;

    let pg_in_recovery = StatsRepo::is_in_recovery(&state.pool)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "pg_is_in_recovery check failed"))
        .ok();
    let pg_connections = StatsRepo::connection_count(&state.pool)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "pg_stat_activity check failed"))
        .ok();
    let redis_ping = SessionRepo::count_active(&state.pool)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Session store check failed"))
        .is_ok();

    Ok(Json(HealthSnapshot {
        app_status: "running",
        container_status: host.container_status,
        cpu: host.cpu,
        os: host.os,
        memory: host.memory,
        pg_in_recovery,
        pg_connections,
        redis_ping,
    }))
}

fn read_host() -> HostReadings {
    let container_status = if std::path::Path::new(DOCKERENV_PATH).exists() {
        "healthy"
    } else {
        "outside_container"
    };
    HostReadings {
        container_status,
        cpu: cpu_load_pct(),
        memory: memory_used_pct(),
        os: os_description(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(unix)]
fn cpu_load_pct() -> Option<f64> {
    let cores = std::thread::available_parallelism().ok()?.get() as f64;
    let mut loads = [0f64; 3];
    // Safety: getloadavg writes at most `nelem` doubles into the buffer.
    let ret = unsafe { libc::getloadavg(loads.as_mut_ptr(), 3) };
    if ret < 1 {
        return None;
    }
    Some(round2(loads[0] / cores * 100.0))
}

#[cfg(not(unix))]
fn cpu_load_pct() -> Option<f64> {
    None
}

#[cfg(target_os = "linux")]
fn memory_used_pct() -> Option<f64> {
    use std::mem::MaybeUninit;

    let mut info = MaybeUninit::<libc::sysinfo>::uninit();
    // Safety: sysinfo fills the struct on success.
    let ret = unsafe { libc::sysinfo(info.as_mut_ptr()) };
    if ret != 0 {
        return None;
    }
    let info = unsafe { info.assume_init() };
    let unit = info.mem_unit.max(1) as f64;
    let total = info.totalram as f64 * unit;
    let available = (info.freeram as f64 + info.bufferram as f64) * unit;
    if total <= 0.0 {
        return None;
    }
    Some(round2((total - available) / total * 100.0))
}

#[cfg(not(target_os = "linux"))]
fn memory_used_pct() -> Option<f64> {
    None
}

/// `{family}-{arch}-{sysname}-{release}`, e.g. `unix-x86_64-Linux-6.8.0`.
fn os_description() -> String {
    let (sysname, release) = uname().unwrap_or_else(|| ("unknown".into(), "unknown".into()));
    format!(
        "{}-{}-{sysname}-{release}",
        std::env::consts::FAMILY,
        std::env::consts::ARCH
    )
}

#[cfg(unix)]
fn uname() -> Option<(String, String)> {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;

    let mut name = MaybeUninit::<libc::utsname>::uninit();
    // Safety: uname fills the struct with NUL-terminated fields on success.
    let ret = unsafe { libc::uname(name.as_mut_ptr()) };
    if ret != 0 {
        return None;
    }
    let name = unsafe { name.assume_init() };
    let field = |raw: &[libc::c_char]| {
        unsafe { CStr::from_ptr(raw.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    };
    Some((field(&name.sysname[..]), field(&name.release[..])))
}

#[cfg(not(unix))]
fn uname() -> Option<(String, String)> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_description_has_four_parts() {
        let os = os_description();
        assert!(os.starts_with(std::env::consts::FAMILY));
        assert!(os.split('-').count() >= 4, "unexpected os string {os}");
    }

    #[test]
    fn host_readings_are_percentages() {
        let host = read_host();
        if let Some(memory) = host.memory {
            assert!((0.0..=100.0).contains(&memory));
        }
        if let Some(cpu) = host.cpu {
            assert!(cpu >= 0.0);
        }
        assert!(["healthy", "outside_container"].contains(&host.container_status));
    }
}
