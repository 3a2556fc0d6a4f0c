//! Startup health probe for the analysis service.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};
use crate::client::{FloatChatClient, StatusProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Checking,
    Connected,
    Offline,
    Degraded,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Checking => "checking",
            ServiceStatus::Connected => "connected",
            ServiceStatus::Offline => "offline",
            ServiceStatus::Degraded => "degraded",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceStatus::Checking => "Checking service...",
            ServiceStatus::Connected => "Connected",
            ServiceStatus::Offline => "Offline (local answers)",
            ServiceStatus::Degraded => "Degraded",
        }
    }

    /// Map a probe that reached the service to a status
    pub fn from_probe(probe: &StatusProbe) -> Self {
        if !probe.is_success() {
            return ServiceStatus::Degraded;
        }
        match probe.reported.as_deref() {
            Some(reported) if reported.eq_ignore_ascii_case("degraded") => ServiceStatus::Degraded,
            _ => ServiceStatus::Connected,
        }
    }
}

/// Process-wide service status, written once by the monitor.
///
/// Reads return [`ServiceStatus::Checking`] until a probe has completed.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    cell: Arc<OnceLock<ServiceStatus>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ServiceStatus {
        self.cell.get().copied().unwrap_or(ServiceStatus::Checking)
    }

    /// Record the status; later calls are ignored. Returns whether this call won.
    pub fn set(&self, status: ServiceStatus) -> bool {
        self.cell.set(status).is_ok()
    }
}

pub struct ServiceStatusMonitor {
    client: FloatChatClient,
    timeout: Duration,
    handle: StatusHandle,
}

impl ServiceStatusMonitor {
    pub fn new(client: FloatChatClient, timeout: Duration, handle: StatusHandle) -> Self {
        Self {
            client,
            timeout,
            handle,
        }
    }

    pub fn handle(&self) -> StatusHandle {
        self.handle.clone()
    }

    /// Probe the service once and record the result.
    pub async fn check_once(&self) -> ServiceStatus {
        let status = match self.client.system_status(self.timeout).await {
            Ok(probe) => {
                let status = ServiceStatus::from_probe(&probe);
                info!(
                    http_status = probe.http_status,
                    reported = probe.reported.as_deref().unwrap_or("-"),
                    status = status.as_str(),
                    "analysis service probed"
                );
                status
            }
            Err(e) => {
                warn!(error = %e, base_url = self.client.base_url(), "analysis service unreachable");
                ServiceStatus::Offline
            }
        };

        if !self.handle.set(status) {
            warn!(status = status.as_str(), "service status already recorded, keeping first result");
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(http_status: u16, reported: Option<&str>) -> StatusProbe {
        StatusProbe {
            http_status,
            reported: reported.map(str::to_string),
        }
    }

    #[test]
    fn test_from_probe() {
        assert_eq!(ServiceStatus::from_probe(&probe(200, Some("operational"))), ServiceStatus::Connected);
        assert_eq!(ServiceStatus::from_probe(&probe(204, None)), ServiceStatus::Connected);
        assert_eq!(ServiceStatus::from_probe(&probe(200, Some("degraded"))), ServiceStatus::Degraded);
        assert_eq!(ServiceStatus::from_probe(&probe(500, Some("error"))), ServiceStatus::Degraded);
        assert_eq!(ServiceStatus::from_probe(&probe(404, None)), ServiceStatus::Degraded);
    }

    #[test]
    fn test_handle_is_set_once() {
        let handle = StatusHandle::new();
        assert_eq!(handle.get(), ServiceStatus::Checking);

        let shared = handle.clone();
        assert!(handle.set(ServiceStatus::Offline));
        assert!(!shared.set(ServiceStatus::Connected));
        assert_eq!(shared.get(), ServiceStatus::Offline);
    }
}
