//! Side-effect seams of the scheduling core.
//!
//! A solving pass must never wait on network or disk, so everything that
//! leaves the process goes through one of these traits. The production
//! implementations route to the process log; real transports (monitors,
//! wake-on-LAN senders) live outside the core and dispatch asynchronously.

use crate::scheduler::host::RenderHost;

/// Fire-and-forget diagnostics from the scheduling core.
pub trait EventSink {
    fn notify(&self, unit: &str, message: &str);
    fn log_error(&self, message: &str);
}

/// Routes scheduler events to the process log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, unit: &str, message: &str) {
        tracing::info!(unit, message, "Scheduler event");
    }

    fn log_error(&self, message: &str) {
        tracing::error!(message, "Scheduler error");
    }
}

/// Powers sleeping hosts back on. The mechanics (magic packets, IPMI) are
/// not the scheduler's concern; implementations must return immediately.
pub trait WakeTransport {
    fn wake(&self, host: &RenderHost);
}

/// Logs the wake request without sending anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWake;

impl WakeTransport for LoggingWake {
    fn wake(&self, host: &RenderHost) {
        tracing::info!(host = %host.name, "Wake requested");
    }
}
