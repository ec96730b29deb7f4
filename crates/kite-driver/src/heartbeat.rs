//! Heartbeat - link liveness in both directions
//!
//! **Receiver**: consumes one vehicle heartbeat per cycle and keeps a
//! connected/disconnected status with hysteresis: a single heartbeat marks
//! the link up, but it takes `disconnect_threshold` consecutive misses to
//! mark it down again.
//!
//! **Sender**: emits one ground-station heartbeat per cycle.

use crate::config::HeartbeatConfig;
use crate::error::DriverError;
use crate::state::HealthStatus;
use kite_link::{Connection, LinkError};
use kite_protocol::{Heartbeat, MessageKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Link health monitor
pub struct HeartbeatReceiver<C> {
    connection: Arc<C>,
    timeout: Duration,
    disconnect_threshold: u32,
    missed_heartbeats: u32,
    status: HealthStatus,
}

impl<C: Connection> HeartbeatReceiver<C> {
    /// Create a receiver; the link starts out `Disconnected`.
    pub fn create(connection: Arc<C>, config: &HeartbeatConfig) -> Result<Self, DriverError> {
        if !connection.is_open() {
            error!("Connection is not open");
            return Err(DriverError::ConnectionClosed {
                component: "HeartbeatReceiver",
            });
        }
        config.validate()?;

        Ok(Self {
            connection,
            timeout: config.timeout(),
            disconnect_threshold: config.disconnect_threshold,
            missed_heartbeats: 0,
            status: HealthStatus::Disconnected,
        })
    }

    /// Wait up to the configured timeout for one heartbeat and update the status.
    ///
    /// Returns the status after this cycle, whether or not it changed.
    pub fn run(&mut self) -> HealthStatus {
        match self
            .connection
            .recv_match(MessageKind::Heartbeat, self.timeout)
        {
            Ok(_) => self.on_heartbeat(),
            Err(e) => self.on_missed(&e),
        }
        self.status
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Consecutive misses since the last heartbeat
    pub fn missed_heartbeats(&self) -> u32 {
        self.missed_heartbeats
    }

    fn on_heartbeat(&mut self) {
        debug!("Heartbeat received");
        self.missed_heartbeats = 0;

        if self.status == HealthStatus::Disconnected {
            self.status = HealthStatus::Connected;
            info!("Connected to vehicle");
        }
    }

    fn on_missed(&mut self, cause: &LinkError) {
        self.missed_heartbeats = self.missed_heartbeats.saturating_add(1);
        match cause {
            LinkError::Timeout => warn!("Missed heartbeat ({})", self.missed_heartbeats),
            other => warn!("Missed heartbeat ({}): {}", self.missed_heartbeats, other),
        }

        if self.missed_heartbeats >= self.disconnect_threshold
            && self.status == HealthStatus::Connected
        {
            self.status = HealthStatus::Disconnected;
            error!(
                "Disconnected from vehicle after {} missed heartbeats",
                self.missed_heartbeats
            );
        }
    }
}

/// Ground-station heartbeat emitter
pub struct HeartbeatSender<C> {
    connection: Arc<C>,
}

impl<C: Connection> HeartbeatSender<C> {
    pub fn create(connection: Arc<C>) -> Result<Self, DriverError> {
        if !connection.is_open() {
            error!("Connection is not open");
            return Err(DriverError::ConnectionClosed {
                component: "HeartbeatSender",
            });
        }
        Ok(Self { connection })
    }

    /// Send one heartbeat. Failures are logged and returned; the next call retries.
    pub fn run(&self) -> Result<(), DriverError> {
        match self.connection.send(Heartbeat::gcs().into()) {
            Ok(()) => {
                debug!("Heartbeat sent");
                Ok(())
            },
            Err(e) => {
                error!("Failed to send heartbeat: {}", e);
                Err(e.into())
            },
        }
    }
}
