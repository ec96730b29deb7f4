//! Simulated vehicle link.
//!
//! An in-process stand-in for a flight controller: it streams `ATTITUDE` and
//! `LOCAL_POSITION_NED` at a fixed rate, emits `HEARTBEAT` once per period,
//! and reacts to `MAV_CMD_CONDITION_CHANGE_ALT` / `MAV_CMD_CONDITION_YAW` by
//! climbing and turning at the commanded rates. Horizontal position never
//! changes.
//!
//! `time_boot_ms` is derived from a monotonic clock anchored at construction.

use crate::{Connection, LinkError};
use kite_protocol::{
    Attitude, CommandLong, Heartbeat, InboundMessage, LocalPositionNed, MavAutopilot, MavCmd,
    MavType, MessageKind, OutboundMessage,
};
use parking_lot::Mutex;
use rand::Rng;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Simulated vehicle configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Rate of ATTITUDE and LOCAL_POSITION_NED streams (Hz)
    pub telemetry_rate_hz: f64,
    /// Interval between vehicle heartbeats
    pub heartbeat_period: Duration,
    /// Initial local position (m)
    pub initial_position: [f32; 3],
    /// Initial heading (rad)
    pub initial_yaw: f32,
    /// Uniform position noise amplitude (m), 0 disables noise
    pub position_noise_m: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            telemetry_rate_hz: 10.0,
            heartbeat_period: Duration::from_secs(1),
            initial_position: [0.0, 0.0, 0.0],
            initial_yaw: 0.0,
            position_noise_m: 0.0,
        }
    }
}

/// Altitude change in progress
#[derive(Debug, Clone, Copy)]
struct Climb {
    target: f32,
    rate: f32,
}

/// Relative turn in progress
#[derive(Debug, Clone, Copy)]
struct Turn {
    remaining: f32,
    rate: f32,
    sign: f32,
}

struct SimState {
    position: [f32; 3],
    velocity: [f32; 3],
    yaw: f32,
    yaw_speed: f32,
    climb: Option<Climb>,
    turn: Option<Turn>,
    last_step: Instant,
    next_attitude: Instant,
    next_position: Instant,
    next_heartbeat: Instant,
}

impl SimState {
    /// Advance the vehicle model to `now`.
    fn step(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_step).as_secs_f32();
        self.last_step = now;

        self.velocity[2] = 0.0;
        if let Some(climb) = self.climb {
            let error = climb.target - self.position[2];
            let max_step = climb.rate * dt;
            if error.abs() <= max_step {
                self.position[2] = climb.target;
                self.climb = None;
            } else {
                self.position[2] += max_step.copysign(error);
                self.velocity[2] = climb.rate.copysign(error);
            }
        }

        self.yaw_speed = 0.0;
        if let Some(mut turn) = self.turn {
            let step = (turn.rate * dt).min(turn.remaining);
            self.yaw = wrap_pi(self.yaw + step * turn.sign);
            turn.remaining -= step;
            if turn.remaining <= f32::EPSILON {
                self.turn = None;
            } else {
                self.yaw_speed = turn.rate * turn.sign;
                self.turn = Some(turn);
            }
        }
    }

    fn due(&self, kind: MessageKind) -> Instant {
        match kind {
            MessageKind::Attitude => self.next_attitude,
            MessageKind::LocalPositionNed => self.next_position,
            MessageKind::Heartbeat => self.next_heartbeat,
        }
    }
}

fn wrap_pi(mut angle: f32) -> f32 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Simulated vehicle
pub struct SimConnection {
    config: SimConfig,
    boot: Instant,
    telemetry_period: Duration,
    state: Mutex<SimState>,
    open: AtomicBool,
    heartbeats_received: AtomicU64,
}

impl SimConnection {
    pub fn new(config: SimConfig) -> Self {
        let boot = Instant::now();
        let telemetry_period = Duration::from_secs_f64(1.0 / config.telemetry_rate_hz.max(0.1));
        let state = SimState {
            position: config.initial_position,
            velocity: [0.0; 3],
            yaw: wrap_pi(config.initial_yaw),
            yaw_speed: 0.0,
            climb: None,
            turn: None,
            last_step: boot,
            next_attitude: boot + telemetry_period,
            next_position: boot + telemetry_period,
            next_heartbeat: boot,
        };
        Self {
            config,
            boot,
            telemetry_period,
            state: Mutex::new(state),
            open: AtomicBool::new(true),
            heartbeats_received: AtomicU64::new(0),
        }
    }

    /// Stop the link; pending and future receives fail with [`LinkError::Closed`].
    pub fn shutdown(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Ground-station heartbeats seen by the vehicle
    pub fn heartbeats_received(&self) -> u64 {
        self.heartbeats_received.load(Ordering::Relaxed)
    }

    /// Current (x, y, z, yaw) of the vehicle model
    pub fn pose(&self) -> ([f32; 3], f32) {
        let mut state = self.state.lock();
        state.step(Instant::now());
        (state.position, state.yaw)
    }

    fn time_boot_ms(&self, now: Instant) -> u32 {
        now.saturating_duration_since(self.boot).as_millis() as u32
    }

    fn apply_command(&self, cmd: &CommandLong) {
        let mut state = self.state.lock();
        state.step(Instant::now());
        match cmd.command {
            MavCmd::ConditionChangeAlt => {
                let climb = Climb {
                    target: cmd.params[6],
                    rate: cmd.params[0].abs(),
                };
                debug!("sim: climbing to {} m at {} m/s", climb.target, climb.rate);
                state.climb = Some(climb);
            },
            MavCmd::ConditionYaw => {
                let angle = cmd.params[0].to_radians();
                let rate = cmd.params[1].abs().to_radians();
                let relative = cmd.params[3] != 0.0;
                let turn = if relative {
                    Turn {
                        remaining: angle.abs(),
                        rate,
                        sign: cmd.params[2].signum(),
                    }
                } else {
                    let delta = wrap_pi(angle - state.yaw);
                    Turn {
                        remaining: delta.abs(),
                        rate,
                        sign: delta.signum(),
                    }
                };
                debug!(
                    "sim: turning {:.1} deg at {:.1} deg/s",
                    (turn.remaining * turn.sign).to_degrees(),
                    rate.to_degrees()
                );
                state.turn = Some(turn);
            },
        }
    }

    fn produce(&self, kind: MessageKind, state: &mut SimState, now: Instant) -> InboundMessage {
        let time_boot_ms = self.time_boot_ms(now);
        match kind {
            MessageKind::Attitude => {
                state.next_attitude = now + self.telemetry_period;
                Attitude {
                    time_boot_ms,
                    roll: 0.0,
                    pitch: 0.0,
                    yaw: state.yaw,
                    rollspeed: 0.0,
                    pitchspeed: 0.0,
                    yawspeed: state.yaw_speed,
                }
                .into()
            },
            MessageKind::LocalPositionNed => {
                state.next_position = now + self.telemetry_period;
                let noise = self.config.position_noise_m;
                let jitter = || {
                    if noise > 0.0 {
                        rand::thread_rng().gen_range(-noise..=noise)
                    } else {
                        0.0
                    }
                };
                LocalPositionNed {
                    time_boot_ms,
                    x: state.position[0] + jitter(),
                    y: state.position[1] + jitter(),
                    z: state.position[2] + jitter(),
                    vx: state.velocity[0],
                    vy: state.velocity[1],
                    vz: state.velocity[2],
                }
                .into()
            },
            MessageKind::Heartbeat => {
                state.next_heartbeat = now + self.config.heartbeat_period;
                Heartbeat {
                    mav_type: MavType::Quadrotor.into(),
                    autopilot: MavAutopilot::ArduPilotMega.into(),
                    base_mode: 0,
                    custom_mode: 0,
                    system_status: 4,
                }
                .into()
            },
        }
    }
}

impl Default for SimConnection {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Connection for SimConnection {
    fn send(&self, msg: OutboundMessage) -> Result<(), LinkError> {
        if !self.is_open() {
            return Err(LinkError::Closed);
        }
        match msg {
            OutboundMessage::CommandLong(cmd) => self.apply_command(&cmd),
            OutboundMessage::Heartbeat(_) => {
                self.heartbeats_received.fetch_add(1, Ordering::Relaxed);
            },
        }
        Ok(())
    }

    fn recv_match(&self, kind: MessageKind, timeout: Duration) -> Result<InboundMessage, LinkError> {
        if !self.is_open() {
            return Err(LinkError::Closed);
        }

        let deadline = Instant::now() + timeout;
        let due = self.state.lock().due(kind);
        if due > deadline {
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
            return Err(LinkError::Timeout);
        }
        thread::sleep(due.saturating_duration_since(Instant::now()));

        if !self.is_open() {
            return Err(LinkError::Closed);
        }
        let now = Instant::now();
        let mut state = self.state.lock();
        state.step(now);
        Ok(self.produce(kind, &mut state, now))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
