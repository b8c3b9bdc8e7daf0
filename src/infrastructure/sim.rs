//! In-memory simulated periboard.
//!
//! Implements the transport seam against a small register file so the
//! test suite and `--sim` runs exercise the full session stack without
//! hardware. Scripted failure modes cover the cases bench hardware
//! makes hard to reproduce on demand: a board that never handshakes, a
//! board that goes mute, and a link that dies mid-conversation.

use crate::core::session::transport::{DeviceFrame, Request, Transport};
use crate::domain::error::PeriboardResult;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Register file of the simulated board.
#[derive(Debug, Clone)]
pub struct SimState {
    pub ram_free: u32,
    pub device_name: String,
    pub device_version: String,
    pub id: String,
    pub position: i32,
    pub motor_enabled: bool,
    pub micro_stepping: bool,
    pub rpm: u32,
    pub home_stop_enabled: bool,
    pub engaged_stop_enabled: bool,
    pub adc_self_cal_gain: u32,
    pub adc_self_cal_offset: u32,
    pub adc_system_gain: u32,
    pub adc_system_offset: u32,
    /// Every request payload seen, in arrival order.
    pub command_log: Vec<String>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            ram_free: 490,
            device_name: "periboard".to_string(),
            device_version: "1.0.0".to_string(),
            id: "periboard-000".to_string(),
            position: 0,
            motor_enabled: false,
            micro_stepping: false,
            rpm: 12,
            home_stop_enabled: false,
            engaged_stop_enabled: false,
            adc_self_cal_gain: 8_388_741,
            adc_self_cal_offset: 1_962,
            adc_system_gain: 8_399_517,
            adc_system_offset: 403,
            command_log: Vec::new(),
        }
    }
}

impl SimState {
    /// Interpret one request and produce the reply payload.
    fn apply(&mut self, request: &str) -> String {
        let (name, argument) = match request.split_once(' ') {
            Some((name, argument)) => (name, Some(argument)),
            None => (request, None),
        };

        match (name, argument) {
            ("ram_free", None) => self.ram_free.to_string(),
            ("name", None) => self.device_name.clone(),
            ("version", None) => self.device_version.clone(),
            ("id", None) => self.id.clone(),
            ("set_id", Some(id)) => {
                self.id = id.to_string();
                "ok".to_string()
            }
            ("zstage.position", None) => self.position.to_string(),
            // The real firmware moves the carriage asynchronously; the
            // simulation jumps straight to the commanded target.
            ("zstage.move_to", Some(target)) => match target.parse() {
                Ok(target) => {
                    self.position = target;
                    "ok".to_string()
                }
                Err(_) => "err bad argument".to_string(),
            },
            ("zstage.home", None) => {
                self.position = 0;
                "ok".to_string()
            }
            ("zstage.motor_enabled", None) => bool_register(self.motor_enabled),
            ("zstage.enable_motor", None) => {
                self.motor_enabled = true;
                "ok".to_string()
            }
            ("zstage.disable_motor", None) => {
                self.motor_enabled = false;
                "ok".to_string()
            }
            ("zstage.micro_stepping", None) => bool_register(self.micro_stepping),
            ("zstage.enable_micro_stepping", None) => {
                self.micro_stepping = true;
                "ok".to_string()
            }
            ("zstage.disable_micro_stepping", None) => {
                self.micro_stepping = false;
                "ok".to_string()
            }
            ("zstage.home_stop_enabled", None) => bool_register(self.home_stop_enabled),
            ("zstage.enable_home_stop", None) => {
                self.home_stop_enabled = true;
                "ok".to_string()
            }
            ("zstage.disable_home_stop", None) => {
                self.home_stop_enabled = false;
                "ok".to_string()
            }
            ("zstage.engaged_stop_enabled", None) => bool_register(self.engaged_stop_enabled),
            ("zstage.enable_engaged_stop", None) => {
                self.engaged_stop_enabled = true;
                "ok".to_string()
            }
            ("zstage.disable_engaged_stop", None) => {
                self.engaged_stop_enabled = false;
                "ok".to_string()
            }
            ("zstage.rpm", None) => self.rpm.to_string(),
            ("zstage.set_rpm", Some(rpm)) => match rpm.parse() {
                Ok(rpm) => {
                    self.rpm = rpm;
                    "ok".to_string()
                }
                Err(_) => "err bad argument".to_string(),
            },
            ("adc.self_cal_gain", None) => self.adc_self_cal_gain.to_string(),
            ("adc.self_cal_offset", None) => self.adc_self_cal_offset.to_string(),
            ("adc.system_gain", None) => self.adc_system_gain.to_string(),
            ("adc.system_offset", None) => self.adc_system_offset.to_string(),
            _ => "err unknown command".to_string(),
        }
    }
}

fn bool_register(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    /// Handshake, then answer every request.
    Normal,
    /// Handshake, then accept requests without ever answering.
    Mute,
    /// Never emit the ready banner.
    NoHandshake,
    /// Behave normally for N requests, then the link dies.
    DropAfter(u32),
}

/// Simulated device implementing [`Transport`].
pub struct SimDevice {
    state: Arc<Mutex<SimState>>,
    behavior: Behavior,
    inbound: VecDeque<DeviceFrame>,
    requests_seen: u32,
    closed: bool,
}

impl SimDevice {
    pub fn new() -> Self {
        Self::with_state(Arc::new(Mutex::new(SimState::default())))
    }

    /// Share a register file with the caller, e.g. to assert on the
    /// command log or to survive a reconnect.
    pub fn with_state(state: Arc<Mutex<SimState>>) -> Self {
        Self {
            state,
            behavior: Behavior::Normal,
            inbound: VecDeque::from([DeviceFrame::Ready]),
            requests_seen: 0,
            closed: false,
        }
    }

    /// A board that handshakes but never answers anything.
    pub fn mute() -> Self {
        Self {
            behavior: Behavior::Mute,
            ..Self::new()
        }
    }

    /// A board that never completes its handshake.
    pub fn without_handshake() -> Self {
        Self {
            behavior: Behavior::NoHandshake,
            inbound: VecDeque::new(),
            ..Self::new()
        }
    }

    /// A link that dies after answering `n` requests.
    pub fn drop_after(n: u32) -> Self {
        Self {
            behavior: Behavior::DropAfter(n),
            ..Self::new()
        }
    }

    pub fn state(&self) -> Arc<Mutex<SimState>> {
        Arc::clone(&self.state)
    }
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimDevice {
    async fn send(&mut self, request: Request) -> PeriboardResult<()> {
        self.requests_seen += 1;

        if let Behavior::DropAfter(n) = self.behavior {
            if self.requests_seen > n {
                self.closed = true;
                return Ok(());
            }
        }

        if self.behavior == Behavior::Mute {
            return Ok(());
        }

        let text = String::from_utf8_lossy(&request.payload).to_string();
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.command_log.push(text.clone());
            state.apply(&text)
        };

        self.inbound.push_back(DeviceFrame::Response {
            id: request.id,
            payload: reply.into_bytes(),
        });
        Ok(())
    }

    async fn recv(&mut self) -> PeriboardResult<Option<DeviceFrame>> {
        loop {
            if let Some(frame) = self.inbound.pop_front() {
                return Ok(Some(frame));
            }
            if self.closed {
                return Ok(None);
            }
            // Nothing queued. Requests arrive through the same listener
            // task, which re-polls recv after each send, so parking here
            // until then is sound.
            std::future::pending::<()>().await;
        }
    }
}
