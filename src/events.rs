//! Gameplay events raised by the world loop (collisions, falls) and consumed
//! on their own thread.
//!
//! An event is a packed `u32`: a category in the top nibble, action flags
//! below it, a signed 8-bit operand in bits 8..16 and an id in the low byte.
//! Several actions of one category may be combined in a single code.
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use parking_lot::RwLock;

use crate::error::PipelineError;

/// Bounded queue between the world loop and the event manager
pub const EVENT_QUEUE_CAPACITY: usize = 10;
/// How long `EventSink::emit` may block before the event is dropped
pub const EVENT_SEND_TIMEOUT: Duration = Duration::from_millis(10);
/// Health is kept in `0..=MAX_HEALTH`
pub const MAX_HEALTH: u16 = 128;

#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventCode(pub u32);

impl EventCode {
    pub const CATEGORY_MASK: u32 = 0xF000_0000;
    pub const ENERGY: u32 = 0x1000_0000;
    pub const FACES: u32 = 0x2000_0000;

    pub const DISPLAY: u32 = 0x0100_0000;
    pub const CHANGE: u32 = 0x0200_0000;
    pub const SCORE: u32 = 0x0400_0000;
    pub const SET: u32 = 0x0800_0000;
    pub const DELETE: u32 = 0x0010_0000;

    pub const OPERAND_MASK: u32 = 0xFF00;
    pub const OPERAND_SHIFT: u32 = 8;
    pub const ID_MASK: u32 = 0xFF;

    pub const NONE: EventCode = EventCode(0);

    /// Energy event with the given action flags and operand
    pub fn energy(actions: u32, operand: i8) -> Self {
        Self(Self::ENERGY | actions | (((operand as u8) as u32) << Self::OPERAND_SHIFT))
    }

    /// Deletes every face whose material carries this exact code
    pub fn delete_faces(id: u8) -> Self {
        Self(Self::FACES | Self::DELETE | id as u32)
    }

    /// Sent once at start-up: set health to 0x79 and show it
    pub fn startup() -> Self {
        Self::energy(Self::SET | Self::DISPLAY, 0x79)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn category(self) -> u32 {
        self.0 & Self::CATEGORY_MASK
    }

    #[inline]
    pub fn has_category(self, category: u32) -> bool {
        self.0 & category != 0
    }

    #[inline]
    pub fn has_action(self, action: u32) -> bool {
        self.0 & action != 0
    }

    /// Operand as a signed delta
    #[inline]
    pub fn operand(self) -> i8 {
        self.operand_bits() as i8
    }

    /// Operand as an unsigned value
    #[inline]
    pub fn operand_bits(self) -> u8 {
        ((self.0 & Self::OPERAND_MASK) >> Self::OPERAND_SHIFT) as u8
    }

    #[inline]
    pub fn id(self) -> u8 {
        (self.0 & Self::ID_MASK) as u8
    }
}

impl fmt::Debug for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EventCode({:#010x})", self.0)
    }
}

impl From<u32> for EventCode {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

/// Requests from the event thread that only the world loop may carry out
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorldCommand {
    DeleteFaces(EventCode),
}

/// Player state owned by the event manager and readable from anywhere
#[derive(Clone, Debug)]
pub struct GameState {
    pub health: u16,
    pub score: u32,
    pub game_over: bool,
    pub started: Instant,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            health: 0,
            score: 0,
            game_over: false,
            started: Instant::now(),
        }
    }
}

impl GameState {
    /// Apply one event. Returns the world-side work it implies, if any.
    pub fn apply(&mut self, code: EventCode) -> Option<WorldCommand> {
        let mut command = None;

        if code.has_category(EventCode::ENERGY) {
            if code.has_action(EventCode::SET) {
                self.health = (code.operand_bits() as u16).min(MAX_HEALTH);
            }
            if code.has_action(EventCode::CHANGE) {
                let health = self.health as i32 + code.operand() as i32;
                self.health = health.clamp(0, MAX_HEALTH as i32) as u16;
                if self.health == 0 && !self.game_over {
                    self.game_over = true;
                    log::warn!(
                        "game over after {}s, score {}",
                        self.started.elapsed().as_secs(),
                        self.score
                    );
                }
            }
            if code.has_action(EventCode::DISPLAY) {
                log::info!("health {}/{}", self.health, MAX_HEALTH);
            }
            if code.has_action(EventCode::SCORE) {
                self.score += code.operand_bits() as u32;
                log::info!("score {}", self.score);
            }
        }

        if code.has_category(EventCode::FACES) && code.has_action(EventCode::DELETE) {
            command = Some(WorldCommand::DeleteFaces(code));
        }
        command
    }
}

/// Best-effort producer side of the event queue.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<EventCode>,
    timeout: Duration,
}

impl EventSink {
    /// Queue an event. A full or closed queue drops it with a warning.
    pub fn emit(&self, code: EventCode) -> bool {
        match self.tx.send_timeout(code, self.timeout) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(code)) => {
                log::warn!("event queue full, dropped {:?}", code);
                false
            }
            Err(SendTimeoutError::Disconnected(code)) => {
                log::warn!("event manager gone, dropped {:?}", code);
                false
            }
        }
    }
}

/// Bounded event queue with the default capacity and send timeout
pub fn event_channel() -> (EventSink, Receiver<EventCode>) {
    let (tx, rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);
    (
        EventSink {
            tx,
            timeout: EVENT_SEND_TIMEOUT,
        },
        rx,
    )
}

/// Consumer thread applying events to the shared `GameState`.
pub struct EventManager {
    handle: JoinHandle<()>,
    state: Arc<RwLock<GameState>>,
}

impl EventManager {
    /// Runs until every `EventSink` has been dropped.
    pub fn spawn(events: Receiver<EventCode>, commands: Sender<WorldCommand>) -> Result<Self, PipelineError> {
        let state = Arc::new(RwLock::new(GameState::default()));
        let shared = Arc::clone(&state);

        let handle = std::thread::Builder::new()
            .name("events".into())
            .spawn(move || {
                log::debug!("event manager running");
                for code in events.iter() {
                    log::debug!("event {:?}", code);
                    let command = shared.write().apply(code);
                    if let Some(command) = command {
                        if commands.send(command).is_err() {
                            log::warn!("world loop gone, dropped {:?}", command);
                        }
                    }
                }
                log::debug!("event manager stopped");
            })
            .map_err(|source| PipelineError::Spawn { name: "events", source })?;

        Ok(Self { handle, state })
    }

    pub fn state(&self) -> Arc<RwLock<GameState>> {
        Arc::clone(&self.state)
    }

    pub fn join(self) -> Result<(), PipelineError> {
        self.handle
            .join()
            .map_err(|_| PipelineError::WorkerStopped("events"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_is_signed() {
        let hurt = EventCode::energy(EventCode::CHANGE, -8);
        assert_eq!(hurt.0, 0x1200_F800);
        assert_eq!(hurt.operand(), -8);
        assert_eq!(hurt.operand_bits(), 0xF8);
        assert_eq!(hurt.category(), EventCode::ENERGY);
    }

    #[test]
    fn startup_sets_health() {
        let mut state = GameState::default();
        assert_eq!(state.apply(EventCode::startup()), None);
        assert_eq!(state.health, 0x79);
    }

    #[test]
    fn health_is_clamped() {
        let mut state = GameState::default();
        state.apply(EventCode::energy(EventCode::SET, 120));
        state.apply(EventCode::energy(EventCode::CHANGE, 100));
        assert_eq!(state.health, MAX_HEALTH);
        state.apply(EventCode::energy(EventCode::CHANGE, -128));
        state.apply(EventCode::energy(EventCode::CHANGE, -128));
        assert_eq!(state.health, 0);
        assert!(state.game_over);
    }

    #[test]
    fn delete_is_forwarded() {
        let mut state = GameState::default();
        let code = EventCode::delete_faces(3);
        assert_eq!(code.id(), 3);
        assert_eq!(state.apply(code), Some(WorldCommand::DeleteFaces(code)));
    }

    #[test]
    fn full_queue_drops_without_blocking_forever() {
        let (sink, rx) = event_channel();
        for _ in 0..EVENT_QUEUE_CAPACITY {
            assert!(sink.emit(EventCode::startup()));
        }
        assert!(!sink.emit(EventCode::startup()));
        assert_eq!(rx.len(), EVENT_QUEUE_CAPACITY);
    }
}
