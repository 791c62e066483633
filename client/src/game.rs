//! Locally predicted game state and the session state machine around it

use crate::error::ClientError;
use log::{debug, info, warn};
use shared::{Direction, GameEvent, Grid, Packet, Position, StateSnapshot};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Snake, apple and score for one life. Only the game loop writes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    nickname: String,
    grid: Grid,
    snake: VecDeque<Position>,
    active_direction: Direction,
    pending_direction: Direction,
    apple: Position,
    score: u32,
    pending_growth: u32,
}

impl GameState {
    /// Builds a fresh state from a server snapshot. `fallback` is used when the
    /// snapshot's direction name is not recognized.
    pub fn from_snapshot(
        snapshot: StateSnapshot,
        fallback: Direction,
    ) -> Result<Self, ClientError> {
        let grid = Grid::try_from(snapshot.grid_size)?;

        if snapshot.snake.is_empty() {
            return Err(ClientError::InvalidSnapshot("empty snake"));
        }

        let direction = match Direction::parse(&snapshot.direction) {
            Some(direction) => direction,
            None => {
                warn!(
                    "Unknown direction {:?} in snapshot, keeping {}",
                    snapshot.direction,
                    fallback.as_str()
                );
                fallback
            }
        };

        Ok(Self {
            nickname: snapshot.nickname,
            grid,
            snake: snapshot.snake.into_iter().map(|p| grid.wrap(p)).collect(),
            active_direction: direction,
            pending_direction: direction,
            apple: grid.wrap(snapshot.apple),
            score: snapshot.score,
            pending_growth: 0,
        })
    }

    /// Latches `candidate` for the next tick unless it would turn the head back
    /// into the body. Returns whether the latch changed.
    pub fn request_direction(&mut self, candidate: Direction) -> bool {
        if candidate.is_reverse_of(self.active_direction) {
            return false;
        }
        let changed = self.pending_direction != candidate;
        self.pending_direction = candidate;
        changed
    }

    /// One tick of local prediction. Returns the new head, which is what the
    /// server is told about.
    pub fn advance(&mut self) -> Position {
        self.active_direction = self.pending_direction;

        let head = self.grid.step(self.head(), self.active_direction);
        self.snake.push_front(head);

        if self.pending_growth > 0 {
            self.pending_growth -= 1;
        } else {
            self.snake.pop_back();
        }

        head
    }

    /// The apple was eaten server-side: move it, take the new score and owe the
    /// snake one segment on the next tick.
    pub fn apply_apple_eaten(&mut self, apple: Position, score: u32) {
        self.apple = self.grid.wrap(apple);
        self.score = score;
        self.pending_growth += 1;
    }

    pub fn head(&self) -> Position {
        // The constructor rejects empty snakes and nothing ever pops the last segment.
        self.snake.front().copied().unwrap_or_default()
    }

    pub fn snake(&self) -> &VecDeque<Position> {
        &self.snake
    }

    pub fn len(&self) -> usize {
        self.snake.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snake.is_empty()
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn apple(&self) -> Position {
        self.apple
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn active_direction(&self) -> Direction {
        self.active_direction
    }

    pub fn pending_direction(&self) -> Direction {
        self.pending_direction
    }

    pub fn pending_growth(&self) -> u32 {
        self.pending_growth
    }
}

/// What an inbound packet did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Started,
    Respawned,
    AppleEaten { score: u32 },
    Disconnected { reason: String },
    Ignored,
}

/// Client session. Nothing happens until the server's initial state arrives.
#[derive(Debug, Clone, Default)]
pub enum Session {
    #[default]
    Uninitialized,
    Running(GameState),
}

impl Session {
    pub fn new() -> Self {
        Session::Uninitialized
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Session::Running(_))
    }

    pub fn state(&self) -> Option<&GameState> {
        match self {
            Session::Running(state) => Some(state),
            Session::Uninitialized => None,
        }
    }

    /// Single entry point for everything the server pushes. Packets that make no
    /// sense in the current state are dropped; a rejected snapshot leaves the
    /// session untouched.
    pub fn handle_packet(&mut self, packet: Packet) -> Result<Transition, ClientError> {
        match packet {
            Packet::InitialState(snapshot) => {
                self.reset(snapshot)?;
                if let Session::Running(state) = self {
                    info!(
                        "Session started as {:?} on a {}x{} grid",
                        state.nickname(),
                        state.grid().width(),
                        state.grid().height()
                    );
                }
                Ok(Transition::Started)
            }

            Packet::Lost(snapshot) => {
                if !self.is_running() {
                    debug!("Dropping respawn received before initial state");
                    return Ok(Transition::Ignored);
                }
                self.reset(snapshot)?;
                info!("Snake lost, respawned with a fresh state");
                Ok(Transition::Respawned)
            }

            Packet::AppleEaten { apple, score } => match self {
                Session::Running(state) => {
                    state.apply_apple_eaten(apple, score);
                    debug!("Apple eaten, score {}, next apple at {:?}", score, apple);
                    Ok(Transition::AppleEaten { score })
                }
                Session::Uninitialized => {
                    debug!("Dropping apple update received before initial state");
                    Ok(Transition::Ignored)
                }
            },

            Packet::Disconnected { reason } => match self {
                Session::Running(_) => {
                    warn!("Disconnected by server: {}", reason);
                    *self = Session::Uninitialized;
                    Ok(Transition::Disconnected { reason })
                }
                Session::Uninitialized => {
                    debug!("Dropping disconnect received before initial state: {}", reason);
                    Ok(Transition::Ignored)
                }
            },

            other => {
                warn!("Unexpected packet from server: {:?}", other);
                Ok(Transition::Ignored)
            }
        }
    }

    /// Replaces the whole state; the render loop keeps running across resets.
    fn reset(&mut self, snapshot: StateSnapshot) -> Result<(), ClientError> {
        let fallback = self
            .state()
            .map(GameState::active_direction)
            .unwrap_or_default();
        *self = Session::Running(GameState::from_snapshot(snapshot, fallback)?);
        Ok(())
    }

    pub fn active_direction(&self) -> Option<Direction> {
        self.state().map(GameState::active_direction)
    }

    /// No-op while uninitialized.
    pub fn request_direction(&mut self, candidate: Direction) -> bool {
        match self {
            Session::Running(state) => state.request_direction(candidate),
            Session::Uninitialized => false,
        }
    }

    /// Advances one tick and returns the move notification for the server.
    pub fn advance(&mut self) -> Option<GameEvent> {
        match self {
            Session::Running(state) => Some(GameEvent::Move {
                head: state.advance(),
            }),
            Session::Uninitialized => None,
        }
    }
}

/// Fires at most once per interval. A late frame does not schedule catch-up
/// ticks: the reference point moves to the frame that fired.
#[derive(Debug, Clone)]
pub struct TickClock {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_tick {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_tick = Some(now);
                true
            }
        }
    }
}
