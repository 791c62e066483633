use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CLIENT_VERSION: u32 = 1;
pub const DEFAULT_TICK_MS: u64 = 70;
pub const TILE_MARGIN: f64 = 0.15;
pub const TILE_PADDING: f32 = 0.05;
pub const MAX_NICKNAME_LEN: usize = 20;
/// Cells are addressed with `i32`, so no side may be longer than that.
pub const MAX_GRID_DIMENSION: u32 = i32::MAX as u32;

const FORBIDDEN_NICKNAME_CHARS: &[char] = &['<', '>', '/', '\\', '{', '}', '[', ']'];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode packet: {0}")]
    Decode(#[source] bincode::Error),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("grid dimensions must be between 1 and {max}, got {width}x{height}", max = MAX_GRID_DIMENSION)]
pub struct GridSizeError {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        nickname: String,
    },
    GameEvent(GameEvent),
    Disconnect,

    InitialState(StateSnapshot),
    AppleEaten {
        apple: Position,
        score: u32,
    },
    Lost(StateSnapshot),
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Move { head: Position },
}

/// Full authoritative state, sent on session start and again on every respawn.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub nickname: String,
    /// Head first.
    pub snake: Vec<Position>,
    /// Wire name of the direction ("UP", "DOWN", "LEFT", "RIGHT").
    pub direction: String,
    pub apple: Position,
    pub score: u32,
    pub grid_size: (u32, u32),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.unit_vector();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_reverse_of(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Screen coordinates: y grows downwards.
    pub fn unit_vector(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

/// Toroidal board, fixed for the lifetime of a session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct Grid {
    width: u32,
    height: u32,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Result<Self, GridSizeError> {
        let valid = 1..=MAX_GRID_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(GridSizeError { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn wrap(&self, position: Position) -> Position {
        Position {
            x: position.x.rem_euclid(self.width as i32),
            y: position.y.rem_euclid(self.height as i32),
        }
    }

    pub fn step(&self, position: Position, direction: Direction) -> Position {
        self.wrap(position.step(direction))
    }
}

impl TryFrom<(u32, u32)> for Grid {
    type Error = GridSizeError;

    fn try_from((width, height): (u32, u32)) -> Result<Self, Self::Error> {
        Grid::new(width, height)
    }
}

impl From<Grid> for (u32, u32) {
    fn from(grid: Grid) -> Self {
        (grid.width, grid.height)
    }
}

/// Same acceptance rule the server applies before it echoes a nickname back.
pub fn is_valid_nickname(nickname: &str) -> bool {
    let len = nickname.chars().count();
    (1..=MAX_NICKNAME_LEN).contains(&len)
        && !nickname.contains(FORBIDDEN_NICKNAME_CHARS)
        && !nickname.contains(&['\n', '\r'][..])
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(packet).map_err(ProtocolError::Encode)
}

pub fn decode(data: &[u8]) -> Result<Packet, ProtocolError> {
    bincode::deserialize(data).map_err(ProtocolError::Decode)
}
