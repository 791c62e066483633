//! # Snake Client Library
//!
//! Client side of a server-authoritative snake game. The client predicts its
//! own snake locally so movement stays smooth, tells the server about every
//! step it takes, and lets the server's pushes overwrite whatever they cover.
//!
//! ## Architecture Overview
//!
//! Everything runs on the window's frame loop. Each frame:
//!
//! 1. Server events queued by the transport are applied to the [`game::Session`]
//!    one at a time, each to completion.
//! 2. Keyboard and swipe input is latched as the pending direction.
//! 3. If the tick interval has elapsed, the snake advances one cell and a move
//!    notification is queued for the server.
//! 4. The scene is rebuilt from the current state and drawn, whether or not
//!    anything changed.
//!
//! ### Local Prediction
//! The snake moves on the client without waiting for the server. The server
//! owns collisions, apples and the score; the client never rolls back on its
//! own, it just accepts the next snapshot.
//!
//! ### Server Events
//! - `InitialState` starts the session.
//! - `AppleEaten` moves the apple, sets the score and owes the snake one segment.
//! - `Lost` replaces the whole state; drawing carries on uninterrupted.
//!
//! ## Module Organization
//!
//! - [`game`]: game state, session state machine and the tick clock
//! - [`input`]: key and swipe mapping with the reversal guard
//! - [`rendering`]: layout, scene building and drawing
//! - [`network`]: UDP transport and the frame loop that ties it all together
//! - [`config`]: command line arguments
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
