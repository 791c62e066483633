//! Keyboard and swipe input mapped onto the session's pending direction

use crate::game::Session;
use log::debug;
use macroquad::prelude::*;
use shared::Direction;

/// Arrow keys and WASD. Key codes carry no case, so `a` and `A` are the same key.
pub fn direction_for_key(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Left | KeyCode::A => Some(Direction::Left),
        KeyCode::Up | KeyCode::W => Some(Direction::Up),
        KeyCode::Right | KeyCode::D => Some(Direction::Right),
        KeyCode::Down | KeyCode::S => Some(Direction::Down),
        _ => None,
    }
}

/// Classifies a completed swipe by its dominant axis. Ties go to the vertical
/// axis; a swipe that did not move at all yields nothing.
pub fn classify_gesture(dx: f32, dy: f32) -> Option<Direction> {
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Some(Direction::Right)
        } else {
            Some(Direction::Left)
        }
    } else if dy > 0.0 {
        Some(Direction::Down)
    } else if dy < 0.0 {
        Some(Direction::Up)
    } else {
        None
    }
}

/// Turns raw key and touch events into direction requests. Holds only the
/// start point of the touch in progress; the direction latch itself lives in
/// the session so the reversal guard can see the active direction.
#[derive(Debug, Default)]
pub struct InputController {
    touch_start: Option<Vec2>,
}

impl InputController {
    pub fn new() -> Self {
        Self { touch_start: None }
    }

    /// Returns whether the pending direction changed. Unmapped keys are ignored.
    pub fn on_key(&self, session: &mut Session, key: KeyCode) -> bool {
        match direction_for_key(key) {
            Some(direction) => session.request_direction(direction),
            None => false,
        }
    }

    pub fn on_gesture(&self, session: &mut Session, dx: f32, dy: f32) -> bool {
        match classify_gesture(dx, dy) {
            Some(direction) => {
                debug!("Swipe ({:.0}, {:.0}) -> {}", dx, dy, direction.as_str());
                session.request_direction(direction)
            }
            None => false,
        }
    }

    /// Fires one gesture per start/end pair; moves in between are swallowed.
    pub fn on_touch(&mut self, session: &mut Session, touch: &Touch) -> bool {
        match touch.phase {
            TouchPhase::Started => {
                self.touch_start = Some(touch.position);
                false
            }
            TouchPhase::Ended => match self.touch_start.take() {
                Some(start) => {
                    let delta = touch.position - start;
                    self.on_gesture(session, delta.x, delta.y)
                }
                None => false,
            },
            TouchPhase::Cancelled => {
                self.touch_start = None;
                false
            }
            TouchPhase::Moved | TouchPhase::Stationary => false,
        }
    }

    /// Reads this frame's input from the window.
    pub fn poll(&mut self, session: &mut Session) {
        for key in get_keys_pressed() {
            self.on_key(session, key);
        }

        for touch in touches() {
            self.on_touch(session, &touch);
        }
    }
}
