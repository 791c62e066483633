//! Board layout, scene building and drawing
//!
//! Drawing is split in two: [`build_scene`] turns the session into a flat list
//! of draw commands without touching the window, and [`Renderer::draw`] replays
//! that list through macroquad. The scene is a pure function of the session and
//! the layout, so drawing twice without a tick or server event in between paints
//! the same frame.

use crate::game::{GameState, Session};
use macroquad::prelude::*;
use shared::{Grid, Position, TILE_MARGIN, TILE_PADDING};

const HUD_FONT_SIZE: f32 = 18.0;
const HUD_X: f32 = 10.0;
const SCORE_Y: f32 = 20.0;
const NICKNAME_Y: f32 = 40.0;
const GLOW_LAYERS: u8 = 4;

/// Largest whole tile size that fits the grid into the viewport once the margin
/// is reserved.
pub fn tile_size(viewport_width: f32, viewport_height: f32, grid: &Grid) -> u32 {
    let usable = 1.0 - TILE_MARGIN;
    let by_width = (viewport_width as f64 * usable / grid.width() as f64).floor();
    let by_height = (viewport_height as f64 * usable / grid.height() as f64).floor();
    by_width.min(by_height).max(0.0) as u32
}

/// Where the board sits in the window. Only changes when the viewport or the
/// grid does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub tile_size: f32,
    pub board: Rect,
}

impl Layout {
    pub fn fit(viewport_width: f32, viewport_height: f32, grid: &Grid) -> Self {
        let tile = tile_size(viewport_width, viewport_height, grid) as f32;
        let width = grid.width() as f32 * tile;
        let height = grid.height() as f32 * tile;

        Layout {
            tile_size: tile,
            board: Rect::new(
                ((viewport_width - width) / 2.0).floor(),
                ((viewport_height - height) / 2.0).floor(),
                width,
                height,
            ),
        }
    }

    /// Screen rectangle of a cell, shrunk on every side so neighbours never touch.
    pub fn tile_rect(&self, position: Position) -> Rect {
        let padding = TILE_PADDING * self.tile_size;
        let inner = self.tile_size - 2.0 * padding;
        Rect::new(
            self.board.x + position.x as f32 * self.tile_size + padding,
            self.board.y + position.y as f32 * self.tile_size + padding,
            inner,
            inner,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub board: Color,
    pub head: Color,
    pub body: Color,
    pub apple: Color,
    pub text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            background: Color::from_rgba(26, 26, 26, 255),
            board: Color::from_rgba(0, 0, 0, 255),
            head: RED,
            body: Color::from_rgba(255, 214, 48, 255),
            apple: Color::from_rgba(255, 140, 0, 255),
            text: WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Rect { rect: Rect, color: Color },
    /// Soft halo around a tile; purely cosmetic.
    Glow { rect: Rect, color: Color },
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub commands: Vec<DrawCommand>,
}

impl Scene {
    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn tiles(&self) -> impl Iterator<Item = (&Rect, &Color)> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Rect { rect, color } => Some((rect, color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

pub fn build_scene(session: &Session, layout: Option<&Layout>, palette: &Palette) -> Scene {
    let mut scene = Scene::default();
    scene.push(DrawCommand::Clear(palette.background));

    match (session, layout) {
        (Session::Running(state), Some(layout)) => draw_game(&mut scene, state, layout, palette),
        _ => scene.push(DrawCommand::Text {
            text: "Connecting...".to_string(),
            x: HUD_X,
            y: SCORE_Y,
            size: HUD_FONT_SIZE,
            color: palette.text,
        }),
    }

    scene
}

fn draw_game(scene: &mut Scene, state: &GameState, layout: &Layout, palette: &Palette) {
    scene.push(DrawCommand::Rect {
        rect: layout.board,
        color: palette.board,
    });

    for (i, segment) in state.snake().iter().enumerate() {
        let color = if i == 0 { palette.head } else { palette.body };
        scene.push(DrawCommand::Rect {
            rect: layout.tile_rect(*segment),
            color,
        });
    }

    let apple = layout.tile_rect(state.apple());
    scene.push(DrawCommand::Glow {
        rect: apple,
        color: palette.apple,
    });
    scene.push(DrawCommand::Rect {
        rect: apple,
        color: palette.apple,
    });

    scene.push(DrawCommand::Text {
        text: format!("Score: {}", state.score()),
        x: HUD_X,
        y: SCORE_Y,
        size: HUD_FONT_SIZE,
        color: palette.text,
    });
    scene.push(DrawCommand::Text {
        text: format!("Nickname: {}", state.nickname()),
        x: HUD_X,
        y: NICKNAME_Y,
        size: HUD_FONT_SIZE,
        color: palette.text,
    });
}

pub struct Renderer {
    palette: Palette,
    viewport: (f32, f32),
    grid: Option<Grid>,
    layout: Option<Layout>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            palette: Palette::default(),
            viewport: (0.0, 0.0),
            grid: None,
            layout: None,
        }
    }

    /// Recomputes the layout when the viewport was resized or a new grid arrived.
    pub fn update_layout(&mut self, viewport_width: f32, viewport_height: f32, grid: Option<Grid>) {
        let viewport = (viewport_width, viewport_height);
        if viewport == self.viewport && grid == self.grid {
            return;
        }

        self.viewport = viewport;
        self.grid = grid;
        self.layout = grid.map(|grid| Layout::fit(viewport_width, viewport_height, &grid));
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn scene(&self, session: &Session) -> Scene {
        build_scene(session, self.layout.as_ref(), &self.palette)
    }

    /// Redraws the current session into the window. Called every frame.
    pub fn render(&mut self, session: &Session) {
        let grid = session.state().map(GameState::grid);
        self.update_layout(screen_width(), screen_height(), grid);
        let scene = self.scene(session);
        self.draw(&scene);
    }

    pub fn draw(&self, scene: &Scene) {
        for command in &scene.commands {
            match command {
                DrawCommand::Clear(color) => clear_background(*color),
                DrawCommand::Rect { rect, color } => {
                    draw_rectangle(rect.x, rect.y, rect.w, rect.h, *color)
                }
                DrawCommand::Glow { rect, color } => self.draw_glow(rect, *color),
                DrawCommand::Text {
                    text,
                    x,
                    y,
                    size,
                    color,
                } => {
                    draw_text(text, *x, *y, *size, *color);
                }
            }
        }
    }

    fn draw_glow(&self, rect: &Rect, color: Color) {
        let spread = rect.w * 0.25;
        for layer in (1..=GLOW_LAYERS).rev() {
            let grow = spread * layer as f32;
            let alpha = 0.35 / layer as f32;
            draw_rectangle(
                rect.x - grow,
                rect.y - grow,
                rect.w + 2.0 * grow,
                rect.h + 2.0 * grow,
                Color::new(color.r, color.g, color.b, alpha),
            );
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
