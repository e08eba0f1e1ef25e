//! The board UI: one immediate-mode tick per frame.
//!
//! [`tick`] reads the frame's input, updates [`State`], and describes the
//! whole screen through [`RenderCommands`]. Nothing is retained between
//! frames except `State`.

use std::f32::consts::{FRAC_PI_4, TAU};

use crate::board::Board;
use crate::command::{QuadKind, RenderCommands};
use crate::font::Font;
use crate::types::{Color, Rgba, Vec2};

/// Height reserved above the trays; the top bar fills all but 8 px of it.
pub const TOP_PADDING: f32 = 42.0;
/// Space left below the trays.
pub const BOTTOM_PADDING: f32 = 24.0;
/// Gap between trays and before the first one.
pub const TRAY_PADDING: f32 = 8.0;
/// Width of a tray.
pub const TRAY_WIDTH: f32 = 280.0;

const TRAY_INSET: f32 = 8.0;
const SCROLL_WIDTH: f32 = 8.0;
const TRAY_NAME_HEIGHT: f32 = 32.0;
const CARD_WIDTH: f32 = TRAY_WIDTH - TRAY_INSET * 2.0 - SCROLL_WIDTH;
const CARD_HEIGHT: f32 = 100.0;
const BOARD_LINE_HEIGHT: f32 = 24.0;

const SPINNER_DOTS: u8 = 8;
const SPINNER_RADIUS: f32 = 16.0;
const SPINNER_DOT_SIZE: f32 = 10.0;

const BOARDS_CLEAR: Rgba = Rgba::new(0.97, 0.98, 0.98, 1.0);
const BOARD_CLEAR: Rgba = Rgba::new(0.0, 121.0 / 255.0, 191.0 / 255.0, 1.0);
const TOP_BAR: Color = Color::rgb(0x02, 0x6a, 0xa7);
const TRAY: Color = Color::rgb(0xe2, 0xe4, 0xe6);
const SHADOW: Color = Color::rgb(0xde, 0xde, 0xde);
const TEXT: Color = Color::rgb(0x03, 0x03, 0x03);
const CARD: Color = Color::WHITE;

/// Keys the UI reacts to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left: back to the board list.
    Left,
    /// Arrow right: open the board.
    Right,
    /// Quit.
    Escape,
}

impl Key {
    const COUNT: usize = 5;
}

/// Keys pressed during the current frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Input {
    keys: [bool; Key::COUNT],
}

impl Input {
    /// Mark `key` as pressed.
    pub fn press(&mut self, key: Key) {
        self.keys[key as usize] = true;
    }

    /// Builder form of [`press`](Self::press).
    #[must_use]
    pub fn with(mut self, key: Key) -> Self {
        self.press(key);
        self
    }

    /// Whether `key` was pressed.
    #[must_use]
    pub fn pressed(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    /// Release every key, ready for the next frame.
    pub fn clear(&mut self) {
        self.keys = [false; Key::COUNT];
    }
}

/// Frame timing in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Time {
    /// Duration of the previous frame.
    pub dt: f64,
    /// Time since startup.
    pub global: f64,
}

/// Which screen is showing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// The list of boards (a spinner until the list arrives).
    #[default]
    Boards,
    /// A single board with its trays.
    Board,
}

/// A column of cards on a board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tray {
    /// Heading drawn at the top of the tray.
    pub name: String,
    /// Card titles, top to bottom.
    pub cards: Vec<String>,
}

/// Everything the UI keeps between frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    /// Current screen.
    pub mode: Mode,
    /// The board list, once it has been fetched.
    pub boards: Option<Vec<Board>>,
    /// Trays of the open board.
    pub trays: Vec<Tray>,
}

impl Default for State {
    fn default() -> Self {
        let sample = Tray {
            name: "Resources".into(),
            cards: [
                "Template system",
                "Project dashboard",
                "(3) Send a pulse \"once\"",
                "Import projects",
                "People scale.png",
            ]
            .map(String::from)
            .to_vec(),
        };
        Self {
            mode: Mode::Boards,
            boards: None,
            trays: vec![sample; 10],
        }
    }
}

/// Run one frame of the UI.
///
/// Returns `false` when the application should quit, in which case nothing
/// is drawn.
pub fn tick(
    state: &mut State,
    time: &Time,
    input: &Input,
    commands: &mut RenderCommands<'_>,
) -> bool {
    if input.pressed(Key::Escape) {
        tracing::debug!("escape pressed, quitting");
        return false;
    }

    let settings = *commands.settings();
    #[expect(clippy::cast_precision_loss)]
    let (width, height) = (settings.width as f32, settings.height as f32);
    // Precision loss is irrelevant for an animation phase.
    #[expect(clippy::cast_possible_truncation)]
    let phase = time.global as f32;

    commands.push_clear(match state.mode {
        Mode::Boards => BOARDS_CLEAR,
        Mode::Board => BOARD_CLEAR,
    });
    commands.push_rect(
        Vec2::ZERO,
        Vec2::new(width, TOP_PADDING - 8.0),
        QuadKind::Normal,
        TOP_BAR,
    );

    match state.mode {
        Mode::Boards => {
            if input.pressed(Key::Right) {
                state.mode = Mode::Board;
            }
            match (&state.boards, settings.text_font) {
                (Some(boards), Some(font)) => draw_board_list(commands, font, boards),
                _ => draw_spinner(
                    commands,
                    Vec2::new(width / 2.0, height / 2.0),
                    SPINNER_RADIUS,
                    phase,
                ),
            }
        }
        Mode::Board => {
            if input.pressed(Key::Left) {
                state.mode = Mode::Boards;
            }
            let tray_height = height - TOP_PADDING - BOTTOM_PADDING;
            let span = TRAY_WIDTH + TRAY_PADDING;
            let mut x = TRAY_PADDING;
            for tray in &state.trays {
                draw_tray(
                    commands,
                    settings.header_font,
                    settings.text_font,
                    tray,
                    Vec2::new(x, TOP_PADDING),
                    tray_height,
                );
                x += span;
            }
        }
    }
    true
}

fn draw_board_list(commands: &mut RenderCommands<'_>, font: &Font, boards: &[Board]) {
    let mut y = TOP_PADDING + 20.0;
    for board in boards {
        let mut pen = Vec2::new(TRAY_PADDING + 4.0, y);
        commands.draw_text(&mut pen, TEXT, font, &board.name);
        y += BOARD_LINE_HEIGHT;
    }
}

/// Draw a loading spinner: eight fading dots on a circle around `origin`,
/// one revolution per second.
pub fn draw_spinner(commands: &mut RenderCommands<'_>, origin: Vec2, size: f32, time: f32) {
    for i in 0..SPINNER_DOTS {
        let angle = time * TAU + FRAC_PI_4 * f32::from(i);
        let (sin, cos) = angle.sin_cos();
        let offset = Vec2::new(size * cos - size * sin, size * cos + size * sin);
        let alpha = u8::try_from(u32::from(i) * 255 / u32::from(SPINNER_DOTS)).unwrap_or(u8::MAX);
        commands.push_rect(
            Vec2::new(origin.x + offset.x, origin.y + offset.y),
            Vec2::new(SPINNER_DOT_SIZE, SPINNER_DOT_SIZE),
            QuadKind::Circle,
            Color::rgba(0xb3, 0xb3, 0xb3, alpha),
        );
    }
}

/// Draw one tray with its drop shadow, heading and cards.
///
/// Text is skipped when the matching font is absent.
pub fn draw_tray(
    commands: &mut RenderCommands<'_>,
    header_font: Option<&Font>,
    text_font: Option<&Font>,
    tray: &Tray,
    pos: Vec2,
    height: f32,
) {
    commands.push_rect(
        Vec2::new(pos.x - 1.0, pos.y - 1.0),
        Vec2::new(TRAY_WIDTH + 2.0, height + 2.0),
        QuadKind::Normal,
        SHADOW,
    );
    commands.push_rect(pos, Vec2::new(TRAY_WIDTH, height), QuadKind::Normal, TRAY);

    if let Some(font) = header_font {
        let mut pen = Vec2::new(pos.x + 4.0, pos.y + 20.0);
        commands.draw_text(&mut pen, TEXT, font, &tray.name);
    }

    let x = pos.x + TRAY_INSET;
    let mut y = pos.y + TRAY_NAME_HEIGHT + TRAY_INSET;
    for card in &tray.cards {
        commands.push_rect(
            Vec2::new(x - 1.0, y - 1.0),
            Vec2::new(CARD_WIDTH + 2.0, CARD_HEIGHT + 2.0),
            QuadKind::Normal,
            SHADOW,
        );
        commands.push_rect(
            Vec2::new(x, y),
            Vec2::new(CARD_WIDTH, CARD_HEIGHT),
            QuadKind::Normal,
            CARD,
        );
        if let Some(font) = text_font {
            let mut pen = Vec2::new(x + 4.0, y + 12.0);
            commands.draw_text(&mut pen, TEXT, font, card);
        }
        y += CARD_HEIGHT + TRAY_INSET;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::command::{RenderEntry, RenderSettings};
    use crate::font::tests::mono_font;
    use crate::types::{TextureId, TexturedVertex, Vertex};

    struct Buffers {
        arena: Vec<u8>,
        vertices: Vec<Vertex>,
        textured: Vec<TexturedVertex>,
    }

    impl Buffers {
        fn new() -> Self {
            Self {
                arena: vec![0; 4096],
                vertices: vec![Vertex::default(); 1200],
                textured: vec![TexturedVertex::default(); 6000],
            }
        }

        fn commands<'a>(&'a mut self, settings: RenderSettings<'a>) -> RenderCommands<'a> {
            RenderCommands::new(&mut self.arena, &mut self.vertices, &mut self.textured, settings)
        }
    }

    fn entries(cmds: &RenderCommands<'_>) -> Vec<RenderEntry> {
        cmds.view().entries().map(Result::unwrap).collect()
    }

    #[test]
    fn escape_quits_without_drawing() {
        let mut buffers = Buffers::new();
        let mut cmds = buffers.commands(RenderSettings::new(800, 600));
        let mut state = State::default();
        let input = Input::default().with(Key::Escape);
        assert!(!tick(&mut state, &Time::default(), &input, &mut cmds));
        assert_eq!(cmds.command_bytes(), 0);
    }

    #[test]
    fn boards_mode_draws_bar_and_spinner() {
        let mut buffers = Buffers::new();
        let mut cmds = buffers.commands(RenderSettings::new(800, 600));
        let mut state = State::default();
        assert!(tick(&mut state, &Time::default(), &Input::default(), &mut cmds));

        let entries = entries(&cmds);
        assert_eq!(entries[0], RenderEntry::Clear { color: BOARDS_CLEAR });
        assert_eq!(
            entries[1],
            RenderEntry::Quads {
                kind: QuadKind::Normal,
                first_vertex: 0,
                quad_count: 1
            }
        );
        assert_eq!(
            entries[2],
            RenderEntry::Quads {
                kind: QuadKind::Circle,
                first_vertex: 6,
                quad_count: 8
            }
        );
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn spinner_dots_fade_in() {
        let mut buffers = Buffers::new();
        let mut cmds = buffers.commands(RenderSettings::new(100, 100));
        draw_spinner(&mut cmds, Vec2::new(50.0, 50.0), 16.0, 0.0);
        let view = cmds.view();
        let alphas: Vec<u8> = view
            .vertices()
            .chunks(6)
            .map(|quad| quad[0].color.channels()[3])
            .collect();
        assert_eq!(alphas, vec![0, 31, 63, 95, 127, 159, 191, 223]);
        // At time zero the first dot sits at (+size, +size) from the origin.
        assert_eq!(view.vertices()[0].pos, Vec2::new(66.0, 66.0));
    }

    #[test]
    fn arrows_switch_modes() {
        let mut buffers = Buffers::new();
        let mut state = State::default();
        {
            let mut cmds = buffers.commands(RenderSettings::new(800, 600));
            tick(&mut state, &Time::default(), &Input::default().with(Key::Right), &mut cmds);
        }
        assert_eq!(state.mode, Mode::Board);

        let mut cmds = buffers.commands(RenderSettings::new(800, 600));
        tick(&mut state, &Time::default(), &Input::default().with(Key::Left), &mut cmds);
        assert_eq!(state.mode, Mode::Boards);
        // The frame that switched back still drew the board screen.
        assert_eq!(entries(&cmds)[0], RenderEntry::Clear { color: BOARD_CLEAR });
    }

    #[test]
    fn board_mode_without_fonts_is_one_batch() {
        let mut buffers = Buffers::new();
        let mut cmds = buffers.commands(RenderSettings::new(800, 600));
        let mut state = State {
            mode: Mode::Board,
            ..State::default()
        };
        tick(&mut state, &Time::default(), &Input::default(), &mut cmds);

        // Top bar, then per tray: shadow, body, and a shadow and body per card.
        let quads = 1 + 10 * (2 + 5 * 2);
        assert_eq!(
            entries(&cmds)[1],
            RenderEntry::Quads {
                kind: QuadKind::Normal,
                first_vertex: 0,
                quad_count: quads
            }
        );
        assert_eq!(cmds.vertex_count(), quads as usize * 6);
    }

    #[test]
    fn tray_geometry() {
        let mut buffers = Buffers::new();
        let mut cmds = buffers.commands(RenderSettings::new(800, 600));
        let tray = Tray {
            name: "T".into(),
            cards: vec!["c".into()],
        };
        draw_tray(&mut cmds, None, None, &tray, Vec2::new(8.0, 42.0), 500.0);
        let verts = cmds.view().vertices();
        // Shadow top-left, tray top-left, card top-left, card bottom-right.
        assert_eq!(verts[0].pos, Vec2::new(7.0, 41.0));
        assert_eq!(verts[6].pos, Vec2::new(8.0, 42.0));
        assert_eq!(verts[18].pos, Vec2::new(16.0, 82.0));
        assert_eq!(verts[22].pos, Vec2::new(16.0 + 256.0, 182.0));
    }

    #[test]
    fn loaded_boards_replace_the_spinner() {
        let font = mono_font(TextureId::new(3));
        let mut buffers = Buffers::new();
        let mut cmds = buffers.commands(RenderSettings::new(800, 600).with_fonts(&font, &font));
        let mut state = State {
            boards: Some(vec![
                Board {
                    name: "Roadmap".into(),
                    ..Board::default()
                },
                Board {
                    name: "Inbox".into(),
                    ..Board::default()
                },
            ]),
            ..State::default()
        };
        tick(&mut state, &Time::default(), &Input::default(), &mut cmds);

        let entries = entries(&cmds);
        assert_eq!(
            entries[2],
            RenderEntry::TexturedQuads {
                texture: TextureId::new(3),
                color: TEXT,
                first_vertex: 0,
                quad_count: 12
            }
        );
        assert_eq!(entries.len(), 3);
    }
}
