use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use log::warn;
use std::fs;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

mod entities;
mod game;
mod level;
mod maze;
mod modes;
mod rng;
mod store;

use game::{Game, GameEvent, MoveOutcome, RejectReason, HAZARD_TICK_MS};
use level::LevelFile;
use maze::Dir;
use modes::{Difficulty, StoryProgression, TutorialScript, TOTAL_LEVELS};
use store::{ProgressStore, MASTERY_KEY};

const DEFAULT_RENDER_FPS: u64 = 60;
const GLOW_STEP: f32 = 0.05;
const CELL_W: usize = 2;
const EXPORT_FILE: &str = "custom_level.json";

const WALL_COLOR: Color = Color::Rgb { r: 69, g: 162, b: 158 };
const COIN_COLOR: Color = Color::Rgb { r: 255, g: 215, b: 0 };
const POWER_COLOR: Color = Color::Rgb { r: 102, g: 252, b: 241 };
const HAZARD_COLOR: Color = Color::Rgb { r: 229, g: 62, b: 62 };
const START_COLOR: Color = Color::Rgb { r: 102, g: 252, b: 241 };
const END_COLOR: Color = Color::Rgb { r: 247, g: 37, b: 133 };

const ARROWS: [char; 4] = ['▶', '▼', '◀', '▲'];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Mastery,
    Story,
    Tutorial,
}

struct App {
    mode: Mode,
    game: Game,
    store: ProgressStore,
    difficulty: Difficulty,
    story: StoryProgression,
    tutorial: Option<TutorialScript>,
    player_name: String,
    forced_seed: Option<u32>,
    message: String,
}

impl App {
    fn new(mode: Mode) -> Self {
        let store_path = std::env::var("MAZE_SAVE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("maze_progress.json"));
        let player_name =
            std::env::var("MAZE_PLAYER_NAME").unwrap_or_else(|_| "anon".to_string());
        let forced_seed = std::env::var("MAZE_SEED")
            .ok()
            .and_then(|v| v.parse::<u32>().ok());

        let difficulty = Difficulty::Medium;
        let story = StoryProgression::new();
        let tutorial = (mode == Mode::Tutorial).then(|| TutorialScript::new());

        let mut game = Game::new(difficulty.session_config());
        game.set_on_level_complete(Box::new(|report| {
            log::debug!(
                "win notification: score={} stars={}",
                report.score,
                report.stars
            );
        }));

        let mut app = Self {
            mode,
            game,
            store: ProgressStore::open(store_path),
            difficulty,
            story,
            tutorial,
            player_name,
            forced_seed,
            message: String::new(),
        };
        app.start_session();
        if app.tutorial.is_some() {
            app.message = TutorialScript::WELCOME.to_string();
        }
        app
    }

    fn start_session(&mut self) {
        match self.mode {
            Mode::Mastery => {
                self.game.configure(self.difficulty.session_config());
                self.game.generate(self.forced_seed);
                self.message = format!(
                    "Navigate the maze! Difficulty: {}",
                    self.difficulty.name()
                );
            }
            Mode::Story | Mode::Tutorial => {
                self.game.configure(self.story.config());
                self.game.generate(Some(self.story.seed()));
                self.message = format!(
                    "Level {} of {}. Reach the far corner!",
                    self.story.current_level, TOTAL_LEVELS
                );
            }
        }
    }

    /// Load a custom level file at startup; a bad file is reported and the
    /// generated maze stays up.
    fn load_custom_level(&mut self, path: &str) {
        let result = fs::read_to_string(path)
            .map_err(|err| err.to_string())
            .and_then(|raw| LevelFile::parse(&raw).map_err(|err| err.to_string()))
            .and_then(|level| level.install(&mut self.game).map_err(|err| err.to_string()));
        match result {
            Ok(()) => {
                let size = self.game.config().grid_size;
                self.message = format!("Playing custom {size}x{size} level from {path}");
            }
            Err(err) => {
                warn!("custom level {path} rejected: {err}");
                self.message = format!("Custom level rejected: {err}");
            }
        }
    }

    /// Returns false when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('w') | KeyCode::Up => self.handle_move(Dir::Up),
            KeyCode::Char('s') | KeyCode::Down => self.handle_move(Dir::Down),
            KeyCode::Char('a') | KeyCode::Left => self.handle_move(Dir::Left),
            KeyCode::Char('d') | KeyCode::Right => self.handle_move(Dir::Right),
            KeyCode::Char('g') => self.start_session(),
            KeyCode::Char('1') if self.mode == Mode::Mastery => self.set_difficulty(Difficulty::Easy),
            KeyCode::Char('2') if self.mode == Mode::Mastery => {
                self.set_difficulty(Difficulty::Medium)
            }
            KeyCode::Char('3') if self.mode == Mode::Mastery => self.set_difficulty(Difficulty::Hard),
            KeyCode::Char('x') => self.export_level(),
            KeyCode::Char('b') => self.show_badges(),
            _ => {}
        }
        true
    }

    fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.start_session();
    }

    fn handle_move(&mut self, dir: Dir) {
        let outcome = self.game.attempt_move(dir);
        match &outcome {
            MoveOutcome::Moved {
                collected_coin,
                collected_power_up,
                won,
            } => {
                if *collected_coin {
                    self.message = "Coin collected! +100".to_string();
                }
                if *collected_power_up {
                    self.message = "Speed boost! Double speed for 5 seconds.".to_string();
                }
                if let Some(report) = won.clone() {
                    self.after_win(report);
                }
            }
            MoveOutcome::Rejected(RejectReason::Hazard) => {
                self.message = "A moving wall blocks the way!".to_string();
            }
            MoveOutcome::Rejected(_) => {}
        }

        if let Some(script) = self.tutorial.as_mut() {
            if let Some(hint) = script.observe(&self.game) {
                self.message = hint.to_string();
            }
        }
    }

    fn after_win(&mut self, report: game::WinReport) {
        match self.mode {
            Mode::Mastery => {
                self.store
                    .record_score(MASTERY_KEY, &self.player_name, report.score);
                let best = self
                    .store
                    .leaderboard(MASTERY_KEY)
                    .first()
                    .map(|entry| format!("{} by {}", entry.score, entry.name))
                    .unwrap_or_else(|| report.score.to_string());
                self.message = format!(
                    "You solved the maze with {}s left! {} Best: {}",
                    report.time_left,
                    self.difficulty.compliment(),
                    best
                );
            }
            Mode::Story | Mode::Tutorial => {
                let mut new_badges: Vec<&str> = Vec::new();
                for id in self.story.achievements_for(&report) {
                    if self.store.unlock(&id) {
                        if let Some(def) =
                            store::ACHIEVEMENTS.iter().find(|a| a.id == id.as_str())
                        {
                            new_badges.push(def.name);
                        }
                    }
                }
                self.store.set_progress(self.story.progress_percent());
                self.store.record_score(
                    &self.story.current_level.to_string(),
                    &self.player_name,
                    report.score,
                );
                if self.story.is_last_level() {
                    self.message = "Congratulations! You completed all levels!".to_string();
                } else {
                    self.message = format!(
                        "You solved the maze! {}",
                        self.difficulty.compliment()
                    );
                    self.game.schedule_level_advance();
                }
                if !new_badges.is_empty() {
                    self.message = format!("{} Unlocked: {}", self.message, new_badges.join(", "));
                }
            }
        }
        if let Err(err) = self.store.save() {
            warn!("cannot save progress: {err}");
        }
    }

    fn show_badges(&mut self) {
        let earned: Vec<&str> = store::ACHIEVEMENTS
            .iter()
            .filter(|a| self.store.is_unlocked(a.id))
            .map(|a| a.name)
            .collect();
        self.message = if earned.is_empty() {
            let first = &store::ACHIEVEMENTS[0];
            format!(
                "No badges yet. First up: {} - {}",
                first.name, first.description
            )
        } else {
            format!(
                "Badges {}/{}: {}",
                earned.len(),
                store::ACHIEVEMENTS.len(),
                earned.join(", ")
            )
        };
    }

    fn apply_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::SpeedBoostEnded => {
                    self.message = "Speed boost wore off.".to_string();
                }
                GameEvent::TimeExpired => {
                    self.message = "Time's up! Try again! (g for a new maze)".to_string();
                }
                GameEvent::AdvanceLevel => {
                    if self.story.advance() {
                        self.start_session();
                    }
                }
            }
        }
    }

    fn export_level(&mut self) {
        let Some(snapshot) = LevelFile::capture(&self.game) else {
            return;
        };
        let result = snapshot
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(EXPORT_FILE, json).map_err(|err| err.to_string()));
        match result {
            Ok(()) => self.message = format!("Board exported to {EXPORT_FILE}"),
            Err(err) => self.message = format!("Export failed: {err}"),
        }
    }

    fn hud(&self) -> String {
        let minutes = self.game.time_left() / 60;
        let seconds = self.game.time_left() % 60;
        let stars = self.game.stars();
        let star_row: String = (0..3).map(|i| if i < stars { '★' } else { '☆' }).collect();
        let boost = if self.game.player().speed_multiplier > 1 {
            "  SPEED x2"
        } else {
            ""
        };
        match self.mode {
            Mode::Mastery => format!(
                "Score: {}  Time: {:02}:{:02}  {}{}  [{}]  (wasd move, g new, 1-3 difficulty, x export, b badges, q quit)",
                self.game.score(),
                minutes,
                seconds,
                star_row,
                boost,
                self.difficulty.name()
            ),
            Mode::Story | Mode::Tutorial => format!(
                "Score: {}  Time: {:02}:{:02}  {}{}  Level {}/{}  (wasd move, g retry, b badges, q quit)",
                self.game.score(),
                minutes,
                seconds,
                star_row,
                boost,
                self.story.current_level,
                TOTAL_LEVELS
            ),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
struct Patch {
    ch: char,
    color: Color,
}

const BLANK: Patch = Patch {
    ch: ' ',
    color: Color::Reset,
};

struct Renderer {
    rows: usize,
    cols: usize,
    last: Vec<Patch>,
    last_hud: String,
    last_message: String,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
    glow: f32,
}

impl Renderer {
    fn new() -> Self {
        Self {
            rows: 0,
            cols: 0,
            last: Vec::new(),
            last_hud: String::new(),
            last_message: String::new(),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
            glow: 0.0,
        }
    }

    fn ensure_size(&mut self, rows: usize, cols: usize) {
        if self.rows != rows || self.cols != cols {
            self.rows = rows;
            self.cols = cols;
            self.last = vec![BLANK; rows * cols];
            self.needs_full = true;
        }
    }
}

fn main() -> io::Result<()> {
    env_logger::init();
    let mode = match std::env::args().nth(1).as_deref() {
        Some("story") => Mode::Story,
        Some("tutorial") => Mode::Tutorial,
        _ => Mode::Mastery,
    };

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, mode);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(stdout: &mut Stdout, mode: Mode) -> io::Result<()> {
    let mut app = App::new(mode);
    if let Ok(path) = std::env::var("MAZE_LEVEL_FILE") {
        app.load_custom_level(&path);
    }

    let render_fps = std::env::var("MAZE_FPS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RENDER_FPS);
    let frame_time = Duration::from_micros(1_000_000 / render_fps.max(1));

    let mut renderer = Renderer::new();
    let mut last_second = Instant::now();
    let mut last_hazard = Instant::now();

    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                match key.kind {
                    KeyEventKind::Press | KeyEventKind::Repeat => {
                        if !app.handle_key(key.code) {
                            return Ok(());
                        }
                    }
                    _ => {}
                }
            }
        }

        if last_hazard.elapsed() >= Duration::from_millis(HAZARD_TICK_MS as u64) {
            last_hazard = Instant::now();
            let events = app.game.tick_hazards();
            app.apply_events(events);
        }

        if last_second.elapsed() >= Duration::from_secs(1) {
            last_second = Instant::now();
            if let Some(event) = app.game.tick_second() {
                app.apply_events(vec![event]);
            }
        }

        render(stdout, &mut app, &mut renderer)?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

fn render(stdout: &mut Stdout, app: &mut App, renderer: &mut Renderer) -> io::Result<()> {
    let Some(size) = app.game.maze().map(|m| m.size()) else {
        return Ok(());
    };
    let rows = size * 2 + 1;
    let cols = size * 3 + 1;
    renderer.ensure_size(rows, cols);

    renderer.glow = (renderer.glow + GLOW_STEP) % std::f32::consts::TAU;
    let frame = compose(&app.game, renderer.glow);

    let needed_w = cols as u16;
    let needed_h = (rows + 2) as u16;
    let (term_w, term_h) = terminal::size()?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(MoveTo(0, 0))?;
        stdout.queue(Clear(ClearType::All))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        renderer.needs_full = true;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;
    if origin_x != renderer.origin_x || origin_y != renderer.origin_y {
        renderer.origin_x = origin_x;
        renderer.origin_y = origin_y;
        renderer.needs_full = true;
    }
    if renderer.needs_full {
        stdout.queue(Clear(ClearType::All))?;
    }

    let hud = app.hud();
    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y - 1))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Print(&hud))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    if renderer.needs_full || app.message != renderer.last_message {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y + rows as u16))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Print(&app.message))?;
        stdout.queue(ResetColor)?;
        renderer.last_message = app.message.clone();
    }

    for y in 0..rows {
        for x in 0..cols {
            let idx = y * cols + x;
            let patch = frame[idx];
            if renderer.needs_full || patch != renderer.last[idx] {
                renderer.last[idx] = patch;
                stdout.queue(MoveTo(
                    renderer.origin_x + x as u16,
                    renderer.origin_y + y as u16,
                ))?;
                stdout.queue(SetForegroundColor(patch.color))?;
                stdout.queue(Print(patch.ch))?;
            }
        }
    }
    stdout.queue(ResetColor)?;
    renderer.needs_full = false;

    stdout.flush()?;
    Ok(())
}

/// Paint the board into a `(2n+1) x (3n+1)` character lattice: wall rows and
/// columns from the cell flags, 2-character content cells between them.
fn compose(game: &Game, glow: f32) -> Vec<Patch> {
    let Some(maze) = game.maze() else {
        return Vec::new();
    };
    let n = maze.size();
    let rows = n * 2 + 1;
    let cols = n * 3 + 1;
    let mut frame = vec![BLANK; rows * cols];

    for row in maze.rows() {
        for cell in row {
            let y0 = cell.row * 2;
            let x0 = cell.col * 3;
            if cell.walls.top {
                put(&mut frame, cols, x0 + 1, y0, '─', WALL_COLOR);
                put(&mut frame, cols, x0 + 2, y0, '─', WALL_COLOR);
            }
            if cell.walls.bottom {
                put(&mut frame, cols, x0 + 1, y0 + 2, '─', WALL_COLOR);
                put(&mut frame, cols, x0 + 2, y0 + 2, '─', WALL_COLOR);
            }
            if cell.walls.left {
                put(&mut frame, cols, x0, y0 + 1, '│', WALL_COLOR);
            }
            if cell.walls.right {
                put(&mut frame, cols, x0 + 3, y0 + 1, '│', WALL_COLOR);
            }
        }
    }

    // A junction shows up only where a wall segment touches it.
    for jr in 0..=n {
        for jc in 0..=n {
            let y = jr * 2;
            let x = jc * 3;
            let mut touched = x > 0 && frame[y * cols + x - 1].ch == '─';
            touched |= x + 1 < cols && frame[y * cols + x + 1].ch == '─';
            touched |= y > 0 && frame[(y - 1) * cols + x].ch == '│';
            touched |= y + 1 < rows && frame[(y + 1) * cols + x].ch == '│';
            if touched {
                put(&mut frame, cols, x, y, '+', WALL_COLOR);
            }
        }
    }

    let (start_row, start_col) = maze.start();
    put_cell(&mut frame, cols, start_row, start_col, ['░', '░'], START_COLOR);
    let (end_row, end_col) = maze.end();
    put_cell(&mut frame, cols, end_row, end_col, ['░', '░'], END_COLOR);

    for coin in game.coins() {
        put_cell(&mut frame, cols, coin.row, coin.col, ['●', ' '], COIN_COLOR);
    }
    for power_up in game.power_ups() {
        put_cell(
            &mut frame,
            cols,
            power_up.row,
            power_up.col,
            ['◆', ' '],
            POWER_COLOR,
        );
    }
    for wall in game.moving_walls() {
        for step in 0..wall.length {
            let (row, col) = if wall.is_vertical {
                (wall.row + step, wall.col)
            } else {
                (wall.row, wall.col + step)
            };
            if row < n && col < n {
                put_cell(&mut frame, cols, row, col, ['█', '█'], HAZARD_COLOR);
            }
        }
    }

    let player = game.player();
    let intensity = 0.7 + 0.3 * glow.sin();
    let player_color = Color::Rgb {
        r: (102.0 * intensity) as u8,
        g: (252.0 * intensity) as u8,
        b: (241.0 * intensity) as u8,
    };
    let arrow = ARROWS[player.facing.facing_index() as usize];
    put_cell(
        &mut frame,
        cols,
        player.row,
        player.col,
        [arrow, ' '],
        player_color,
    );

    frame
}

fn put(frame: &mut [Patch], cols: usize, x: usize, y: usize, ch: char, color: Color) {
    frame[y * cols + x] = Patch { ch, color };
}

/// Fill a content cell (the `CELL_W` characters between wall columns).
fn put_cell(
    frame: &mut [Patch],
    cols: usize,
    row: usize,
    col: usize,
    chars: [char; CELL_W],
    color: Color,
) {
    let y = row * 2 + 1;
    let x0 = col * 3 + 1;
    for (i, ch) in chars.into_iter().enumerate() {
        put(frame, cols, x0 + i, y, ch, color);
    }
}
