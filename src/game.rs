use log::{debug, info};

use crate::entities::{
    place_moving_walls, place_power_up, scatter_coins, Coin, MovingWall, PowerUp, PowerUpKind,
};
use crate::maze::{Dir, Maze};
use crate::rng::RandomSource;

pub const HAZARD_TICK_MS: u32 = 100;
pub const SPEED_BOOST_MS: u32 = 5000;
pub const LEVEL_ADVANCE_MS: u32 = 1500;
pub const COIN_SCORE: u32 = 100;
pub const TIME_BONUS_MAX: f64 = 500.0;
pub const LEVEL_BONUS_STEP: u32 = 20;
pub const STAR_THRESHOLDS: [f64; 3] = [0.5, 0.75, 0.9];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    Playing,
    Won,
    TimedOut,
}

#[derive(Clone, Copy, Debug)]
pub struct PlayerToken {
    pub row: usize,
    pub col: usize,
    pub facing: Dir,
    pub speed_multiplier: u32,
}

/// Session parameters the mode layer sets before the next `generate`.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub grid_size: usize,
    pub max_score: u32,
    pub time_limit: u32,
    pub level: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_size: 15,
            max_score: 1000,
            time_limit: 120,
            level: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WinReport {
    pub score: u32,
    pub stars: u8,
    pub level: Option<u32>,
    pub coins_left: usize,
    pub backtracked: bool,
    pub time_left: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    NotPlaying,
    Wall,
    OutOfBounds,
    Hazard,
}

#[derive(Clone, Debug)]
pub enum MoveOutcome {
    Rejected(RejectReason),
    Moved {
        collected_coin: bool,
        collected_power_up: bool,
        won: Option<WinReport>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    SpeedBoostEnded,
    TimeExpired,
    AdvanceLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeferredKind {
    RevertSpeed,
    AdvanceLevel,
}

/// Fire-once task on the 100 ms clock. `generation` pins it to the maze it
/// was scheduled for; a stale task is dropped instead of fired.
#[derive(Clone, Copy, Debug)]
struct Deferred {
    generation: u64,
    remaining_ms: u32,
    kind: DeferredKind,
}

pub struct Game {
    config: SessionConfig,
    maze: Option<Maze>,
    coins: Vec<Coin>,
    power_ups: Vec<PowerUp>,
    moving_walls: Vec<MovingWall>,
    player: PlayerToken,
    phase: Phase,
    score: u32,
    time_left: u32,
    generation: u64,
    deferred: Vec<Deferred>,
    entered: Vec<bool>,
    backtracked: bool,
    on_level_complete: Option<Box<dyn FnMut(&WinReport)>>,
}

impl Game {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            maze: None,
            coins: Vec::new(),
            power_ups: Vec::new(),
            moving_walls: Vec::new(),
            player: PlayerToken {
                row: 0,
                col: 0,
                facing: Dir::Right,
                speed_multiplier: 1,
            },
            phase: Phase::Idle,
            score: 0,
            time_left: 0,
            generation: 0,
            deferred: Vec::new(),
            entered: Vec::new(),
            backtracked: false,
            on_level_complete: None,
        }
    }

    /// Reconfigure the next session. Takes effect on the next `generate`.
    pub fn configure(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_on_level_complete(&mut self, hook: Box<dyn FnMut(&WinReport)>) {
        self.on_level_complete = Some(hook);
    }

    /// Discard the previous maze and session state, carve a fresh one, and
    /// start playing. Pending deferred tasks from the old session are
    /// cancelled here; nothing scheduled before this call may mutate the new
    /// maze.
    pub fn generate(&mut self, seed: Option<u32>) {
        self.phase = Phase::Generating;
        self.generation += 1;
        self.deferred.clear();

        let mut random = RandomSource::from_seed(seed);
        let maze = Maze::generate(self.config.grid_size, &mut random);
        let size = maze.size();
        self.coins = scatter_coins(&maze, &mut random);
        self.power_ups = place_power_up(size, &mut random).into_iter().collect();
        self.moving_walls = place_moving_walls(size, &mut random);

        self.player = PlayerToken {
            row: 0,
            col: 0,
            facing: Dir::Right,
            speed_multiplier: 1,
        };
        self.score = 0;
        self.time_left = self.config.time_limit;
        self.entered = vec![false; size * size];
        self.entered[0] = true;
        self.backtracked = false;
        self.maze = Some(maze);
        self.phase = Phase::Playing;
        debug!(
            "generated maze: size={} seed={:?} coins={} hazards={}",
            size,
            seed,
            self.coins.len(),
            self.moving_walls.len()
        );
    }

    /// Validate and apply one move request. Invalid requests leave every
    /// piece of state untouched.
    pub fn attempt_move(&mut self, dir: Dir) -> MoveOutcome {
        if self.phase != Phase::Playing {
            return MoveOutcome::Rejected(RejectReason::NotPlaying);
        }
        let Some(maze) = self.maze.as_ref() else {
            return MoveOutcome::Rejected(RejectReason::NotPlaying);
        };

        let (row, col) = (self.player.row, self.player.col);
        if maze.cell(row, col).walls.has(dir) {
            return MoveOutcome::Rejected(RejectReason::Wall);
        }
        let Some((nrow, ncol)) = maze.neighbor(row, col, dir) else {
            return MoveOutcome::Rejected(RejectReason::OutOfBounds);
        };
        if self.moving_walls.iter().any(|w| w.occupies(nrow, ncol)) {
            return MoveOutcome::Rejected(RejectReason::Hazard);
        }

        self.player.row = nrow;
        self.player.col = ncol;
        self.player.facing = dir;

        let idx = nrow * maze.size() + ncol;
        if self.entered[idx] {
            self.backtracked = true;
        } else {
            self.entered[idx] = true;
        }

        let mut collected_coin = false;
        if let Some(pos) = self
            .coins
            .iter()
            .position(|c| c.row == nrow && c.col == ncol)
        {
            self.coins.remove(pos);
            self.score += COIN_SCORE;
            collected_coin = true;
        }

        let mut collected_power_up = false;
        if let Some(pos) = self
            .power_ups
            .iter()
            .position(|p| p.row == nrow && p.col == ncol)
        {
            let power_up = self.power_ups.remove(pos);
            match power_up.kind {
                PowerUpKind::Speed => {
                    self.player.speed_multiplier = 2;
                    self.schedule(DeferredKind::RevertSpeed, SPEED_BOOST_MS);
                }
            }
            collected_power_up = true;
        }

        let won = if self.maze.as_ref().map(|m| m.cell(nrow, ncol).is_end) == Some(true) {
            Some(self.finish())
        } else {
            None
        };

        MoveOutcome::Moved {
            collected_coin,
            collected_power_up,
            won,
        }
    }

    fn finish(&mut self) -> WinReport {
        let time_bonus = if self.config.time_limit > 0 {
            ((self.time_left as f64 / self.config.time_limit as f64) * TIME_BONUS_MAX) as u32
        } else {
            0
        };
        let level_bonus = self.config.level.unwrap_or(0) * LEVEL_BONUS_STEP;
        self.score += time_bonus + level_bonus;
        self.phase = Phase::Won;

        let report = WinReport {
            score: self.score,
            stars: self.stars(),
            level: self.config.level,
            coins_left: self.coins.len(),
            backtracked: self.backtracked,
            time_left: self.time_left,
        };
        info!(
            "maze solved: score={} stars={} level={:?}",
            report.score, report.stars, report.level
        );
        if let Some(hook) = self.on_level_complete.as_mut() {
            hook(&report);
        }
        report
    }

    /// One-second countdown tick. Only `Playing` sessions age.
    pub fn tick_second(&mut self) -> Option<GameEvent> {
        if self.phase != Phase::Playing {
            return None;
        }
        if self.time_left > 0 {
            self.time_left -= 1;
        }
        if self.time_left == 0 {
            self.phase = Phase::TimedOut;
            info!("time expired with score={}", self.score);
            return Some(GameEvent::TimeExpired);
        }
        None
    }

    /// 100 ms tick: hazards sweep while a maze is live, and the deferred
    /// clock advances. Hazards never pause for `Won`/`TimedOut`; move
    /// acceptance and the countdown already stopped.
    pub fn tick_hazards(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if let Some(maze) = self.maze.as_ref() {
            let size = maze.size();
            for wall in &mut self.moving_walls {
                wall.advance(size);
            }
        }

        let generation = self.generation;
        let mut fired = Vec::new();
        for task in &mut self.deferred {
            task.remaining_ms = task.remaining_ms.saturating_sub(HAZARD_TICK_MS);
            if task.remaining_ms == 0 && task.generation == generation {
                fired.push(task.kind);
            }
        }
        self.deferred.retain(|t| t.remaining_ms > 0);

        for kind in fired {
            match kind {
                DeferredKind::RevertSpeed => {
                    self.player.speed_multiplier = 1;
                    events.push(GameEvent::SpeedBoostEnded);
                }
                DeferredKind::AdvanceLevel => events.push(GameEvent::AdvanceLevel),
            }
        }
        events
    }

    /// Ask for an `AdvanceLevel` event once the win pause has elapsed.
    /// Regenerating first cancels it.
    pub fn schedule_level_advance(&mut self) {
        self.schedule(DeferredKind::AdvanceLevel, LEVEL_ADVANCE_MS);
    }

    fn schedule(&mut self, kind: DeferredKind, delay_ms: u32) {
        // Only one task of a kind runs at a time; a fresh pickup restarts
        // the clock.
        self.deferred.retain(|t| t.kind != kind);
        self.deferred.push(Deferred {
            generation: self.generation,
            remaining_ms: delay_ms,
            kind,
        });
    }

    /// Number of stars the current score has earned against `max_score`.
    pub fn stars(&self) -> u8 {
        if self.config.max_score == 0 {
            return 0;
        }
        let ratio = self.score as f64 / self.config.max_score as f64;
        STAR_THRESHOLDS.iter().filter(|&&t| ratio >= t).count() as u8
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn maze(&self) -> Option<&Maze> {
        self.maze.as_ref()
    }

    pub fn player(&self) -> &PlayerToken {
        &self.player
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    pub fn moving_walls(&self) -> &[MovingWall] {
        &self.moving_walls
    }

    pub(crate) fn install_board(
        &mut self,
        maze: Maze,
        coins: Vec<Coin>,
        power_ups: Vec<PowerUp>,
    ) {
        self.phase = Phase::Generating;
        self.generation += 1;
        self.deferred.clear();

        let size = maze.size();
        let (row, col) = maze.start();
        self.config.grid_size = size;
        self.coins = coins;
        self.power_ups = power_ups;
        self.moving_walls = Vec::new();
        self.player = PlayerToken {
            row,
            col,
            facing: Dir::Right,
            speed_multiplier: 1,
        };
        self.score = 0;
        self.time_left = self.config.time_limit;
        self.entered = vec![false; size * size];
        self.entered[row * size + col] = true;
        self.backtracked = false;
        self.maze = Some(maze);
        self.phase = Phase::Playing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as StdCell;
    use std::rc::Rc;

    fn playing_game(grid_size: usize, seed: u32) -> Game {
        let mut game = Game::new(SessionConfig {
            grid_size,
            ..SessionConfig::default()
        });
        game.generate(Some(seed));
        game
    }

    fn first_open_dir(game: &Game) -> Dir {
        let maze = game.maze().expect("maze exists");
        let (row, col) = (game.player().row, game.player().col);
        crate::maze::DIRS
            .into_iter()
            .find(|&d| !maze.cell(row, col).walls.has(d))
            .expect("start cell has an opening")
    }

    #[test]
    fn moves_rejected_outside_playing() {
        let mut game = Game::new(SessionConfig::default());
        assert!(matches!(
            game.attempt_move(Dir::Right),
            MoveOutcome::Rejected(RejectReason::NotPlaying)
        ));
    }

    #[test]
    fn wall_blocks_leave_state_untouched() {
        let mut game = playing_game(15, 42);
        let maze = game.maze().expect("maze exists");
        let blocked = crate::maze::DIRS
            .into_iter()
            .find(|&d| maze.cell(0, 0).walls.has(d))
            .expect("corner cell has at least two walls");
        let before = (game.player().row, game.player().col, game.score());
        let outcome = game.attempt_move(blocked);
        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(RejectReason::Wall)
        ));
        assert_eq!(
            (game.player().row, game.player().col, game.score()),
            before
        );
    }

    #[test]
    fn hazard_on_destination_blocks_the_move() {
        let mut game = playing_game(15, 42);
        let dir = first_open_dir(&game);
        let (nrow, ncol) = game
            .maze()
            .expect("maze exists")
            .neighbor(0, 0, dir)
            .expect("open dir stays on the grid");
        game.moving_walls = vec![MovingWall {
            row: nrow,
            col: ncol,
            direction: 1,
            length: 1,
            is_vertical: false,
        }];
        assert!(matches!(
            game.attempt_move(dir),
            MoveOutcome::Rejected(RejectReason::Hazard)
        ));
        assert_eq!((game.player().row, game.player().col), (0, 0));
    }

    #[test]
    fn coin_pickup_scores_and_shrinks_the_set() {
        let mut game = playing_game(15, 42);
        let dir = first_open_dir(&game);
        let (nrow, ncol) = game
            .maze()
            .expect("maze exists")
            .neighbor(0, 0, dir)
            .expect("open dir stays on the grid");
        game.coins = vec![Coin {
            row: nrow,
            col: ncol,
        }];
        game.moving_walls.clear();
        let outcome = game.attempt_move(dir);
        match outcome {
            MoveOutcome::Moved {
                collected_coin, ..
            } => assert!(collected_coin),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(game.score(), COIN_SCORE);
        assert!(game.coins().is_empty());
        assert_eq!(game.player().facing, dir);
    }

    #[test]
    fn speed_boost_reverts_after_fifty_ticks() {
        let mut game = playing_game(15, 42);
        let dir = first_open_dir(&game);
        let (nrow, ncol) = game
            .maze()
            .expect("maze exists")
            .neighbor(0, 0, dir)
            .expect("open dir stays on the grid");
        game.power_ups = vec![PowerUp {
            row: nrow,
            col: ncol,
            kind: PowerUpKind::Speed,
        }];
        game.moving_walls.clear();
        game.attempt_move(dir);
        assert_eq!(game.player().speed_multiplier, 2);

        for _ in 0..49 {
            assert!(game.tick_hazards().is_empty());
            assert_eq!(game.player().speed_multiplier, 2);
        }
        let events = game.tick_hazards();
        assert_eq!(events, vec![GameEvent::SpeedBoostEnded]);
        assert_eq!(game.player().speed_multiplier, 1);
    }

    #[test]
    fn regenerate_cancels_pending_boost_revert() {
        let mut game = playing_game(15, 42);
        let dir = first_open_dir(&game);
        let (nrow, ncol) = game
            .maze()
            .expect("maze exists")
            .neighbor(0, 0, dir)
            .expect("open dir stays on the grid");
        game.power_ups = vec![PowerUp {
            row: nrow,
            col: ncol,
            kind: PowerUpKind::Speed,
        }];
        game.moving_walls.clear();
        game.attempt_move(dir);
        game.generate(Some(7));
        // The old revert must not fire into the new session.
        for _ in 0..60 {
            assert!(game.tick_hazards().is_empty());
        }
        assert_eq!(game.player().speed_multiplier, 1);
    }

    #[test]
    fn countdown_times_out_and_blocks_moves() {
        let mut game = Game::new(SessionConfig {
            time_limit: 2,
            ..SessionConfig::default()
        });
        game.generate(Some(42));
        assert_eq!(game.tick_second(), None);
        assert_eq!(game.tick_second(), Some(GameEvent::TimeExpired));
        assert_eq!(game.phase(), Phase::TimedOut);
        assert!(matches!(
            game.attempt_move(first_open_dir(&game)),
            MoveOutcome::Rejected(RejectReason::NotPlaying)
        ));
        // Recoverable: a fresh generate plays again.
        game.generate(Some(43));
        assert_eq!(game.phase(), Phase::Playing);
    }

    /// Depth-first walk over the open passages until the end cell; a
    /// perfect maze always gets there.
    fn walk_to_end(game: &mut Game) -> WinReport {
        let mut trail: Vec<Dir> = Vec::new();
        loop {
            let choice = {
                let maze = game.maze().expect("maze exists");
                let (row, col) = (game.player().row, game.player().col);
                let back = trail.last().map(|d| d.opposite());
                crate::maze::DIRS.into_iter().find(|&dir| {
                    Some(dir) != back
                        && !maze.cell(row, col).walls.has(dir)
                        && maze
                            .neighbor(row, col, dir)
                            .map(|(nr, nc)| !game.entered[nr * maze.size() + nc])
                            .unwrap_or(false)
                })
            };
            match choice {
                Some(dir) => match game.attempt_move(dir) {
                    MoveOutcome::Moved { won: Some(report), .. } => return report,
                    MoveOutcome::Moved { .. } => trail.push(dir),
                    MoveOutcome::Rejected(reason) => panic!("unexpected rejection: {reason:?}"),
                },
                None => {
                    let dir = trail.pop().expect("connected maze cannot strand the walk");
                    game.attempt_move(dir.opposite());
                }
            }
        }
    }

    #[test]
    fn walking_the_maze_to_the_end_wins() {
        let mut game = playing_game(5, 7);
        game.moving_walls.clear();
        game.coins.clear();
        let fired = Rc::new(StdCell::new(0u32));
        let fired_hook = Rc::clone(&fired);
        game.set_on_level_complete(Box::new(move |_| {
            fired_hook.set(fired_hook.get() + 1);
        }));

        let report = walk_to_end(&mut game);
        assert_eq!(game.phase(), Phase::Won);
        assert_eq!(fired.get(), 1);
        assert!(report.score >= report.level.unwrap_or(0) * LEVEL_BONUS_STEP);
        assert_eq!(report.score, game.score());
        // Timer is stopped: further seconds change nothing.
        let left = game.time_left();
        assert_eq!(game.tick_second(), None);
        assert_eq!(game.time_left(), left);
    }

    #[test]
    fn win_score_includes_time_and_level_bonuses() {
        let mut game = Game::new(SessionConfig {
            grid_size: 5,
            time_limit: 100,
            level: Some(3),
            ..SessionConfig::default()
        });
        game.generate(Some(1));
        game.moving_walls.clear();
        game.coins.clear();
        let report = walk_to_end(&mut game);
        // No seconds elapsed, so the time bonus is whole.
        assert_eq!(
            report.score,
            TIME_BONUS_MAX as u32 + 3 * LEVEL_BONUS_STEP
        );
    }

    #[test]
    fn stars_follow_the_thresholds() {
        let mut game = Game::new(SessionConfig {
            max_score: 1000,
            ..SessionConfig::default()
        });
        game.score = 499;
        assert_eq!(game.stars(), 0);
        game.score = 500;
        assert_eq!(game.stars(), 1);
        game.score = 750;
        assert_eq!(game.stars(), 2);
        game.score = 900;
        assert_eq!(game.stars(), 3);
    }
}
