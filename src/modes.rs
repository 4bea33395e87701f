//! Mode configuration: difficulty tables, story progression, and tutorial
//! scripting, composed with the core `Game` rather than layered over it.

use crate::game::{Game, SessionConfig, WinReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn grid_size(self) -> usize {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }

    pub fn max_score(self) -> u32 {
        match self {
            Difficulty::Easy => 500,
            Difficulty::Medium => 1000,
            Difficulty::Hard => 1500,
        }
    }

    /// Countdown in seconds.
    pub fn time_limit(self) -> u32 {
        match self {
            Difficulty::Easy => 180,
            Difficulty::Medium => 120,
            Difficulty::Hard => 60,
        }
    }

    pub fn compliment(self) -> &'static str {
        match self {
            Difficulty::Easy => "Nice job! Try a harder difficulty!",
            Difficulty::Medium => "Great work! You're getting good!",
            Difficulty::Hard => "Amazing! You're a maze master!",
        }
    }

    pub fn session_config(self) -> SessionConfig {
        SessionConfig {
            grid_size: self.grid_size(),
            max_score: self.max_score(),
            time_limit: self.time_limit(),
            level: None,
        }
    }
}

pub const TOTAL_LEVELS: u32 = 25;

/// Story-mode level progression. Levels ramp the grid up and the clock down;
/// each level seeds its own maze so replays see the same layout.
#[derive(Clone, Copy, Debug)]
pub struct StoryProgression {
    pub current_level: u32,
}

impl StoryProgression {
    pub fn new() -> Self {
        Self { current_level: 1 }
    }

    pub fn grid_size_for(level: u32) -> usize {
        let level = level as usize;
        if level <= 10 {
            10 + level / 3
        } else if level <= 20 {
            15 + (level - 10) / 2
        } else {
            20 + (level - 20)
        }
    }

    pub fn time_limit_for(level: u32) -> u32 {
        180u32.saturating_sub(level * 5)
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            grid_size: Self::grid_size_for(self.current_level),
            max_score: 1000,
            time_limit: Self::time_limit_for(self.current_level),
            level: Some(self.current_level),
        }
    }

    pub fn seed(&self) -> u32 {
        self.current_level
    }

    pub fn progress_percent(&self) -> u32 {
        self.current_level * 100 / TOTAL_LEVELS
    }

    pub fn is_last_level(&self) -> bool {
        self.current_level >= TOTAL_LEVELS
    }

    /// Step to the next level. Returns false on the last one.
    pub fn advance(&mut self) -> bool {
        if self.is_last_level() {
            return false;
        }
        self.current_level += 1;
        true
    }

    /// Achievement ids earned by finishing the current level with `report`.
    pub fn achievements_for(&self, report: &WinReport) -> Vec<String> {
        let mut ids = vec![format!("level_{}", self.current_level)];
        if report.coins_left == 0 {
            ids.push("all_coins".to_string());
        }
        if !report.backtracked {
            ids.push("no_backtrack".to_string());
        }
        ids
    }
}

impl Default for StoryProgression {
    fn default() -> Self {
        Self::new()
    }
}

/// Staged tutorial hints, advanced by watching the live game after each
/// input.
#[derive(Clone, Copy, Debug)]
pub struct TutorialScript {
    step: usize,
}

impl TutorialScript {
    pub const WELCOME: &'static str =
        "Welcome to the tutorial! Use the W, A, S, D keys to move.";

    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Called after every key press; returns the next hint once its trigger
    /// condition holds.
    pub fn observe(&mut self, game: &Game) -> Option<&'static str> {
        match self.step {
            0 => {
                self.step = 1;
                Some("Great! Now, try to reach the end of the maze.")
            }
            1 if game.player().row > 5 => {
                self.step = 2;
                Some("You can collect coins to increase your score.")
            }
            2 if game.coins().len() < 2 => {
                self.step = 3;
                Some("Power-ups like this one will give you a speed boost!")
            }
            _ => None,
        }
    }
}

impl Default for TutorialScript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_table_matches_the_design() {
        assert_eq!(Difficulty::Easy.grid_size(), 10);
        assert_eq!(Difficulty::Medium.grid_size(), 20);
        assert_eq!(Difficulty::Hard.grid_size(), 30);
        assert_eq!(Difficulty::Easy.time_limit(), 180);
        assert_eq!(Difficulty::Hard.max_score(), 1500);
        let config = Difficulty::Medium.session_config();
        assert_eq!(config.grid_size, 20);
        assert_eq!(config.max_score, 1000);
        assert_eq!(config.time_limit, 120);
        assert_eq!(config.level, None);
    }

    #[test]
    fn story_grid_sizes_ramp_up() {
        assert_eq!(StoryProgression::grid_size_for(1), 10);
        assert_eq!(StoryProgression::grid_size_for(9), 13);
        assert_eq!(StoryProgression::grid_size_for(11), 15);
        assert_eq!(StoryProgression::grid_size_for(20), 20);
        assert_eq!(StoryProgression::grid_size_for(25), 25);
    }

    #[test]
    fn story_clock_tightens_with_level() {
        assert_eq!(StoryProgression::time_limit_for(1), 175);
        assert_eq!(StoryProgression::time_limit_for(25), 55);
    }

    #[test]
    fn story_advance_stops_at_the_last_level() {
        let mut story = StoryProgression::new();
        for _ in 0..TOTAL_LEVELS {
            story.advance();
        }
        assert_eq!(story.current_level, TOTAL_LEVELS);
        assert!(!story.advance());
        assert_eq!(story.progress_percent(), 100);
    }

    #[test]
    fn story_awards_completion_badges() {
        let story = StoryProgression { current_level: 10 };
        let report = WinReport {
            score: 700,
            stars: 1,
            level: Some(10),
            coins_left: 0,
            backtracked: false,
            time_left: 40,
        };
        let ids = story.achievements_for(&report);
        assert!(ids.contains(&"level_10".to_string()));
        assert!(ids.contains(&"all_coins".to_string()));
        assert!(ids.contains(&"no_backtrack".to_string()));

        let messy = WinReport {
            coins_left: 3,
            backtracked: true,
            ..report
        };
        let ids = story.achievements_for(&messy);
        assert_eq!(ids, vec!["level_10".to_string()]);
    }

    #[test]
    fn tutorial_steps_fire_in_order() {
        let mut game = Game::new(StoryProgression::new().config());
        game.generate(Some(1));
        let mut script = TutorialScript::new();
        assert_eq!(
            script.observe(&game),
            Some("Great! Now, try to reach the end of the maze.")
        );
        // Player is still near the top; the next hint waits.
        assert_eq!(script.observe(&game), None);
    }
}
