//! Command vocabulary
//!
//! Chat text is folded to lower case and looked up in a fixed phrase table.
//! Matching is exact: no trimming, no whitespace collapsing, no partial hits.

use std::fmt;

/// One discrete vehicle maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveForward,
    MoveBackward,
    RotateClockwise,
    RotateCounterClockwise,
    Flip,
    FrontFlip,
    RightFlip,
    Hover,
}

/// Recognized chat phrases, already lower case
pub const PHRASES: &[(&str, Command)] = &[
    ("up", Command::MoveUp),
    ("down", Command::MoveDown),
    ("left", Command::MoveLeft),
    ("right", Command::MoveRight),
    ("forward", Command::MoveForward),
    ("backward", Command::MoveBackward),
    ("rotate", Command::RotateClockwise),
    ("rotate clockwise", Command::RotateClockwise),
    ("rotate cc", Command::RotateCounterClockwise),
    ("flip", Command::Flip),
    ("right flip", Command::RightFlip),
    ("front flip", Command::FrontFlip),
    ("halt", Command::Hover),
    ("hover", Command::Hover),
    ("steady", Command::Hover),
];

impl Command {
    /// Every command in the vocabulary
    pub const ALL: [Command; 12] = [
        Command::MoveUp,
        Command::MoveDown,
        Command::MoveLeft,
        Command::MoveRight,
        Command::MoveForward,
        Command::MoveBackward,
        Command::RotateClockwise,
        Command::RotateCounterClockwise,
        Command::Flip,
        Command::FrontFlip,
        Command::RightFlip,
        Command::Hover,
    ];

    /// Map a raw chat message to a command, if it is a known phrase
    pub fn from_phrase(text: &str) -> Option<Command> {
        let folded = text.to_lowercase();
        PHRASES
            .iter()
            .find(|(phrase, _)| *phrase == folded)
            .map(|(_, command)| *command)
    }

    /// Stable name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::MoveUp => "move_up",
            Command::MoveDown => "move_down",
            Command::MoveLeft => "move_left",
            Command::MoveRight => "move_right",
            Command::MoveForward => "move_forward",
            Command::MoveBackward => "move_backward",
            Command::RotateClockwise => "rotate_clockwise",
            Command::RotateCounterClockwise => "rotate_counter_clockwise",
            Command::Flip => "flip",
            Command::FrontFlip => "front_flip",
            Command::RightFlip => "right_flip",
            Command::Hover => "hover",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
