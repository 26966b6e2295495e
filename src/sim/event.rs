/// Events emitted by a state transition.
/// The presentation layer consumes these for banners and sound.

use crate::domain::entity::Position;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PlayerMoved { to: Position },
    LevelComplete { level: usize },
    LevelStarted { level: usize },
    GameComplete,
}
