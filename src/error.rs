use crate::models::game::GamePhase;

/// Rejection reasons surfaced to players. Every variant leaves the game
/// state untouched.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GameError {
    #[error("no game is running in this chat")]
    GameNotFound,
    #[error("a game is already running in this chat")]
    GameInProgress,
    #[error("the game is full, please wait for the next one")]
    LobbyFull,
    #[error("you already joined this game")]
    AlreadyJoined,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("player not found in this game")]
    PlayerNotFound,
    #[error("target not found in this game")]
    TargetNotFound,
    #[error("dead players cannot act")]
    ActorDead,
    #[error("that player is no longer alive")]
    TargetDead,
    #[error("that action is not allowed during the {0} phase")]
    WrongPhase(GamePhase),
    #[error("your role cannot perform this action")]
    RoleNotAllowed,
    #[error("you already used your ability tonight")]
    AbilityAlreadyUsed,
    #[error("you can only protect yourself once per game")]
    SelfHealUsed,
    #[error("the sniper cannot shoot on the first night")]
    SniperFirstNight,
    #[error("you cannot target yourself")]
    SelfTarget,
    #[error("the defendant cannot vote in their own trial")]
    DefendantCannotVote,
    #[error("only the defendant may speak right now")]
    NotDefendant,
}
