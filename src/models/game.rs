use std::collections::HashMap;
use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;

use super::action::NightActionKind;
use super::config::GameConfig;
use super::player::{Player, PlayerId};
use super::role::{Role, Team};

/// Identity of the origin chat/group a game belongs to.
pub type ChatId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Lobby,
    Introduction,
    Night,
    Day,
    Voting,
    Defense,
    FinalVote,
    Ended,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Introduction => "introduction",
            GamePhase::Night => "night",
            GamePhase::Day => "day",
            GamePhase::Voting => "voting",
            GamePhase::Defense => "defense",
            GamePhase::FinalVote => "final vote",
            GamePhase::Ended => "ended",
        };
        write!(f, "{}", name)
    }
}

/// One night-ability submission. At most one per ability kind per night.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub actor: PlayerId,
    pub target: PlayerId,
}

/// Collected submissions for the current night, keyed by ability rather
/// than by submission order so resolution order is fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NightActions {
    pub save: Option<Submission>,
    pub kill: Option<Submission>,
    pub shot: Option<Submission>,
    pub investigation: Option<Submission>,
    pub track: Option<Submission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathNotice {
    pub player: PlayerId,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationResult {
    pub detective: PlayerId,
    pub target: PlayerId,
    pub target_name: String,
    pub team: Team,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResult {
    pub tracker: PlayerId,
    pub target: PlayerId,
    pub target_name: String,
    pub visited_name: Option<String>,
}

/// Everything the phase controller needs to announce a dawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightResolution {
    pub deaths: Vec<DeathNotice>,
    pub save: Option<Submission>,
    pub kill_attempt: Option<Submission>,
    pub investigation: Option<InvestigationResult>,
    pub track: Option<TrackResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictOutcome {
    pub defendant: PlayerId,
    pub defendant_name: String,
    pub defendant_role: Role,
    pub guilty: usize,
    pub innocent: usize,
    pub eliminated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub chat_id: ChatId,
    pub game_id: Uuid,
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub phase: GamePhase,
    pub day_count: u32,
    pub night_count: u32,
    pub defendant: Option<PlayerId>,
    /// voter -> target for the current voting round.
    pub votes: HashMap<PlayerId, PlayerId>,
    /// voter -> guilty for the current trial.
    pub defense_votes: HashMap<PlayerId, bool>,
    pub night_actions: NightActions,
    pub winner: Option<Team>,
    /// Bumped on every phase transition. A timer that wakes up with a
    /// stale epoch must do nothing.
    pub epoch: u64,
}

impl Game {
    pub fn new(chat_id: ChatId, config: GameConfig) -> Self {
        Game {
            chat_id,
            game_id: Uuid::new_v4(),
            players: Vec::new(),
            config,
            phase: GamePhase::Lobby,
            day_count: 0,
            night_count: 0,
            defendant: None,
            votes: HashMap::new(),
            defense_votes: HashMap::new(),
            night_actions: NightActions::default(),
            winner: None,
            epoch: 0,
        }
    }

    // ----- roster ---------------------------------------------------------

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.capacity
    }

    pub fn is_started(&self) -> bool {
        self.phase != GamePhase::Lobby
    }

    pub fn join(&mut self, id: PlayerId, name: String) -> Result<(), GameError> {
        if self.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        if self.is_full() {
            return Err(GameError::LobbyFull);
        }
        if self.players.iter().any(|p| p.id == id) {
            return Err(GameError::AlreadyJoined);
        }
        self.players.push(Player::new(id, name));
        Ok(())
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive)
    }

    fn alive_count(&self, team: Team) -> usize {
        self.alive_players().filter(|p| p.team() == team).count()
    }

    /// Alive player currently holding the mafia kill: the Godfather, or
    /// the Minion once the Godfather is dead. Plain Mafia never act.
    pub fn kill_actor(&self) -> Option<&Player> {
        let godfather = self
            .players
            .iter()
            .find(|p| p.role == Role::Godfather && p.is_alive);
        godfather.or_else(|| {
            self.players
                .iter()
                .find(|p| p.role == Role::Minion && p.is_alive)
        })
    }

    // ----- role assignment ------------------------------------------------

    /// Deck of size `capacity`: mafia side first (Godfather, Minion, then
    /// plain Mafia up to `mafia_count`), citizen specials in fixed
    /// priority, Citizens filling the rest.
    pub fn build_deck(config: &GameConfig) -> Vec<Role> {
        let mut deck = Vec::with_capacity(config.capacity);
        let mafia_count = config.mafia_count.min(config.capacity);
        for i in 0..mafia_count {
            deck.push(match i {
                0 => Role::Godfather,
                1 => Role::Minion,
                _ => Role::Mafia,
            });
        }
        let specials = [Role::Doctor, Role::Detective, Role::Sniper, Role::Tracker];
        let mut remaining = config.capacity - mafia_count;
        for role in specials {
            if remaining == 0 {
                break;
            }
            deck.push(role);
            remaining -= 1;
        }
        deck.extend(std::iter::repeat(Role::Citizen).take(remaining));
        deck
    }

    pub fn assign_roles(&mut self) {
        self.assign_roles_with(&mut rand::thread_rng());
    }

    pub fn assign_roles_with<R: rand::Rng>(&mut self, rng: &mut R) {
        let mut deck = Self::build_deck(&self.config);
        deck.shuffle(rng);
        for (player, role) in self.players.iter_mut().zip(deck) {
            player.role = role;
        }
    }

    // ----- night actions --------------------------------------------------

    pub fn submit_night_action(
        &mut self,
        actor_id: PlayerId,
        kind: NightActionKind,
        target_id: PlayerId,
    ) -> Result<(), GameError> {
        if self.phase != GamePhase::Night {
            return Err(GameError::WrongPhase(self.phase));
        }
        let actor = self.player(actor_id).ok_or(GameError::PlayerNotFound)?;
        if !actor.is_alive {
            return Err(GameError::ActorDead);
        }
        if actor.ability_used_this_round {
            return Err(GameError::AbilityAlreadyUsed);
        }
        let target = self.player(target_id).ok_or(GameError::TargetNotFound)?;
        if !target.is_alive {
            return Err(GameError::TargetDead);
        }

        match kind {
            NightActionKind::Kill => {
                let allowed = self.kill_actor().map(|p| p.id) == Some(actor_id);
                if !allowed {
                    return Err(GameError::RoleNotAllowed);
                }
                if target_id == actor_id {
                    return Err(GameError::SelfTarget);
                }
            }
            NightActionKind::Save => {
                if actor.role != Role::Doctor {
                    return Err(GameError::RoleNotAllowed);
                }
                if target_id == actor_id && actor.self_heal_used {
                    return Err(GameError::SelfHealUsed);
                }
            }
            NightActionKind::Shoot => {
                if actor.role != Role::Sniper {
                    return Err(GameError::RoleNotAllowed);
                }
                if self.night_count <= 1 {
                    return Err(GameError::SniperFirstNight);
                }
                if target_id == actor_id {
                    return Err(GameError::SelfTarget);
                }
            }
            NightActionKind::Investigate => {
                if actor.role != Role::Detective {
                    return Err(GameError::RoleNotAllowed);
                }
                if target_id == actor_id {
                    return Err(GameError::SelfTarget);
                }
            }
            NightActionKind::Track => {
                if actor.role != Role::Tracker {
                    return Err(GameError::RoleNotAllowed);
                }
                if target_id == actor_id {
                    return Err(GameError::SelfTarget);
                }
            }
        }

        let submission = Submission {
            actor: actor_id,
            target: target_id,
        };
        let slot = match kind {
            NightActionKind::Kill => &mut self.night_actions.kill,
            NightActionKind::Save => &mut self.night_actions.save,
            NightActionKind::Shoot => &mut self.night_actions.shot,
            NightActionKind::Investigate => &mut self.night_actions.investigation,
            NightActionKind::Track => &mut self.night_actions.track,
        };
        *slot = Some(submission);

        let actor = self
            .player_mut(actor_id)
            .ok_or(GameError::PlayerNotFound)?;
        actor.ability_used_this_round = true;
        actor.pending_night_target = Some(target_id);
        if kind == NightActionKind::Save && target_id == actor_id {
            actor.self_heal_used = true;
        }
        Ok(())
    }

    /// Resolves the collected night actions in fixed order: save, kill,
    /// sniper shot, investigation, track. Deaths are applied
    /// simultaneously at the end; night-scoped player state is cleared.
    pub fn resolve_night(&mut self) -> NightResolution {
        let actions = std::mem::take(&mut self.night_actions);
        let mut marked: Vec<PlayerId> = Vec::new();

        // 1. Doctor
        let saved = actions.save.map(|s| s.target);

        // 2. Mafia kill, blocked silently when the doctor guessed right.
        if let Some(kill) = actions.kill {
            if saved != Some(kill.target) {
                marked.push(kill.target);
            }
        }

        // 3. Sniper
        if let Some(shot) = actions.shot {
            let hit_leader = self
                .player(shot.target)
                .map(|t| t.is_alive && t.role == Role::Godfather)
                .unwrap_or(false);
            if hit_leader {
                marked.push(shot.target);
            } else if let Some(sniper) = self.player_mut(shot.actor) {
                sniper.wrong_shot_count += 1;
                if sniper.wrong_shot_count >= 2 {
                    marked.push(shot.actor);
                }
            }
        }

        // 4. Detective
        let investigation = actions.investigation.and_then(|s| {
            self.player(s.target).map(|t| InvestigationResult {
                detective: s.actor,
                target: s.target,
                target_name: t.name.clone(),
                team: t.team(),
            })
        });

        // 5. Tracker, reading last night's targets before they are updated.
        let track = actions.track.and_then(|s| {
            self.player(s.target).map(|t| TrackResult {
                tracker: s.actor,
                target: s.target,
                target_name: t.name.clone(),
                visited_name: t
                    .last_night_target
                    .and_then(|id| self.player(id))
                    .map(|p| p.name.clone()),
            })
        });

        // Tonight's submissions become visible to next night's tracker;
        // an idle night clears the trail.
        for player in &mut self.players {
            player.last_night_target = player.pending_night_target;
        }

        marked.sort_unstable();
        marked.dedup();
        let mut deaths = Vec::new();
        for id in marked {
            if let Some(player) = self.player_mut(id) {
                if player.is_alive {
                    player.kill();
                    deaths.push(DeathNotice {
                        player: player.id,
                        name: player.name.clone(),
                        role: player.role,
                    });
                }
            }
        }

        for player in &mut self.players {
            player.reset_night_state();
        }

        NightResolution {
            deaths,
            save: actions.save,
            kill_attempt: actions.kill,
            investigation,
            track,
        }
    }

    // ----- voting ---------------------------------------------------------

    pub fn cast_vote(&mut self, voter_id: PlayerId, target_id: PlayerId) -> Result<(), GameError> {
        if self.phase != GamePhase::Voting {
            return Err(GameError::WrongPhase(self.phase));
        }
        let voter = self.player(voter_id).ok_or(GameError::PlayerNotFound)?;
        if !voter.is_alive {
            return Err(GameError::ActorDead);
        }
        if voter_id == target_id {
            return Err(GameError::SelfTarget);
        }
        let target = self.player(target_id).ok_or(GameError::TargetNotFound)?;
        if !target.is_alive {
            return Err(GameError::TargetDead);
        }

        // Re-voting is allowed and moves the tally.
        if let Some(previous) = self.votes.insert(voter_id, target_id) {
            if let Some(old_target) = self.player_mut(previous) {
                old_target.vote_count = old_target.vote_count.saturating_sub(1);
            }
        }
        if let Some(target) = self.player_mut(target_id) {
            target.vote_count += 1;
        }
        if let Some(voter) = self.player_mut(voter_id) {
            voter.has_voted = true;
        }
        Ok(())
    }

    /// The nominee, if any: unique strict maximum vote count of at least 2.
    pub fn nominee(&self) -> Option<PlayerId> {
        let top = self.alive_players().map(|p| p.vote_count).max()?;
        if top < 2 {
            return None;
        }
        let mut leaders = self.alive_players().filter(|p| p.vote_count == top);
        let first = leaders.next()?;
        if leaders.next().is_some() {
            return None;
        }
        Some(first.id)
    }

    // ----- defense / final vote -------------------------------------------

    pub fn cast_verdict(&mut self, voter_id: PlayerId, guilty: bool) -> Result<(), GameError> {
        if self.phase != GamePhase::FinalVote {
            return Err(GameError::WrongPhase(self.phase));
        }
        let voter = self.player(voter_id).ok_or(GameError::PlayerNotFound)?;
        if !voter.is_alive {
            return Err(GameError::ActorDead);
        }
        if self.defendant == Some(voter_id) {
            return Err(GameError::DefendantCannotVote);
        }
        // Re-casting overwrites the previous ballot.
        self.defense_votes.insert(voter_id, guilty);
        Ok(())
    }

    /// Tallies the trial. Guilty eliminates only with a strict majority
    /// of at least two guilty ballots; anything else acquits.
    pub fn resolve_verdict(&mut self) -> Option<VerdictOutcome> {
        let defendant_id = self.defendant?;
        let guilty = self.defense_votes.values().filter(|&&g| g).count();
        let innocent = self.defense_votes.len() - guilty;
        let eliminated = guilty > innocent && guilty >= 2;

        let defendant = self.player_mut(defendant_id)?;
        let outcome = VerdictOutcome {
            defendant: defendant.id,
            defendant_name: defendant.name.clone(),
            defendant_role: defendant.role,
            guilty,
            innocent,
            eliminated,
        };
        if eliminated {
            defendant.kill();
        }
        Some(outcome)
    }

    /// Clears all round-scoped vote state before the next night.
    pub fn clear_round_state(&mut self) {
        self.votes.clear();
        self.defense_votes.clear();
        self.defendant = None;
        for player in &mut self.players {
            player.reset_vote_state();
        }
    }

    // ----- win condition --------------------------------------------------

    /// Citizens win once no mafia is left; mafia wins on reaching parity.
    /// Pure read, safe to call repeatedly.
    pub fn check_winner(&self) -> Option<Team> {
        let mafia = self.alive_count(Team::Mafia);
        let citizens = self.alive_count(Team::Citizen);
        if mafia == 0 {
            Some(Team::Citizen)
        } else if mafia >= citizens {
            Some(Team::Mafia)
        } else {
            None
        }
    }

    // ----- presentation ---------------------------------------------------

    /// Alive/dead roster shown at the start of each day.
    pub fn status_text(&self) -> String {
        let mut status = format!("Day {}\n\nAlive:\n", self.day_count);
        for (i, player) in self.alive_players().enumerate() {
            status.push_str(&format!("{}. {}\n", i + 1, player.name));
        }
        let dead: Vec<&Player> = self.players.iter().filter(|p| !p.is_alive).collect();
        if !dead.is_empty() {
            status.push_str("\nDead:\n");
            for (i, player) in dead.iter().enumerate() {
                status.push_str(&format!("{}. {}\n", i + 1, player.name));
            }
        }
        status
    }

    /// Lobby roster with the fill count, sent after every join.
    pub fn roster_text(&self) -> String {
        let mut text = format!(
            "Players ({}/{}):\n",
            self.players.len(),
            self.config.capacity
        );
        for (i, player) in self.players.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, player.name));
        }
        text
    }

    /// Full role reveal for the end-of-game announcement.
    pub fn role_reveal_text(&self) -> String {
        let mut text = String::from("Roles:\n");
        for player in &self.players {
            text.push_str(&format!(
                "{} {} - {}\n",
                player.team().emoji(),
                player.name,
                player.role
            ));
        }
        text
    }
}
