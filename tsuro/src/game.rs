use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::turn::{execute_initial_placement, execute_turn};
use crate::{
    deck, Action, ActionKind, BoardState, Color, IllegalMove, LobbyError, Placement, PlayerId,
    PlayerState, PlayerStatus, SubmitError, Tile, TileRef,
};

/// Rules that can be tweaked per game.
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    /// Hands are refilled to this size at the start of every turn.
    pub hand_size: usize,
    /// How many rejected submissions in a row are forgiven before a player
    /// is disqualified.
    pub max_retries: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: Color::ALL.len(),
            hand_size: 3,
            max_retries: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    WaitingForPlayers,
    /// Players place their first tile and avatar, in join order.
    InitialPlacement { next: usize },
    /// Round-robin over the active players; `active` is an index into the players.
    Turn { active: usize },
    GameOver,
}

/// Who has to act next, and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub player: PlayerId,
    pub kind: ActionKind,
}

/// The effects of an accepted action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    pub player: PlayerId,
    pub placement: Placement,
    pub game_over: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(TurnReport),
    /// The action was not applied. Unless the player was disqualified, they
    /// are prompted again.
    Rejected {
        reason: IllegalMove,
        disqualified: bool,
    },
}

/// The authoritative state of one game, from the lobby to the end.
///
/// This type performs no I/O; the server drives it by relaying actions.
#[derive(Clone, Debug)]
pub struct Game {
    config: GameConfig,
    phase: GamePhase,
    board: BoardState,
    /// In join order, including players that are out of the game.
    players: Vec<PlayerState>,
    draw_pile: Vec<Tile>,
    winners: Vec<PlayerId>,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            phase: GamePhase::WaitingForPlayers,
            board: BoardState::new(),
            players: Vec::new(),
            draw_pile: Vec::new(),
            winners: Vec::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players.min(Color::ALL.len())
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Empty until the game is over. Several players win if they were all
    /// eliminated by the same placement.
    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    /// The player's hand in wire format.
    pub fn hand_refs(&self, id: PlayerId) -> Vec<TileRef> {
        self.player(id)
            .map(|p| p.hand.iter().filter_map(Tile::to_ref).collect())
            .unwrap_or_default()
    }

    /// Adds a player to the lobby. Missing names and colors are filled in.
    pub fn join(&mut self, name: Option<String>, color: Option<Color>) -> Result<PlayerId, LobbyError> {
        if self.phase != GamePhase::WaitingForPlayers {
            return Err(LobbyError::AlreadyStarted);
        }
        if self.is_full() {
            return Err(LobbyError::PoolFull);
        }
        if let Some(name) = &name {
            if self.players.iter().any(|p| &p.name == name) {
                return Err(LobbyError::DuplicateIdentity { name: name.clone() });
            }
        }
        let color = match color {
            Some(color) if self.players.iter().any(|p| p.color == color) => {
                return Err(LobbyError::DuplicateColor)
            }
            Some(color) => color,
            None => Color::ALL
                .into_iter()
                .find(|&c| self.players.iter().all(|p| p.color != c))
                .ok_or(LobbyError::PoolFull)?,
        };
        let id = PlayerId(self.players.len() as u8);
        let name = name.unwrap_or_else(|| {
            (self.players.len()..)
                .map(|n| format!("player-{}", n))
                .find(|candidate| self.players.iter().all(|p| &p.name != candidate))
                .unwrap_or_default()
        });
        info!(%id, %name, ?color, "Player joined");
        self.players.push(PlayerState::new(id, name, color));
        Ok(id)
    }

    /// Shuffles the deck and deals the first hands.
    pub fn start<R: Rng>(&mut self, rng: &mut R) -> Result<(), LobbyError> {
        let mut draw_pile = deck().to_vec();
        draw_pile.shuffle(rng);
        self.start_with_draw_pile(draw_pile)
    }

    /// Like [`Self::start()`], but with a given draw pile. Tiles are drawn from the end.
    pub fn start_with_draw_pile(&mut self, draw_pile: Vec<Tile>) -> Result<(), LobbyError> {
        if self.phase != GamePhase::WaitingForPlayers {
            return Err(LobbyError::AlreadyStarted);
        }
        if self.players.len() < self.config.min_players {
            return Err(LobbyError::NotEnoughPlayers {
                joined: self.players.len(),
                required: self.config.min_players,
            });
        }
        self.draw_pile = draw_pile;
        for idx in 0..self.players.len() {
            self.refill_hand(idx);
        }
        info!(num_players = self.players.len(), "Game started");
        self.phase = GamePhase::InitialPlacement { next: 0 };
        self.check_game_over(&[]);
        Ok(())
    }

    /// Who has to act next, if anyone.
    pub fn prompt(&self) -> Option<Prompt> {
        let (idx, kind) = match self.phase {
            GamePhase::InitialPlacement { next } => (next, ActionKind::Initial),
            GamePhase::Turn { active } => (active, ActionKind::Intermediate),
            GamePhase::WaitingForPlayers | GamePhase::GameOver => return None,
        };
        Some(Prompt {
            player: self.players[idx].id,
            kind,
        })
    }

    /// Validates and applies an action by the prompted player.
    ///
    /// Submissions by anyone else are refused without consequences. Invalid
    /// actions by the prompted player leave the game untouched, but count
    /// towards disqualification.
    pub fn submit(&mut self, player: PlayerId, action: Action) -> Result<SubmitOutcome, SubmitError> {
        let prompt = self.prompt().ok_or(SubmitError::NotRunning)?;
        if prompt.player != player {
            return Err(SubmitError::OutOfTurn {
                expected: prompt.player,
                got: player,
            });
        }
        let idx = self.index_of(player).ok_or(SubmitError::NotRunning)?;
        let state = &mut self.players[idx];
        let result = match (prompt.kind, action) {
            (ActionKind::Initial, Action::Initial(placement)) => {
                execute_initial_placement(state, &mut self.board, placement)
            }
            (ActionKind::Intermediate, Action::Intermediate(placement)) => {
                execute_turn(state, &mut self.board, placement)
            }
            (expected, _) => Err(IllegalMove::WrongActionKind { expected }),
        };
        match result {
            Ok(placement) => {
                self.players[idx].strikes = 0;
                debug!(%player, ?placement, "Action accepted");
                for &eliminated in &placement.eliminated {
                    if let Some(i) = self.index_of(eliminated) {
                        self.players[i].status = PlayerStatus::Eliminated;
                        self.players[i].hand.clear();
                        info!(player = %eliminated, "Avatar left the board");
                    }
                }
                if !self.check_game_over(&placement.eliminated) {
                    self.advance();
                }
                Ok(SubmitOutcome::Accepted(TurnReport {
                    player,
                    placement,
                    game_over: self.is_over(),
                }))
            }
            Err(reason) => Ok(self.reject(player, reason)),
        }
    }

    /// Counts a failed submission (including timeouts) against the prompted
    /// player, disqualifying them once they run out of retries. Unknown
    /// players are not counted.
    pub fn reject(&mut self, player: PlayerId, reason: IllegalMove) -> SubmitOutcome {
        let Some(idx) = self.index_of(player) else {
            return SubmitOutcome::Rejected {
                reason,
                disqualified: false,
            };
        };
        self.players[idx].strikes += 1;
        let disqualified = self.players[idx].strikes > self.config.max_retries;
        debug!(%player, %reason, strikes = self.players[idx].strikes, "Action rejected");
        if disqualified {
            self.disqualify(player);
        }
        SubmitOutcome::Rejected {
            reason,
            disqualified,
        }
    }

    /// Removes a player from the game: their avatar leaves the board and their
    /// hand is discarded.
    pub fn disqualify(&mut self, player: PlayerId) {
        let Some(idx) = self.index_of(player) else {
            return;
        };
        if !self.players[idx].is_active() {
            return;
        }
        let was_prompted = self.prompt().map(|p| p.player) == Some(player);
        info!(%player, "Player disqualified");
        self.players[idx].status = PlayerStatus::Disqualified;
        self.players[idx].hand.clear();
        self.board.remove_avatar(player);
        if self.phase == GamePhase::WaitingForPlayers {
            return;
        }
        if !self.check_game_over(&[]) && was_prompted {
            self.advance();
        }
    }

    fn index_of(&self, player: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == player)
    }

    fn refill_hand(&mut self, idx: usize) {
        while self.players[idx].hand.len() < self.config.hand_size {
            match self.draw_pile.pop() {
                Some(tile) => self.players[idx].hand.push(tile),
                None => break,
            }
        }
    }

    /// Ends the game if at most one player is left. Returns whether the game is over.
    fn check_game_over(&mut self, eliminated_now: &[PlayerId]) -> bool {
        if self.phase == GamePhase::GameOver {
            return true;
        }
        let active: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect();
        match active.len() {
            0 => self.end_game(eliminated_now.to_vec()),
            1 => self.end_game(active),
            _ => return false,
        }
        true
    }

    fn end_game(&mut self, winners: Vec<PlayerId>) {
        info!(?winners, "Game over");
        self.winners = winners;
        self.phase = GamePhase::GameOver;
    }

    /// Moves on to the next player who has to act.
    fn advance(&mut self) {
        let n = self.players.len();
        match self.phase {
            GamePhase::InitialPlacement { next } => {
                if let Some(i) = (next + 1..n).find(|&i| self.players[i].is_active()) {
                    self.phase = GamePhase::InitialPlacement { next: i };
                } else {
                    self.begin_turn_after(n - 1);
                }
            }
            GamePhase::Turn { active } => self.begin_turn_after(active),
            GamePhase::WaitingForPlayers | GamePhase::GameOver => {}
        }
    }

    /// Starts the turn of the first active player after `idx` (cyclically) who
    /// can still play a tile, after refilling their hand.
    fn begin_turn_after(&mut self, idx: usize) {
        let n = self.players.len();
        for offset in 1..=n {
            let i = (idx + offset) % n;
            if !self.players[i].is_active() {
                continue;
            }
            self.refill_hand(i);
            if !self.players[i].hand.is_empty() {
                self.players[i].strikes = 0;
                self.phase = GamePhase::Turn { active: i };
                return;
            }
        }
        // Nobody has any tiles left
        let survivors = self
            .players
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect();
        self.end_game(survivors);
    }
}
