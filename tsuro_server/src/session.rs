use std::collections::BTreeMap;

use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use tsuro::{
    ClientMessage, Color, Game, GameConfig, IllegalMove, LobbyError, PlayerId, PlayerStatus,
    Prompt, ServerMessage, SubmitOutcome, KNOWN_STRATEGIES,
};

use crate::{ConnectionId, ServerConfig, ServerError, SessionEvent};

struct Client {
    outbox: mpsc::Sender<ServerMessage>,
    /// Set once the client registered successfully.
    player: Option<PlayerId>,
}

/// Owns the game and talks to the players through their connections.
///
/// All game state lives in this task. Connections only forward parsed
/// messages as [`SessionEvent`]s. Sending never waits: a client whose outbox
/// is full is dropped, so one stuck reader cannot hold up the game.
pub struct Session {
    config: ServerConfig,
    game: Game,
    rng: StdRng,
    events: mpsc::Receiver<SessionEvent>,
    clients: BTreeMap<ConnectionId, Client>,
}

impl Session {
    pub fn new(
        config: ServerConfig,
        game_config: GameConfig,
        rng: StdRng,
        events: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            config,
            game: Game::new(game_config),
            rng,
            events,
            clients: BTreeMap::new(),
        }
    }

    /// Plays one game from registration to the end, and returns the winners.
    pub async fn run(mut self) -> Result<Vec<PlayerId>, ServerError> {
        self.wait_for_players().await?;
        self.game.start(&mut self.rng)?;

        // Connections that never registered are not needed anymore.
        let spectators: Vec<ConnectionId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.player.is_none())
            .map(|(&conn, _)| conn)
            .collect();
        for conn in spectators {
            self.deny(conn, LobbyError::AlreadyStarted);
        }

        while let Some(prompt) = self.game.prompt() {
            self.play_prompt(prompt).await?;
        }

        let winners = self.game.winners().to_vec();
        info!(?winners, "Game over");
        self.broadcast(ServerMessage::GameOver {
            winners: winners.clone(),
        });
        Ok(winners)
    }

    /// Accepts registrations until the game is full, or until the join timeout
    /// has passed and enough players are there.
    async fn wait_for_players(&mut self) -> Result<(), ServerError> {
        let deadline = Instant::now() + self.config.join_timeout;
        let mut deadline_passed = false;
        loop {
            let enough = self.game.players().len() >= self.game.config().min_players;
            if self.game.is_full() || (deadline_passed && enough) {
                return Ok(());
            }
            let event = if deadline_passed {
                self.events.recv().await
            } else {
                match timeout_at(deadline, self.events.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        debug!("Join timeout passed");
                        deadline_passed = true;
                        continue;
                    }
                }
            };
            match event.ok_or(ServerError::EventsClosed)? {
                SessionEvent::Connected { conn, outbox } => {
                    debug!(%conn, "Client connected");
                    self.clients.insert(
                        conn,
                        Client {
                            outbox,
                            player: None,
                        },
                    );
                }
                SessionEvent::Disconnected { conn } => {
                    // A registered player stays in the game and will time out.
                    debug!(%conn, "Client disconnected");
                    self.clients.remove(&conn);
                }
                SessionEvent::Message {
                    conn,
                    msg:
                        ClientMessage::Register {
                            name,
                            color,
                            strategy,
                        },
                } => self.register(conn, name, color, strategy),
                SessionEvent::Message {
                    conn,
                    msg: ClientMessage::ActionResponse { .. },
                } => self.send(
                    conn,
                    ServerMessage::MalformedInput {
                        reason: String::from("the game has not started"),
                    },
                ),
            }
        }
    }

    fn register(
        &mut self,
        conn: ConnectionId,
        name: Option<String>,
        color: Option<Color>,
        strategy: Option<String>,
    ) {
        let Some(client) = self.clients.get(&conn) else {
            return;
        };
        if client.player.is_some() {
            self.send(
                conn,
                ServerMessage::MalformedInput {
                    reason: String::from("already registered"),
                },
            );
            return;
        }
        if let Some(strategy) = strategy {
            if !KNOWN_STRATEGIES.contains(&strategy.as_str()) {
                self.send(conn, ServerMessage::UnknownStrategy { strategy });
                return;
            }
        }
        match self.game.join(name, color) {
            Ok(player) => {
                if let Some(client) = self.clients.get_mut(&conn) {
                    client.player = Some(player);
                }
                if let Some(state) = self.game.player(player) {
                    let msg = ServerMessage::AssignIdentity {
                        player,
                        name: state.name.clone(),
                        color: state.color,
                    };
                    self.send(conn, msg);
                }
            }
            Err(err) => {
                warn!(%conn, %err, "Registration refused");
                self.deny(conn, err);
            }
        }
    }

    /// Prompts a player and waits for their response, then applies it.
    async fn play_prompt(&mut self, prompt: Prompt) -> Result<(), ServerError> {
        let player = prompt.player;
        self.broadcast(ServerMessage::TurnStatus {
            player,
            kind: prompt.kind,
        });

        if let Some(conn) = self.connection_of(player) {
            let tiles = self.game.hand_refs(player);
            self.send(conn, ServerMessage::Hand { tiles });
            let board = self.game.board().view();
            self.send(
                conn,
                ServerMessage::ActionRequest {
                    kind: prompt.kind,
                    board,
                },
            );
        }
        // Also covers a client dropped while being prompted.
        if self.connection_of(player).is_none() {
            let outcome = self.game.reject(player, IllegalMove::NoResponse);
            self.report(player, outcome);
            return Ok(());
        }

        let deadline = Instant::now() + self.config.turn_timeout;
        loop {
            let event = match timeout_at(deadline, self.events.recv()).await {
                Ok(event) => event.ok_or(ServerError::EventsClosed)?,
                Err(_) => {
                    let outcome = self.game.reject(player, IllegalMove::TimedOut);
                    self.report(player, outcome);
                    return Ok(());
                }
            };
            match event {
                SessionEvent::Connected { conn, outbox } => {
                    let reason = LobbyError::AlreadyStarted.to_string();
                    debug!(%conn, "Turning away late connection");
                    let _ = outbox.try_send(ServerMessage::ConnectionDenied { reason });
                }
                SessionEvent::Disconnected { conn } => {
                    let gone = self.clients.remove(&conn).and_then(|client| client.player);
                    debug!(%conn, ?gone, "Client disconnected");
                    if self.connection_of(player).is_none() {
                        let outcome = self.game.reject(player, IllegalMove::NoResponse);
                        self.report(player, outcome);
                        return Ok(());
                    }
                }
                SessionEvent::Message { conn: from, msg } => {
                    let sender = self.clients.get(&from).and_then(|client| client.player);
                    match msg {
                        ClientMessage::ActionResponse {
                            player: claimed,
                            placement,
                        } if sender == Some(player) => {
                            let outcome = if claimed != player {
                                self.send(from, ServerMessage::InvalidId { claimed });
                                self.game.reject(player, IllegalMove::InvalidId { claimed })
                            } else {
                                match self.game.submit(player, placement) {
                                    Ok(outcome) => outcome,
                                    Err(err) => {
                                        warn!(%player, %err, "Submission ignored");
                                        continue;
                                    }
                                }
                            };
                            self.report(player, outcome);
                            return Ok(());
                        }
                        ClientMessage::ActionResponse { .. } => {
                            let reason = String::from("out of turn");
                            self.send(from, ServerMessage::MalformedInput { reason });
                        }
                        ClientMessage::Register { .. } => {
                            let reason = LobbyError::AlreadyStarted.to_string();
                            self.send(from, ServerMessage::ConnectionDenied { reason });
                        }
                    }
                }
            }
        }
    }

    /// Tells the players what came of a submission.
    fn report(&mut self, player: PlayerId, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Accepted(report) => {
                debug!(%player, ?report.placement, "Tile placed");
                let board = self.game.board().view();
                self.broadcast(ServerMessage::StateUpdate { board });
                for &eliminated in &report.placement.eliminated {
                    self.remove_player(eliminated, PlayerStatus::Eliminated);
                }
            }
            SubmitOutcome::Rejected {
                reason,
                disqualified,
            } => {
                warn!(%player, %reason, disqualified, "Action rejected");
                if let Some(conn) = self.connection_of(player) {
                    let reason = reason.to_string();
                    self.send(conn, ServerMessage::ActionRejected { reason });
                }
                if disqualified {
                    self.remove_player(player, PlayerStatus::Disqualified);
                    // The avatar was taken off the board.
                    let board = self.game.board().view();
                    self.broadcast(ServerMessage::StateUpdate { board });
                }
            }
        }
    }

    fn remove_player(&mut self, player: PlayerId, status: PlayerStatus) {
        if let Some(conn) = self.connection_of(player) {
            self.send(conn, ServerMessage::HandClear);
        }
        self.broadcast(ServerMessage::PlayerRemoved { player, status });
    }

    /// Sends `ConnectionDenied` and closes the connection.
    fn deny(&mut self, conn: ConnectionId, err: LobbyError) {
        if let Some(client) = self.clients.remove(&conn) {
            let reason = err.to_string();
            let _ = client
                .outbox
                .try_send(ServerMessage::ConnectionDenied { reason });
        }
    }

    fn connection_of(&self, player: PlayerId) -> Option<ConnectionId> {
        self.clients
            .iter()
            .find(|(_, client)| client.player == Some(player))
            .map(|(&conn, _)| conn)
    }

    /// Queues a message for one client. Dropping a client closes its
    /// connection once the outbox is drained.
    fn send(&mut self, conn: ConnectionId, msg: ServerMessage) {
        let Some(client) = self.clients.get(&conn) else {
            return;
        };
        match client.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%conn, player = ?client.player, "Client stopped reading, dropping it");
                self.clients.remove(&conn);
            }
            // The connection is gone and its disconnect event is on the way.
            Err(TrySendError::Closed(_)) => {
                self.clients.remove(&conn);
            }
        }
    }

    fn broadcast(&mut self, msg: ServerMessage) {
        let conns: Vec<ConnectionId> = self.clients.keys().copied().collect();
        for conn in conns {
            self.send(conn, msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use tokio::task::JoinHandle;
    use tsuro::rules::{legal_actions, legal_initial_placements};
    use tsuro::{Action, ActionKind, BoardState, Coordinate, IntermediatePlacement, PlayerState};

    use super::*;

    struct TestClient {
        conn: ConnectionId,
        inbox: mpsc::Receiver<ServerMessage>,
        events: mpsc::Sender<SessionEvent>,
    }

    impl TestClient {
        async fn connect(events: &mpsc::Sender<SessionEvent>, id: u64) -> Self {
            Self::connect_with_capacity(events, id, 256).await
        }

        async fn connect_with_capacity(
            events: &mpsc::Sender<SessionEvent>,
            id: u64,
            capacity: usize,
        ) -> Self {
            let conn = ConnectionId(id);
            let (outbox, inbox) = mpsc::channel(capacity);
            events
                .send(SessionEvent::Connected { conn, outbox })
                .await
                .unwrap();
            Self {
                conn,
                inbox,
                events: events.clone(),
            }
        }

        async fn send(&self, msg: ClientMessage) {
            self.events
                .send(SessionEvent::Message {
                    conn: self.conn,
                    msg,
                })
                .await
                .unwrap();
        }

        async fn recv(&mut self) -> ServerMessage {
            tokio::time::timeout(Duration::from_secs(10), self.inbox.recv())
                .await
                .expect("no message in time")
                .expect("connection closed")
        }

        /// Skips messages until one matches.
        async fn recv_matching(&mut self, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
            loop {
                let msg = self.recv().await;
                if pred(&msg) {
                    return msg;
                }
            }
        }

        async fn register(&mut self, name: &str) -> PlayerId {
            self.send(ClientMessage::Register {
                name: Some(String::from(name)),
                color: None,
                strategy: Some(String::from("random")),
            })
            .await;
            match self.recv().await {
                ServerMessage::AssignIdentity { player, .. } => player,
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    fn start_session(
        turn_timeout: Duration,
        max_retries: u8,
    ) -> (mpsc::Sender<SessionEvent>, JoinHandle<Result<Vec<PlayerId>, ServerError>>) {
        let (events_tx, events) = mpsc::channel(64);
        let config = ServerConfig {
            join_timeout: Duration::from_secs(60),
            turn_timeout,
            ..ServerConfig::default()
        };
        let game_config = GameConfig {
            min_players: 2,
            max_players: 2,
            max_retries,
            ..GameConfig::default()
        };
        let session = Session::new(config, game_config, StdRng::seed_from_u64(1), events);
        (events_tx, tokio::spawn(session.run()))
    }

    fn is_action_request(msg: &ServerMessage) -> bool {
        matches!(msg, ServerMessage::ActionRequest { .. })
    }

    #[tokio::test]
    async fn registration() {
        let (events, session) = start_session(Duration::from_secs(60), 2);

        let mut ada = TestClient::connect(&events, 0).await;
        ada.send(ClientMessage::Register {
            name: Some(String::from("ada")),
            color: None,
            strategy: Some(String::from("psychic")),
        })
        .await;
        assert_eq!(
            ada.recv().await,
            ServerMessage::UnknownStrategy {
                strategy: String::from("psychic")
            }
        );
        assert_eq!(ada.register("ada").await, PlayerId(0));

        let mut copycat = TestClient::connect(&events, 1).await;
        copycat
            .send(ClientMessage::Register {
                name: Some(String::from("ada")),
                color: Some(Color::Red),
                strategy: None,
            })
            .await;
        assert!(matches!(
            copycat.recv().await,
            ServerMessage::ConnectionDenied { .. }
        ));

        let mut bob = TestClient::connect(&events, 2).await;
        assert_eq!(bob.register("bob").await, PlayerId(1));

        // The game is full and has started.
        let mut late = TestClient::connect(&events, 3).await;
        assert!(matches!(
            late.recv().await,
            ServerMessage::ConnectionDenied { .. }
        ));

        assert_eq!(
            ada.recv().await,
            ServerMessage::TurnStatus {
                player: PlayerId(0),
                kind: ActionKind::Initial
            }
        );
        match ada.recv().await {
            ServerMessage::Hand { tiles } => assert_eq!(tiles.len(), 3),
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(
            ada.recv().await,
            ServerMessage::ActionRequest {
                kind: ActionKind::Initial,
                board: Default::default()
            }
        );
        assert_eq!(
            bob.recv().await,
            ServerMessage::TurnStatus {
                player: PlayerId(0),
                kind: ActionKind::Initial
            }
        );
        session.abort();
    }

    #[tokio::test]
    async fn wrong_ids_and_out_of_turn_messages() {
        let (events, session) = start_session(Duration::from_secs(60), 2);
        let mut ada = TestClient::connect(&events, 0).await;
        let mut bob = TestClient::connect(&events, 1).await;
        let ada_id = ada.register("ada").await;
        let bob_id = bob.register("bob").await;
        ada.recv_matching(is_action_request).await;

        let placement = Action::Intermediate(IntermediatePlacement {
            tile: 0,
            rotation: 0,
            coordinate: Coordinate::new(0, 0).unwrap(),
        });
        bob.send(ClientMessage::ActionResponse {
            player: bob_id,
            placement,
        })
        .await;
        assert_eq!(
            bob.recv_matching(|msg| matches!(msg, ServerMessage::MalformedInput { .. }))
                .await,
            ServerMessage::MalformedInput {
                reason: String::from("out of turn")
            }
        );

        ada.send(ClientMessage::ActionResponse {
            player: bob_id,
            placement,
        })
        .await;
        assert_eq!(
            ada.recv().await,
            ServerMessage::InvalidId { claimed: bob_id }
        );
        assert!(matches!(
            ada.recv().await,
            ServerMessage::ActionRejected { .. }
        ));
        // Ada is asked again.
        assert_eq!(
            ada.recv().await,
            ServerMessage::TurnStatus {
                player: ada_id,
                kind: ActionKind::Initial
            }
        );
        session.abort();
    }

    #[tokio::test]
    async fn silent_players_are_disqualified() {
        let (events, session) = start_session(Duration::from_millis(50), 1);
        let mut ada = TestClient::connect(&events, 0).await;
        let mut bob = TestClient::connect(&events, 1).await;
        let ada_id = ada.register("ada").await;
        let bob_id = bob.register("bob").await;

        // Ada never answers and runs out of retries.
        assert_eq!(
            ada.recv_matching(|msg| matches!(msg, ServerMessage::HandClear))
                .await,
            ServerMessage::HandClear
        );
        assert_eq!(
            bob.recv_matching(|msg| matches!(msg, ServerMessage::PlayerRemoved { .. }))
                .await,
            ServerMessage::PlayerRemoved {
                player: ada_id,
                status: PlayerStatus::Disqualified
            }
        );
        assert_eq!(
            bob.recv_matching(|msg| matches!(msg, ServerMessage::GameOver { .. }))
                .await,
            ServerMessage::GameOver {
                winners: vec![bob_id]
            }
        );
        assert_eq!(session.await.unwrap().unwrap(), vec![bob_id]);
    }

    #[tokio::test]
    async fn clients_that_stop_reading_are_dropped() {
        let (events, session) = start_session(Duration::from_secs(60), 1);
        // Room for the identity only, and nobody drains it.
        let mut ada = TestClient::connect_with_capacity(&events, 0, 1).await;
        let mut bob = TestClient::connect(&events, 1).await;
        ada.send(ClientMessage::Register {
            name: Some(String::from("ada")),
            color: None,
            strategy: None,
        })
        .await;
        let bob_id = bob.register("bob").await;

        // Ada's prompts fail right away instead of waiting for the turn timeout.
        let winners = tokio::time::timeout(Duration::from_secs(5), session)
            .await
            .expect("the session got stuck")
            .unwrap()
            .unwrap();
        assert_eq!(winners, vec![bob_id]);
        assert_eq!(
            bob.recv_matching(|msg| matches!(msg, ServerMessage::GameOver { .. }))
                .await,
            ServerMessage::GameOver {
                winners: vec![bob_id]
            }
        );
        // Ada got the identity, then the outbox was closed.
        assert!(matches!(
            ada.inbox.recv().await,
            Some(ServerMessage::AssignIdentity { .. })
        ));
        assert_eq!(ada.inbox.recv().await, None);
    }

    /// Plays whatever legal action comes first until the game ends.
    async fn play_until_game_over(mut client: TestClient, id: PlayerId) -> Vec<PlayerId> {
        let mut state = PlayerState::new(id, String::new(), Color::White);
        loop {
            match client.recv().await {
                ServerMessage::Hand { tiles } => {
                    state.hand = tiles
                        .iter()
                        .map(|tile| tile.resolve().unwrap())
                        .collect();
                }
                ServerMessage::ActionRequest { kind, board } => {
                    let board = BoardState::from_view(&board).unwrap();
                    let placement = match kind {
                        ActionKind::Initial => {
                            Action::Initial(legal_initial_placements(&board, &state)[0])
                        }
                        ActionKind::Intermediate => {
                            Action::Intermediate(legal_actions(&board, &state)[0])
                        }
                    };
                    client
                        .send(ClientMessage::ActionResponse {
                            player: id,
                            placement,
                        })
                        .await;
                }
                ServerMessage::ActionRejected { reason } => panic!("rejected: {}", reason),
                ServerMessage::GameOver { winners } => return winners,
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn plays_a_whole_game() {
        let (events, session) = start_session(Duration::from_secs(10), 2);
        let mut ada = TestClient::connect(&events, 0).await;
        let mut bob = TestClient::connect(&events, 1).await;
        let ada_id = ada.register("ada").await;
        let bob_id = bob.register("bob").await;

        let ada_task = tokio::spawn(play_until_game_over(ada, ada_id));
        let bob_task = tokio::spawn(play_until_game_over(bob, bob_id));
        let winners = session.await.unwrap().unwrap();
        assert!(!winners.is_empty());
        assert_eq!(ada_task.await.unwrap(), winners);
        assert_eq!(bob_task.await.unwrap(), winners);
    }
}
