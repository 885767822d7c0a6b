use tsuro::LobbyError;

/// Errors that end the server.
///
/// Anything a single player does wrong is handled inside the session and
/// never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not start the game: {0}")]
    Lobby(#[from] LobbyError),

    /// Every sender of session events was dropped while the game was running.
    #[error("The session lost all of its connections")]
    EventsClosed,

    #[error("The session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
