mod config;
mod connection;
mod error;
mod session;
pub use config::*;
pub use connection::*;
pub use error::*;
pub use session::*;

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tsuro::{GameConfig, PlayerId};

/// How long connections get to deliver their last messages after the game.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Listens for players, plays one game, and returns its winners.
pub async fn serve(
    config: ServerConfig,
    game_config: GameConfig,
    rng: StdRng,
) -> Result<Vec<PlayerId>, ServerError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "Listening");
    serve_on(listener, config, game_config, rng).await
}

/// Plays one game with the players connecting to `listener`.
///
/// Returns once every connection has flushed its outbox, or the grace
/// period has run out.
pub async fn serve_on(
    listener: TcpListener,
    config: ServerConfig,
    game_config: GameConfig,
    rng: StdRng,
) -> Result<Vec<PlayerId>, ServerError> {
    let (events_tx, events) = mpsc::channel(64);
    let mut session = tokio::spawn(Session::new(config, game_config, rng, events).run());
    let mut connections = JoinSet::new();

    let mut next_conn = 0;
    let result = loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let conn = ConnectionId(next_conn);
                        next_conn += 1;
                        info!(%conn, %peer, "New connection");
                        connections.spawn(handle_connection(stream, conn, events_tx.clone()));
                    }
                    Err(err) => error!(%err, "Accept error"),
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            result = &mut session => break result?,
        }
    };
    drop(listener);
    drop(events_tx);

    // The session dropped every outbox, so each connection ends once its
    // queued messages are written.
    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("Some connections did not finish in time");
    }
    result
}
