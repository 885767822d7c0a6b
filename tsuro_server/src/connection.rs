use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use tsuro::{ClientMessage, ServerMessage};

/// Identifies one client connection for the lifetime of the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connection {}", self.0)
    }
}

/// What connections report to the session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A new client. Messages for it go into `outbox`.
    Connected {
        conn: ConnectionId,
        outbox: mpsc::Sender<ServerMessage>,
    },
    Message {
        conn: ConnectionId,
        msg: ClientMessage,
    },
    Disconnected {
        conn: ConnectionId,
    },
}

async fn write_line<W: AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    conn: ConnectionId,
    msg: &T,
) -> std::io::Result<()> {
    let mut json = serde_json::to_string(msg)?;
    trace!(name: "Sending message", %conn, message = %json);
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await
}

/// Serves one client until it disconnects or the session drops its outbox.
///
/// Lines are parsed here, and unparsable ones are answered directly. Only
/// well-formed messages reach the session.
pub async fn handle_connection<S>(stream: S, conn: ConnectionId, events: mpsc::Sender<SessionEvent>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMessage>(64);

    let mut writer_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(err) = write_line(&mut writer, conn, &msg).await {
                debug!(%conn, %err, "Could not write to client");
                break;
            }
        }
    });

    // The session holds the only strong sender, so dropping it closes the connection.
    let replies = outbox.downgrade();
    if events
        .send(SessionEvent::Connected { conn, outbox })
        .await
        .is_err()
    {
        return;
    }

    let mut lines = BufReader::new(reader).lines();
    let mut writer_finished = false;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        debug!(%conn, %err, "Could not read from client");
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                trace!(name: "Received message", %conn, message = %line);
                match ClientMessage::parse(line) {
                    Ok(msg) => {
                        if events.send(SessionEvent::Message { conn, msg }).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(%conn, %err, "Bad input from client");
                        let Some(outbox) = replies.upgrade() else {
                            break;
                        };
                        if outbox.send(ServerMessage::from(err)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            _ = &mut writer_task => {
                writer_finished = true;
                break;
            }
        }
    }

    let _ = events.send(SessionEvent::Disconnected { conn }).await;
    if !writer_finished {
        // Let queued messages go out before the stream is dropped.
        let _ = writer_task.await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;

    #[tokio::test]
    async fn forwards_messages_and_answers_bad_input() {
        let (client, server) = tokio::io::duplex(4096);
        let (events_tx, mut events) = mpsc::channel(16);
        let task = tokio::spawn(handle_connection(server, ConnectionId(7), events_tx));

        let outbox = match events.recv().await {
            Some(SessionEvent::Connected { conn, outbox }) => {
                assert_eq!(conn, ConnectionId(7));
                outbox
            }
            other => panic!("unexpected event {:?}", other),
        };

        let (client_reader, mut client_writer) = tokio::io::split(client);
        let mut client_lines = BufReader::new(client_reader).lines();
        client_writer
            .write_all(b"{\"action\":\"REGISTER\",\"name\":\"ada\"}\n{oops\n{\"action\":\"DANCE\"}\n")
            .await
            .unwrap();

        match events.recv().await {
            Some(SessionEvent::Message { conn, msg }) => {
                assert_eq!(conn, ConnectionId(7));
                assert_eq!(
                    msg,
                    ClientMessage::Register {
                        name: Some(String::from("ada")),
                        color: None,
                        strategy: None
                    }
                );
            }
            other => panic!("unexpected event {:?}", other),
        }

        let line = client_lines.next_line().await.unwrap().unwrap();
        assert!(matches!(
            serde_json::from_str::<ServerMessage>(&line).unwrap(),
            ServerMessage::MalformedInput { .. }
        ));
        let line = client_lines.next_line().await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<ServerMessage>(&line).unwrap(),
            ServerMessage::UnknownAction {
                name: String::from("DANCE")
            }
        );

        outbox.send(ServerMessage::HandClear).await.unwrap();
        let line = client_lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"action":"HAND_CLEAR"}"#);

        client_writer.shutdown().await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(SessionEvent::Disconnected {
                conn: ConnectionId(7)
            })
        ));
        drop(outbox);
        task.await.unwrap();
    }
}
