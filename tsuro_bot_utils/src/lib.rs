use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use tsuro::{
    Action, ActionKind, BoardState, ClientMessage, Color, InitialPlacement, IntermediatePlacement,
    PlayerId, PlayerState, ServerMessage,
};

/// How a bot introduces itself to the server. Unset fields are chosen by the server.
#[derive(Clone, Debug, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub color: Option<Color>,
    pub strategy: Option<String>,
}

/// A trait to simplify writing bots.
///
/// `me` carries the bot's identity and current hand. Returning `None` means
/// not answering at all, which the server eventually treats as a timeout.
pub trait Bot {
    fn initial_placement(&mut self, me: &PlayerState, board: &BoardState) -> Option<InitialPlacement>;
    fn take_turn(&mut self, me: &PlayerState, board: &BoardState) -> Option<IntermediatePlacement>;

    /// Called when the server did not accept the last action. The bot will be asked again.
    fn action_rejected(&mut self, _reason: &str) {}

    /// Connects to the server, plays one game and returns its winners.
    fn run(&mut self, addr: &str, registration: Registration) -> anyhow::Result<Vec<PlayerId>> {
        let stream = TcpStream::connect(addr)?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;
        let mut buf = String::new();

        send(
            &mut writer,
            &ClientMessage::Register {
                name: registration.name,
                color: registration.color,
                strategy: registration.strategy,
            },
        )?;

        let mut me: Option<PlayerState> = None;
        loop {
            buf.clear(); // because read_line() appends to the buffer
            let num_bytes_read = reader.read_line(&mut buf)?;
            if num_bytes_read == 0 {
                anyhow::bail!("The server closed the connection before the game ended");
            }

            match serde_json::from_str::<ServerMessage>(buf.trim_end())? {
                ServerMessage::AssignIdentity {
                    player,
                    name,
                    color,
                } => me = Some(PlayerState::new(player, name, color)),
                ServerMessage::ConnectionDenied { reason } => {
                    anyhow::bail!("Connection denied: {}", reason)
                }
                ServerMessage::UnknownStrategy { strategy } => {
                    anyhow::bail!("The server does not know the strategy '{}'", strategy)
                }
                ServerMessage::Hand { tiles } => {
                    if let Some(me) = &mut me {
                        me.hand = tiles
                            .into_iter()
                            .map(|tile| tile.resolve())
                            .collect::<Result<_, _>>()?;
                    }
                }
                ServerMessage::HandClear => {
                    if let Some(me) = &mut me {
                        me.hand.clear();
                    }
                }
                ServerMessage::ActionRequest { kind, board } => {
                    let Some(me) = &me else {
                        anyhow::bail!("Asked for an action before being registered");
                    };
                    let board = BoardState::from_view(&board)?;
                    let placement = match kind {
                        ActionKind::Initial => self
                            .initial_placement(me, &board)
                            .map(Action::Initial),
                        ActionKind::Intermediate => {
                            self.take_turn(me, &board).map(Action::Intermediate)
                        }
                    };
                    if let Some(placement) = placement {
                        send(
                            &mut writer,
                            &ClientMessage::ActionResponse {
                                player: me.id,
                                placement,
                            },
                        )?;
                    }
                }
                ServerMessage::ActionRejected { reason } => self.action_rejected(&reason),
                ServerMessage::GameOver { winners } => break Ok(winners),
                _ => {}
            }
        }
    }
}

fn send(writer: &mut TcpStream, msg: &ClientMessage) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, msg)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
