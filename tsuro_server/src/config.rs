use std::time::Duration;

/// Settings for the network side of a game. The rules themselves are in
/// [`tsuro::GameConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// After this long, the game starts as soon as enough players joined,
    /// even if there is room for more.
    pub join_timeout: Duration,
    /// How long a prompted player has to respond.
    pub turn_timeout: Duration,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8000,
            join_timeout: Duration::from_secs(30),
            turn_timeout: Duration::from_secs(10),
        }
    }
}
