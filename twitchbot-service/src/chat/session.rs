//! Persistent chat-ingestion session (spec §4.8): a plaintext TCP
//! connection to the platform's IRC-compatible chat server, with OAuth
//! bearer handshake, tag-capability request, channel join/rejoin,
//! keepalive-challenge response, and exponential-backoff reconnect.

use crate::chat::token::TokenManager;
use crate::chat::ChannelRegistry;
use crate::commands::{CreateMessage, ExecuteChatCommand};
use crate::platform::PlatformClient;
use composable_rust_core::bus::CommandBus;
use composable_rust_core::context::RequestContext;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Initial reconnect backoff (spec §4.8: "exponential backoff").
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Reconnect backoff ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// How long the session waits for the next line before treating the
/// connection as dead and reconnecting.
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
/// How long the session waits for the server's welcome/failure response
/// during the auth handshake before treating it as a dead connection.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Failure modes of a single connect-and-serve attempt.
enum SessionError {
    /// Transient I/O failure — reconnect with backoff.
    Io(std::io::Error),
    /// The server authenticated the connection as a different account than
    /// `bot_username` (spec §4.8). Not retryable: the caller must fix
    /// configuration, so the session aborts instead of reconnecting.
    AuthMismatch { expected: String, actual: String },
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Static configuration for one chat session.
#[derive(Debug, Clone)]
pub struct ChatSessionConfig {
    /// IRC-compatible chat server host.
    pub irc_host: String,
    /// IRC-compatible chat server port.
    pub irc_port: u16,
    /// Bot account username. Must match the token's own account
    /// (spec §4.8: "abort with a configuration error on mismatch").
    pub bot_username: String,
    /// Channels to join on connect and on every reconnect.
    pub channels: Vec<String>,
}

struct ParsedLine {
    channel: Option<String>,
    username: Option<String>,
    display_name: Option<String>,
    user_id: Option<String>,
    is_moderator: bool,
    is_subscriber: bool,
    is_vip: bool,
    is_broadcaster: bool,
    command: String,
    body: Option<String>,
}

/// Parses one raw IRC line with optional leading `@tag=value;...` tag block
/// into its tags, command verb, channel, and trailing body.
fn parse_line(line: &str) -> Option<ParsedLine> {
    let mut rest = line;
    let mut tags: HashMap<String, String> = HashMap::new();

    if let Some(stripped) = rest.strip_prefix('@') {
        let (tag_block, remainder) = stripped.split_once(' ')?;
        rest = remainder;
        for pair in tag_block.split(';') {
            if let Some((key, value)) = pair.split_once('=') {
                tags.insert(key.to_string(), value.to_string());
            }
        }
    }

    // Skip the `:prefix` segment (nick!user@host), if present.
    let rest = rest.strip_prefix(':').map_or(rest, |stripped| {
        stripped.split_once(' ').map_or("", |(_, remainder)| remainder)
    });

    let mut parts = rest.splitn(3, ' ');
    let command = parts.next()?.to_string();
    let target = parts.next().unwrap_or_default();
    let trailing = parts.next().map(|body| body.trim_start_matches(':').to_string());

    let channel = target.strip_prefix('#').map(std::string::ToString::to_string);

    Some(ParsedLine {
        channel,
        username: tags.get("login").cloned(),
        display_name: tags.get("display-name").cloned(),
        user_id: tags.get("user-id").cloned(),
        is_moderator: tags.get("mod").is_some_and(|v| v == "1"),
        is_subscriber: tags.get("subscriber").is_some_and(|v| v == "1"),
        is_vip: tags.contains_key("vip"),
        is_broadcaster: tags
            .get("badges")
            .is_some_and(|badges| badges.contains("broadcaster/")),
        command,
        body: trailing,
    })
}

/// Parses the authenticated nick out of the server's `001` welcome
/// reply, e.g. `:tmi.twitch.tv 001 actualnick :Welcome, GLHF!`.
fn parse_welcome_username(line: &str) -> Option<String> {
    let rest = line.strip_prefix(':').map_or(line, |stripped| {
        stripped.split_once(' ').map_or("", |(_, remainder)| remainder)
    });
    let mut parts = rest.splitn(3, ' ');
    if parts.next()? != "001" {
        return None;
    }
    parts.next().map(std::string::ToString::to_string)
}

/// Owns the TCP connection, reconnect loop, and message routing for one
/// chat session.
pub struct ChatSession {
    config: ChatSessionConfig,
    tokens: Arc<TokenManager>,
    platform: Arc<dyn PlatformClient>,
    channels: Arc<ChannelRegistry>,
    commands: Arc<CommandBus>,
}

impl ChatSession {
    /// Build a new session. Does not connect until [`Self::run`] is awaited.
    #[must_use]
    pub fn new(
        config: ChatSessionConfig,
        tokens: Arc<TokenManager>,
        platform: Arc<dyn PlatformClient>,
        channels: Arc<ChannelRegistry>,
        commands: Arc<CommandBus>,
    ) -> Self {
        Self { config, tokens, platform, channels, commands }
    }

    /// Runs the connect/handshake/read-write loop until `shutdown` fires,
    /// reconnecting with exponential backoff on any connection failure or
    /// missed keepalive.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if shutdown.is_cancelled() {
                return;
            }

            match self.connect_and_serve(&shutdown).await {
                Ok(()) => {
                    // Clean shutdown signal observed inside the serve loop.
                    return;
                }
                Err(SessionError::AuthMismatch { expected, actual }) => {
                    tracing::error!(
                        expected_username = %expected,
                        authenticated_username = %actual,
                        "chat session authenticated as a different account than configured, aborting"
                    );
                    return;
                }
                Err(SessionError::Io(err)) => {
                    tracing::warn!(error = %err, backoff_secs = backoff.as_secs(), "chat session disconnected, reconnecting");
                    tokio::select! {
                        () = shutdown.cancelled() => return,
                        () = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    async fn connect_and_serve(&self, shutdown: &CancellationToken) -> Result<(), SessionError> {
        let stream = TcpStream::connect((self.config.irc_host.as_str(), self.config.irc_port)).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let token = self.tokens.current_token().await;
        self.authenticate(&mut reader, &mut write_half, &token).await?;

        for channel in &self.config.channels {
            write_half.write_all(format!("JOIN #{channel}\r\n").as_bytes()).await?;
            self.channels.join(channel).await;
            self.hydrate_viewers(channel).await;
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        let mut line = String::new();
        loop {
            line.clear();
            tokio::select! {
                () = shutdown.cancelled() => {
                    return Ok(());
                }
                outbound = outbound_rx.recv() => {
                    if let Some(text) = outbound {
                        write_half.write_all(text.as_bytes()).await?;
                    }
                }
                read = tokio::time::timeout(READ_IDLE_TIMEOUT, reader.read_line(&mut line)) => {
                    let bytes = read.map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no keepalive"))??;
                    if bytes == 0 {
                        return Err(std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "connection closed").into());
                    }

                    let trimmed = line.trim_end();
                    if let Some(challenge) = trimmed.strip_prefix("PING ") {
                        write_half.write_all(format!("PONG {challenge}\r\n").as_bytes()).await?;
                        continue;
                    }

                    if let Some(parsed) = parse_line(trimmed) {
                        self.handle_line(parsed, &outbound_tx).await;
                    }
                }
            }
        }
    }

    /// Sends the capability/auth handshake and blocks until the server
    /// either welcomes the connection (numeric `001`, spec §4.8) or
    /// rejects the login. On welcome, confirms the authenticated account
    /// matches `bot_username`, aborting with [`SessionError::AuthMismatch`]
    /// if it doesn't.
    async fn authenticate(
        &self,
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
        write_half: &mut tokio::net::tcp::OwnedWriteHalf,
        token: &str,
    ) -> Result<(), SessionError> {
        write_half.write_all(b"CAP REQ :twitch.tv/tags twitch.tv/commands\r\n").await?;
        write_half.write_all(format!("PASS oauth:{token}\r\n").as_bytes()).await?;
        write_half.write_all(format!("NICK {}\r\n", self.config.bot_username).as_bytes()).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let bytes = tokio::time::timeout(HANDSHAKE_TIMEOUT, reader.read_line(&mut line))
                .await
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "handshake timed out"))??;
            if bytes == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "connection closed during handshake").into());
            }

            let trimmed = line.trim_end();

            if let Some(challenge) = trimmed.strip_prefix("PING ") {
                write_half.write_all(format!("PONG {challenge}\r\n").as_bytes()).await?;
                continue;
            }

            if trimmed.to_ascii_lowercase().contains("notice") && trimmed.to_ascii_lowercase().contains("login authentication failed") {
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "chat login authentication failed").into());
            }

            if let Some(authenticated_username) = parse_welcome_username(trimmed) {
                if !authenticated_username.eq_ignore_ascii_case(&self.config.bot_username) {
                    return Err(SessionError::AuthMismatch {
                        expected: self.config.bot_username.clone(),
                        actual: authenticated_username,
                    });
                }
                return Ok(());
            }
        }
    }

    async fn hydrate_viewers(&self, channel: &str) {
        let token = self.tokens.current_token().await;
        match self.platform.get_chatters(channel, &token).await {
            Ok(chatters) => {
                tracing::info!(channel, count = chatters.len(), "hydrated chatter list");
            }
            Err(err) => {
                tracing::warn!(channel, error = %err, "failed to hydrate chatter list");
            }
        }
    }

    async fn handle_line(&self, parsed: ParsedLine, outbound: &mpsc::UnboundedSender<String>) {
        if parsed.command != "PRIVMSG" {
            return;
        }
        let (Some(channel), Some(body)) = (parsed.channel, parsed.body) else {
            return;
        };
        let user_id = parsed.user_id.unwrap_or_default();
        let username = parsed.username.unwrap_or_default();
        let display_name = parsed.display_name.unwrap_or_else(|| username.clone());

        let ctx = RequestContext::new(Some(user_id.clone()));

        if let Some(invocation) = body.strip_prefix('!') {
            let name = invocation.split_whitespace().next().unwrap_or_default().to_string();
            let mut cmd = ExecuteChatCommand {
                name,
                invoker_is_moderator: parsed.is_moderator,
                invoker_is_subscriber: parsed.is_subscriber,
                response: None,
            };
            match self.commands.dispatch(&ctx, &mut cmd).await {
                Ok(()) => {
                    if let Some(response) = cmd.response {
                        let _ = outbound.send(format!("PRIVMSG #{channel} :{response}\r\n"));
                    }
                }
                Err(err) => {
                    tracing::debug!(channel, command = %cmd.name, error = %err, "chat command invocation failed");
                }
            }
            return;
        }

        let stream_id = self.channels.stream_id_for(&channel).await;
        let mut cmd = CreateMessage {
            stream_id,
            channel,
            user_id,
            username,
            display_name,
            body,
            is_moderator: parsed.is_moderator,
            is_subscriber: parsed.is_subscriber,
            is_vip: parsed.is_vip,
            is_broadcaster: parsed.is_broadcaster,
            created: None,
        };
        if let Err(err) = self.commands.dispatch(&ctx, &mut cmd).await {
            tracing::warn!(error = %err, "failed to record chat message");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_privmsg_line() {
        let line = "@badges=moderator/1;display-name=Someone;login=someone;mod=1;subscriber=0;user-id=123 :someone!someone@someone.tmi.twitch.tv PRIVMSG #somechannel :hello there";
        let parsed = parse_line(line).expect("line parses");

        assert_eq!(parsed.command, "PRIVMSG");
        assert_eq!(parsed.channel.as_deref(), Some("somechannel"));
        assert_eq!(parsed.body.as_deref(), Some("hello there"));
        assert_eq!(parsed.username.as_deref(), Some("someone"));
        assert_eq!(parsed.display_name.as_deref(), Some("Someone"));
        assert_eq!(parsed.user_id.as_deref(), Some("123"));
        assert!(parsed.is_moderator);
        assert!(!parsed.is_subscriber);
    }

    #[test]
    fn parses_untagged_ping_as_command_only() {
        let parsed = parse_line("PING :tmi.twitch.tv").expect("line parses");
        assert_eq!(parsed.command, "PING");
    }

    #[test]
    fn parses_welcome_username_from_numeric_001() {
        let username = parse_welcome_username(":tmi.twitch.tv 001 actualnick :Welcome, GLHF!").expect("line parses");
        assert_eq!(username, "actualnick");
    }

    #[test]
    fn parse_welcome_username_ignores_other_numerics() {
        assert!(parse_welcome_username(":tmi.twitch.tv 002 actualnick :Your host is tmi.twitch.tv").is_none());
    }
}
