// Meowkov Engine — IRC Bridge
//
// Connects the bot to one IRC server via outbound TCP/TLS, joins the
// configured channels and feeds every PRIVMSG to the Responder.
//
// Lifecycle:
//   connect (TLS by default, port 6697) → PASS/NICK/USER → 001 → JOIN
//   signal (SIGINT/SIGTERM/SIGHUP) → persist corpus → QUIT → wait for EOF
//
// Each PRIVMSG is handled in its own task so a slow generation or a long
// typing delay never stalls PING handling.

use crate::atoms::constants::{HOMEPAGE, IRC_MAX_MESSAGE_LEN, IRC_QUIT_GRACE_SECS, VERSION};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::IncomingMessage;
use crate::engine::config::BotConfig;
use crate::engine::responder::{input_source, Responder};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinSet;

// ── Bridge Core ────────────────────────────────────────────────────────

/// Run until the server closes the link, our own QUIT comes back, or a
/// shutdown signal has been handled.
pub async fn run_bridge(config: &BotConfig, responder: Arc<Responder>) -> EngineResult<()> {
    let mut signals = ShutdownSignals::install()?;
    let stream = connect(config).await?;
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    let mut session = Session::new(config, IrcWriter::new(writer), responder);
    session.register(config.irc_password.as_deref()).await?;
    info!("[irc] Sent NICK/USER to {}", config.irc_server);

    let mut buf: Vec<u8> = Vec::with_capacity(512);
    let mut quit_deadline: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            name = signals.recv(), if quit_deadline.is_none() => {
                info!("[irc] Received {}, shutting down..", name);
                persist(&session).await;
                if let Err(e) = session.writer.send("QUIT :meow").await {
                    warn!("[irc] Could not send QUIT: {}", e);
                    break;
                }
                quit_deadline = Some(tokio::time::Instant::now() + Duration::from_secs(IRC_QUIT_GRACE_SECS));
            }
            _ = tokio::time::sleep_until(quit_deadline.unwrap_or_else(tokio::time::Instant::now)), if quit_deadline.is_some() => {
                warn!("[irc] {} did not close the connection, giving up", config.irc_server);
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    info!("[irc] Connection to {} closed", config.irc_server);
                    break;
                }
                // Clients in the wild still send Latin-1/2; keep going instead of dropping the link.
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                buf.clear();
                if line.is_empty() {
                    continue;
                }
                debug!("[irc] ← {}", line);
                if let Flow::Disconnect = session.handle_line(&line).await? {
                    break;
                }
            }
        }
    }

    session.tasks.abort_all();
    Ok(())
}

async fn persist(session: &Session) {
    let corpus = session.responder.corpus();
    info!("[irc] Saving corpus..");
    match corpus.persist().await {
        Ok(()) => info!("[irc] Saved ({})", corpus.backend()),
        Err(e) => error!("[irc] {}", e),
    }
}

// ── Connection ─────────────────────────────────────────────────────────

/// TLS or plain TCP; both implement AsyncRead + AsyncWrite.
trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

async fn connect(config: &BotConfig) -> EngineResult<Box<dyn IrcStream>> {
    let (host, port) = config.irc_host_port()?;
    let addr = format!("{}:{}", host, port);

    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|e| EngineError::channel("irc", format!("TCP connect to {} failed: {}", addr, e)))?;

    if !config.use_tls {
        warn!("[irc] Connecting WITHOUT TLS to {} — credentials will be sent in plaintext!", addr);
        return Ok(Box::new(tcp));
    }

    info!("[irc] Upgrading to TLS for {}", addr);

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| EngineError::channel("irc", format!("TLS setup failed: {}", e)))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));

    let server_name = rustls::pki_types::ServerName::try_from(host)
        .map_err(|e| EngineError::channel("irc", format!("Invalid server name: {}", e)))?;

    let tls_stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| EngineError::channel("irc", format!("TLS handshake with {} failed: {}", addr, e)))?;

    info!("[irc] TLS handshake complete for {}", addr);
    Ok(Box::new(tls_stream))
}

#[cfg(unix)]
struct ShutdownSignals {
    term: tokio::signal::unix::Signal,
    int: tokio::signal::unix::Signal,
    hup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> EngineResult<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
            hup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.term.recv() => "SIGTERM",
            _ = self.int.recv() => "SIGINT",
            _ = self.hup.recv() => "SIGHUP",
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> EngineResult<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("[irc] Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    }
}

// ── Writer ─────────────────────────────────────────────────────────────

/// Shared write half; every line is written whole under the lock.
#[derive(Clone)]
struct IrcWriter {
    inner: Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Unpin + Send>>>,
}

impl IrcWriter {
    fn new<W: AsyncWrite + Unpin + Send + 'static>(writer: W) -> Self {
        Self { inner: Arc::new(tokio::sync::Mutex::new(Box::new(writer))) }
    }

    async fn send(&self, line: &str) -> EngineResult<()> {
        if line.starts_with("PASS ") {
            debug!("[irc] → PASS ********");
        } else {
            debug!("[irc] → {}", line);
        }
        let mut w = self.inner.lock().await;
        w.write_all(format!("{}\r\n", line).as_bytes()).await?;
        w.flush().await?;
        Ok(())
    }

    async fn privmsg(&self, target: &str, text: &str) -> EngineResult<()> {
        for chunk in split_message(text, IRC_MAX_MESSAGE_LEN) {
            self.send(&format!("PRIVMSG {} :{}", target, chunk)).await?;
        }
        Ok(())
    }
}

// ── Session ────────────────────────────────────────────────────────────

enum Flow {
    Continue,
    Disconnect,
}

struct Session {
    /// Current nick; grows `_` suffixes on collisions.
    nick: String,
    channels: Vec<String>,
    writer: IrcWriter,
    responder: Arc<Responder>,
    tasks: JoinSet<()>,
}

impl Session {
    fn new(config: &BotConfig, writer: IrcWriter, responder: Arc<Responder>) -> Self {
        Session {
            nick: config.bot_name.clone(),
            channels: config.channels.clone(),
            writer,
            responder,
            tasks: JoinSet::new(),
        }
    }

    async fn register(&self, password: Option<&str>) -> EngineResult<()> {
        if let Some(pass) = password.filter(|p| !p.is_empty()) {
            self.writer.send(&format!("PASS {}", pass)).await?;
        }
        self.writer.send(&format!("NICK {}", self.nick)).await?;
        self.writer.send(&format!("USER {} 0 * :{}", self.nick, self.nick)).await
    }

    async fn handle_line(&mut self, line: &str) -> EngineResult<Flow> {
        self.reap();
        let parsed = parse_irc_line(line);

        match parsed.command.as_str() {
            "PING" => {
                let token = parsed.trailing.as_deref().or(parsed.params.first().map(String::as_str)).unwrap_or("");
                self.writer.send(&format!("PONG :{}", token)).await?;
            }
            "001" => {
                if let Some(nick) = parsed.params.first() {
                    self.nick = nick.clone();
                }
                info!("[irc] Registered as {}", self.nick);
                for channel in &self.channels {
                    info!("[irc] Joining {}", channel);
                    self.writer.send(&format!("JOIN {}", channel)).await?;
                }
            }
            "433" => {
                self.nick.push('_');
                warn!("[irc] Nick in use, retrying as {}", self.nick);
                self.writer.send(&format!("NICK {}", self.nick)).await?;
            }
            "NICK" => {
                if parsed.prefix_nick() == Some(self.nick.as_str()) {
                    if let Some(new) = parsed.trailing.clone().or_else(|| parsed.params.first().cloned()) {
                        info!("[irc] Nick changed to {}", new);
                        self.nick = new;
                    }
                }
            }
            "JOIN" => {
                let joined = parsed.prefix_nick().unwrap_or_default();
                let channel = parsed.params.first().cloned().or_else(|| parsed.trailing.clone());
                if let Some(channel) = channel.filter(|_| joined != self.nick) {
                    if let Some(smiley) = self.responder.greeting() {
                        self.writer.privmsg(&channel, &smiley).await?;
                    }
                }
            }
            "PRIVMSG" => self.handle_privmsg(line, &parsed).await?,
            "QUIT" => {
                if parsed.prefix_nick() == Some(self.nick.as_str()) {
                    info!("[irc] Disconnected, goodbye.");
                    return Ok(Flow::Disconnect);
                }
            }
            "ERROR" => {
                warn!("[irc] Server closed the link: {}", parsed.trailing.unwrap_or_default());
                return Ok(Flow::Disconnect);
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    async fn handle_privmsg(&mut self, line: &str, parsed: &IrcParsed) -> EngineResult<()> {
        let Some(sender) = parsed.prefix_nick().map(str::to_string) else {
            return Ok(());
        };
        if sender == self.nick {
            return Ok(());
        }
        let text = parsed.trailing.clone().unwrap_or_default();

        if let Some(ctcp) = text.strip_prefix('\x01') {
            let ctcp = ctcp.trim_end_matches('\x01');
            if ctcp.eq_ignore_ascii_case("VERSION") {
                let notice = format!("NOTICE {} :\x01VERSION meowkov @ {} ({})\x01", sender, VERSION, HOMEPAGE);
                self.writer.send(&notice).await?;
            } else {
                debug!("[irc] Ignoring CTCP {:?} from {}", ctcp, sender);
            }
            return Ok(());
        }

        let Some((target, private)) = input_source(line, &self.nick) else {
            return Ok(());
        };
        let message = IncomingMessage { text, sender, own_nick: self.nick.clone(), private };
        let responder = self.responder.clone();
        let writer = self.writer.clone();

        self.tasks.spawn(async move {
            let Some(reply) = responder.respond(&message).await else { return };
            if !reply.delay.is_zero() {
                debug!("[irc] <sleeping for {:?}>", reply.delay);
                tokio::time::sleep(reply.delay).await;
            }
            if let Err(e) = writer.privmsg(&target, &reply.text).await {
                error!("[irc] Reply to {} failed: {}", target, e);
            }
        });
        Ok(())
    }

    /// Collect finished handlers so panics are logged and the set stays small.
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                error!("[irc] Message handler failed: {}", e);
            }
        }
    }
}

// ── IRC Message Parser ─────────────────────────────────────────────────

#[derive(Debug)]
struct IrcParsed {
    prefix: Option<String>,
    command: String,
    params: Vec<String>,
    trailing: Option<String>,
}

impl IrcParsed {
    fn prefix_nick(&self) -> Option<&str> {
        self.prefix.as_deref().and_then(|p| p.split('!').next())
    }
}

fn parse_irc_line(line: &str) -> IrcParsed {
    let mut remaining = line;
    let prefix = if let Some(rest) = remaining.strip_prefix(':') {
        let end = rest.find(' ').unwrap_or(rest.len());
        let p = rest[..end].to_string();
        remaining = rest[end..].trim_start();
        Some(p)
    } else {
        None
    };

    // Trailing parameter follows the first " :"; a line may also start with it.
    let (main, trailing) = if let Some(idx) = remaining.find(" :") {
        (&remaining[..idx], Some(remaining[idx + 2..].to_string()))
    } else {
        (remaining, None)
    };

    let mut parts = main.split_whitespace();
    let command = parts.next().unwrap_or("").to_ascii_uppercase();
    let params: Vec<String> = parts.map(str::to_string).collect();

    IrcParsed { prefix, command, params, trailing }
}

/// Split on word boundaries into chunks of at most `max_len` bytes, never
/// cutting through a UTF-8 sequence.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text.trim();

    while remaining.len() > max_len {
        let mut boundary = max_len;
        while boundary > 0 && !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }
        if boundary == 0 {
            // A single character wider than max_len.
            boundary = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }
        let split_at = remaining[..boundary].rfind(' ').filter(|&i| i > 0).unwrap_or(boundary);
        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}
