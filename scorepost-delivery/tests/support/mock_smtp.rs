//! Mock SMTP relay for exercising the notifier.
//!
//! The relay can:
//! - Reject specific recipients at `RCPT TO`
//! - Reject the message after `DATA`
//! - Delay every reply to trigger client timeouts
//! - Record every command and message body for verification
//!
//! ```rust,no_run
//! use support::mock_smtp::MockSmtpServer;
//!
//! # async fn example() {
//! let server = MockSmtpServer::builder()
//!     .with_rejected_recipient("nobody@example.com", 550, "No such user")
//!     .build()
//!     .await;
//!
//! // Point the notifier at server.addr()
//! # }
//! ```

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// SMTP command received by the mock relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Ehlo(String),
    Helo(String),
    MailFrom(String),
    RcptTo(String),
    Data,
    /// Message content received after DATA, with CRLF line endings kept
    MessageContent(String),
    Rset,
    Quit,
    Other(String),
}

#[derive(Clone)]
struct Reply {
    code: u16,
    message: String,
}

impl Reply {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct MockServerConfig {
    rejected_recipients: HashMap<String, Reply>,
    data_end_reply: Reply,
    reply_delay: Option<Duration>,
    ehlo_rejected: bool,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            rejected_recipients: HashMap::new(),
            data_end_reply: Reply::new(250, "OK: Message accepted"),
            reply_delay: None,
            ehlo_rejected: false,
        }
    }
}

pub struct MockSmtpServer {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<SmtpCommand>>>,
    handle: JoinHandle<()>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder {
            config: MockServerConfig::default(),
        }
    }

    /// `host:port` the relay is listening on
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn commands(&self) -> Vec<SmtpCommand> {
        self.commands.lock().clone()
    }

    /// The bodies of all accepted or rejected messages, in order
    pub fn messages(&self) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                SmtpCommand::MessageContent(content) => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    async fn handle_client(
        stream: TcpStream,
        config: Arc<MockServerConfig>,
        commands: Arc<Mutex<Vec<SmtpCommand>>>,
    ) -> std::io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"220 Mock SMTP Relay\r\n").await?;

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }

            let cmd_line = line.trim_end();
            let (verb, argument) = cmd_line.split_once(' ').unwrap_or((cmd_line, ""));

            let (command, reply) = match verb.to_uppercase().as_str() {
                "EHLO" if config.ehlo_rejected => (
                    SmtpCommand::Ehlo(argument.to_string()),
                    Reply::new(502, "Command not implemented").to_bytes(),
                ),
                "EHLO" => (
                    SmtpCommand::Ehlo(argument.to_string()),
                    b"250-mock.relay\r\n250 SIZE 10000000\r\n".to_vec(),
                ),
                "HELO" => (
                    SmtpCommand::Helo(argument.to_string()),
                    Reply::new(250, "mock.relay").to_bytes(),
                ),
                "MAIL" => (
                    SmtpCommand::MailFrom(extract_path(argument)),
                    Reply::new(250, "OK").to_bytes(),
                ),
                "RCPT" => {
                    let recipient = extract_path(argument);
                    let reply = config
                        .rejected_recipients
                        .get(&recipient)
                        .cloned()
                        .unwrap_or_else(|| Reply::new(250, "OK"));
                    (SmtpCommand::RcptTo(recipient), reply.to_bytes())
                }
                "DATA" => (
                    SmtpCommand::Data,
                    Reply::new(354, "Start mail input; end with <CRLF>.<CRLF>").to_bytes(),
                ),
                "RSET" => (SmtpCommand::Rset, Reply::new(250, "Reset").to_bytes()),
                "QUIT" => (SmtpCommand::Quit, Reply::new(221, "Bye").to_bytes()),
                _ => (
                    SmtpCommand::Other(cmd_line.to_string()),
                    Reply::new(500, "Unknown command").to_bytes(),
                ),
            };

            commands.lock().push(command.clone());

            if let Some(delay) = config.reply_delay {
                tokio::time::sleep(delay).await;
            }
            writer.write_all(&reply).await?;

            match command {
                SmtpCommand::Quit => return Ok(()),
                SmtpCommand::Data => {
                    let mut content = String::new();
                    loop {
                        let mut data_line = String::new();
                        if reader.read_line(&mut data_line).await? == 0 {
                            return Ok(());
                        }
                        if data_line == ".\r\n" || data_line == ".\n" {
                            break;
                        }
                        content.push_str(&data_line);
                    }

                    commands.lock().push(SmtpCommand::MessageContent(content));
                    writer.write_all(&config.data_end_reply.to_bytes()).await?;
                }
                _ => {}
            }
        }
    }
}

impl Drop for MockSmtpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The body of a message recorded by the relay, decoded from base64
pub fn decoded_body(message: &str) -> String {
    let (_, body) = message.split_once("\r\n\r\n").unwrap();
    let encoded: String = body.lines().map(str::trim_end).collect();
    String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap()
}

/// Longest line of a recorded message, without its line terminator
pub fn longest_line(message: &str) -> usize {
    message.lines().map(str::len).max().unwrap_or(0)
}

/// `FROM:<a@b>` / `TO:<a@b>` -> `a@b`
fn extract_path(argument: &str) -> String {
    argument
        .split_once(':')
        .map_or(argument, |(_, path)| path)
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    /// Answer `RCPT TO` for `recipient` with an error
    #[must_use]
    pub fn with_rejected_recipient(
        mut self,
        recipient: impl Into<String>,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .rejected_recipients
            .insert(recipient.into(), Reply::new(code, message));
        self
    }

    /// Set the reply after message content (after `<CRLF>.<CRLF>`)
    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_reply = Reply::new(code, message);
        self
    }

    /// Answer `EHLO` with `502`, as a relay that only speaks RFC 821 would
    #[must_use]
    pub const fn with_ehlo_rejected(mut self) -> Self {
        self.config.ehlo_rejected = true;
        self
    }

    /// Add a delay before sending each reply
    #[must_use]
    pub const fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.config.reply_delay = Some(delay);
        self
    }

    pub async fn build(self) -> MockSmtpServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = Arc::new(self.config);
        let commands = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&commands);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let config = Arc::clone(&config);
                let commands = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = MockSmtpServer::handle_client(stream, config, commands).await;
                });
            }
        });

        MockSmtpServer {
            addr,
            commands,
            handle,
        }
    }
}
