/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

/// A reply of the server, code and text.
#[derive(Debug, Clone)]
struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    fn to_line(&self) -> String {
        format!("{} {}\r\n", self.code, self.text)
    }
}

#[derive(Debug, Clone)]
struct Behavior {
    auth: Reply,
    mail_from: Reply,
    rcpt_to: Reply,
    silent: bool,
    starttls: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            auth: Reply::new(235, "2.7.0 Authentication successful"),
            mail_from: Reply::new(250, "2.1.0 Ok"),
            rcpt_to: Reply::new(250, "2.1.5 Ok"),
            silent: false,
            starttls: false,
        }
    }
}

/// Configure a [`MockSmtpServer`].
#[derive(Debug, Default)]
pub struct MockSmtpServerBuilder {
    behavior: Behavior,
}

impl MockSmtpServerBuilder {
    /// Reply to `AUTH` with `code`.
    #[must_use]
    pub fn with_auth_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.behavior.auth = Reply::new(code, text);
        self
    }

    /// Reply to `MAIL FROM` with `code`.
    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.behavior.mail_from = Reply::new(code, text);
        self
    }

    /// Reply to `RCPT TO` with `code`.
    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, text: impl Into<String>) -> Self {
        self.behavior.rcpt_to = Reply::new(code, text);
        self
    }

    /// Accept connections but never send anything, not even the greeting.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.behavior.silent = true;
        self
    }

    /// Offer `STARTTLS`, then fail every handshake by answering the client
    /// hello with bytes that are not TLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.behavior.starttls = true;
        self
    }

    /// Start listening on an ephemeral port of localhost.
    ///
    /// # Errors
    ///
    /// * the listener cannot be bound
    pub async fn build(self) -> std::io::Result<MockSmtpServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let commands = Arc::new(Mutex::new(Vec::new()));
        let behavior = Arc::new(self.behavior);

        let task = tokio::spawn({
            let commands = commands.clone();
            async move {
                while let Ok((stream, peer)) = listener.accept().await {
                    tracing::debug!(%peer, "Mock server accepted a connection.");
                    let behavior = behavior.clone();
                    let commands = commands.clone();

                    tokio::spawn(async move {
                        if let Err(error) = serve(stream, &behavior, &commands).await {
                            tracing::warn!(%error, "Mock server connection failed.");
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands,
            task,
        })
    }
}

/// A scripted SMTP server, stopped when dropped.
///
/// The server answers `EHLO` with the `AUTH PLAIN LOGIN` extension, and
/// `STARTTLS` only if [`MockSmtpServerBuilder::with_starttls`] was called.
/// No TLS session is ever established.
pub struct MockSmtpServer {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockSmtpServer {
    /// Create a new builder for configuring the mock server.
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::default()
    }

    /// The address the server is listening on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every command line received so far, the message content excluded.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// The verbs of [`Self::commands`], upper cased.
    #[must_use]
    pub fn verbs(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|command| {
                command
                    .split(|c: char| c == ' ' || c == ':')
                    .next()
                    .unwrap_or_default()
                    .to_ascii_uppercase()
            })
            .collect()
    }
}

impl Drop for MockSmtpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn record(commands: &Mutex<Vec<String>>, command: &str) {
    if let Ok(mut commands) = commands.lock() {
        commands.push(command.to_owned());
    }
}

async fn serve(
    stream: TcpStream,
    behavior: &Behavior,
    commands: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    if behavior.silent {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        return Ok(());
    }

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    writer.write_all(b"220 mock.test ESMTP ready\r\n").await?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let command = line.trim_end();
        record(commands, command);

        let verb = command.to_ascii_uppercase();
        let reply = if verb.starts_with("EHLO") {
            let starttls = if behavior.starttls { "250-STARTTLS\r\n" } else { "" };
            format!("250-mock.test\r\n{starttls}250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n")
        } else if verb == "STARTTLS" && behavior.starttls {
            writer.write_all(b"220 2.0.0 Ready to start TLS\r\n").await?;
            return fail_handshake(reader, writer).await;
        } else if verb.starts_with("HELO") {
            "250 mock.test\r\n".to_owned()
        } else if verb.starts_with("AUTH") {
            behavior.auth.to_line()
        } else if verb.starts_with("MAIL FROM") {
            behavior.mail_from.to_line()
        } else if verb.starts_with("RCPT TO") {
            behavior.rcpt_to.to_line()
        } else if verb == "DATA" {
            writer
                .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .await?;
            loop {
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    return Ok(());
                }
                if line == ".\r\n" || line == ".\n" {
                    break;
                }
            }
            "250 2.0.0 Ok: queued\r\n".to_owned()
        } else if verb == "RSET" || verb == "NOOP" {
            "250 2.0.0 Ok\r\n".to_owned()
        } else if verb == "QUIT" {
            writer.write_all(b"221 2.0.0 Bye\r\n").await?;
            return Ok(());
        } else {
            "502 5.5.2 Command not recognized\r\n".to_owned()
        };

        writer.write_all(reply.as_bytes()).await?;
    }
}

async fn fail_handshake(
    mut reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    mut writer: tokio::net::tcp::OwnedWriteHalf,
) -> std::io::Result<()> {
    let mut buffer = [0; 1024];
    // client hello
    if reader.read(&mut buffer).await? == 0 {
        return Ok(());
    }
    writer.write_all(b"this is not tls\r\n").await?;

    while reader.read(&mut buffer).await? != 0 {}
    Ok(())
}

/// An address of localhost on which nothing listens.
///
/// # Panics
///
/// * no port can be bound
#[must_use]
pub fn unreachable_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
