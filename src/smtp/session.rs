//! SMTP STARTTLS probe
//!
//! Connects to a mail server, upgrades the session with STARTTLS and lets the
//! DANE verifier decide whether the presented certificate chain is trusted.
//! No mail is sent and no authentication is attempted.

use crate::config::SmtpSettings;
use crate::dane::ServerTrust;
use crate::smtp::verifier::DaneCertVerifier;
use crate::smtp::wire_log::WireLog;
use crate::utils::SmtpError;
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, StreamOwned};
use serde::Serialize;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a successful probe
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub host: String,
    pub address: String,
    pub greeting: String,
    pub protocol: String,
    pub cipher_suite: String,
}

/// A reply made of one or more lines sharing a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    /// Whether an EHLO reply advertises `keyword`
    pub fn has_extension(&self, keyword: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
        })
    }

    fn text(&self) -> String {
        format!("{} {}", self.code, self.lines.join(" / "))
    }
}

/// Runs the STARTTLS probe against mail servers
#[derive(Debug, Clone)]
pub struct SmtpSession {
    settings: SmtpSettings,
}

impl SmtpSession {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    /// Greet `host`, switch to TLS and exchange a NOOP over the secured channel.
    ///
    /// Servers that do not offer STARTTLS are an error, there is no
    /// plaintext fallback.
    pub fn probe(
        &self,
        host: &str,
        trust: Arc<dyn ServerTrust>,
    ) -> Result<SessionReport, SmtpError> {
        let stream = self.connect(host)?;
        let address = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();

        let mut plain = Dialog::new(stream, self.settings.wire_log);
        let greeting = plain.expect(220)?;
        let ehlo = plain.command(&format!("EHLO {}", self.settings.helo_name), 250)?;
        if !ehlo.has_extension("STARTTLS") {
            return Err(SmtpError::StartTlsUnsupported {
                host: host.to_string(),
            });
        }
        plain.command("STARTTLS", 220)?;
        let stream = plain.into_stream()?;

        let config = Arc::new(DaneCertVerifier::new(trust).client_config()?);
        let server_name =
            ServerName::try_from(host.to_string()).map_err(|_| SmtpError::InvalidServerName {
                host: host.to_string(),
            })?;
        let connection = ClientConnection::new(config, server_name)?;
        let mut tls = StreamOwned::new(connection, stream);
        while tls.conn.is_handshaking() {
            tls.conn.complete_io(&mut tls.sock).map_err(tls_error)?;
        }

        let protocol = tls
            .conn
            .protocol_version()
            .map(|v| format!("{:?}", v))
            .unwrap_or_else(|| "Unknown".to_string());
        let cipher_suite = tls
            .conn
            .negotiated_cipher_suite()
            .map(|cs| format!("{:?}", cs.suite()))
            .unwrap_or_else(|| "Unknown".to_string());
        debug!("TLS established with {}: {} {}", host, protocol, cipher_suite);

        let mut secure = Dialog::new(tls, self.settings.wire_log);
        secure.command(&format!("EHLO {}", self.settings.helo_name), 250)?;
        secure.command("NOOP", 250)?;
        secure.command("QUIT", 221)?;

        let mut tls = secure.into_stream()?;
        tls.conn.send_close_notify();
        // The server may already have closed; the probe has succeeded.
        let _ = tls.conn.complete_io(&mut tls.sock);

        Ok(SessionReport {
            host: host.to_string(),
            address,
            greeting: greeting.lines.join(" "),
            protocol,
            cipher_suite,
        })
    }

    fn connect(&self, host: &str) -> Result<TcpStream, SmtpError> {
        let port = self.settings.port;
        let connect_error = |message: String| SmtpError::Connect {
            host: host.to_string(),
            port,
            message,
        };

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| connect_error(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            debug!("Connecting to {} ({})", host, addr);
            match TcpStream::connect_timeout(&addr, self.settings.connect_timeout()) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.settings.read_timeout()))?;
                    stream.set_write_timeout(Some(self.settings.read_timeout()))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(connect_error(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses found".to_string()),
        ))
    }
}

fn tls_error(err: io::Error) -> SmtpError {
    SmtpError::Tls {
        message: err.to_string(),
    }
}

/// Command/reply exchange over a plain or TLS stream
struct Dialog<S: Read + Write> {
    reader: BufReader<S>,
    sent: Option<WireLog>,
    received: Option<WireLog>,
}

impl<S: Read + Write> Dialog<S> {
    fn new(stream: S, wire_log: bool) -> Self {
        Self {
            reader: BufReader::new(stream),
            sent: wire_log.then(|| WireLog::new("C:")),
            received: wire_log.then(|| WireLog::new("S:")),
        }
    }

    fn command(&mut self, command: &str, expected: u16) -> Result<Reply, SmtpError> {
        let line = format!("{}\r\n", command);
        if let Some(log) = self.sent.as_mut() {
            log.write_all(line.as_bytes())?;
            log.flush()?;
        }
        let stream = self.reader.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.flush()?;
        self.expect(expected)
    }

    fn expect(&mut self, expected: u16) -> Result<Reply, SmtpError> {
        let mut lines = Vec::new();
        let code = loop {
            let mut raw = String::new();
            if self.reader.read_line(&mut raw)? == 0 {
                return Err(SmtpError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
            if let Some(log) = self.received.as_mut() {
                log.write_all(raw.as_bytes())?;
                log.flush()?;
            }

            let line = raw.trim_end_matches(['\r', '\n']);
            let (line_code, more, text) =
                parse_reply_line(line).ok_or_else(|| SmtpError::Protocol {
                    expected,
                    reply: line.to_string(),
                })?;
            lines.push(text.to_string());
            if !more {
                break line_code;
            }
        };

        let reply = Reply { code, lines };
        if reply.code != expected {
            return Err(SmtpError::Protocol {
                expected,
                reply: reply.text(),
            });
        }
        Ok(reply)
    }

    /// Give back the stream, refusing if the server sent data ahead of time
    fn into_stream(self) -> Result<S, SmtpError> {
        if !self.reader.buffer().is_empty() {
            return Err(SmtpError::Protocol {
                expected: 220,
                reply: "unexpected data received before TLS negotiation".to_string(),
            });
        }
        Ok(self.reader.into_inner())
    }
}

/// Split a reply line into code, continuation flag and text
pub fn parse_reply_line(line: &str) -> Option<(u16, bool, &str)> {
    let code = line.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = code.parse().ok()?;
    match line.as_bytes().get(3) {
        None => Some((code, false, "")),
        Some(b'-') => Some((code, true, &line[4..])),
        Some(b' ') => Some((code, false, &line[4..])),
        Some(_) => None,
    }
}
