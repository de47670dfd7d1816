//! DNSSEC-aware DNS client
//!
//! Sends single MX/TLSA queries to one configured resolver and enforces that
//! answers requested as secure carry the authenticated-data (AD) flag. The
//! resolver itself is expected to validate DNSSEC (e.g. unbound); this client
//! only trusts its verdict.

use crate::config::DnsSettings;
use crate::utils::DnsError;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// EDNS payload size advertised on secure queries
const EDNS_PAYLOAD: u16 = 4096;

/// How a query travels to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// UDP first, retried over TCP when the answer is truncated
    UdpWithTcpFallback,
    /// TCP only
    Tcp,
}

/// Sends an encoded DNS request and returns the decoded response.
///
/// The network implementation is [`NetworkExchange`]; tests substitute
/// scripted answers.
pub trait DnsExchange: Send + Sync {
    fn exchange(&self, request: &Message, transport: Transport) -> Result<Message, DnsError>;
}

/// DNS client issuing secure (DNSSEC OK) and plain queries
pub struct SecureDnsClient {
    exchange: Box<dyn DnsExchange>,
    tcp_only: bool,
}

impl std::fmt::Debug for SecureDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureDnsClient")
            .field("tcp_only", &self.tcp_only)
            .finish_non_exhaustive()
    }
}

impl SecureDnsClient {
    /// Create a client on top of the given exchange, using UDP with TCP fallback
    pub fn new(exchange: impl DnsExchange + 'static) -> Self {
        Self {
            exchange: Box::new(exchange),
            tcp_only: false,
        }
    }

    /// Create a network client for the resolver described by the settings
    pub fn from_settings(settings: &DnsSettings) -> Result<Self, DnsError> {
        let server = resolver_address(settings)?;
        debug!("Using DNS resolver {}", server);
        let mut client = Self::new(NetworkExchange::new(server, settings.timeout()));
        client.set_tcp_only(settings.tcp_only);
        Ok(client)
    }

    /// Force every query (secure and insecure) over TCP
    pub fn set_tcp_only(&mut self, tcp_only: bool) {
        self.tcp_only = tcp_only;
    }

    /// Query `name` for `record_type`.
    ///
    /// Fails when the response code is not NOERROR, or when `secure` is set
    /// and the response lacks the AD flag. A single attempt is made.
    pub fn query(
        &self,
        name: &str,
        record_type: RecordType,
        secure: bool,
    ) -> Result<Message, DnsError> {
        let request = build_query(name, record_type, secure)?;
        let transport = if self.tcp_only {
            Transport::Tcp
        } else {
            Transport::UdpWithTcpFallback
        };

        debug!(
            "Querying {} {} ({})",
            name,
            record_type,
            if secure { "secure" } else { "insecure" }
        );
        let response = self.exchange.exchange(&request, transport)?;
        check_response(name, &response, secure)?;
        Ok(response)
    }
}

/// Build a recursive query, requesting DNSSEC records when `secure` is set
pub fn build_query(name: &str, record_type: RecordType, secure: bool) -> Result<Message, DnsError> {
    let qname = Name::from_ascii(name).map_err(|e| DnsError::InvalidName {
        domain: name.to_string(),
        message: e.to_string(),
    })?;

    let mut request = Message::new();
    request
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(qname, record_type));

    if secure {
        let mut edns = Edns::new();
        edns.set_max_payload(EDNS_PAYLOAD);
        edns.set_dnssec_ok(true);
        request.set_edns(edns);
        request.set_authentic_data(true);
    }

    Ok(request)
}

/// Reject responses with a failing rcode, or insecure answers to secure queries
pub fn check_response(name: &str, response: &Message, secure: bool) -> Result<(), DnsError> {
    // SERVFAIL covers both resolver trouble and a failed DNSSEC validation;
    // neither can be told apart from here, so nothing is retried.
    if response.response_code() != ResponseCode::NoError {
        return Err(DnsError::ResponseCode {
            domain: name.to_string(),
            code: response.response_code().to_string(),
        });
    }
    if secure && !response.authentic_data() {
        return Err(DnsError::Insecure {
            domain: name.to_string(),
        });
    }
    Ok(())
}

/// Find the socket address of the configured resolver
pub fn resolver_address(settings: &DnsSettings) -> Result<SocketAddr, DnsError> {
    let mut addr = if settings.uses_system_host() {
        system_nameserver()?
    } else if let Ok(ip) = settings.host.trim().parse::<IpAddr>() {
        SocketAddr::new(ip, 53)
    } else {
        (settings.host.trim(), 53)
            .to_socket_addrs()
            .map_err(|e| DnsError::Resolver {
                message: format!("cannot resolve {}: {}", settings.host, e),
            })?
            .next()
            .ok_or_else(|| DnsError::Resolver {
                message: format!("no address for {}", settings.host),
            })?
    };

    if settings.port > 0 {
        addr.set_port(settings.port);
    }
    Ok(addr)
}

fn system_nameserver() -> Result<SocketAddr, DnsError> {
    let (config, _) =
        hickory_resolver::system_conf::read_system_conf().map_err(|e| DnsError::Resolver {
            message: e.to_string(),
        })?;

    config
        .name_servers()
        .first()
        .map(|ns| ns.socket_addr)
        .ok_or_else(|| DnsError::Resolver {
            message: "system configuration lists no nameservers".to_string(),
        })
}

/// Blocking UDP/TCP exchange with a single resolver
#[derive(Debug, Clone)]
pub struct NetworkExchange {
    server: SocketAddr,
    timeout: Duration,
}

impl NetworkExchange {
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    fn exchange_udp(&self, name: &str, request: &Message) -> Result<Message, DnsError> {
        let bind_addr = if self.server.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let bytes = encode(name, request)?;

        let socket = UdpSocket::bind(bind_addr).map_err(|e| io_error(name, e))?;
        socket
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| io_error(name, e))?;
        socket.connect(self.server).map_err(|e| io_error(name, e))?;
        socket.send(&bytes).map_err(|e| io_error(name, e))?;

        let mut buf = vec![0u8; usize::from(EDNS_PAYLOAD)];
        loop {
            let len = socket.recv(&mut buf).map_err(|e| io_error(name, e))?;
            let response = decode(name, &buf[..len])?;
            // Stray datagrams for other ids are dropped, the read timeout
            // still bounds the wait.
            if response.id() == request.id() {
                return Ok(response);
            }
            debug!(
                "Ignoring DNS response with id {} (expected {})",
                response.id(),
                request.id()
            );
        }
    }

    fn exchange_tcp(&self, name: &str, request: &Message) -> Result<Message, DnsError> {
        let bytes = encode(name, request)?;
        let len = u16::try_from(bytes.len()).map_err(|_| DnsError::Query {
            domain: name.to_string(),
            message: "request too large for TCP framing".to_string(),
        })?;

        let mut stream =
            TcpStream::connect_timeout(&self.server, self.timeout).map_err(|e| io_error(name, e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| io_error(name, e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| io_error(name, e))?;

        let mut framed = Vec::with_capacity(bytes.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(&bytes);
        stream.write_all(&framed).map_err(|e| io_error(name, e))?;

        let mut len_buf = [0u8; 2];
        stream
            .read_exact(&mut len_buf)
            .map_err(|e| io_error(name, e))?;
        let mut buf = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
        stream.read_exact(&mut buf).map_err(|e| io_error(name, e))?;

        let response = decode(name, &buf)?;
        if response.id() != request.id() {
            return Err(DnsError::Query {
                domain: name.to_string(),
                message: format!(
                    "response id {} does not match request id {}",
                    response.id(),
                    request.id()
                ),
            });
        }
        Ok(response)
    }
}

impl DnsExchange for NetworkExchange {
    fn exchange(&self, request: &Message, transport: Transport) -> Result<Message, DnsError> {
        let name = query_name(request);
        match transport {
            Transport::Tcp => self.exchange_tcp(&name, request),
            Transport::UdpWithTcpFallback => {
                let response = self.exchange_udp(&name, request)?;
                if response.truncated() {
                    debug!("Truncated UDP answer for {}, retrying over TCP", name);
                    self.exchange_tcp(&name, request)
                } else {
                    Ok(response)
                }
            }
        }
    }
}

fn query_name(request: &Message) -> String {
    request
        .queries()
        .first()
        .map(|q| q.name().to_ascii())
        .unwrap_or_default()
}

fn encode(name: &str, message: &Message) -> Result<Vec<u8>, DnsError> {
    message.to_vec().map_err(|e| DnsError::Query {
        domain: name.to_string(),
        message: format!("failed to encode request: {}", e),
    })
}

fn decode(name: &str, bytes: &[u8]) -> Result<Message, DnsError> {
    Message::from_vec(bytes).map_err(|e| DnsError::Query {
        domain: name.to_string(),
        message: format!("failed to decode response: {}", e),
    })
}

fn io_error(name: &str, err: io::Error) -> DnsError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => DnsError::Timeout {
            domain: name.to_string(),
        },
        _ => DnsError::Query {
            domain: name.to_string(),
            message: err.to_string(),
        },
    }
}
