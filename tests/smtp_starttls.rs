use dane_smtp::config::SmtpSettings;
use dane_smtp::dane::{DaneRecord, DaneTrustDecider, MailServerRecords, ServerTrust};
use dane_smtp::smtp::{connect_to_servers, SmtpSession};
use dane_smtp::utils::SmtpError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn certs(name: &str) -> Vec<CertificateDer<'static>> {
    let data = std::fs::read(fixture(name)).unwrap();
    pem::parse_many(data)
        .unwrap()
        .into_iter()
        .map(|p| CertificateDer::from(p.into_contents()))
        .collect()
}

fn server_config(with_intermediate: bool) -> Arc<ServerConfig> {
    let mut chain = certs("leaf.pem");
    if with_intermediate {
        chain.extend(certs("intermediate.pem"));
    }
    let key = pem::parse(std::fs::read(fixture("leaf.key")).unwrap()).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.into_contents()));

    let config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .unwrap();
    Arc::new(config)
}

/// Loopback SMTP server accepting connections until the test ends
fn start_server(config: Arc<ServerConfig>, offer_starttls: bool) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let _ = serve(stream, config.clone(), offer_starttls);
        }
    });
    port
}

fn serve(
    stream: std::net::TcpStream,
    config: Arc<ServerConfig>,
    offer_starttls: bool,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    reader
        .get_mut()
        .write_all(b"220 mx1.example.nl ESMTP test\r\n")?;

    let mut line = String::new();
    reader.read_line(&mut line)?;
    assert!(line.starts_with("EHLO "));
    if offer_starttls {
        reader
            .get_mut()
            .write_all(b"250-mx1.example.nl\r\n250-PIPELINING\r\n250 STARTTLS\r\n")?;
    } else {
        reader
            .get_mut()
            .write_all(b"250-mx1.example.nl\r\n250 PIPELINING\r\n")?;
        return Ok(());
    }

    line.clear();
    reader.read_line(&mut line)?;
    assert_eq!(line, "STARTTLS\r\n");
    reader.get_mut().write_all(b"220 2.0.0 Ready to start TLS\r\n")?;

    let connection = ServerConnection::new(config).map_err(io::Error::other)?;
    let mut tls = BufReader::new(StreamOwned::new(connection, reader.into_inner()));
    loop {
        line.clear();
        if tls.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let reply: &[u8] = match line.trim_end().split_whitespace().next() {
            Some("EHLO") => b"250-mx1.example.nl\r\n250 PIPELINING\r\n",
            Some("NOOP") => b"250 2.0.0 OK\r\n",
            Some("QUIT") => b"221 2.0.0 Bye\r\n",
            _ => b"500 5.5.1 Unknown command\r\n",
        };
        tls.get_mut().write_all(reply)?;
        tls.get_mut().flush()?;
        if line.starts_with("QUIT") {
            tls.get_mut().conn.send_close_notify();
            let _ = tls.get_mut().flush();
            return Ok(());
        }
    }
}

fn session(port: u16, wire_log: bool) -> SmtpSession {
    SmtpSession::new(SmtpSettings {
        port,
        wire_log,
        ..SmtpSettings::default()
    })
}

fn trust(names: &[&str]) -> Arc<dyn ServerTrust> {
    let records: HashSet<DaneRecord> = names
        .iter()
        .map(|name| DaneRecord::load(fixture(name)).unwrap())
        .collect();
    Arc::new(DaneTrustDecider::new(records))
}

#[test]
fn test_dane_ee_probe_succeeds() {
    let port = start_server(server_config(false), true);
    let report = session(port, true)
        .probe("127.0.0.1", trust(&["mx1.example.nl.tlsa.json"]))
        .unwrap();

    assert_eq!(report.host, "127.0.0.1");
    assert_eq!(report.greeting, "mx1.example.nl ESMTP test");
    assert!(report.protocol.starts_with("TLSv1_"));
    assert_ne!(report.cipher_suite, "Unknown");
}

#[test]
fn test_dane_ta_probe_succeeds() {
    let port = start_server(server_config(true), true);
    let report = session(port, false)
        .probe("127.0.0.1", trust(&["mx1.example.nl.2.tlsa.json"]))
        .unwrap();
    assert_eq!(report.address, format!("127.0.0.1:{}", port));
}

#[test]
fn test_dane_ta_without_intermediate_fails() {
    let port = start_server(server_config(false), true);
    let err = session(port, false)
        .probe("127.0.0.1", trust(&["mx1.example.nl.2.tlsa.json"]))
        .unwrap_err();
    assert!(matches!(err, SmtpError::Tls { .. }));
}

#[test]
fn test_mismatching_records_fail_handshake() {
    let port = start_server(server_config(true), true);
    let other = DaneRecord::from_fields(
        "example.nl",
        "mx1.example.nl",
        3,
        1,
        1,
        &[0u8; 32],
    )
    .unwrap();
    let trust: Arc<dyn ServerTrust> = Arc::new(DaneTrustDecider::new(HashSet::from([other])));

    let err = session(port, false).probe("127.0.0.1", trust).unwrap_err();
    match err {
        SmtpError::Tls { message } => assert!(message.contains("DANE"), "{}", message),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_missing_starttls_is_an_error() {
    let port = start_server(server_config(false), false);
    let err = session(port, false)
        .probe("127.0.0.1", trust(&["mx1.example.nl.tlsa.json"]))
        .unwrap_err();
    assert!(matches!(err, SmtpError::StartTlsUnsupported { .. }));
}

#[test]
fn test_connect_tries_servers_in_order() {
    let port = start_server(server_config(false), true);
    let records: HashSet<DaneRecord> =
        HashSet::from([DaneRecord::load(fixture("mx1.example.nl.tlsa.json")).unwrap()]);

    let mut servers = MailServerRecords::new();
    // Nothing listens on 127.0.0.2 for this port.
    servers.insert("127.0.0.2", records.clone());
    servers.insert("127.0.0.1", records);

    let outcome = connect_to_servers("example.nl", &servers, &session(port, false));
    assert!(outcome.is_connected());
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].server, "127.0.0.2");
    assert!(outcome.attempts[0].error.is_some());
    assert_eq!(outcome.attempts[1].server, "127.0.0.1");
    assert!(outcome.attempts[1].error.is_none());
}
