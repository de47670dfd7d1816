use dane_smtp::config::{DnsSettings, Settings};
use dane_smtp::dane::{CertificateUsage, DaneResolver};
use dane_smtp::dns::{MxResolver, SecureDnsClient};
use dane_smtp::utils::DnsError;
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::rdata::tlsa::{CertUsage, Matching, Selector};
use hickory_proto::rr::rdata::{MX, TLSA};
use hickory_proto::rr::{Name, RData, Record};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;

/// Minimal DNS server answering from a fixed record list over UDP and TCP
#[derive(Clone, Default)]
struct Zone {
    records: Vec<Record>,
    authentic: bool,
    /// Query names answered with TC set (and no answers) over UDP
    truncate_udp: HashSet<String>,
}

struct Responder {
    addr: SocketAddr,
    log: Arc<Mutex<Vec<(&'static str, String)>>>,
}

impl Responder {
    fn start(zone: Zone) -> Self {
        let (udp, tcp) = bind_pair();
        let addr = udp.local_addr().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let udp_zone = zone.clone();
        let udp_log = log.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                let Ok((len, peer)) = udp.recv_from(&mut buf) else {
                    return;
                };
                let request = Message::from_vec(&buf[..len]).unwrap();
                udp_log.lock().unwrap().push(("udp", query_name(&request)));
                let response = answer(&udp_zone, &request, true);
                udp.send_to(&response.to_vec().unwrap(), peer).unwrap();
            }
        });

        let tcp_log = log.clone();
        thread::spawn(move || {
            for stream in tcp.incoming() {
                let Ok(mut stream) = stream else {
                    return;
                };
                let mut len = [0u8; 2];
                stream.read_exact(&mut len).unwrap();
                let mut buf = vec![0u8; usize::from(u16::from_be_bytes(len))];
                stream.read_exact(&mut buf).unwrap();

                let request = Message::from_vec(&buf).unwrap();
                tcp_log.lock().unwrap().push(("tcp", query_name(&request)));
                let bytes = answer(&zone, &request, false).to_vec().unwrap();
                stream
                    .write_all(&(bytes.len() as u16).to_be_bytes())
                    .unwrap();
                stream.write_all(&bytes).unwrap();
            }
        });

        Self { addr, log }
    }

    fn settings(&self, tcp_only: bool) -> DnsSettings {
        DnsSettings {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            tcp_only,
            timeout_secs: 2,
        }
    }

    fn client(&self, tcp_only: bool) -> Arc<SecureDnsClient> {
        Arc::new(SecureDnsClient::from_settings(&self.settings(tcp_only)).unwrap())
    }

    fn log(&self) -> Vec<(&'static str, String)> {
        self.log.lock().unwrap().clone()
    }
}

/// UDP and TCP sockets on the same loopback port
fn bind_pair() -> (UdpSocket, TcpListener) {
    for _ in 0..20 {
        let udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = udp.local_addr().unwrap().port();
        if let Ok(tcp) = TcpListener::bind(("127.0.0.1", port)) {
            return (udp, tcp);
        }
    }
    panic!("no free loopback port for UDP and TCP");
}

fn query_name(request: &Message) -> String {
    request.queries()[0].name().to_ascii()
}

fn answer(zone: &Zone, request: &Message, udp: bool) -> Message {
    let query = request.queries()[0].clone();
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_authentic_data(zone.authentic)
        .add_query(query.clone());

    if udp && zone.truncate_udp.contains(&query.name().to_ascii()) {
        response.set_truncated(true);
        return response;
    }

    for record in &zone.records {
        if record.name() == query.name() && record.record_type() == query.query_type() {
            response.add_answer(record.clone());
        }
    }
    response
}

fn mx(preference: u16, target: &str) -> Record {
    Record::from_rdata(
        Name::from_ascii("example.nl.").unwrap(),
        300,
        RData::MX(MX::new(preference, Name::from_ascii(target).unwrap())),
    )
}

fn tlsa(server: &str, usage: u8, data: &[u8]) -> Record {
    Record::from_rdata(
        Name::from_ascii(format!("_25._tcp.{}.", server)).unwrap(),
        300,
        RData::TLSA(TLSA::new(
            CertUsage::from(usage),
            Selector::from(1),
            Matching::from(1),
            data.to_vec(),
        )),
    )
}

fn example_zone() -> Zone {
    Zone {
        records: vec![
            mx(20, "mx2.example.nl."),
            mx(10, "MX1.example.nl."),
            tlsa("mx1.example.nl", 3, &[0xaa; 32]),
            tlsa("mx1.example.nl", 2, &[0xbb; 32]),
            tlsa("mx2.example.nl", 3, &[0xcc; 32]),
        ],
        authentic: true,
        truncate_udp: HashSet::new(),
    }
}

#[test]
fn test_secure_mx_over_udp() {
    let responder = Responder::start(example_zone());
    let mx = MxResolver::new(responder.client(false));

    let servers = mx.resolve_mail_exchangers_secure("example.nl").unwrap();
    assert_eq!(servers, vec!["mx1.example.nl", "mx2.example.nl"]);
    assert_eq!(responder.log(), vec![("udp", "example.nl.".to_string())]);
}

#[test]
fn test_resolve_dane_records_end_to_end() {
    let responder = Responder::start(example_zone());
    let resolver = DaneResolver::new(responder.client(false));

    let result = resolver.resolve_dane_records("example.nl").unwrap();
    assert_eq!(result.servers(), vec!["mx1.example.nl", "mx2.example.nl"]);

    let usages: HashSet<CertificateUsage> = result
        .get("mx1.example.nl")
        .unwrap()
        .iter()
        .map(|r| r.certificate_usage())
        .collect();
    assert_eq!(
        usages,
        HashSet::from([CertificateUsage::DaneEe, CertificateUsage::DaneTa])
    );
}

#[test]
fn test_truncated_answer_retried_over_tcp() {
    let mut zone = example_zone();
    zone.truncate_udp.insert("_25._tcp.mx1.example.nl.".to_string());
    let responder = Responder::start(zone);
    let resolver = DaneResolver::new(responder.client(false));

    let records = resolver
        .resolve_server_records("example.nl", "mx1.example.nl")
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(
        responder.log(),
        vec![
            ("udp", "_25._tcp.mx1.example.nl.".to_string()),
            ("tcp", "_25._tcp.mx1.example.nl.".to_string()),
        ]
    );
}

#[test]
fn test_tcp_only_skips_udp() {
    let responder = Responder::start(example_zone());
    let mx = MxResolver::new(responder.client(true));

    let servers = mx.resolve_mail_exchangers("example.nl", false).unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(responder.log(), vec![("tcp", "example.nl.".to_string())]);
}

#[test]
fn test_unauthenticated_resolver() {
    let mut zone = example_zone();
    zone.authentic = false;
    let responder = Responder::start(zone);

    let mx = MxResolver::new(responder.client(false));
    assert!(matches!(
        mx.resolve_mail_exchangers_secure("example.nl"),
        Err(DnsError::Insecure { .. })
    ));
    assert_eq!(
        mx.resolve_mail_exchangers("example.nl", false).unwrap().len(),
        2
    );

    // Insecure MX is allowed, TLSA is not: the walk stops at the first server.
    let mut settings = Settings::default();
    settings.dns = responder.settings(false);
    settings.dane.secure_mx = false;
    let resolver = DaneResolver::from_settings(&settings).unwrap();
    assert!(resolver.resolve_dane_records("example.nl").unwrap().is_empty());
}

#[test]
fn test_silent_server_times_out() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap();
    let client = SecureDnsClient::from_settings(&DnsSettings {
        host: addr.ip().to_string(),
        port: addr.port(),
        tcp_only: false,
        timeout_secs: 1,
    })
    .unwrap();

    let mx = MxResolver::new(Arc::new(client));
    assert!(matches!(
        mx.resolve_mail_exchangers_secure("example.nl"),
        Err(DnsError::Timeout { .. })
    ));
    drop(silent);
}
