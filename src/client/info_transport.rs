//! Info-protocol transport
//!
//! One dial, one command line written, one response read to EOF, one close.
//! Nothing is kept between calls.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::config::EndpointConfig;
#[cfg(feature = "native-tls-backend")]
use crate::config::TlsConfig;
use crate::utils::{ConnectionError, Logger};

/// Line terminator appended to every command
pub const COMMAND_TERMINATOR: &[u8] = b"\n";

const MODULE: &str = "transport";

/// Single request/response exchange against one endpoint
pub trait InfoTransport {
    /// Send `command` to the first host of `endpoint` that accepts a
    /// connection and return the raw response bytes.
    fn send_info(&self, endpoint: &EndpointConfig, command: &str)
        -> Result<Vec<u8>, ConnectionError>;

    /// Whether endpoints with TLS material can be served
    fn supports_tls(&self) -> bool;
}

/// Plain TCP (and, with `native-tls-backend`, TLS) transport
#[derive(Debug, Clone)]
pub struct TcpInfoTransport {
    logger: Logger,
}

impl TcpInfoTransport {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Exchange one command with a single `host:port`
    pub fn send_info_to(
        &self,
        host: &str,
        port: u16,
        command: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Vec<u8>, ConnectionError> {
        let mut stream = dial(host, port, connect_timeout)?;
        self.logger
            .debug(MODULE, &format!("connected to {}:{}, sending {:?}", host, port, command));
        exchange(&mut stream, command, read_timeout)
    }

    /// Dial hosts in listed order; the first accepted connection is used
    fn dial_first<'e>(
        &self,
        endpoint: &'e EndpointConfig,
    ) -> Result<(TcpStream, &'e str), ConnectionError> {
        let mut last_err = ConnectionError::NoHosts;

        for host in &endpoint.hosts {
            match dial(host, endpoint.port, endpoint.connect_timeout()) {
                Ok(stream) => return Ok((stream, host.as_str())),
                Err(e) => {
                    self.logger.debug(
                        MODULE,
                        &format!("dial {}:{} failed: {}", host, endpoint.port, e),
                    );
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

impl Default for TcpInfoTransport {
    fn default() -> Self {
        Self::new(Logger::default())
    }
}

impl InfoTransport for TcpInfoTransport {
    fn send_info(
        &self,
        endpoint: &EndpointConfig,
        command: &str,
    ) -> Result<Vec<u8>, ConnectionError> {
        let (mut stream, host) = self.dial_first(endpoint)?;
        self.logger.debug(
            MODULE,
            &format!("{} endpoint using {}:{}", endpoint.role, host, endpoint.port),
        );

        match endpoint.tls {
            #[cfg(feature = "native-tls-backend")]
            Some(ref tls) => {
                // Bound the handshake by the read deadline as well
                stream.set_timeouts(endpoint.read_timeout())?;
                let mut tls_stream = handshake(stream, host, tls)?;
                exchange(&mut tls_stream, command, endpoint.read_timeout())
            }
            #[cfg(not(feature = "native-tls-backend"))]
            Some(_) => Err(ConnectionError::TlsFailed(
                "TLS support not compiled in".to_string(),
            )),
            None => exchange(&mut stream, command, endpoint.read_timeout()),
        }
    }

    fn supports_tls(&self) -> bool {
        cfg!(feature = "native-tls-backend")
    }
}

/// Resolve and connect, bounded by `connect_timeout` per address
fn dial(host: &str, port: u16, connect_timeout: Duration) -> Result<TcpStream, ConnectionError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ConnectionError::ConnectFailed {
            host: host.to_string(),
            port,
            source: e,
        })?
        .collect();

    let mut last_err = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, connect_timeout) {
            Ok(stream) => {
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(source) => ConnectionError::ConnectFailed {
            host: host.to_string(),
            port,
            source,
        },
        None => ConnectionError::NoAddress {
            host: host.to_string(),
            port,
        },
    })
}

/// Sockets whose read/write deadlines can be adjusted
trait Deadline {
    fn set_timeouts(&self, timeout: Duration) -> io::Result<()>;
}

impl Deadline for TcpStream {
    fn set_timeouts(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }
}

#[cfg(feature = "native-tls-backend")]
impl Deadline for native_tls::TlsStream<TcpStream> {
    fn set_timeouts(&self, timeout: Duration) -> io::Result<()> {
        self.get_ref().set_timeouts(timeout)
    }
}

/// Write the command line, then read until EOF under one overall deadline
fn exchange<S>(
    stream: &mut S,
    command: &str,
    read_timeout: Duration,
) -> Result<Vec<u8>, ConnectionError>
where
    S: Read + Write + Deadline,
{
    let timeout_ms = read_timeout.as_millis() as u64;
    let deadline = Instant::now() + read_timeout;

    stream.set_timeouts(read_timeout)?;
    let mut request = Vec::with_capacity(command.len() + COMMAND_TERMINATOR.len());
    request.extend_from_slice(command.as_bytes());
    request.extend_from_slice(COMMAND_TERMINATOR);
    stream.write_all(&request).map_err(|e| map_timeout(e, timeout_ms))?;
    stream.flush().map_err(|e| map_timeout(e, timeout_ms))?;

    let mut response = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ConnectionError::Timeout(timeout_ms));
        }
        stream.set_timeouts(remaining)?;

        match stream.read(&mut buf) {
            Ok(0) => return Ok(response),
            Ok(n) => response.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(map_timeout(e, timeout_ms)),
        }
    }
}

fn map_timeout(e: io::Error, timeout_ms: u64) -> ConnectionError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ConnectionError::Timeout(timeout_ms),
        _ => ConnectionError::Io(e),
    }
}

#[cfg(feature = "native-tls-backend")]
fn handshake(
    stream: TcpStream,
    host: &str,
    tls: &TlsConfig,
) -> Result<native_tls::TlsStream<TcpStream>, ConnectionError> {
    use native_tls::{Certificate, Identity, TlsConnector};

    let ca_data = std::fs::read(&tls.ca_file)
        .map_err(|e| ConnectionError::TlsFailed(format!("Failed to read CA cert: {}", e)))?;
    let ca = Certificate::from_pem(&ca_data)
        .map_err(|e| ConnectionError::TlsFailed(format!("Invalid CA cert: {}", e)))?;

    let cert_data = std::fs::read(&tls.cert_file)
        .map_err(|e| ConnectionError::TlsFailed(format!("Failed to read client cert: {}", e)))?;
    let key_data = std::fs::read(&tls.key_file)
        .map_err(|e| ConnectionError::TlsFailed(format!("Failed to read client key: {}", e)))?;
    let identity = Identity::from_pkcs8(&cert_data, &key_data)
        .map_err(|e| ConnectionError::TlsFailed(format!("Invalid client identity: {}", e)))?;

    let connector = TlsConnector::builder()
        .add_root_certificate(ca)
        .identity(identity)
        .build()
        .map_err(|e| ConnectionError::TlsFailed(format!("Failed to build TLS connector: {}", e)))?;

    connector
        .connect(tls.server_name(host), stream)
        .map_err(|e| ConnectionError::TlsFailed(format!("TLS handshake failed: {}", e)))
}
