//! Failover client
//!
//! `connect` probes the active endpoint and, only if that fails and a
//! passive endpoint is configured, probes the passive one. There is no
//! loop: at most two attempts per call, active strictly first.

use serde::Serialize;

use super::info_transport::{InfoTransport, TcpInfoTransport};
use crate::config::{ClientConfig, Edition, EndpointConfig, EndpointRole};
use crate::utils::{Error, Logger, Result};

/// Lightweight command used to establish a session
pub const PROBE_COMMAND: &str = "node";

/// Command used by [`Client::ping`]
pub const PING_COMMAND: &str = "statistics";

const MODULE: &str = "client";

/// Client lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "endpoint", rename_all = "lowercase")]
pub enum ClientState {
    Unconnected,
    Connecting(EndpointRole),
    Connected(EndpointRole),
    Failed,
}

/// Cluster client with active/passive failover
pub struct Client<T: InfoTransport = TcpInfoTransport> {
    config: ClientConfig,
    transport: T,
    logger: Logger,
    state: ClientState,
}

impl Client<TcpInfoTransport> {
    /// Create a client using the TCP transport
    pub fn init(config: ClientConfig, logger: Logger) -> Result<Self> {
        let transport = TcpInfoTransport::new(logger.clone());
        Self::with_transport(config, transport, logger)
    }
}

impl<T: InfoTransport> Client<T> {
    /// Create a client over an explicit transport
    ///
    /// Re-validates `config`, then fails with `TlsUnavailable` if an
    /// endpoint needs TLS the transport cannot provide.
    pub fn with_transport(config: ClientConfig, transport: T, logger: Logger) -> Result<Self> {
        config.validate()?;

        if let Some(endpoint) = config
            .endpoints()
            .find(|e| e.tls_enabled() && !transport.supports_tls())
        {
            return Err(Error::TlsUnavailable(format!(
                "{} endpoint requires TLS but the transport was built without TLS support",
                endpoint.role
            )));
        }

        logger.debug(
            MODULE,
            &format!(
                "client initialized (edition {}, passive {})",
                config.edition,
                if config.passive.is_some() { "configured" } else { "none" }
            ),
        );

        Ok(Self {
            config,
            transport,
            logger,
            state: ClientState::Unconnected,
        })
    }

    /// Establish a session, failing over to the passive endpoint once
    pub fn connect(&mut self) -> Result<EndpointRole> {
        match self.attempt(EndpointRole::Active) {
            Ok(()) => Ok(EndpointRole::Active),
            Err(active_err) => {
                if self.config.passive.is_none() {
                    self.state = ClientState::Failed;
                    self.logger.error(
                        MODULE,
                        &format!("active endpoint failed, no passive configured: {}", active_err),
                    );
                    return Err(active_err);
                }

                self.logger.warn(
                    MODULE,
                    &format!("active endpoint failed, trying passive: {}", active_err),
                );
                match self.attempt(EndpointRole::Passive) {
                    Ok(()) => Ok(EndpointRole::Passive),
                    Err(passive_err) => {
                        self.state = ClientState::Failed;
                        self.logger
                            .error(MODULE, &format!("passive endpoint failed: {}", passive_err));
                        Err(passive_err)
                    }
                }
            }
        }
    }

    fn attempt(&mut self, role: EndpointRole) -> Result<()> {
        self.state = ClientState::Connecting(role);
        let endpoint = self.config.endpoint(role).ok_or_else(|| {
            Error::OperationUnsupported(format!("no {} endpoint configured", role))
        })?;

        self.transport.send_info(endpoint, PROBE_COMMAND)?;
        self.state = ClientState::Connected(role);
        self.logger.info(
            MODULE,
            &format!("connected to {} endpoint [{}]", role, endpoint.addresses().join(",")),
        );
        Ok(())
    }

    /// Run `statistics` on the selected endpoint
    ///
    /// Returns `Ok(false)` for an empty response, and a response of only
    /// ASCII whitespace counts as empty. Transport failures are propagated.
    /// Never fails over.
    pub fn ping(&self) -> Result<bool> {
        let response = self.info(PING_COMMAND)?;
        let healthy = !response.trim_ascii().is_empty();
        if !healthy {
            self.logger.warn(MODULE, "ping returned an empty response");
        }
        Ok(healthy)
    }

    /// Run an arbitrary info command on the selected endpoint
    pub fn info(&self, command: &str) -> Result<Vec<u8>> {
        let endpoint = self.selected_endpoint().ok_or_else(|| {
            Error::OperationUnsupported(format!("client is not connected (state {:?})", self.state))
        })?;
        Ok(self.transport.send_info(endpoint, command)?)
    }

    /// Release the session. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let ClientState::Connected(role) = self.state {
            self.logger.debug(MODULE, &format!("closing session on {} endpoint", role));
        }
        self.state = ClientState::Unconnected;
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Endpoint chosen by the last successful `connect`
    pub fn selected_endpoint(&self) -> Option<&EndpointConfig> {
        match self.state {
            ClientState::Connected(role) => self.config.endpoint(role),
            _ => None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn edition(&self) -> Edition {
        self.config.edition
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: InfoTransport> Drop for Client<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, TlsConfig};
    use crate::utils::{ConnectionError, ErrorKind};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::{self, BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// What the scripted transport does for an endpoint role
    #[derive(Clone)]
    enum Reply {
        Bytes(&'static [u8]),
        Refused,
        Timeout,
    }

    struct ScriptedTransport {
        replies: HashMap<EndpointRole, Reply>,
        calls: RefCell<Vec<(EndpointRole, String)>>,
        tls: bool,
    }

    impl ScriptedTransport {
        fn new(active: Reply, passive: Reply) -> Self {
            let mut replies = HashMap::new();
            replies.insert(EndpointRole::Active, active);
            replies.insert(EndpointRole::Passive, passive);
            Self {
                replies,
                calls: RefCell::new(Vec::new()),
                tls: false,
            }
        }

        fn calls_to(&self, role: EndpointRole) -> usize {
            self.calls.borrow().iter().filter(|(r, _)| *r == role).count()
        }

        fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(_, c)| c.clone()).collect()
        }
    }

    impl InfoTransport for ScriptedTransport {
        fn send_info(
            &self,
            endpoint: &EndpointConfig,
            command: &str,
        ) -> std::result::Result<Vec<u8>, ConnectionError> {
            self.calls
                .borrow_mut()
                .push((endpoint.role, command.to_string()));
            match self.replies[&endpoint.role] {
                Reply::Bytes(b) => Ok(b.to_vec()),
                Reply::Refused => Err(ConnectionError::ConnectFailed {
                    host: endpoint.hosts[0].clone(),
                    port: endpoint.port,
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                }),
                Reply::Timeout => Err(ConnectionError::Timeout(endpoint.read_timeout_ms)),
            }
        }

        fn supports_tls(&self) -> bool {
            self.tls
        }
    }

    fn config(with_passive: bool) -> ClientConfig {
        let cfg = ClientConfig::new(
            Edition::Community,
            EndpointConfig::new(EndpointRole::Active, ["a1"]),
        )
        .unwrap();
        if with_passive {
            cfg.with_passive(EndpointConfig::new(EndpointRole::Passive, ["p1"]))
                .unwrap()
        } else {
            cfg
        }
    }

    fn client(with_passive: bool, active: Reply, passive: Reply) -> Client<ScriptedTransport> {
        Client::with_transport(
            config(with_passive),
            ScriptedTransport::new(active, passive),
            Logger::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_active_reachable_skips_passive() {
        let mut c = client(true, Reply::Bytes(b"BB9\n"), Reply::Bytes(b"BB8\n"));

        assert_eq!(c.connect().unwrap(), EndpointRole::Active);
        assert_eq!(c.state(), ClientState::Connected(EndpointRole::Active));
        assert_eq!(c.transport().calls_to(EndpointRole::Active), 1);
        assert_eq!(c.transport().calls_to(EndpointRole::Passive), 0);
        assert_eq!(c.transport().commands(), vec![PROBE_COMMAND]);
        assert_eq!(c.selected_endpoint().unwrap().hosts, vec!["a1"]);
    }

    #[test]
    fn test_failover_to_passive() {
        let mut c = client(true, Reply::Refused, Reply::Bytes(b"BB8\n"));

        assert_eq!(c.connect().unwrap(), EndpointRole::Passive);
        assert_eq!(c.state(), ClientState::Connected(EndpointRole::Passive));
        assert_eq!(c.selected_endpoint().unwrap().hosts, vec!["p1"]);
        assert_eq!(c.transport().calls_to(EndpointRole::Active), 1);
        assert_eq!(c.transport().calls_to(EndpointRole::Passive), 1);
    }

    #[test]
    fn test_no_passive_single_attempt() {
        let mut c = client(false, Reply::Timeout, Reply::Bytes(b"unused"));

        let err = c.connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert_eq!(c.state(), ClientState::Failed);
        assert_eq!(c.transport().calls.borrow().len(), 1);
    }

    #[test]
    fn test_both_fail_at_most_two_attempts() {
        let mut c = client(true, Reply::Refused, Reply::Timeout);

        let err = c.connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert!(matches!(
            err,
            Error::ConnectionFailed(ConnectionError::Timeout(_))
        ));
        assert_eq!(c.state(), ClientState::Failed);
        let calls = c.transport().calls.borrow().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, EndpointRole::Active);
        assert_eq!(calls[1].0, EndpointRole::Passive);
    }

    #[test]
    fn test_ping_uses_selected_endpoint_only() {
        let mut c = client(true, Reply::Refused, Reply::Bytes(b"cluster_size=1\n"));
        c.connect().unwrap();

        assert!(c.ping().unwrap());
        let calls = c.transport().calls.borrow().clone();
        assert_eq!(calls.last().unwrap(), &(EndpointRole::Passive, PING_COMMAND.to_string()));
        assert_eq!(c.transport().calls_to(EndpointRole::Active), 1);
    }

    #[test]
    fn test_ping_empty_response_is_false() {
        let mut c = client(false, Reply::Bytes(b" \n"), Reply::Refused);
        c.connect().unwrap();
        assert!(!c.ping().unwrap());
    }

    #[test]
    fn test_ping_requires_connection() {
        let c = client(false, Reply::Bytes(b"x"), Reply::Refused);
        assert_eq!(c.ping().unwrap_err().kind(), ErrorKind::OperationUnsupported);
        assert!(c.transport().calls.borrow().is_empty());

        let mut failed = client(false, Reply::Refused, Reply::Refused);
        assert!(failed.connect().is_err());
        assert_eq!(failed.ping().unwrap_err().kind(), ErrorKind::OperationUnsupported);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut c = client(false, Reply::Bytes(b"x"), Reply::Refused);
        c.close();
        assert_eq!(c.state(), ClientState::Unconnected);

        c.connect().unwrap();
        c.close();
        c.close();
        assert_eq!(c.state(), ClientState::Unconnected);
        assert!(c.selected_endpoint().is_none());
    }

    #[test]
    fn test_unvalidated_config_rejected_at_init() {
        let empty: Vec<String> = Vec::new();
        let cfg = ClientConfig {
            edition: Edition::Community,
            active: EndpointConfig::new(EndpointRole::Active, empty),
            passive: None,
            credentials: Credentials::none(),
        };
        let err = Client::init(cfg, Logger::default()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredConfig);

        let mut cfg = config(false);
        cfg.passive = Some(EndpointConfig::new(EndpointRole::Active, ["p1"]));
        let err = Client::with_transport(
            cfg,
            ScriptedTransport::new(Reply::Bytes(b"x"), Reply::Bytes(b"x")),
            Logger::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredConfig);
    }

    #[test]
    fn test_ping_whitespace_only_is_false() {
        let mut c = client(false, Reply::Bytes(b"x"), Reply::Refused);
        c.connect().unwrap();
        c.transport.replies.insert(EndpointRole::Active, Reply::Bytes(b"\r\n\t "));
        assert!(!c.ping().unwrap());
    }

    #[test]
    fn test_tls_endpoint_needs_tls_transport() {
        let cfg = ClientConfig::new(
            Edition::Enterprise,
            EndpointConfig::new(EndpointRole::Active, ["a1"])
                .with_tls(TlsConfig::new("ca.pem", "cert.pem", "key.pem")),
        )
        .unwrap();

        let err = Client::with_transport(
            cfg.clone(),
            ScriptedTransport::new(Reply::Refused, Reply::Refused),
            Logger::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::TlsUnavailable);

        let mut transport = ScriptedTransport::new(Reply::Bytes(b"x"), Reply::Refused);
        transport.tls = true;
        let c = Client::with_transport(cfg, transport, Logger::default()).unwrap();
        assert_eq!(c.edition(), Edition::Enterprise);
    }

    /// Peer serving one scripted behavior per accepted connection:
    /// `Some(reply)` answers and closes, `None` stays silent.
    fn spawn_peer(script: Vec<Option<&'static [u8]>>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        thread::spawn(move || {
            for step in script {
                let (mut stream, _) = listener.accept().unwrap();
                let mut line = String::new();
                BufReader::new(stream.try_clone().unwrap())
                    .read_line(&mut line)
                    .unwrap();
                match step {
                    Some(reply) => stream.write_all(reply).unwrap(),
                    None => thread::sleep(Duration::from_secs(2)),
                }
            }
        });

        port
    }

    fn closed_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn tcp_config(active_port: u16, passive_port: Option<u16>) -> ClientConfig {
        let endpoint = |role, port| {
            EndpointConfig::new(role, ["127.0.0.1"])
                .with_port(port)
                .with_connect_timeout_ms(500)
                .with_read_timeout_ms(300)
        };
        let active = endpoint(EndpointRole::Active, active_port);
        let cfg = ClientConfig::new(Edition::Community, active).unwrap();
        match passive_port {
            Some(port) => cfg.with_passive(endpoint(EndpointRole::Passive, port)).unwrap(),
            None => cfg,
        }
    }

    #[test]
    fn test_tcp_failover_and_ping() {
        let passive = spawn_peer(vec![Some(b"BB8\n"), Some(b"cluster_size=2\n"), Some(b"")]);
        let config = tcp_config(closed_port(), Some(passive));
        let mut c = Client::init(config, Logger::default()).unwrap();

        assert_eq!(c.connect().unwrap(), EndpointRole::Passive);
        assert!(c.ping().unwrap());
        assert!(!c.ping().unwrap());
    }

    #[test]
    fn test_tcp_ping_timeout_propagates() {
        let active = spawn_peer(vec![Some(b"BB9\n"), None]);
        let mut c = Client::init(tcp_config(active, None), Logger::default()).unwrap();

        c.connect().unwrap();
        let err = c.ping().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert_eq!(c.state(), ClientState::Connected(EndpointRole::Active));
    }

    #[test]
    fn test_tcp_no_passive_fails() {
        let mut c = Client::init(tcp_config(closed_port(), None), Logger::default()).unwrap();
        assert_eq!(c.connect().unwrap_err().kind(), ErrorKind::ConnectionFailed);
        assert_eq!(c.state(), ClientState::Failed);
    }
}
