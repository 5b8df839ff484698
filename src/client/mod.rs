//! Client connection layer

pub mod client;
pub mod info_transport;

pub use client::{Client, ClientState, PING_COMMAND, PROBE_COMMAND};
pub use info_transport::{InfoTransport, TcpInfoTransport, COMMAND_TERMINATOR};
