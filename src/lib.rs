//! A line-oriented chat relay over TCP.
//!
//! Anyone who connects is asked for a name; once named, every line they send
//! is relayed to every connected participant. Plain `netcat` is a perfectly
//! good client. Each module owns one concern:
//!
//! - [`cli`] parses the command-line flags for the relay binary.
//! - [`server`] binds the listener, runs the hub, and spawns one session per
//!   connection.
//! - [`hub`] owns the membership set and fans broadcasts out to each
//!   client's outgoing queue.
//! - [`session`] drives one connection through identification, chat, and
//!   teardown, racing input against the inactivity timeout.
//! - [`relay`] drains one client's outgoing queue onto its socket.
//!
//! Integration tests exercise the server over real sockets; the e2e test
//! drives the compiled binary.

pub mod cli;
pub mod hub;
pub mod relay;
pub mod server;
pub mod session;
