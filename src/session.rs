//! Per-connection session: identification, inactivity timeout, chat relay.
//!
//! Each connection gets two cooperating tasks besides its relay: a
//! line-reader that turns every inbound line into a notification, and the
//! session future itself, which races those notifications against the
//! inactivity timer and talks to the hub. The timer is re-armed on every
//! received line, not tracked as whole-session idle time.

use std::time::Duration;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::{tcp::OwnedReadHalf, TcpStream},
    select,
    sync::mpsc::{self, Sender},
    time::sleep,
};
use tracing::{debug, info};

use crate::{
    hub::{Client, HubHandle},
    relay,
};

/// Runs one connection to completion.
///
/// The connection is closed on stream end, read error, or `idle_timeout`
/// elapsing without input. A client that never supplied a name leaves no
/// trace at the hub; a registered client is deregistered and its departure
/// announced.
pub async fn run(stream: TcpStream, hub: HubHandle, idle_timeout: Duration) {
    let peer = stream.peer_addr().ok();
    let (read_half, write_half) = stream.into_split();

    let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
    tokio::spawn(relay::run(write_half, outgoing_rx));

    let (lines_tx, mut lines) = mpsc::channel(1);
    let reader = tokio::spawn(read_lines(read_half, lines_tx));

    if outgoing.send("Input your name:".to_string()).is_err() {
        reader.abort();
        return;
    }

    // Identification: the first line to arrive within the window is the
    // name, taken verbatim.
    let name = select! {
        line = lines.recv() => match line {
            Some(line) => line,
            None => {
                debug!(?peer, "connection closed before identification");
                reader.abort();
                return;
            }
        },
        _ = sleep(idle_timeout) => {
            info!(?peer, "closing connection that never identified");
            reader.abort();
            return;
        }
    };

    let client = Client::new(name.clone(), outgoing.clone());
    hub.register(client.clone());
    hub.broadcast(format!("{name} has arrived"));
    info!(?peer, %name, "client joined");

    let reason = loop {
        select! {
            line = lines.recv() => match line {
                Some(text) => hub.broadcast(format!("{name}: {text}")),
                None => break "disconnected",
            },
            _ = sleep(idle_timeout) => break "timed out",
        }
    };

    hub.deregister(client);
    hub.broadcast(format!("{name} has left"));
    info!(?peer, %name, reason, "client departed");

    // Aborting the reader drops the read half; together with the relay
    // draining to closure this is what closes the socket.
    reader.abort();
}

/// Turns each inbound line into a notification for the session.
///
/// Stream end and read errors both simply end the notifications; the
/// session treats the two identically.
async fn read_lines(read_half: OwnedReadHalf, lines: Sender<String>) {
    let mut reader = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        if lines.send(line).await.is_err() {
            break;
        }
    }
}
