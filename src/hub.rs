//! The broadcast hub: sole owner of the set of connected clients.
//!
//! All membership changes and all fan-out funnel through one task that
//! `select!`s over three submission channels (arrival, departure,
//! broadcast). Nothing else ever touches the membership set, so no lock is
//! needed and every join summary observes a consistent set.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// An identified, connected participant as the hub tracks it.
///
/// Two entries are the same client only when both the name and the outgoing
/// queue handle match; two connections sharing a name stay distinct.
#[derive(Debug, Clone)]
pub struct Client {
    pub name: String,
    pub outgoing: UnboundedSender<String>,
}

impl Client {
    pub fn new(name: impl Into<String>, outgoing: UnboundedSender<String>) -> Self {
        Self {
            name: name.into(),
            outgoing,
        }
    }

    fn same_identity(&self, other: &Client) -> bool {
        self.name == other.name && self.outgoing.same_channel(&other.outgoing)
    }
}

/// Cloneable submission side of the hub. Sessions talk to the hub only
/// through these three channels, never by direct call.
#[derive(Debug, Clone)]
pub struct HubHandle {
    arrivals: UnboundedSender<Client>,
    departures: UnboundedSender<Client>,
    broadcasts: UnboundedSender<String>,
}

impl HubHandle {
    /// Submits a newly identified client for registration.
    pub fn register(&self, client: Client) {
        if let Err(error) = self.arrivals.send(client) {
            warn!(%error, "hub is gone, dropping arrival");
        }
    }

    /// Submits a departure; the hub removes the entry and closes its queue.
    pub fn deregister(&self, client: Client) {
        if let Err(error) = self.departures.send(client) {
            warn!(%error, "hub is gone, dropping departure");
        }
    }

    /// Submits a line for delivery to every registered client.
    pub fn broadcast(&self, message: impl Into<String>) {
        if let Err(error) = self.broadcasts.send(message.into()) {
            warn!(%error, "hub is gone, dropping broadcast");
        }
    }
}

/// Creates a hub and the handle used to submit requests to it.
pub fn channel() -> (HubHandle, Hub) {
    let (arrivals_tx, arrivals) = mpsc::unbounded_channel();
    let (departures_tx, departures) = mpsc::unbounded_channel();
    let (broadcasts_tx, broadcasts) = mpsc::unbounded_channel();
    let handle = HubHandle {
        arrivals: arrivals_tx,
        departures: departures_tx,
        broadcasts: broadcasts_tx,
    };
    let hub = Hub {
        arrivals,
        departures,
        broadcasts,
        clients: Vec::new(),
    };
    (handle, hub)
}

/// The hub's control loop state. Run it on its own task with [`Hub::run`].
pub struct Hub {
    arrivals: UnboundedReceiver<Client>,
    departures: UnboundedReceiver<Client>,
    broadcasts: UnboundedReceiver<String>,
    clients: Vec<Client>,
}

impl Hub {
    /// Processes submissions one at a time until every handle is dropped.
    ///
    /// Polling is biased: arrivals before departures before broadcasts.
    /// Channels are FIFO, so a session's registration is always processed
    /// before the arrival announcement it submits right after, and its
    /// departure before the matching "has left" line.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(client) = self.arrivals.recv() => self.handle_arrival(client),
                Some(client) = self.departures.recv() => self.handle_departure(client),
                Some(message) = self.broadcasts.recv() => self.handle_broadcast(message),
                else => break,
            }
        }
    }

    fn handle_arrival(&mut self, client: Client) {
        let outgoing = client.outgoing.clone();
        self.clients.push(client);

        let names: Vec<&str> = self.clients.iter().map(|c| c.name.as_str()).collect();
        let summary = format!("{} clients: {}", self.clients.len(), names.join(", "));

        // A queue that is already closed here means the client's relay died
        // while its session was still registering, which violates the
        // ownership contract: only a departure may close the queue.
        outgoing
            .send(summary)
            .expect("new client's outgoing queue closed before its join summary");
    }

    fn handle_departure(&mut self, client: Client) {
        // Dropping the stored entry closes the outgoing queue, which is what
        // terminates the client's relay task. Unknown clients are a no-op.
        self.clients.retain(|existing| !existing.same_identity(&client));
    }

    fn handle_broadcast(&mut self, message: String) {
        for client in &self.clients {
            if client.outgoing.send(message.clone()).is_err() {
                debug!(name = %client.name, "skipping client with closed outgoing queue");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn probe_client(name: &str) -> (Client, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Client::new(name, tx), rx)
    }

    async fn recv(rx: &mut UnboundedReceiver<String>) -> String {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("outgoing queue closed unexpectedly")
    }

    #[tokio::test]
    async fn join_summary_counts_current_membership() {
        let (handle, hub) = channel();
        tokio::spawn(hub.run());

        let (alice, mut alice_rx) = probe_client("alice");
        handle.register(alice);
        assert_eq!(recv(&mut alice_rx).await, "1 clients: alice");

        let (bob, mut bob_rx) = probe_client("bob");
        handle.register(bob);
        assert_eq!(recv(&mut bob_rx).await, "2 clients: alice, bob");
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_client_once() {
        let (handle, hub) = channel();
        tokio::spawn(hub.run());

        let (alice, mut alice_rx) = probe_client("alice");
        let (bob, mut bob_rx) = probe_client("bob");
        handle.register(alice);
        handle.register(bob);
        recv(&mut alice_rx).await;
        recv(&mut bob_rx).await;

        handle.broadcast("hello everyone");

        assert_eq!(recv(&mut alice_rx).await, "hello everyone");
        assert_eq!(recv(&mut bob_rx).await, "hello everyone");
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn departure_closes_the_outgoing_queue() {
        let (handle, hub) = channel();
        tokio::spawn(hub.run());

        let (alice, mut alice_rx) = probe_client("alice");
        let (bob, mut bob_rx) = probe_client("bob");
        handle.register(alice.clone());
        handle.register(bob);
        recv(&mut alice_rx).await;
        recv(&mut bob_rx).await;

        // Confirm delivery before departing so the broadcast cannot be
        // reordered past the departure by the biased poll order.
        handle.broadcast("before departure");
        assert_eq!(recv(&mut alice_rx).await, "before departure");
        assert_eq!(recv(&mut bob_rx).await, "before departure");

        handle.deregister(alice);
        handle.broadcast("after departure");

        assert_eq!(recv(&mut bob_rx).await, "after departure");
        let closed = timeout(Duration::from_secs(1), alice_rx.recv())
            .await
            .expect("timed out waiting for queue closure");
        assert_eq!(closed, None);
    }

    #[tokio::test]
    async fn departure_of_unknown_client_is_a_no_op() {
        let (handle, hub) = channel();
        tokio::spawn(hub.run());

        let (alice, mut alice_rx) = probe_client("alice");
        handle.register(alice);
        recv(&mut alice_rx).await;

        let (stranger, _stranger_rx) = probe_client("stranger");
        handle.deregister(stranger);

        handle.broadcast("still here");
        assert_eq!(recv(&mut alice_rx).await, "still here");
    }

    #[tokio::test]
    async fn same_name_on_two_connections_stays_distinct() {
        let (handle, hub) = channel();
        tokio::spawn(hub.run());

        let (first, mut first_rx) = probe_client("alice");
        let (second, mut second_rx) = probe_client("alice");
        handle.register(first.clone());
        handle.register(second);
        assert_eq!(recv(&mut first_rx).await, "1 clients: alice");
        assert_eq!(recv(&mut second_rx).await, "2 clients: alice, alice");

        handle.deregister(first);
        handle.broadcast("only one left");

        assert_eq!(recv(&mut second_rx).await, "only one left");
        let closed = timeout(Duration::from_secs(1), first_rx.recv())
            .await
            .expect("timed out waiting for queue closure");
        assert_eq!(closed, None);
    }
}
