//! Per-client writer: drains the outgoing queue onto the socket.

use tokio::{io::AsyncWriteExt, net::tcp::OwnedWriteHalf, sync::mpsc::UnboundedReceiver};
use tracing::debug;

/// Writes each queued message to the client as one line.
///
/// Terminates only when the hub closes the queue. Write failures are logged
/// and otherwise ignored; eviction of a broken client happens on its
/// session's read side, never here.
pub async fn run(mut writer: OwnedWriteHalf, mut outgoing: UnboundedReceiver<String>) {
    while let Some(message) = outgoing.recv().await {
        if let Err(error) = write_line(&mut writer, &message).await {
            debug!(?error, "failed to deliver message to client");
        }
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, message: &str) -> std::io::Result<()> {
    writer.write_all(message.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
