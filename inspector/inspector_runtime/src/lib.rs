pub mod channel;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use crate::channel::OutboundQueue;
use crate::protocol::{decode_inbound, encode_registration, registration};
use futures_util::{Sink, SinkExt, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub use crate::channel::EventChannel;
pub use crate::config::LaunchConfig;
pub use crate::connection::{
    ConnectionIdentity, ConnectionManager, HandshakeOutcome, SessionState,
};
pub use crate::dispatcher::{Dispatched, EventDispatcher, IgnoreReason};
pub use crate::error::{InspectorError, InspectorResult};
pub use crate::protocol::{
    HOST_TO_INSPECTOR_CAP, INSPECTOR_TO_HOST_CAP, InboundMessage, OutboundEnvelope,
};
pub use crate::store::{InputDescriptor, SettingsSnapshot, SettingsStore};

/// The UI that displays the snapshot. It reads store state through these
/// notifications and feeds edits back as [`LocalEdit`]s.
pub trait RenderSurface {
    fn inputs_replaced(&mut self, inputs: &[InputDescriptor]);

    fn connection_changed(&mut self, connected: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    FunctionName(String),
    SelectedIndex(i64),
}

/// Connects to the host, registers, and drives the session until the host
/// socket closes. Host frames and local edits are handled on this task
/// only, so the snapshot has a single writer.
pub async fn run<S: RenderSurface>(
    config: LaunchConfig,
    surface: S,
    mut edits: mpsc::Receiver<LocalEdit>,
) -> InspectorResult<()> {
    config.validate()?;
    if let Some(info) = config.host_info()? {
        tracing::debug!(%info, "host application info");
    }

    let url = config.host_url();
    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|err| InspectorError::transport(format!("failed to connect to {url}: {err}")))?;
    tracing::info!(%url, uuid = %config.uuid, "host socket open");

    let (mut sink, mut stream) = socket.split();
    let frame = encode_registration(&registration(
        config.register_event.as_str(),
        config.uuid.as_str(),
    ))?;
    sink.send(Message::text(frame))
        .await
        .map_err(|err| InspectorError::transport(format!("registration failed: {err}")))?;

    let queue_capacity = config.outbound_queue_cap;
    let (tx, rx) = mpsc::channel(queue_capacity);
    let writer_handle = tokio::spawn(writer_loop(sink, rx));

    let mut dispatcher =
        EventDispatcher::new(OutboundQueue::new(tx, queue_capacity), surface);
    dispatcher.on_message(&config.handshake_message()?);

    let mut edits_open = true;
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&mut dispatcher, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(%err, "host socket error");
                    break;
                }
            },
            edit = edits.recv(), if edits_open => match edit {
                Some(edit) => dispatcher.apply_local_edit(edit),
                None => edits_open = false,
            },
        }
    }

    dispatcher.on_channel_lost();
    let dropped = dispatcher.store().channel().dropped();
    if dropped > 0 {
        tracing::warn!(dropped, "outbound messages dropped during session");
    }
    // Releases the last queue sender so the writer drains and exits.
    drop(dispatcher);

    match writer_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(%err, "writer task returned error"),
        Err(err) => tracing::warn!(%err, "writer task join failed"),
    }

    Ok(())
}

pub async fn writer_loop<W>(mut sink: W, mut rx: mpsc::Receiver<String>) -> InspectorResult<()>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(frame) = rx.recv().await {
        sink.send(Message::text(frame))
            .await
            .map_err(|err| InspectorError::transport(format!("failed to write frame: {err}")))?;
    }

    if let Err(err) = sink.close().await {
        tracing::debug!(%err, "host socket already closed");
    }
    Ok(())
}

fn handle_frame<C: EventChannel, S: RenderSurface>(
    dispatcher: &mut EventDispatcher<C, S>,
    frame: &str,
) {
    match decode_inbound(frame) {
        Ok(message) => {
            dispatcher.on_message(&message);
        }
        Err(err) => tracing::warn!(%err, "dropping undecodable host frame"),
    }
}
