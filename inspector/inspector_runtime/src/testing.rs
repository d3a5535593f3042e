use crate::RenderSurface;
use crate::channel::EventChannel;
use crate::error::{InspectorError, InspectorResult};
use crate::protocol::OutboundEnvelope;
use crate::store::InputDescriptor;
use std::cell::RefCell;

#[derive(Debug, Default)]
pub(crate) struct RecordingChannel {
    sent: RefCell<Vec<OutboundEnvelope>>,
}

impl RecordingChannel {
    pub(crate) fn sent(&self) -> Vec<OutboundEnvelope> {
        self.sent.borrow().clone()
    }
}

impl EventChannel for RecordingChannel {
    fn send(&self, envelope: OutboundEnvelope) -> InspectorResult<()> {
        self.sent.borrow_mut().push(envelope);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClosedChannel;

impl EventChannel for ClosedChannel {
    fn send(&self, _envelope: OutboundEnvelope) -> InspectorResult<()> {
        Err(InspectorError::channel_unavailable("closed for test"))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    pub(crate) replaced: Vec<Vec<InputDescriptor>>,
    pub(crate) connection_changes: Vec<bool>,
}

impl RenderSurface for RecordingSurface {
    fn inputs_replaced(&mut self, inputs: &[InputDescriptor]) {
        self.replaced.push(inputs.to_vec());
    }

    fn connection_changed(&mut self, connected: bool) {
        self.connection_changes.push(connected);
    }
}
