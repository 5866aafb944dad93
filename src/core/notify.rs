//! Notification sinks for committed status changes
//!
//! Delivery (push, SMS, in-app) belongs to an external service. The core
//! only hands events off, after the transition has been committed, and never
//! waits on or fails because of the sink.

use crate::core::traits::NotificationSink;
use crate::types::StatusChange;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, field, info};

/// Sink that records each event in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, event: StatusChange) {
        info!(
            tx = event.tx,
            user = event.user,
            from = event.from.map(field::display),
            to = %event.to,
            "transaction status changed"
        );
    }
}

/// Sink that forwards events to an unbounded channel
///
/// The receiving half is typically drained by a task that hands events to
/// the delivery service.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<StatusChange>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, UnboundedReceiver<StatusChange>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, event: StatusChange) {
        if let Err(dropped) = self.sender.send(event) {
            debug!(tx = dropped.0.tx, "notification receiver closed, event dropped");
        }
    }
}
