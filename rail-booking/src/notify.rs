use std::sync::Arc;

use rail_core::notify::{Notification, NotificationKind, Notifier, NotifyError};
use rail_core::repository::UserDirectory;
use rail_shared::{Booking, Train};
use tracing::{debug, warn};

/// Resolves the passenger and hands the message to the configured [`Notifier`].
///
/// Failures are logged here and never reach the caller as errors.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    users: Arc<dyn UserDirectory>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, users: Arc<dyn UserDirectory>) -> Self {
        Self { notifier, users }
    }

    /// Fire-and-forget: runs on a spawned task.
    pub fn dispatch(&self, kind: NotificationKind, booking: Booking, train: Train) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.deliver(kind, booking, train).await;
        });
    }

    /// Awaited delivery. Returns whether the passenger was notified.
    pub async fn deliver(&self, kind: NotificationKind, booking: Booking, train: Train) -> bool {
        let user = match self.users.get_user(booking.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(booking_id = %booking.id, user_id = %booking.user_id, "notification skipped, user not found");
                return false;
            }
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "notification skipped, user lookup failed");
                return false;
            }
        };

        let notification = Notification::new(kind, booking, user, train);
        if notification.recipient().is_none() {
            debug!(pnr = %notification.booking.pnr, "passenger has no email, not notified");
            return false;
        }
        match self.notifier.notify(&notification).await {
            Ok(()) => {
                debug!(pnr = %notification.booking.pnr, subject = %notification.subject(), "notification delivered");
                true
            }
            Err(NotifyError::NoRecipient) => false,
            Err(e) => {
                warn!(pnr = %notification.booking.pnr, error = %e, "notification failed");
                false
            }
        }
    }
}
