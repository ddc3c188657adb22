use async_trait::async_trait;
use rail_shared::{Booking, BookingStatus, Train, User};

/// Why a passenger is being contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    BookingConfirmed,
    StatusChanged { status: BookingStatus },
    Delayed { delay_minutes: i32 },
    TrainCancelled { reason: Option<String> },
}

/// Fully resolved message input. Formatting and delivery belong to the [`Notifier`].
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub booking: Booking,
    pub user: User,
    pub train: Train,
}

impl Notification {
    pub fn new(kind: NotificationKind, booking: Booking, user: User, train: Train) -> Self {
        Self { kind, booking, user, train }
    }

    pub fn recipient(&self) -> Option<&str> {
        self.user.contact_email()
    }

    pub fn subject(&self) -> String {
        match &self.kind {
            NotificationKind::BookingConfirmed => format!("Booking Confirmation - PNR: {}", self.booking.pnr),
            NotificationKind::StatusChanged { status } => {
                format!("Booking Status Update - {}", capitalize(status.as_str()))
            }
            NotificationKind::Delayed { .. } => format!("Train Delay Notification - {}", self.train.number),
            NotificationKind::TrainCancelled { .. } => format!("Train Cancellation Notice - {}", self.train.number),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("recipient has no email address")]
    NoRecipient,
    #[error("message rejected: {0}")]
    Rejected(String),
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// Delivery channel for passenger notifications (email or equivalent).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_status() {
        assert_eq!(capitalize("cancelled"), "Cancelled");
        assert_eq!(capitalize(""), "");
    }
}
