use async_trait::async_trait;
use handlebars::{Handlebars, RenderError, TemplateError};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rail_core::notify::{Notification, NotificationKind, Notifier, NotifyError};
use rail_shared::pii::Masked;
use rail_shared::{BookingStatus, Passenger};
use serde::Serialize;
use tracing::info;

use crate::app_config::EmailConfig;

/// SMTP delivery.
pub struct SmtpNotifier {
    host: String,
    port: u16,
    credentials: Credentials,
    from: String,
    templates: MailTemplates,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, TemplateError> {
        let address = config.from_address.clone().unwrap_or_else(|| config.username.clone());
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            credentials: Credentials::new(config.username.clone(), config.password.clone()),
            from: format!("{} <{}>", config.from_name, address),
            templates: MailTemplates::new()?,
        })
    }

    fn build_transport(&self) -> Result<SmtpTransport, NotifyError> {
        Ok(SmtpTransport::starttls_relay(&self.host)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let to = notification.recipient().ok_or(NotifyError::NoRecipient)?;

        let html = self
            .templates
            .render(notification)
            .map_err(|e| NotifyError::Rejected(format!("Failed to render email: {e}")))?;

        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| NotifyError::Rejected(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| NotifyError::Rejected(format!("Invalid to address: {e}")))?)
            .subject(notification.subject())
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| NotifyError::Rejected(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| NotifyError::Transport(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| NotifyError::Transport(format!("Email task failed: {e}")))??;

        info!(to = %Masked(to), subject = %notification.subject(), "email sent");
        Ok(())
    }
}

/// Used when no SMTP server is configured: records what would have been sent.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let to = notification.recipient().ok_or(NotifyError::NoRecipient)?;
        info!(
            to = %Masked(to),
            subject = %notification.subject(),
            pnr = %notification.booking.pnr,
            "email not configured, notification logged only"
        );
        Ok(())
    }
}

const RED: &str = "#dc2626";
const GREEN: &str = "#059669";
const AMBER: &str = "#f59e0b";
const BLUE: &str = "#1a56db";

const NOTIFICATION: &str = "notification";

#[derive(Serialize)]
struct MailContext<'a> {
    color: &'static str,
    heading: &'static str,
    banner: Option<String>,
    pnr: &'a str,
    train_line: String,
    source: &'a str,
    destination: &'a str,
    journey_date: String,
    confirmed: bool,
    seat_class: String,
    passenger_count: usize,
    total_fare: i32,
    passengers: &'a [Passenger],
}

/// Handlebars registry for notification emails. Values are HTML-escaped on render.
pub struct MailTemplates {
    hbs: Handlebars<'static>,
}

impl MailTemplates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_template_string(
            NOTIFICATION,
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/notification.html.hbs")),
        )?;
        Ok(Self { hbs })
    }

    pub fn render(&self, n: &Notification) -> Result<String, RenderError> {
        let train = &n.train;
        let booking = &n.booking;
        let train_line = format!("{} ({})", train.name, train.number);

        let (color, heading, banner) = match &n.kind {
            NotificationKind::BookingConfirmed => (BLUE, "Your Booking is Confirmed!", None),
            NotificationKind::StatusChanged { status } => {
                let color = match status {
                    BookingStatus::Confirmed => GREEN,
                    BookingStatus::Cancelled => RED,
                    BookingStatus::Waiting => AMBER,
                };
                (
                    color,
                    "Booking Status Update",
                    Some(format!("Your booking status has been updated to {}", status.as_str())),
                )
            }
            NotificationKind::Delayed { delay_minutes } => (
                RED,
                "Train Delay Alert",
                Some(format!("Your train {train_line} is delayed by {delay_minutes} minutes.")),
            ),
            NotificationKind::TrainCancelled { reason } => (
                RED,
                "Train Cancellation Notice",
                Some(match reason {
                    Some(r) => format!("Your train {train_line} has been cancelled. Reason: {r}"),
                    None => format!("Your train {train_line} has been cancelled."),
                }),
            ),
        };

        let context = MailContext {
            color,
            heading,
            banner,
            pnr: &booking.pnr,
            train_line,
            source: &train.source,
            destination: &train.destination,
            journey_date: booking.journey_date.to_string(),
            confirmed: n.kind == NotificationKind::BookingConfirmed,
            seat_class: booking.seat_class.as_str().to_uppercase(),
            passenger_count: booking.passengers.len(),
            total_fare: booking.total_fare,
            passengers: &booking.passengers,
        };
        self.hbs.render(NOTIFICATION, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rail_shared::{Booking, Passenger, PerClass, Role, RunDay, SeatClass, Train, TrainStatus, User};
    use uuid::Uuid;

    fn notification(kind: NotificationKind, passenger: &str) -> Notification {
        let train = Train {
            id: Uuid::new_v4(),
            number: "12627".into(),
            name: "Karnataka Express".into(),
            source: "Bengaluru".into(),
            destination: "New Delhi".into(),
            departure_time: "19:20".into(),
            arrival_time: "09:00".into(),
            duration: "37h 40m".into(),
            distance: 2365,
            days: vec![RunDay::Daily],
            fare: PerClass::default(),
            available_seats: PerClass::default(),
            total_seats: PerClass::default(),
            status: TrainStatus::OnTime,
            delay_minutes: 0,
            status_reason: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let user = User { id: Uuid::new_v4(), name: "Meera".into(), email: Some("meera@example.com".into()), role: Role::User };
        let booking = Booking::new(
            "9876543210".into(),
            user.id,
            train.id,
            SeatClass::Sleeper,
            NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
            vec![Passenger { name: passenger.into(), age: 34, gender: "F".into(), seat_number: None }],
            650,
        );
        Notification::new(kind, booking, user, train)
    }

    fn render(n: &Notification) -> String {
        MailTemplates::new().unwrap().render(n).unwrap()
    }

    #[test]
    fn test_confirmation_lists_passengers_escaped() {
        let html = render(&notification(NotificationKind::BookingConfirmed, "<script>x</script>"));
        assert!(html.contains("9876543210"));
        assert!(html.contains("Karnataka Express (12627)"));
        assert!(html.contains("SLEEPER"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_delay_mentions_minutes() {
        let html = render(&notification(NotificationKind::Delayed { delay_minutes: 45 }, "Meera"));
        assert!(html.contains("delayed by 45 minutes"));
        assert!(!html.contains("Passenger Details"));
    }

    #[test]
    fn test_cancellation_reason_escaped() {
        let html = render(&notification(
            NotificationKind::TrainCancelled { reason: Some("Flooding & track damage".into()) },
            "Meera",
        ));
        assert!(html.contains("Reason: Flooding &amp; track damage"));
    }

    #[test]
    fn test_status_change_has_banner_without_passenger_table() {
        let html = render(&notification(
            NotificationKind::StatusChanged { status: BookingStatus::Waiting },
            "Meera",
        ));
        assert!(html.contains("Booking Status Update"));
        assert!(html.contains("updated to waiting"));
        assert!(html.contains("#f59e0b"));
        assert!(!html.contains("Passenger Details"));
    }

    #[tokio::test]
    async fn test_log_notifier_requires_recipient() {
        let mut n = notification(NotificationKind::BookingConfirmed, "Meera");
        assert!(LogNotifier.notify(&n).await.is_ok());
        n.user.email = Some("  ".into());
        assert!(matches!(LogNotifier.notify(&n).await, Err(NotifyError::NoRecipient)));
    }
}
