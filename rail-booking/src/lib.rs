pub mod broadcast;
pub mod ledger;
pub mod notify;
pub mod pnr;

pub use broadcast::{DelayReport, TrainBroadcaster, TrainStatusReport, TrainStatusUpdate};
pub use ledger::{BookingLedger, BookingRules, NewBooking, PnrStatus};
pub use notify::NotificationDispatcher;
