pub mod models;
pub mod pii;

pub use models::booking::{Booking, BookingStatus, Passenger};
pub use models::events::InventoryEvent;
pub use models::train::{PerClass, RunDay, SeatClass, SeatSnapshot, Train, TrainStatus};
pub use models::user::{Requester, Role, User};
pub use models::UnknownVariant;
