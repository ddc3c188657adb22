pub mod catalog;
pub mod coordinator;
pub mod inventory;

pub use catalog::{NewTrain, TrainCatalog};
pub use coordinator::{AppliedTransition, BookingReservation, SeatInventory};
pub use inventory::{InventoryError, SeatAccounting};
