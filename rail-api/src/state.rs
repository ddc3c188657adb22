use std::sync::Arc;

use rail_booking::{BookingLedger, BookingRules, NotificationDispatcher, TrainBroadcaster};
use rail_catalog::{SeatInventory, TrainCatalog};
use rail_core::notify::Notifier;
use rail_core::repository::{BookingRepository, SeatStore, TrainRepository, UserDirectory};
use rail_shared::InventoryEvent;
use rail_store::app_config::BusinessRules;
use rail_store::{MemoryStore, PgBookingRepository, PgTrainRepository, PgUserDirectory, RedisClient};
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::metrics::{CountingNotifier, Metrics};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage handles behind the service layer.
#[derive(Clone)]
pub struct Repositories {
    pub trains: Arc<dyn TrainRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub seats: Arc<dyn SeatStore>,
}

impl Repositories {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            trains: store.clone(),
            bookings: store.clone(),
            users: store.clone(),
            seats: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let bookings = Arc::new(PgBookingRepository::new(pool.clone()));
        Self {
            trains: Arc::new(PgTrainRepository::new(pool.clone())),
            bookings: bookings.clone(),
            users: Arc::new(PgUserDirectory::new(pool)),
            seats: bookings,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: TrainCatalog,
    pub inventory: SeatInventory,
    pub ledger: BookingLedger,
    pub broadcaster: TrainBroadcaster,
    pub users: Arc<dyn UserDirectory>,
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        notifier: Arc<dyn Notifier>,
        redis: Option<Arc<RedisClient>>,
        auth: AuthConfig,
        business_rules: BusinessRules,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (events, _) = broadcast::channel::<InventoryEvent>(256);
        let notifier: Arc<dyn Notifier> = Arc::new(CountingNotifier::new(notifier, metrics.clone()));
        let dispatcher = NotificationDispatcher::new(notifier, repos.users.clone());
        let inventory = SeatInventory::new(repos.seats.clone(), events.clone());
        let rules = BookingRules {
            max_passengers: business_rules.max_passengers_per_booking,
            pnr_attempts: business_rules.pnr_attempts,
        };

        Self {
            catalog: TrainCatalog::new(repos.trains.clone()),
            ledger: BookingLedger::new(
                repos.trains.clone(),
                repos.bookings.clone(),
                inventory.clone(),
                dispatcher.clone(),
                rules,
            ),
            broadcaster: TrainBroadcaster::new(repos.trains, repos.bookings, dispatcher, events),
            inventory,
            users: repos.users,
            redis,
            auth,
            business_rules,
            metrics,
        }
    }
}
