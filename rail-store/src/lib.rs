pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod mailer;
pub mod memory;
pub mod redis_repo;
pub mod train_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use mailer::{LogNotifier, SmtpNotifier};
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use train_repo::PgTrainRepository;
pub use user_repo::PgUserDirectory;
