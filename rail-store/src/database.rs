use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};
use serde_json::Value;

use crate::app_config::BusinessRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Applies rows of the `business_rules` table on top of the file config.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for (key, value) in rows {
            apply_rule(&mut rules, &key, &value);
        }
        Ok(rules)
    }
}

fn apply_rule(rules: &mut BusinessRules, key: &str, raw: &Value) {
    let Some(v) = raw.get("value") else {
        warn!(key, "business rule without a value field ignored");
        return;
    };
    match key {
        "max_passengers_per_booking" => {
            if let Some(n) = v.as_u64().filter(|n| *n > 0) {
                rules.max_passengers_per_booking = n as usize;
            }
        }
        "rate_limit_per_minute" => {
            if let Some(n) = v.as_i64().filter(|n| *n > 0) {
                rules.rate_limit_per_minute = n;
            }
        }
        "pnr_attempts" => {
            if let Some(n) = v.as_u64().and_then(|n| u32::try_from(n).ok()).filter(|n| *n > 0) {
                rules.pnr_attempts = n;
            }
        }
        other => warn!(key = other, "unknown business rule ignored"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_overrides() {
        let mut rules = BusinessRules::default();
        apply_rule(&mut rules, "max_passengers_per_booking", &json!({ "value": 4 }));
        apply_rule(&mut rules, "pnr_attempts", &json!({ "value": 0 }));
        apply_rule(&mut rules, "rate_limit_per_minute", &json!(30));
        apply_rule(&mut rules, "surge", &json!({ "value": 2 }));

        assert_eq!(rules.max_passengers_per_booking, 4);
        assert_eq!(rules.pnr_attempts, 5);
        assert_eq!(rules.rate_limit_per_minute, 100);
    }
}
