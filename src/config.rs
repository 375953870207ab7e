use std::env;

use serde::Serialize;

use crate::models::TimeOfDay;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub hours: BusinessHours,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = BusinessHours::default();
        let open = time_var("OPEN_TIME", defaults.open)?;
        let close = time_var("CLOSE_TIME", defaults.close)?;
        let slot_minutes = match env::var("SLOT_MINUTES") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("SLOT_MINUTES must be a positive integer, got {v}"))?,
            Err(_) => defaults.slot_minutes,
        };

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barbershop.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            hours: BusinessHours::new(open, close, slot_minutes)?,
        })
    }
}

fn time_var(name: &str, default: TimeOfDay) -> anyhow::Result<TimeOfDay> {
    match env::var(name) {
        Ok(v) => TimeOfDay::parse(&v).map_err(|e| anyhow::anyhow!("{name}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Opening policy shared by booking validation and the weekly grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    pub open: TimeOfDay,
    pub close: TimeOfDay,
    pub slot_minutes: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: TimeOfDay::from_minutes(9 * 60).unwrap_or(TimeOfDay::MIDNIGHT),
            close: TimeOfDay::from_minutes(20 * 60).unwrap_or(TimeOfDay::MIDNIGHT),
            slot_minutes: 15,
        }
    }
}

impl BusinessHours {
    pub fn new(open: TimeOfDay, close: TimeOfDay, slot_minutes: u32) -> anyhow::Result<Self> {
        anyhow::ensure!(open < close, "opening time {open} must be before closing time {close}");
        anyhow::ensure!(slot_minutes > 0, "slot granularity must be positive");
        Ok(Self {
            open,
            close,
            slot_minutes,
        })
    }

    /// Grid start times from opening up to the last slot before closing.
    pub fn slots(&self) -> Vec<TimeOfDay> {
        (self.open.minutes()..self.close.minutes())
            .step_by(self.slot_minutes as usize)
            .filter_map(TimeOfDay::from_minutes)
            .collect()
    }

    pub fn is_aligned(&self, t: TimeOfDay) -> bool {
        t >= self.open && (t.minutes() - self.open.minutes()) % self.slot_minutes == 0
    }
}
