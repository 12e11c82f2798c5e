//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the dispatcher as an
//! `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.

use crate::constants::{
    DEFAULT_ROOT_FOLDER_NAME, VISIT_DEFAULT_PRICE_CENTS, VISIT_DURATION_MINUTES,
};
use crate::error::{PortalError, PortalResult};
use rust_decimal::Decimal;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    base_url: String,
    master_sheet_id: String,
    calendar_id: String,
    root_folder_name: String,
    time_zone: String,
    visit_default_price: Decimal,
    visit_duration_minutes: i64,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with the default root folder, price and visit length.
    pub fn new(
        base_url: impl Into<String>,
        master_sheet_id: impl Into<String>,
        calendar_id: impl Into<String>,
        time_zone: impl Into<String>,
    ) -> PortalResult<Self> {
        let cfg = Self {
            base_url: base_url.into(),
            master_sheet_id: master_sheet_id.into(),
            calendar_id: calendar_id.into(),
            root_folder_name: DEFAULT_ROOT_FOLDER_NAME.to_string(),
            time_zone: time_zone.into(),
            visit_default_price: Decimal::new(VISIT_DEFAULT_PRICE_CENTS, 2),
            visit_duration_minutes: VISIT_DURATION_MINUTES,
        };

        for (name, value) in [
            ("base_url", &cfg.base_url),
            ("master_sheet_id", &cfg.master_sheet_id),
            ("calendar_id", &cfg.calendar_id),
        ] {
            if value.trim().is_empty() {
                return Err(PortalError::InvalidInput(format!("{name} cannot be empty")));
            }
        }

        Ok(cfg)
    }

    /// Use a root folder other than the default. Empty names are rejected.
    pub fn with_root_folder_name(mut self, name: impl Into<String>) -> PortalResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PortalError::InvalidInput(
                "root_folder_name cannot be empty".into(),
            ));
        }
        self.root_folder_name = name;
        Ok(self)
    }

    pub fn with_visit_defaults(
        mut self,
        price: Decimal,
        duration_minutes: i64,
    ) -> PortalResult<Self> {
        if price.is_sign_negative() {
            return Err(PortalError::InvalidInput(
                "visit_default_price cannot be negative".into(),
            ));
        }
        if duration_minutes <= 0 {
            return Err(PortalError::InvalidInput(
                "visit_duration_minutes must be positive".into(),
            ));
        }
        self.visit_default_price = price;
        self.visit_duration_minutes = duration_minutes;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn master_sheet_id(&self) -> &str {
        &self.master_sheet_id
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    pub fn root_folder_name(&self) -> &str {
        &self.root_folder_name
    }

    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn visit_default_price(&self) -> Decimal {
        self.visit_default_price
    }

    pub fn visit_duration_minutes(&self) -> i64 {
        self.visit_duration_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_identifiers() {
        assert!(CoreConfig::new("https://x/", "", "md@example.com", "UTC").is_err());
        assert!(CoreConfig::new(" ", "master", "md@example.com", "UTC").is_err());
        assert!(CoreConfig::new("https://x/", "master", "", "UTC").is_err());
    }

    #[test]
    fn applies_defaults() {
        let cfg = CoreConfig::new("https://x/", "master", "md@example.com", "UTC")
            .expect("config should be valid");
        assert_eq!(cfg.root_folder_name(), DEFAULT_ROOT_FOLDER_NAME);
        assert_eq!(cfg.visit_default_price(), Decimal::new(30_000, 0));
        assert_eq!(cfg.visit_duration_minutes(), 60);
    }

    #[test]
    fn overrides_are_validated() {
        let cfg = CoreConfig::new("https://x/", "master", "md@example.com", "UTC")
            .expect("config should be valid");
        assert!(cfg.clone().with_root_folder_name("").is_err());
        assert!(cfg.clone().with_visit_defaults(Decimal::ONE, 0).is_err());
        assert!(cfg
            .clone()
            .with_visit_defaults(Decimal::NEGATIVE_ONE, 30)
            .is_err());

        let cfg = cfg
            .with_root_folder_name("CLINIC-B")
            .and_then(|c| c.with_visit_defaults(Decimal::new(4500, 0), 30))
            .expect("overrides should apply");
        assert_eq!(cfg.root_folder_name(), "CLINIC-B");
        assert_eq!(cfg.visit_duration_minutes(), 30);
    }
}
