//! Application settings under the `skillmatrix` key of Rocket's figment.
//!
//! ```toml
//! [default.skillmatrix]
//! qualifying_threshold = 3
//! station_check_timeout_secs = 10
//! mail_relay_url = "https://mail.example.com/send"
//! ```

use std::time::Duration;

use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use serde::{Deserialize, Serialize};

use crate::feed::{ChangeFeed, DEFAULT_FEED_CAPACITY};
use crate::mailer;
use crate::report::DEFAULT_QUALIFYING_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SkillMatrixConfig {
    /// Minimum rating counted as qualified in gap reports.
    pub qualifying_threshold: i32,
    /// Upper bound on the duplicate-name check before creating a station.
    pub station_check_timeout_secs: u64,
    pub feed_capacity: usize,
    /// Empty means messages are only logged.
    pub mail_relay_url: String,
    pub mail_relay_token: Option<String>,
    pub mail_from: String,
    pub mail_to: String,
}

impl Default for SkillMatrixConfig {
    fn default() -> Self {
        SkillMatrixConfig {
            qualifying_threshold: DEFAULT_QUALIFYING_THRESHOLD,
            station_check_timeout_secs: 10,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            mail_relay_url: String::new(),
            mail_relay_token: None,
            mail_from: "noreply@skillmatrix.local".to_string(),
            mail_to: "contact@skillmatrix.local".to_string(),
        }
    }
}

impl SkillMatrixConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, String> {
        let config: SkillMatrixConfig = figment
            .focus("skillmatrix")
            .extract()
            .map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.qualifying_threshold) {
            return Err(format!(
                "qualifying_threshold must be between 1 and 5, got {}",
                self.qualifying_threshold
            ));
        }
        if self.station_check_timeout_secs == 0 {
            return Err("station_check_timeout_secs must be positive".to_string());
        }
        Ok(())
    }

    pub fn station_check_timeout(&self) -> Duration {
        Duration::from_secs(self.station_check_timeout_secs)
    }
}

/// Extracts [`SkillMatrixConfig`] and puts it, the change feed and the mailer
/// into managed state.
pub fn config_fairing() -> AdHoc {
    AdHoc::try_on_ignite("SkillMatrix Config", |rocket| async {
        let config = match SkillMatrixConfig::from_figment(rocket.figment()) {
            Ok(config) => config,
            Err(e) => {
                error!("Invalid skillmatrix configuration: {}", e);
                return Err(rocket);
            }
        };
        info!(
            "Qualifying threshold {}, station check timeout {}s",
            config.qualifying_threshold, config.station_check_timeout_secs
        );

        let feed = ChangeFeed::new(config.feed_capacity);
        let mailer = mailer::from_config(&config);
        Ok(rocket.manage(config).manage(feed).manage(mailer))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::Serialized;

    #[test]
    fn missing_section_uses_defaults() {
        let figment = Figment::from(Serialized::defaults(rocket::Config::default()));
        let config = SkillMatrixConfig::from_figment(&figment).unwrap();
        assert_eq!(config, SkillMatrixConfig::default());
        assert_eq!(config.station_check_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn section_overrides_and_validates() {
        let figment = Figment::new().merge(("skillmatrix.qualifying_threshold", 4));
        assert_eq!(
            SkillMatrixConfig::from_figment(&figment)
                .unwrap()
                .qualifying_threshold,
            4
        );

        let bad = Figment::new().merge(("skillmatrix.qualifying_threshold", 9));
        assert!(SkillMatrixConfig::from_figment(&bad).is_err());
    }
}
