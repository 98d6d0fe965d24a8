// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2025 Skiff Developers. All rights reserved.
//  https://github.com/skiff-mq/skiff
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Configuration for the consumer group registry.

use serde::{Deserialize, Serialize};
use skiff_core::correctness::check_positive_u64;

/// The default idle period (milliseconds) after which a connection is considered expired.
pub const CHANNEL_EXPIRED_TIMEOUT_MS: u64 = 120_000;

/// The default interval (milliseconds) between expiry sweeps.
pub const SCAN_INTERVAL_MS: u64 = 10_000;

/// Configuration for `ConsumerManager` instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerManagerConfig {
    /// The idle period (milliseconds) after which the expiry sweep closes a connection.
    pub channel_expired_timeout_ms: u64,
    /// The interval (milliseconds) between expiry sweeps.
    pub scan_interval_ms: u64,
    /// The delay (milliseconds) before the first expiry sweep.
    pub scan_initial_delay_ms: u64,
    /// If `CHANGE` events are emitted on membership changes by default.
    pub notify_consumer_ids_changed_enable: bool,
}

impl Default for ConsumerManagerConfig {
    /// Creates a new default [`ConsumerManagerConfig`] instance.
    fn default() -> Self {
        Self {
            channel_expired_timeout_ms: CHANNEL_EXPIRED_TIMEOUT_MS,
            scan_interval_ms: SCAN_INTERVAL_MS,
            scan_initial_delay_ms: SCAN_INTERVAL_MS,
            notify_consumer_ids_changed_enable: true,
        }
    }
}

impl ConsumerManagerConfig {
    /// Creates a new [`ConsumerManagerConfig`] instance.
    #[must_use]
    pub const fn new(
        channel_expired_timeout_ms: u64,
        scan_interval_ms: u64,
        scan_initial_delay_ms: u64,
        notify_consumer_ids_changed_enable: bool,
    ) -> Self {
        Self {
            channel_expired_timeout_ms,
            scan_interval_ms,
            scan_initial_delay_ms,
            notify_consumer_ids_changed_enable,
        }
    }

    /// Parses a configuration from a JSON string, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the parsed values fail [`Self::validate`].
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry timeout or scan interval is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_positive_u64(
            self.channel_expired_timeout_ms,
            stringify!(channel_expired_timeout_ms),
        )?;
        check_positive_u64(self.scan_interval_ms, stringify!(scan_interval_ms))?;
        Ok(())
    }

    /// Returns the `notify_on_change` value callers should pass when they have no override.
    #[must_use]
    pub const fn notify_on_change_default(&self) -> bool {
        self.notify_consumer_ids_changed_enable
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_default_config() {
        let config = ConsumerManagerConfig::default();
        assert_eq!(config.channel_expired_timeout_ms, 120_000);
        assert_eq!(config.scan_interval_ms, 10_000);
        assert!(config.notify_on_change_default());
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn test_from_json_fills_defaults() {
        let config = ConsumerManagerConfig::from_json(r#"{"scan_interval_ms": 500}"#).unwrap();
        assert_eq!(config.scan_interval_ms, 500);
        assert_eq!(config.channel_expired_timeout_ms, CHANNEL_EXPIRED_TIMEOUT_MS);
        assert_eq!(config.scan_initial_delay_ms, SCAN_INTERVAL_MS);
    }

    #[rstest]
    fn test_from_json_rejects_zero_timeout() {
        let result = ConsumerManagerConfig::from_json(r#"{"channel_expired_timeout_ms": 0}"#);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_from_json_rejects_malformed() {
        assert!(ConsumerManagerConfig::from_json("{not json").is_err());
    }
}
