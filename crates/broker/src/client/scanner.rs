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

//! Periodic expiry sweep of idle consumer channels.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use super::manager::ConsumerManager;

/// Runs [`ConsumerManager::scan_not_active_channel`] on a fixed interval.
///
/// The sweep runs as a task on the ambient Tokio runtime and is aborted on
/// [`ChannelScanner::cancel`] or when the scanner is dropped.
#[derive(Debug)]
pub struct ChannelScanner {
    manager: Arc<ConsumerManager>,
    initial_delay: Duration,
    interval: Duration,
    task_handle: Option<JoinHandle<()>>,
}

impl ChannelScanner {
    /// Creates a new [`ChannelScanner`] using the manager's configured schedule.
    #[must_use]
    pub fn new(manager: Arc<ConsumerManager>) -> Self {
        let config = manager.config();
        let initial_delay = Duration::from_millis(config.scan_initial_delay_ms);
        let interval = Duration::from_millis(config.scan_interval_ms);
        Self::with_schedule(manager, initial_delay, interval)
    }

    /// Creates a new [`ChannelScanner`] with an explicit schedule.
    ///
    /// A zero `interval` is raised to one millisecond.
    #[must_use]
    pub fn with_schedule(
        manager: Arc<ConsumerManager>,
        initial_delay: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            manager,
            initial_delay,
            interval: interval.max(Duration::from_millis(1)),
            task_handle: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Returns whether the sweep task is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the sweep task. Does nothing if already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            log::warn!("Channel scanner already running");
            return;
        }

        let manager = self.manager.clone();
        let interval = self.interval;
        let start = Instant::now() + self.initial_delay;

        log::debug!(
            "Starting channel scanner, initial_delay={:?}, interval={interval:?}",
            self.initial_delay,
        );

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(start, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                let removed = manager.scan_not_active_channel();
                if removed > 0 {
                    log::debug!("Channel scan removed {removed} expired channels");
                }
            }
        });

        self.task_handle = Some(handle);
    }

    /// Cancels the sweep task.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            log::debug!("Cancel channel scanner");
            handle.abort();
        }
    }
}

impl Drop for ChannelScanner {
    fn drop(&mut self) {
        self.cancel();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
