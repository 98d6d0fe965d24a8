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

//! The broker-side registry of consumer groups.
//!
//! [`ConsumerManager`] maps group names to [`ConsumerGroupInfo`] records and drives the
//! register, unregister, channel close and expiry scan flows, fanning out
//! [`ConsumerGroupEvent`]s to the registered listeners.
//!
//! Group records are created first-writer-wins and removed only while observed empty
//! (a `remove_if` on the group table). No table guard is ever held while listeners run.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use dashmap::DashMap;
use skiff_core::{
    correctness::check_valid_string,
    time::{Clock, MonotonicClock, duration_since_ms},
};
use ustr::Ustr;

use super::{
    channel::{ClientChannelInfo, SharedChannel},
    event::ConsumerGroupEvent,
    group::ConsumerGroupInfo,
    listener::{ListenerList, SharedListener},
    stats::BrokerStatsCollector,
    subscription::SubscriptionData,
};
use crate::{
    config::ConsumerManagerConfig,
    enums::{ConsumeFromWhere, ConsumeType, MessageModel},
    error::RegistryError,
};

/// Registry of consumer groups, their connections and their subscriptions.
#[derive(Debug)]
pub struct ConsumerManager {
    config: ConsumerManagerConfig,
    consumer_table: DashMap<Ustr, Arc<ConsumerGroupInfo>>,
    listeners: ListenerList,
    stats: Option<Arc<dyn BrokerStatsCollector>>,
    clock: Arc<dyn Clock>,
}

impl ConsumerManager {
    /// Creates a new [`ConsumerManager`] notifying `listener`.
    #[must_use]
    pub fn new(config: ConsumerManagerConfig, listener: SharedListener) -> Self {
        Self::with_clock(config, listener, None, Arc::new(MonotonicClock::new()))
    }

    /// Creates a new [`ConsumerManager`] which reports registration latency to `stats`.
    #[must_use]
    pub fn with_stats(
        config: ConsumerManagerConfig,
        listener: SharedListener,
        stats: Arc<dyn BrokerStatsCollector>,
    ) -> Self {
        Self::with_clock(config, listener, Some(stats), Arc::new(MonotonicClock::new()))
    }

    /// Creates a new [`ConsumerManager`] reading liveness time from `clock`.
    #[must_use]
    pub fn with_clock(
        config: ConsumerManagerConfig,
        listener: SharedListener,
        stats: Option<Arc<dyn BrokerStatsCollector>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            consumer_table: DashMap::new(),
            listeners: ListenerList::new(vec![listener]),
            stats,
            clock,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ConsumerManagerConfig {
        &self.config
    }

    /// Appends a listener; listeners are never removed.
    pub fn append_consumer_ids_change_listener(&self, listener: SharedListener) {
        self.listeners.append(listener);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Registers `client` with `group`, updating the subscription set.
    ///
    /// Equivalent to [`Self::register_consumer`] with `update_subscription` set.
    pub fn register_consumer_default(
        &self,
        group: &str,
        client: ClientChannelInfo,
        consume_type: ConsumeType,
        message_model: MessageModel,
        consume_from_where: ConsumeFromWhere,
        subscriptions: &[SubscriptionData],
        notify_on_change: bool,
    ) -> bool {
        self.register_consumer(
            group,
            client,
            consume_type,
            message_model,
            consume_from_where,
            subscriptions,
            notify_on_change,
            true,
        )
    }

    /// Registers (or refreshes) `client` with `group`.
    ///
    /// Returns `true` if the group's channel set, group policy or (when
    /// `update_subscription` is set) subscription set changed. A blank group name is
    /// ignored with a warning and returns `false`.
    #[allow(clippy::too_many_arguments)]
    pub fn register_consumer(
        &self,
        group: &str,
        client: ClientChannelInfo,
        consume_type: ConsumeType,
        message_model: MessageModel,
        consume_from_where: ConsumeFromWhere,
        subscriptions: &[SubscriptionData],
        notify_on_change: bool,
        update_subscription: bool,
    ) -> bool {
        match self.try_register_consumer(
            group,
            client,
            consume_type,
            message_model,
            consume_from_where,
            subscriptions,
            notify_on_change,
            update_subscription,
        ) {
            Ok(changed) => changed,
            Err(e) => {
                log::warn!("Ignoring consumer registration: {e}");
                false
            }
        }
    }

    /// Registers (or refreshes) `client` with `group`, rejecting a blank group name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidGroup`] if `group` is empty, all whitespace or
    /// contains non-ASCII characters.
    #[allow(clippy::too_many_arguments)]
    pub fn try_register_consumer(
        &self,
        group: &str,
        client: ClientChannelInfo,
        consume_type: ConsumeType,
        message_model: MessageModel,
        consume_from_where: ConsumeFromWhere,
        subscriptions: &[SubscriptionData],
        notify_on_change: bool,
        update_subscription: bool,
    ) -> Result<bool, RegistryError> {
        check_valid_string(group, "group")
            .map_err(|e| RegistryError::InvalidGroup(e.to_string()))?;

        let start_ms = self.clock.timestamp_ms();
        let group_key = Ustr::from(group);

        let (info, changed) = loop {
            let info = self.get_or_create_group(
                group_key,
                &client,
                consume_type,
                message_model,
                consume_from_where,
                subscriptions,
            );

            let now_ms = self.clock.timestamp_ms();
            let mut changed = info.update_channel(
                client.clone(),
                consume_type,
                message_model,
                consume_from_where,
                now_ms,
            );
            if update_subscription {
                changed |= info.update_subscription(subscriptions, now_ms);
            }

            // A concurrent sweep may have retired the record between lookup and update
            if self.is_current(group_key, &info) {
                break (info, changed);
            }
            log::debug!("Consumer group '{group_key}' was removed concurrently, retrying");
        };

        if changed && notify_on_change {
            self.listeners.dispatch(
                group,
                &ConsumerGroupEvent::Change {
                    channels: info.all_channels(),
                },
            );
        }

        if let Some(stats) = &self.stats {
            stats.inc_consumer_register_time(duration_since_ms(
                self.clock.timestamp_ms(),
                start_ms,
            ));
        }

        self.listeners.dispatch(
            group,
            &ConsumerGroupEvent::Register {
                subscriptions: subscriptions.to_vec(),
            },
        );

        Ok(changed)
    }

    /// Removes `client` from `group`, removing the group once it has no channels.
    ///
    /// `Change` is only emitted while the record is still mapped and non-empty, so a
    /// group removed by this or a concurrent call never receives a trailing `Change`.
    pub fn unregister_consumer(
        &self,
        group: &str,
        client: &ClientChannelInfo,
        notify_on_change: bool,
    ) {
        let Some(info) = self.consumer_group_info(group) else {
            return;
        };

        if info.unregister_channel(client) {
            self.listeners.dispatch(
                group,
                &ConsumerGroupEvent::ClientUnregister {
                    client: client.clone(),
                    topics: info.subscribe_topics(),
                },
            );
        }

        if info.is_empty() && self.remove_if_empty(&info) {
            log::info!("Unregister consumer ok, no any connection, and remove consumer group, {group}");
            self.listeners.dispatch(group, &ConsumerGroupEvent::Unregister);
            return;
        }

        if notify_on_change && self.is_live(&info) {
            self.listeners.dispatch(
                group,
                &ConsumerGroupEvent::Change {
                    channels: info.all_channels(),
                },
            );
        }
    }

    /// Removes `channel` from every group it is registered with.
    ///
    /// Each affected group receives a `ClientUnregister`, then `Unregister` if it
    /// was removed or `Change` if it is still mapped and non-empty. Always returns
    /// `false`; removals are only observable through listener events.
    pub fn do_channel_close_event(&self, remote_addr: &str, channel: &SharedChannel) -> bool {
        for info in self.groups_snapshot() {
            let Some(client) = info.do_channel_close_event(remote_addr, channel) else {
                continue;
            };
            let group = info.group_name();

            self.listeners.dispatch(
                &group,
                &ConsumerGroupEvent::ClientUnregister {
                    client,
                    topics: info.subscribe_topics(),
                },
            );

            if info.is_empty() && self.remove_if_empty(&info) {
                log::info!(
                    "Unregister consumer ok, no any connection, and remove consumer group, {group}"
                );
                self.listeners.dispatch(&group, &ConsumerGroupEvent::Unregister);
            } else if self.is_live(&info) {
                self.listeners.dispatch(
                    &group,
                    &ConsumerGroupEvent::Change {
                        channels: info.all_channels(),
                    },
                );
            }
        }

        false
    }

    /// Closes and removes every channel idle for longer than the configured timeout.
    ///
    /// Each removed channel emits `ClientUnregister`. A group left empty is removed
    /// without an `Unregister` event. Returns the number of channels removed.
    pub fn scan_not_active_channel(&self) -> usize {
        let now_ms = self.clock.timestamp_ms();
        let timeout_ms = self.config.channel_expired_timeout_ms;
        let mut removed = 0;

        for info in self.groups_snapshot() {
            let group = info.group_name();
            let expired = info.remove_expired_channels(now_ms, timeout_ms);

            for client in expired {
                log::warn!(
                    "SCAN: remove expired channel from consumer table, channel={}, group={group}, idle_ms={}",
                    client.remote_addr(),
                    duration_since_ms(now_ms, client.last_update_timestamp()),
                );
                client.channel().close_quietly();
                self.listeners.dispatch(
                    &group,
                    &ConsumerGroupEvent::ClientUnregister {
                        client,
                        topics: info.subscribe_topics(),
                    },
                );
                removed += 1;
            }

            if info.is_empty() && self.remove_if_empty(&info) {
                log::warn!(
                    "SCAN: remove expired channel from consumer table, all clear, group={group}"
                );
            }
        }

        removed
    }

    /// Returns the channel of `group` registered by `client_id`.
    #[must_use]
    pub fn find_channel_by_client_id(
        &self,
        group: &str,
        client_id: &str,
    ) -> Option<ClientChannelInfo> {
        self.consumer_group_info(group)?
            .find_channel_by_client_id(client_id)
    }

    /// Returns the channel of `group` bound to `channel`.
    #[must_use]
    pub fn find_channel_by_channel(
        &self,
        group: &str,
        channel: &SharedChannel,
    ) -> Option<ClientChannelInfo> {
        self.consumer_group_info(group)?.find_channel(channel.id())
    }

    #[must_use]
    pub fn find_subscription_data(&self, group: &str, topic: &str) -> Option<SubscriptionData> {
        self.consumer_group_info(group)?
            .find_subscription_data(topic)
    }

    /// Returns the number of topics `group` subscribes to, zero if unknown.
    #[must_use]
    pub fn find_subscription_data_count(&self, group: &str) -> usize {
        self.consumer_group_info(group)
            .map_or(0, |info| info.subscription_count())
    }

    /// Returns the groups currently subscribed to `topic`.
    #[must_use]
    pub fn query_topic_consume_by_who(&self, topic: &str) -> AHashSet<Ustr> {
        self.consumer_table
            .iter()
            .filter(|entry| entry.value().is_subscribed(topic))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Returns the record for `group`, if registered.
    #[must_use]
    pub fn consumer_group_info(&self, group: &str) -> Option<Arc<ConsumerGroupInfo>> {
        // Names never interned cannot be keys of the table
        let key = Ustr::from_existing(group)?;
        self.consumer_table
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns a point-in-time copy of the group table.
    #[must_use]
    pub fn consumer_table(&self) -> AHashMap<Ustr, Arc<ConsumerGroupInfo>> {
        self.consumer_table
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    #[must_use]
    pub fn group_names(&self) -> Vec<Ustr> {
        self.consumer_table.iter().map(|entry| *entry.key()).collect()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.consumer_table.len()
    }

    fn get_or_create_group(
        &self,
        group_key: Ustr,
        client: &ClientChannelInfo,
        consume_type: ConsumeType,
        message_model: MessageModel,
        consume_from_where: ConsumeFromWhere,
        subscriptions: &[SubscriptionData],
    ) -> Arc<ConsumerGroupInfo> {
        let existing = self
            .consumer_table
            .get(&group_key)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(info) = existing {
            return info;
        }

        self.listeners.dispatch(
            &group_key,
            &ConsumerGroupEvent::ClientRegister {
                client: client.clone(),
                topics: subscriptions.iter().map(|sub| sub.topic).collect(),
            },
        );

        let candidate = Arc::new(ConsumerGroupInfo::new(
            group_key,
            consume_type,
            message_model,
            consume_from_where,
        ));
        Arc::clone(
            self.consumer_table
                .entry(group_key)
                .or_insert(candidate)
                .value(),
        )
    }

    fn is_current(&self, group_key: Ustr, info: &Arc<ConsumerGroupInfo>) -> bool {
        self.consumer_table
            .get(&group_key)
            .is_some_and(|current| Arc::ptr_eq(current.value(), info))
    }

    /// Returns whether `info` still has channels and is the record mapped for its group.
    ///
    /// An empty record is either being removed or about to be refilled by a concurrent
    /// registration, which emits its own `Change`.
    fn is_live(&self, info: &Arc<ConsumerGroupInfo>) -> bool {
        !info.is_empty() && self.is_current(info.group_name(), info)
    }

    /// Removes `info` from the table only if it is still the mapped record and empty.
    fn remove_if_empty(&self, info: &Arc<ConsumerGroupInfo>) -> bool {
        self.consumer_table
            .remove_if(&info.group_name(), |_, current| {
                Arc::ptr_eq(current, info) && current.is_empty()
            })
            .is_some()
    }

    fn groups_snapshot(&self) -> Vec<Arc<ConsumerGroupInfo>> {
        self.consumer_table
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
