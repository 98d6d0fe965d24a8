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

//! Per-group membership and subscription state.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use ahash::AHashSet;
use dashmap::{DashMap, mapref::entry::Entry};
use ustr::Ustr;

use super::{
    channel::{ChannelId, ClientChannelInfo, SharedChannel},
    subscription::SubscriptionData,
};
use crate::enums::{ConsumeFromWhere, ConsumeType, MessageModel};

/// The state of one consumer group: its live connections and subscribed topics.
///
/// Every mutator reports whether observable state actually changed, which the
/// registry uses to decide on `CHANGE` notification.
///
/// # Thread Safety
///
/// All operations are thread-safe; connection and subscription tables are concurrent
/// maps linearizable per channel and per topic, and group metadata lives in atomics.
#[derive(Debug)]
pub struct ConsumerGroupInfo {
    group_name: Ustr,
    consume_type: AtomicU8,
    message_model: AtomicU8,
    consume_from_where: AtomicU8,
    channel_table: DashMap<ChannelId, ClientChannelInfo>,
    subscription_table: DashMap<Ustr, SubscriptionData>,
    last_update_timestamp: AtomicU64,
}

impl ConsumerGroupInfo {
    /// Creates a new empty [`ConsumerGroupInfo`] instance.
    #[must_use]
    pub fn new(
        group_name: Ustr,
        consume_type: ConsumeType,
        message_model: MessageModel,
        consume_from_where: ConsumeFromWhere,
    ) -> Self {
        Self {
            group_name,
            consume_type: AtomicU8::new(consume_type.as_u8()),
            message_model: AtomicU8::new(message_model.as_u8()),
            consume_from_where: AtomicU8::new(consume_from_where.as_u8()),
            channel_table: DashMap::new(),
            subscription_table: DashMap::new(),
            last_update_timestamp: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn group_name(&self) -> Ustr {
        self.group_name
    }

    #[must_use]
    pub fn consume_type(&self) -> ConsumeType {
        ConsumeType::from_u8(self.consume_type.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn message_model(&self) -> MessageModel {
        MessageModel::from_u8(self.message_model.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn consume_from_where(&self) -> ConsumeFromWhere {
        ConsumeFromWhere::from_u8(self.consume_from_where.load(Ordering::SeqCst))
    }

    /// Returns the time (milliseconds) of the last channel or subscription update.
    #[must_use]
    pub fn last_update_timestamp(&self) -> u64 {
        self.last_update_timestamp.load(Ordering::SeqCst)
    }

    /// Upserts `info_new` keyed by its channel and refreshes its liveness timestamp.
    ///
    /// Returns `true` if the channel is new, if the client metadata of an existing
    /// channel changed, or if any group-level policy differs from the stored value.
    pub fn update_channel(
        &self,
        mut info_new: ClientChannelInfo,
        consume_type: ConsumeType,
        message_model: MessageModel,
        consume_from_where: ConsumeFromWhere,
        now_ms: u64,
    ) -> bool {
        let mut updated = false;
        updated |= self.consume_type.swap(consume_type.as_u8(), Ordering::SeqCst)
            != consume_type.as_u8();
        updated |= self.message_model.swap(message_model.as_u8(), Ordering::SeqCst)
            != message_model.as_u8();
        updated |= self
            .consume_from_where
            .swap(consume_from_where.as_u8(), Ordering::SeqCst)
            != consume_from_where.as_u8();

        info_new.set_last_update_timestamp(now_ms);

        match self.channel_table.entry(info_new.channel_id()) {
            Entry::Vacant(entry) => {
                log::info!(
                    "New consumer connected, group={} {consume_type} {message_model} {info_new}",
                    self.group_name,
                );
                entry.insert(info_new);
                updated = true;
            }
            Entry::Occupied(mut entry) => {
                let info_old = entry.get_mut();
                if info_old.client_id() != info_new.client_id() {
                    log::error!(
                        "Consumer channel exists in broker but client id differs, group={} old={} new={}",
                        self.group_name,
                        info_old.client_id(),
                        info_new.client_id(),
                    );
                }

                if info_old.same_client_metadata(&info_new) {
                    info_old.set_last_update_timestamp(now_ms);
                } else {
                    *info_old = info_new;
                    updated = true;
                }
            }
        }

        self.last_update_timestamp.store(now_ms, Ordering::SeqCst);
        updated
    }

    /// Replaces the subscription table with `subscriptions`.
    ///
    /// Topics absent from `subscriptions` are removed. An incoming subscription with an
    /// older `sub_version` than the stored one is ignored. Returns `true` if any topic
    /// was added or removed, or any stored subscription's filter or version changed.
    pub fn update_subscription(&self, subscriptions: &[SubscriptionData], now_ms: u64) -> bool {
        let mut updated = false;
        let mut incoming = AHashSet::with_capacity(subscriptions.len());

        for sub in subscriptions {
            incoming.insert(sub.topic);

            match self.subscription_table.entry(sub.topic) {
                Entry::Vacant(entry) => {
                    log::info!(
                        "Subscription changed, add new topic, group={} {sub}",
                        self.group_name
                    );
                    entry.insert(sub.clone());
                    updated = true;
                }
                Entry::Occupied(mut entry) => {
                    let old = entry.get_mut();
                    if sub.sub_version < old.sub_version {
                        log::debug!(
                            "Ignoring stale subscription, group={} old={old} new={sub}",
                            self.group_name,
                        );
                        continue;
                    }

                    if old != sub {
                        if self.consume_type() == ConsumeType::ConsumePassively {
                            log::info!(
                                "Subscription changed, group={} old={old} new={sub}",
                                self.group_name,
                            );
                        }
                        *old = sub.clone();
                        updated = true;
                    }
                }
            }
        }

        self.subscription_table.retain(|topic, old| {
            if incoming.contains(topic) {
                return true;
            }
            log::warn!(
                "Subscription changed, group={} remove topic {topic} {old}",
                self.group_name,
            );
            updated = true;
            false
        });

        self.last_update_timestamp.store(now_ms, Ordering::SeqCst);
        updated
    }

    /// Removes the connection matching `info`, returning whether it was present.
    pub fn unregister_channel(&self, info: &ClientChannelInfo) -> bool {
        match self.channel_table.remove(&info.channel_id()) {
            Some((_, removed)) => {
                log::info!(
                    "Unregister a consumer {} from consumer group info {removed}",
                    self.group_name,
                );
                true
            }
            None => false,
        }
    }

    /// Removes the connection on a closed `channel`, returning the removed record.
    pub fn do_channel_close_event(
        &self,
        remote_addr: &str,
        channel: &SharedChannel,
    ) -> Option<ClientChannelInfo> {
        let (_, removed) = self.channel_table.remove(&channel.id())?;
        log::warn!(
            "Channel {remote_addr} closed, remove consumer {} from group {}",
            removed.client_id(),
            self.group_name,
        );
        Some(removed)
    }

    /// Removes every connection idle for more than `timeout_ms` at `now_ms`.
    ///
    /// A connection refreshed concurrently between the scan and its removal is kept.
    pub fn remove_expired_channels(&self, now_ms: u64, timeout_ms: u64) -> Vec<ClientChannelInfo> {
        let expired: Vec<ChannelId> = self
            .channel_table
            .iter()
            .filter(|entry| entry.value().is_expired(now_ms, timeout_ms))
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                self.channel_table
                    .remove_if(&id, |_, info| info.is_expired(now_ms, timeout_ms))
                    .map(|(_, info)| info)
            })
            .collect()
    }

    /// Returns the connection registered with `client_id`, if any.
    #[must_use]
    pub fn find_channel_by_client_id(&self, client_id: &str) -> Option<ClientChannelInfo> {
        self.channel_table
            .iter()
            .find(|entry| entry.value().client_id().as_str() == client_id)
            .map(|entry| entry.value().clone())
    }

    /// Returns the connection registered on `channel_id`, if any.
    #[must_use]
    pub fn find_channel(&self, channel_id: ChannelId) -> Option<ClientChannelInfo> {
        self.channel_table
            .get(&channel_id)
            .map(|entry| entry.value().clone())
    }

    /// Returns the subscription for `topic`, if any.
    #[must_use]
    pub fn find_subscription_data(&self, topic: &str) -> Option<SubscriptionData> {
        let topic = Ustr::from_existing(topic)?;
        self.subscription_table
            .get(&topic)
            .map(|entry| entry.value().clone())
    }

    /// Returns whether the group subscribes to `topic`.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        Ustr::from_existing(topic).is_some_and(|topic| self.subscription_table.contains_key(&topic))
    }

    /// Returns a snapshot of all connections.
    #[must_use]
    pub fn all_channels(&self) -> Vec<ClientChannelInfo> {
        self.channel_table
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns a snapshot of all client ids.
    #[must_use]
    pub fn all_client_ids(&self) -> Vec<Ustr> {
        self.channel_table
            .iter()
            .map(|entry| entry.value().client_id())
            .collect()
    }

    /// Returns a snapshot of the subscribed topics.
    #[must_use]
    pub fn subscribe_topics(&self) -> AHashSet<Ustr> {
        self.subscription_table
            .iter()
            .map(|entry| *entry.key())
            .collect()
    }

    /// Returns a snapshot of all subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<SubscriptionData> {
        self.subscription_table
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscription_table.len()
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channel_table.len()
    }

    /// Returns whether the group has no live connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel_table.is_empty()
    }
}
