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

//! Consumer connections, subscriptions and the registry which tracks them per group.
//!
//! - [`channel`]: connection handles and per-connection client metadata.
//! - [`subscription`]: topic subscriptions declared by a group.
//! - [`group`]: membership and subscription state of a single group.
//! - [`manager`]: the registry of all groups.
//! - [`listener`]: change listeners and the isolating dispatcher.
//! - [`scanner`]: the periodic expiry sweep.

pub mod channel;
pub mod event;
pub mod group;
pub mod listener;
pub mod manager;
pub mod scanner;
pub mod stats;
pub mod subscription;

#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

// Re-exports
pub use crate::client::{
    channel::{ChannelId, ClientChannelInfo, RemotingChannel, SharedChannel},
    event::ConsumerGroupEvent,
    group::ConsumerGroupInfo,
    listener::{ConsumerIdsChangeListener, FnListener, SharedListener},
    manager::ConsumerManager,
    scanner::ChannelScanner,
    stats::BrokerStatsCollector,
    subscription::SubscriptionData,
};
