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

//! Consumer group events delivered to change listeners.

use std::fmt::{self, Display};

use ahash::AHashSet;
use ustr::Ustr;

use super::{channel::ClientChannelInfo, subscription::SubscriptionData};
use crate::enums::ConsumerGroupEventKind;

/// A consumer group lifecycle or membership transition.
#[derive(Clone, Debug)]
pub enum ConsumerGroupEvent {
    /// A connection registered against a group that did not yet exist, carrying the
    /// topics it subscribes to (no channel state exists yet).
    ClientRegister {
        client: ClientChannelInfo,
        topics: AHashSet<Ustr>,
    },
    /// A single connection left the group, carrying the group's subscribed topics.
    ClientUnregister {
        client: ClientChannelInfo,
        topics: AHashSet<Ustr>,
    },
    /// A registration completed, carrying the raw subscription list as received.
    Register {
        subscriptions: Vec<SubscriptionData>,
    },
    /// The group was removed from the registry.
    Unregister,
    /// The group membership changed, carrying the full current connection set.
    Change { channels: Vec<ClientChannelInfo> },
}

impl ConsumerGroupEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> ConsumerGroupEventKind {
        match self {
            Self::ClientRegister { .. } => ConsumerGroupEventKind::ClientRegister,
            Self::ClientUnregister { .. } => ConsumerGroupEventKind::ClientUnregister,
            Self::Register { .. } => ConsumerGroupEventKind::Register,
            Self::Unregister => ConsumerGroupEventKind::Unregister,
            Self::Change { .. } => ConsumerGroupEventKind::Change,
        }
    }
}

impl Display for ConsumerGroupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientRegister { client, topics } | Self::ClientUnregister { client, topics } => {
                write!(
                    f,
                    "{}(client_id={}, topics={})",
                    self.kind(),
                    client.client_id(),
                    topics.len()
                )
            }
            Self::Register { subscriptions } => {
                write!(f, "{}(subscriptions={})", self.kind(), subscriptions.len())
            }
            Self::Unregister => write!(f, "{}", self.kind()),
            Self::Change { channels } => {
                write!(f, "{}(channels={})", self.kind(), channels.len())
            }
        }
    }
}
