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

//! Client connection handles and the per-connection registration record.

use std::{
    fmt::{self, Debug, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

use skiff_core::time::duration_since_ms;
use ustr::Ustr;

use crate::enums::LanguageCode;

/// Opaque identity of one live client network connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Creates a new [`ChannelId`] instance from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The transport-side view of a client connection.
///
/// Implemented by the network layer; the registry only needs identity, the peer
/// address for logging, and a best-effort close.
pub trait RemotingChannel: Debug + Send + Sync {
    /// Returns the identity used as the registry key for this connection.
    fn id(&self) -> ChannelId;

    /// Returns the remote peer address (e.g. `"10.0.0.7:52311"`).
    fn remote_addr(&self) -> String;

    /// Returns whether the underlying connection is still open.
    fn is_active(&self) -> bool;

    /// Closes the underlying connection.
    ///
    /// Must not block on the peer: the expiry sweep calls this inline for every
    /// expired connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to close the connection.
    fn close(&self) -> anyhow::Result<()>;
}

/// A cheaply cloneable handle to a [`RemotingChannel`], compared and hashed by [`ChannelId`].
#[derive(Clone, Debug)]
#[repr(transparent)]
pub struct SharedChannel(pub Arc<dyn RemotingChannel>);

impl SharedChannel {
    /// Creates a new [`SharedChannel`] wrapping `channel`.
    pub fn new<C: RemotingChannel + 'static>(channel: C) -> Self {
        Self(Arc::new(channel))
    }

    /// Returns the channel identity.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.0.id()
    }

    /// Returns the remote peer address.
    #[must_use]
    pub fn remote_addr(&self) -> String {
        self.0.remote_addr()
    }

    /// Returns whether the underlying connection is still open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }

    /// Closes the channel, logging rather than returning any transport failure.
    ///
    /// A channel the transport already reports as inactive is not closed again.
    pub fn close_quietly(&self) {
        let remote_addr = self.remote_addr();
        if !self.is_active() {
            log::debug!("Channel {remote_addr} already inactive, skipping close");
            return;
        }
        match self.0.close() {
            Ok(()) => log::info!("Closed channel {remote_addr}"),
            Err(e) => log::error!("Failed to close channel {remote_addr}: {e}"),
        }
    }
}

impl From<Arc<dyn RemotingChannel>> for SharedChannel {
    fn from(value: Arc<dyn RemotingChannel>) -> Self {
        Self(value)
    }
}

impl PartialEq for SharedChannel {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SharedChannel {}

impl Hash for SharedChannel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// A client connection as registered against one consumer group.
///
/// Two records are equal when they refer to the same channel, regardless of metadata.
#[derive(Clone, Debug)]
pub struct ClientChannelInfo {
    channel: SharedChannel,
    client_id: Ustr,
    language: LanguageCode,
    version: u32,
    last_update_timestamp: u64,
}

impl ClientChannelInfo {
    /// Creates a new [`ClientChannelInfo`] instance.
    ///
    /// The liveness timestamp starts at zero and is stamped by the registry on registration.
    pub fn new<T: AsRef<str>>(
        channel: SharedChannel,
        client_id: T,
        language: LanguageCode,
        version: u32,
    ) -> Self {
        Self {
            channel,
            client_id: Ustr::from(client_id.as_ref()),
            language,
            version,
            last_update_timestamp: 0,
        }
    }

    #[must_use]
    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.channel.id()
    }

    #[must_use]
    pub fn client_id(&self) -> Ustr {
        self.client_id
    }

    #[must_use]
    pub fn language(&self) -> LanguageCode {
        self.language
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn remote_addr(&self) -> String {
        self.channel.remote_addr()
    }

    /// Returns the last heartbeat time (milliseconds) recorded for this connection.
    #[must_use]
    pub fn last_update_timestamp(&self) -> u64 {
        self.last_update_timestamp
    }

    pub(crate) fn set_last_update_timestamp(&mut self, timestamp_ms: u64) {
        self.last_update_timestamp = timestamp_ms;
    }

    /// Returns whether the client-reported metadata matches `other`.
    #[must_use]
    pub fn same_client_metadata(&self, other: &Self) -> bool {
        self.client_id == other.client_id
            && self.language == other.language
            && self.version == other.version
    }

    /// Returns whether more than `timeout_ms` has elapsed since the last heartbeat.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64, timeout_ms: u64) -> bool {
        duration_since_ms(now_ms, self.last_update_timestamp) > timeout_ms
    }
}

impl PartialEq for ClientChannelInfo {
    fn eq(&self, other: &Self) -> bool {
        self.channel == other.channel
    }
}

impl Eq for ClientChannelInfo {}

impl Hash for ClientChannelInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.channel.hash(state);
    }
}

impl Display for ClientChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientChannelInfo(client_id={}, remote_addr={}, language={}, version={}, last_update_timestamp={})",
            self.client_id,
            self.remote_addr(),
            self.language,
            self.version,
            self.last_update_timestamp,
        )
    }
}
