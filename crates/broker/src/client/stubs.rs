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

//! Type stubs to facilitate testing.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use skiff_core::MUTEX_POISONED;
use ustr::Ustr;

use super::{
    channel::{ChannelId, ClientChannelInfo, RemotingChannel, SharedChannel},
    event::ConsumerGroupEvent,
    listener::ConsumerIdsChangeListener,
    stats::BrokerStatsCollector,
};
use crate::enums::{ConsumerGroupEventKind, LanguageCode};

/// An in-memory [`RemotingChannel`] which records close calls.
#[derive(Debug)]
pub struct StubChannel {
    id: ChannelId,
    remote_addr: String,
    active: AtomicBool,
    fail_close: bool,
    close_count: AtomicUsize,
}

impl StubChannel {
    /// Creates a new active stub channel.
    pub fn new<T: AsRef<str>>(id: u64, remote_addr: T) -> Self {
        Self {
            id: ChannelId::new(id),
            remote_addr: remote_addr.as_ref().to_string(),
            active: AtomicBool::new(true),
            fail_close: false,
            close_count: AtomicUsize::new(0),
        }
    }

    /// Creates a new stub channel whose `close` always fails.
    pub fn failing_close<T: AsRef<str>>(id: u64, remote_addr: T) -> Self {
        Self {
            fail_close: true,
            ..Self::new(id, remote_addr)
        }
    }

    /// Returns how many times `close` was called.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

impl RemotingChannel for StubChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn close(&self) -> anyhow::Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            anyhow::bail!("stub channel {} refused to close", self.id);
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Returns the stub remote address for channel `id`.
#[must_use]
pub fn stub_remote_addr(id: u64) -> String {
    format!("127.0.0.1:{}", 10_000 + id)
}

/// Returns a shared stub channel with identity `id`.
#[must_use]
pub fn stub_channel(id: u64) -> SharedChannel {
    SharedChannel::new(StubChannel::new(id, stub_remote_addr(id)))
}

/// Returns a Java client (version 1) on a new stub channel with identity `id`.
#[must_use]
pub fn stub_client(id: u64, client_id: &str) -> ClientChannelInfo {
    stub_client_with(id, client_id, LanguageCode::Java, 1)
}

/// Returns a client with the given metadata on a new stub channel with identity `id`.
#[must_use]
pub fn stub_client_with(
    id: u64,
    client_id: &str,
    language: LanguageCode,
    version: u32,
) -> ClientChannelInfo {
    ClientChannelInfo::new(stub_channel(id), client_id, language, version)
}

/// Returns a client together with its stub channel, for asserting close calls.
#[must_use]
pub fn stub_client_and_channel(
    channel: StubChannel,
    client_id: &str,
) -> (Arc<StubChannel>, ClientChannelInfo) {
    let channel = Arc::new(channel);
    let shared = SharedChannel(channel.clone());
    let client = ClientChannelInfo::new(shared, client_id, LanguageCode::Java, 1);
    (channel, client)
}

/// A listener which records every event it observes.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(Ustr, ConsumerGroupEvent)>>,
}

impl RecordingListener {
    /// Creates a new empty [`RecordingListener`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded `(group, event)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if the event lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<(Ustr, ConsumerGroupEvent)> {
        self.events.lock().expect(MUTEX_POISONED).clone()
    }

    /// Returns the kinds of events recorded for `group`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the event lock is poisoned.
    #[must_use]
    pub fn kinds_for(&self, group: &str) -> Vec<ConsumerGroupEventKind> {
        self.events
            .lock()
            .expect(MUTEX_POISONED)
            .iter()
            .filter(|(g, _)| g.as_str() == group)
            .map(|(_, event)| event.kind())
            .collect()
    }

    /// Returns how many events of `kind` were recorded across all groups.
    ///
    /// # Panics
    ///
    /// Panics if the event lock is poisoned.
    #[must_use]
    pub fn count(&self, kind: ConsumerGroupEventKind) -> usize {
        self.events
            .lock()
            .expect(MUTEX_POISONED)
            .iter()
            .filter(|(_, event)| event.kind() == kind)
            .count()
    }

    /// Clears the recorded events.
    ///
    /// # Panics
    ///
    /// Panics if the event lock is poisoned.
    pub fn clear(&self) {
        self.events.lock().expect(MUTEX_POISONED).clear();
    }
}

impl ConsumerIdsChangeListener for RecordingListener {
    fn handle(&self, event: &ConsumerGroupEvent, group: &str) -> anyhow::Result<()> {
        self.events
            .lock()
            .expect(MUTEX_POISONED)
            .push((Ustr::from(group), event.clone()));
        Ok(())
    }
}

/// A listener which fails on every event.
#[derive(Debug)]
pub struct FailingListener;

impl ConsumerIdsChangeListener for FailingListener {
    fn handle(&self, event: &ConsumerGroupEvent, group: &str) -> anyhow::Result<()> {
        anyhow::bail!("failing listener rejected {} for '{group}'", event.kind())
    }
}

/// A listener which panics on every event.
#[derive(Debug)]
pub struct PanickingListener;

impl ConsumerIdsChangeListener for PanickingListener {
    fn handle(&self, event: &ConsumerGroupEvent, group: &str) -> anyhow::Result<()> {
        panic!("panicking listener received {} for '{group}'", event.kind())
    }
}

/// A stats collector which records every registration sample.
#[derive(Debug, Default)]
pub struct RecordingStats {
    samples: Mutex<Vec<u64>>,
}

impl RecordingStats {
    /// Returns the recorded samples (milliseconds).
    ///
    /// # Panics
    ///
    /// Panics if the sample lock is poisoned.
    #[must_use]
    pub fn samples(&self) -> Vec<u64> {
        self.samples.lock().expect(MUTEX_POISONED).clone()
    }
}

impl BrokerStatsCollector for RecordingStats {
    fn inc_consumer_register_time(&self, elapsed_ms: u64) {
        self.samples.lock().expect(MUTEX_POISONED).push(elapsed_ms);
    }
}
