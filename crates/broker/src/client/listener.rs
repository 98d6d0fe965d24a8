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

//! Change listener capability and the isolating fan-out dispatcher.
//!
//! Listeners are held in a copy-on-write list behind [`ArcSwap`]: dispatch takes a
//! lock-free snapshot, appends swap in a new list. Each listener call is isolated so an
//! error or a panic in one listener is logged and never reaches the others or the caller.

use std::{
    fmt::{self, Debug},
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use arc_swap::ArcSwap;
use ustr::Ustr;
use uuid::Uuid;

use super::event::ConsumerGroupEvent;

/// A sink notified of consumer group transitions (typically the rebalance service).
pub trait ConsumerIdsChangeListener: Send + Sync {
    /// Handles `event` for `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails; the dispatcher logs it and carries on.
    fn handle(&self, event: &ConsumerGroupEvent, group: &str) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`ConsumerIdsChangeListener`].
pub struct FnListener<F>
where
    F: Fn(&ConsumerGroupEvent, &str) -> anyhow::Result<()> + Send + Sync,
{
    id: Ustr,
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ConsumerGroupEvent, &str) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new listener with an optional custom ID.
    pub fn new<S: AsRef<str>>(id: Option<S>, callback: F) -> Self {
        let id = id.map_or_else(
            || Ustr::from(&Uuid::new_v4().to_string()),
            |s| Ustr::from(s.as_ref()),
        );
        Self { id, callback }
    }

    /// Creates a new listener with an auto-generated ID.
    pub fn from(callback: F) -> Self {
        Self::new::<&str>(None, callback)
    }

    #[must_use]
    pub fn id(&self) -> Ustr {
        self.id
    }
}

impl<F> Debug for FnListener<F>
where
    F: Fn(&ConsumerGroupEvent, &str) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(stringify!(FnListener))
            .field("id", &self.id)
            .field("callback", &"<function>")
            .finish()
    }
}

impl<F> ConsumerIdsChangeListener for FnListener<F>
where
    F: Fn(&ConsumerGroupEvent, &str) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &ConsumerGroupEvent, group: &str) -> anyhow::Result<()> {
        (self.callback)(event, group)
    }
}

/// A shareable listener handle.
pub type SharedListener = Arc<dyn ConsumerIdsChangeListener>;

/// An append-only, ordered list of listeners with isolating synchronous dispatch.
pub struct ListenerList {
    listeners: ArcSwap<Vec<SharedListener>>,
}

impl ListenerList {
    /// Creates a new [`ListenerList`] instance holding `initial`.
    #[must_use]
    pub fn new(initial: Vec<SharedListener>) -> Self {
        Self {
            listeners: ArcSwap::from_pointee(initial),
        }
    }

    /// Appends `listener`; it observes every event dispatched after this call returns.
    pub fn append(&self, listener: SharedListener) {
        self.listeners.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    /// Returns whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Dispatches `event` for `group` to every listener, in registration order.
    ///
    /// Returns the number of listeners which failed (returned an error or panicked).
    pub fn dispatch(&self, group: &str, event: &ConsumerGroupEvent) -> usize {
        let listeners = self.listeners.load_full();
        log::trace!("Dispatching {event} for group '{group}' to {} listeners", listeners.len());

        let mut failures = 0;
        for listener in listeners.iter() {
            match catch_unwind(AssertUnwindSafe(|| listener.handle(event, group))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    log::error!(
                        "Error when calling consumer ids change listener for {} of group '{group}': {e}",
                        event.kind(),
                    );
                }
                Err(panic) => {
                    failures += 1;
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    log::error!(
                        "Consumer ids change listener panicked on {} of group '{group}': {msg}",
                        event.kind(),
                    );
                }
            }
        }
        failures
    }
}

impl Debug for ListenerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(stringify!(ListenerList))
            .field("listeners", &self.len())
            .finish()
    }
}
