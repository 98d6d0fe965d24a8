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

//! Core foundational types and utilities for the Skiff message broker.
//!
//! The `skiff-core` crate is designed to be lightweight and dependency-light. It supplies
//! the essential building blocks used across the Skiff broker crates, including:
//!
//! - Correctness validation functions.
//! - Millisecond clocks (monotonic and static/test) for liveness tracking.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod correctness;
pub mod time;

// Re-exports
pub use crate::time::{Clock, MonotonicClock, TestClock};

/// Message for when a mutex guard cannot be acquired due to poisoning.
///
/// A poisoned lock indicates a thread panicked while holding it, so the protected
/// data may be inconsistent and the panic is propagated.
pub const MUTEX_POISONED: &str = "Mutex poisoned";
