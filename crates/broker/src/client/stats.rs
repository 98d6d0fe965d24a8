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

//! Statistics sink for registry timings.

use std::fmt::Debug;

/// Receives registry timing samples; an absent collector means no-op.
pub trait BrokerStatsCollector: Debug + Send + Sync {
    /// Records the elapsed wall-time (milliseconds) of one consumer registration call.
    fn inc_consumer_register_time(&self, elapsed_ms: u64);
}
