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

//! Typed errors surfaced by the consumer registry.

use thiserror::Error;

/// An error rejecting a registry input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The consumer group name was empty or blank.
    #[error("invalid consumer group name: {0}")]
    InvalidGroup(String),
}
