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

//! Enumerations for the consumer group registry.
//!
//! Group-level policy enums are stored per group in `AtomicU8` cells, so each carries
//! `from_u8`/`as_u8` conversions alongside the usual `strum` and `serde` derives.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, FromRepr};

/// How a consumer obtains messages from the broker.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Hash,
    PartialEq,
    Eq,
    AsRefStr,
    EnumIter,
    EnumString,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumeType {
    /// The consumer pulls messages itself.
    ConsumeActively = 0,
    /// The broker pushes messages to the consumer.
    ConsumePassively = 1,
}

/// How messages are distributed across the consumers of a group.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Hash,
    PartialEq,
    Eq,
    AsRefStr,
    EnumIter,
    EnumString,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageModel {
    /// Every consumer in the group receives every message.
    Broadcasting = 0,
    /// Each message is delivered to exactly one consumer in the group.
    #[default]
    Clustering = 1,
}

/// Where a group without a committed offset starts consuming.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Hash,
    PartialEq,
    Eq,
    AsRefStr,
    EnumIter,
    EnumString,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumeFromWhere {
    /// Start from the latest offset.
    #[default]
    ConsumeFromLastOffset = 0,
    /// Start from the earliest retained offset.
    ConsumeFromFirstOffset = 1,
    /// Start from the first offset at or after a timestamp.
    ConsumeFromTimestamp = 2,
}

/// The implementation language reported by a client.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Hash,
    PartialEq,
    Eq,
    AsRefStr,
    EnumIter,
    EnumString,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LanguageCode {
    #[default]
    Java = 0,
    Cpp = 1,
    Dotnet = 2,
    Python = 3,
    Go = 4,
    Rust = 5,
    Other = 255,
}

/// The filter expression dialect of a subscription.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Hash,
    PartialEq,
    Eq,
    AsRefStr,
    EnumIter,
    EnumString,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpressionType {
    /// `tagA || tagB` style tag expressions.
    #[default]
    Tag = 0,
    /// SQL-92 property filters.
    Sql92 = 1,
}

/// The kind of a consumer group lifecycle or membership transition.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerGroupEventKind {
    /// A connection registered against a group not yet in the registry.
    ClientRegister,
    /// A single connection left a group.
    ClientUnregister,
    /// A registration call completed (always emitted).
    Register,
    /// A group was removed after its last connection left.
    Unregister,
    /// Group membership or subscriptions changed.
    Change,
}

macro_rules! impl_atomic_repr {
    ($ty:ident) => {
        impl $ty {
            /// Converts a `u8` to this enum, useful when loading from an `AtomicU8`.
            ///
            /// # Panics
            ///
            /// Panics if `value` is not a valid discriminant.
            #[inline]
            #[must_use]
            pub fn from_u8(value: u8) -> Self {
                Self::from_repr(value).unwrap_or_else(|| {
                    panic!("Invalid `{}` value: {value}", stringify!($ty))
                })
            }

            /// Converts this enum to a `u8`, useful when storing to an `AtomicU8`.
            #[inline]
            #[must_use]
            pub const fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}

impl_atomic_repr!(ConsumeType);
impl_atomic_repr!(MessageModel);
impl_atomic_repr!(ConsumeFromWhere);

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    fn test_consume_type_round_trips_through_u8() {
        for value in ConsumeType::iter() {
            assert_eq!(ConsumeType::from_u8(value.as_u8()), value);
        }
        for value in ConsumeFromWhere::iter() {
            assert_eq!(ConsumeFromWhere::from_u8(value.as_u8()), value);
        }
    }

    #[rstest]
    #[should_panic(expected = "Invalid `MessageModel` value: 9")]
    fn test_message_model_from_invalid_u8() {
        let _ = MessageModel::from_u8(9);
    }

    #[rstest]
    #[case("CONSUME_PASSIVELY", ConsumeType::ConsumePassively)]
    #[case("consume_actively", ConsumeType::ConsumeActively)]
    fn test_consume_type_from_str(#[case] input: &str, #[case] expected: ConsumeType) {
        assert_eq!(ConsumeType::from_str(input).unwrap(), expected);
    }

    #[rstest]
    fn test_event_kind_display() {
        assert_eq!(ConsumerGroupEventKind::ClientRegister.to_string(), "CLIENT_REGISTER");
        assert_eq!(ConsumerGroupEventKind::Change.as_ref(), "CHANGE");
    }

    #[rstest]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&ConsumeFromWhere::ConsumeFromFirstOffset).unwrap();
        assert_eq!(json, "\"CONSUME_FROM_FIRST_OFFSET\"");

        let model: MessageModel = serde_json::from_str("\"BROADCASTING\"").unwrap();
        assert_eq!(model, MessageModel::Broadcasting);
    }
}
