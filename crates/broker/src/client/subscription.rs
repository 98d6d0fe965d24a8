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

//! Subscription data declared by consumers in their heartbeats.

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::enums::ExpressionType;

/// The expression which subscribes to every tag of a topic.
pub const SUB_ALL: &str = "*";

/// Separator between tags in a TAG expression.
const TAG_SEPARATOR: &str = "||";

/// A (topic, filter expression, version) triple a consumer group declares interest in.
///
/// Keyed by `topic` within a group; equality compares every field so a changed filter
/// or version is observable as a change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    /// The subscribed topic.
    pub topic: Ustr,
    /// The raw filter expression.
    pub sub_string: String,
    /// The parsed tags (TAG expressions only).
    #[serde(default)]
    pub tags_set: BTreeSet<String>,
    /// Hash codes of `tags_set`, used for fast filtering on the store side.
    #[serde(default)]
    pub code_set: BTreeSet<i32>,
    /// The client-assigned version of this subscription (monotonic per client).
    pub sub_version: u64,
    /// The dialect of `sub_string`.
    #[serde(default)]
    pub expression_type: ExpressionType,
    /// If the subscription uses a class filter.
    #[serde(default)]
    pub class_filter_mode: bool,
}

impl SubscriptionData {
    /// Creates a new [`SubscriptionData`] from a TAG expression.
    ///
    /// An empty or `*` expression subscribes to all tags; otherwise tags are split
    /// on `||` and trimmed, with empty tags dropped.
    pub fn build<T: AsRef<str>>(topic: T, sub_string: &str, sub_version: u64) -> Self {
        let trimmed = sub_string.trim();
        let mut data = Self {
            topic: Ustr::from(topic.as_ref()),
            sub_string: if trimmed.is_empty() {
                SUB_ALL.to_string()
            } else {
                trimmed.to_string()
            },
            tags_set: BTreeSet::new(),
            code_set: BTreeSet::new(),
            sub_version,
            expression_type: ExpressionType::Tag,
            class_filter_mode: false,
        };

        if data.is_sub_all() {
            return data;
        }

        for tag in data.sub_string.split(TAG_SEPARATOR) {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            data.code_set.insert(tag_hash_code(tag));
            data.tags_set.insert(tag.to_string());
        }

        data
    }

    /// Creates a new [`SubscriptionData`] with a SQL-92 filter expression.
    pub fn sql92<T: AsRef<str>>(topic: T, expression: &str, sub_version: u64) -> Self {
        Self {
            topic: Ustr::from(topic.as_ref()),
            sub_string: expression.trim().to_string(),
            tags_set: BTreeSet::new(),
            code_set: BTreeSet::new(),
            sub_version,
            expression_type: ExpressionType::Sql92,
            class_filter_mode: false,
        }
    }

    /// Returns whether this subscription matches every tag of the topic.
    #[must_use]
    pub fn is_sub_all(&self) -> bool {
        self.expression_type == ExpressionType::Tag && self.sub_string == SUB_ALL
    }
}

impl Display for SubscriptionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubscriptionData(topic={}, sub_string={}, expression_type={}, sub_version={})",
            self.topic, self.sub_string, self.expression_type, self.sub_version,
        )
    }
}

/// Returns a stable 32-bit hash code for `tag` (the polynomial string hash with base 31).
///
/// Must stay stable across releases since stored messages carry the same code.
#[must_use]
pub fn tag_hash_code(tag: &str) -> i32 {
    tag.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}
