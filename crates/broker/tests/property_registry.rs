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

//! Property-based tests for the consumer registry.
//!
//! Random sequences of register, unregister, channel close and expiry sweeps are applied
//! to both the registry and a plain model, checking after every step that:
//! - A group is present if and only if it still has connections
//! - Each group holds exactly the connections and topics of the model
//! - `query_topic_consume_by_who` agrees with the groups' subscriptions

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use proptest::prelude::*;
use rstest::rstest;
use skiff_broker::{
    client::{
        ConsumerManager, SubscriptionData,
        stubs::{RecordingListener, stub_channel, stub_client, stub_remote_addr},
    },
    config::ConsumerManagerConfig,
    enums::{ConsumeFromWhere, ConsumeType, MessageModel},
};
use skiff_core::time::TestClock;
use ustr::Ustr;

const GROUPS: [&str; 3] = ["G0", "G1", "G2"];
const TOPICS: [&str; 3] = ["orders", "payments", "refunds"];
const EXPIRY_MS: u64 = 120_000;

#[derive(Clone, Debug)]
enum Op {
    Register {
        group: usize,
        client: u64,
        topics: Vec<usize>,
    },
    Unregister {
        group: usize,
        client: u64,
    },
    Close {
        client: u64,
    },
    AdvanceAndScan {
        delta_ms: u64,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..GROUPS.len(), 0u64..5, prop::collection::vec(0..TOPICS.len(), 0..=3))
            .prop_map(|(group, client, topics)| Op::Register { group, client, topics }),
        2 => (0..GROUPS.len(), 0u64..5).prop_map(|(group, client)| Op::Unregister { group, client }),
        1 => (0u64..5).prop_map(|client| Op::Close { client }),
        1 => prop_oneof![Just(0u64), Just(60_000u64), Just(121_000u64)]
            .prop_map(|delta_ms| Op::AdvanceAndScan { delta_ms }),
    ]
}

#[derive(Debug, Default)]
struct ModelGroup {
    channels: BTreeMap<u64, u64>,
    topics: BTreeSet<&'static str>,
}

#[derive(Debug, Default)]
struct Model {
    now_ms: u64,
    groups: BTreeMap<&'static str, ModelGroup>,
}

impl Model {
    fn apply(&mut self, op: &Op) {
        match op {
            Op::Register {
                group,
                client,
                topics,
            } => {
                let record = self.groups.entry(GROUPS[*group]).or_default();
                record.channels.insert(*client, self.now_ms);
                record.topics = topics.iter().map(|t| TOPICS[*t]).collect();
            }
            Op::Unregister { group, client } => {
                let name = GROUPS[*group];
                if let Some(record) = self.groups.get_mut(name) {
                    record.channels.remove(client);
                }
                self.drop_empty();
            }
            Op::Close { client } => {
                for record in self.groups.values_mut() {
                    record.channels.remove(client);
                }
                self.drop_empty();
            }
            Op::AdvanceAndScan { delta_ms } => {
                self.now_ms += delta_ms;
                let now_ms = self.now_ms;
                for record in self.groups.values_mut() {
                    record
                        .channels
                        .retain(|_, last_ms| now_ms.saturating_sub(*last_ms) <= EXPIRY_MS);
                }
                self.drop_empty();
            }
        }
    }

    fn drop_empty(&mut self) {
        self.groups.retain(|_, record| !record.channels.is_empty());
    }
}

fn apply(manager: &ConsumerManager, clock: &TestClock, op: &Op) {
    match op {
        Op::Register {
            group,
            client,
            topics,
        } => {
            let subscriptions: Vec<SubscriptionData> = topics
                .iter()
                .map(|t| SubscriptionData::build(TOPICS[*t], "*", 1))
                .collect();
            manager.register_consumer_default(
                GROUPS[*group],
                stub_client(*client, &format!("client-{client}")),
                ConsumeType::ConsumePassively,
                MessageModel::Clustering,
                ConsumeFromWhere::ConsumeFromLastOffset,
                &subscriptions,
                true,
            );
        }
        Op::Unregister { group, client } => {
            manager.unregister_consumer(
                GROUPS[*group],
                &stub_client(*client, &format!("client-{client}")),
                true,
            );
        }
        Op::Close { client } => {
            manager.do_channel_close_event(&stub_remote_addr(*client), &stub_channel(*client));
        }
        Op::AdvanceAndScan { delta_ms } => {
            clock.advance_ms(*delta_ms);
            manager.scan_not_active_channel();
        }
    }
}

fn check_matches_model(manager: &ConsumerManager, model: &Model) -> Result<(), TestCaseError> {
    let mut names: Vec<String> = manager
        .group_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    names.sort();
    let expected: Vec<String> = model.groups.keys().map(|name| (*name).to_string()).collect();
    prop_assert_eq!(names, expected);

    for (name, record) in &model.groups {
        let info = manager.consumer_group_info(name).unwrap();
        prop_assert!(!info.is_empty(), "group {} is empty but registered", name);

        let mut client_ids: Vec<String> = info
            .all_client_ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        client_ids.sort();
        let expected: Vec<String> = record
            .channels
            .keys()
            .map(|id| format!("client-{id}"))
            .collect();
        prop_assert_eq!(client_ids, expected);
        prop_assert_eq!(manager.find_subscription_data_count(name), record.topics.len());
    }

    for topic in TOPICS {
        let actual = manager.query_topic_consume_by_who(topic);
        let expected: BTreeSet<Ustr> = model
            .groups
            .iter()
            .filter(|(_, record)| record.topics.contains(topic))
            .map(|(name, _)| Ustr::from(*name))
            .collect();
        prop_assert_eq!(actual.into_iter().collect::<BTreeSet<_>>(), expected);
    }
    Ok(())
}

proptest! {
    /// Property: the registry tracks the same groups, connections and topics as the model.
    #[rstest]
    fn registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let clock = Arc::new(TestClock::new(0));
        let manager = ConsumerManager::with_clock(
            ConsumerManagerConfig::default(),
            Arc::new(RecordingListener::new()),
            None,
            clock.clone(),
        );
        let mut model = Model::default();

        for op in &ops {
            apply(&manager, &clock, op);
            model.apply(op);
            check_matches_model(&manager, &model)?;
        }
    }

    /// Property: unregistering every connection leaves no groups behind.
    #[rstest]
    fn unregister_all_leaves_registry_empty(
        registrations in prop::collection::vec((0..GROUPS.len(), 0u64..8), 1..30)
    ) {
        let manager = ConsumerManager::new(
            ConsumerManagerConfig::default(),
            Arc::new(RecordingListener::new()),
        );

        for (group, client) in &registrations {
            manager.register_consumer_default(
                GROUPS[*group],
                stub_client(*client, &format!("client-{client}")),
                ConsumeType::ConsumePassively,
                MessageModel::Clustering,
                ConsumeFromWhere::ConsumeFromLastOffset,
                &[SubscriptionData::build("orders", "*", 1)],
                true,
            );
        }
        prop_assert!(manager.group_count() > 0);

        for (group, client) in &registrations {
            manager.unregister_consumer(
                GROUPS[*group],
                &stub_client(*client, &format!("client-{client}")),
                true,
            );
        }
        prop_assert_eq!(manager.group_count(), 0);
        prop_assert!(manager.query_topic_consume_by_who("orders").is_empty());
    }
}
