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

//! End-to-end consumer group lifecycle through the public registry API.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use rstest::rstest;
use skiff_broker::{
    client::{
        ChannelScanner, ConsumerGroupEvent, ConsumerManager, FnListener, SubscriptionData,
        stubs::{RecordingListener, StubChannel, stub_client, stub_client_and_channel, stub_remote_addr},
    },
    config::ConsumerManagerConfig,
    enums::{ConsumeFromWhere, ConsumeType, ConsumerGroupEventKind as Kind, MessageModel},
};
use skiff_core::time::TestClock;
use ustr::Ustr;

fn orders() -> Vec<SubscriptionData> {
    vec![SubscriptionData::build("orders", "TagA || TagB", 1)]
}

#[rstest]
fn test_register_then_unregister_round_trip() {
    let recorder = Arc::new(RecordingListener::new());
    let manager = ConsumerManager::new(ConsumerManagerConfig::default(), recorder.clone());
    let notify = manager.config().notify_on_change_default();
    let client = stub_client(1, "client-1");

    let changed = manager.register_consumer_default(
        "G1",
        client.clone(),
        ConsumeType::ConsumePassively,
        MessageModel::Clustering,
        ConsumeFromWhere::ConsumeFromLastOffset,
        &orders(),
        notify,
    );

    assert!(changed);
    assert_eq!(manager.find_subscription_data_count("G1"), 1);
    let subscription = manager.find_subscription_data("G1", "orders").unwrap();
    assert_eq!(subscription.tags_set.len(), 2);
    assert!(
        manager
            .query_topic_consume_by_who("orders")
            .contains(&Ustr::from("G1"))
    );

    manager.unregister_consumer("G1", &client, notify);

    assert_eq!(manager.find_subscription_data_count("G1"), 0);
    assert!(!manager.consumer_table().contains_key(&Ustr::from("G1")));
    assert!(manager.query_topic_consume_by_who("orders").is_empty());
    assert_eq!(
        recorder.kinds_for("G1"),
        vec![
            Kind::ClientRegister,
            Kind::Change,
            Kind::Register,
            Kind::ClientUnregister,
            Kind::Unregister,
        ]
    );
}

#[rstest]
fn test_closure_listener_observes_membership_changes() {
    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    let listener = FnListener::new(
        Some("rebalance"),
        move |event: &ConsumerGroupEvent, _group: &str| {
            if let ConsumerGroupEvent::Change { channels } = event {
                counter.store(channels.len(), Ordering::SeqCst);
            }
            Ok(())
        },
    );
    assert_eq!(listener.id().as_str(), "rebalance");

    let manager = ConsumerManager::new(ConsumerManagerConfig::default(), Arc::new(listener));
    for id in 1..=3 {
        manager.register_consumer_default(
            "G1",
            stub_client(id, &format!("client-{id}")),
            ConsumeType::ConsumePassively,
            MessageModel::Clustering,
            ConsumeFromWhere::ConsumeFromLastOffset,
            &orders(),
            true,
        );
    }
    assert_eq!(changes.load(Ordering::SeqCst), 3);

    let closing = stub_client(2, "client-2");
    manager.do_channel_close_event(&stub_remote_addr(2), closing.channel());
    assert_eq!(changes.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_manager_from_json_config() {
    let config = ConsumerManagerConfig::from_json(
        r#"{"channel_expired_timeout_ms": 30000, "notify_consumer_ids_changed_enable": false}"#,
    )
    .unwrap();
    let clock = Arc::new(TestClock::new(0));
    let manager = ConsumerManager::with_clock(
        config,
        Arc::new(RecordingListener::new()),
        None,
        clock.clone(),
    );

    manager.register_consumer_default(
        "G1",
        stub_client(1, "client-1"),
        ConsumeType::ConsumeActively,
        MessageModel::Broadcasting,
        ConsumeFromWhere::ConsumeFromFirstOffset,
        &orders(),
        manager.config().notify_on_change_default(),
    );
    clock.advance_ms(30_001);

    assert_eq!(manager.scan_not_active_channel(), 1);
    assert_eq!(manager.group_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scanner_expires_idle_consumers() {
    let recorder = Arc::new(RecordingListener::new());
    let clock = Arc::new(TestClock::new(1_000));
    let manager = Arc::new(ConsumerManager::with_clock(
        ConsumerManagerConfig::default(),
        recorder.clone(),
        None,
        clock.clone(),
    ));
    let (channel, client) =
        stub_client_and_channel(StubChannel::new(1, stub_remote_addr(1)), "client-1");
    manager.register_consumer_default(
        "G1",
        client,
        ConsumeType::ConsumePassively,
        MessageModel::Clustering,
        ConsumeFromWhere::ConsumeFromLastOffset,
        &orders(),
        true,
    );

    let mut scanner = ChannelScanner::new(manager.clone());
    scanner.start();

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(manager.group_count(), 1);
    assert_eq!(channel.close_count(), 0);

    clock.advance_ms(120_001);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(manager.group_count(), 0);
    assert_eq!(channel.close_count(), 1);
    assert_eq!(recorder.count(Kind::ClientUnregister), 1);
    assert_eq!(recorder.count(Kind::Unregister), 0);

    scanner.cancel();
}
