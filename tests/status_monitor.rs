//! Status monitor reconciliation and notification.

use alloy::primitives::B256;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use custody_wallet::monitor::{EventKind, MonitorEvent};
use custody_wallet::storage::MemoryStore;
use custody_wallet::transactions::{GasSpeed, TxStatus};

mod common;
use common::{ether, FakeChain, DEV_KEY, PASSWORD, RECIPIENT};

#[tokio::test]
async fn test_pending_record_survives_restart() {
    let store = MemoryStore::new();
    let chain = FakeChain::new();

    let hash = {
        let wallet = common::wallet(&store, &chain);
        wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
        wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap()
        // Dropped before any polling: simulated crash.
    };

    let restarted = common::wallet(&store, &chain);
    assert_eq!(restarted.transaction(&hash).unwrap().status, TxStatus::Pending);

    let changes = Arc::new(Mutex::new(Vec::new()));
    let balance_updates = Arc::new(AtomicUsize::new(0));
    let seen = changes.clone();
    restarted.monitor().on(EventKind::StatusChange, move |event| {
        if let MonitorEvent::StatusChange { record, old_status } = event {
            seen.lock().unwrap().push((record.status, *old_status));
        }
        Ok(())
    });
    let counter = balance_updates.clone();
    restarted.monitor().on(EventKind::BalanceUpdate, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    restarted.start_monitor();
    chain.mine(hash, 1);

    assert!(
        common::wait_until(Duration::from_secs(2), || {
            restarted.transaction(&hash).map(|r| r.status) == Some(TxStatus::Success)
        })
        .await
    );
    restarted.monitor().stop();

    let record = restarted.transaction(&hash).unwrap();
    assert_eq!(record.gas_used, 21_000);
    assert!(record.block_number.is_some());
    assert_eq!(*changes.lock().unwrap(), vec![(TxStatus::Success, TxStatus::Pending)]);
    assert_eq!(balance_updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_terminal_status_never_overwritten() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
    let hash = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();

    let notifications = Arc::new(AtomicUsize::new(0));
    let balance_updates = Arc::new(AtomicUsize::new(0));
    let n = notifications.clone();
    wallet.monitor().on(EventKind::StatusChange, move |_| {
        n.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let b = balance_updates.clone();
    wallet.monitor().on(EventKind::BalanceUpdate, move |_| {
        b.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    chain.mine(hash, 0);
    wallet.monitor().poll_once().await;
    assert_eq!(wallet.transaction(&hash).unwrap().status, TxStatus::Failed);

    // The chain now claims success; the record must not move.
    chain.mine(hash, 1);
    wallet.monitor().poll_once().await;
    let checked = wallet.monitor().check_one(hash).await.unwrap().unwrap();
    assert_eq!(checked.status, TxStatus::Failed);

    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    assert_eq!(balance_updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_check_one() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();

    assert!(wallet.monitor().check_one(B256::repeat_byte(9)).await.unwrap().is_none());

    let hash = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();
    let unchanged = wallet.monitor().check_one(hash).await.unwrap().unwrap();
    assert_eq!(unchanged.status, TxStatus::Pending);

    chain.mine(hash, 1);
    let settled = wallet.monitor().check_one(hash).await.unwrap().unwrap();
    assert_eq!(settled.status, TxStatus::Success);
}

#[tokio::test]
async fn test_failing_subscriber_does_not_block_others() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
    let first = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();
    let second = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();

    let delivered = Arc::new(AtomicUsize::new(0));
    wallet.monitor().on(EventKind::StatusChange, |_| Err("subscriber failed".into()));
    wallet.monitor().on(EventKind::StatusChange, |_| panic!("subscriber bug"));
    let d = delivered.clone();
    wallet.monitor().on(EventKind::StatusChange, move |_| {
        d.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    chain.mine(first, 1);
    chain.mine(second, 0);
    wallet.monitor().poll_once().await;

    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert_eq!(wallet.transaction(&first).unwrap().status, TxStatus::Success);
    assert_eq!(wallet.transaction(&second).unwrap().status, TxStatus::Failed);
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
    let hash = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();

    let monitor = wallet.monitor();
    monitor.stop();
    monitor.start(Duration::from_millis(20));
    monitor.start(Duration::from_millis(20));
    assert!(monitor.is_running());

    let polled = || chain.receipt_calls.load(Ordering::SeqCst) > 0;
    assert!(common::wait_until(Duration::from_secs(1), polled).await);

    monitor.stop();
    monitor.stop();
    assert!(common::wait_until(Duration::from_secs(1), || !monitor.is_running()).await);

    // Nothing settles once stopped.
    chain.mine(hash, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(wallet.transaction(&hash).unwrap().status, TxStatus::Pending);
}

#[tokio::test]
async fn test_wait_for_confirmation_settles_record() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
    let hash = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();

    chain.mine(hash, 1);
    let record = wallet.wait_for_confirmation(hash).await.unwrap().unwrap();
    assert_eq!(record.status, TxStatus::Success);
}

#[tokio::test]
async fn test_zero_interval_is_refused() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    let monitor = wallet.monitor();

    monitor.start(Duration::ZERO);
    assert!(!monitor.is_running());

    monitor.start(Duration::from_millis(20));
    assert!(monitor.is_running());
    monitor.stop();
}

#[tokio::test]
async fn test_stop_during_tick_discards_rest_of_tick() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
    let first = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();
    let second = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();
    chain.mine(first, 1);
    chain.mine(second, 1);

    let changes = Arc::new(AtomicUsize::new(0));
    let c = changes.clone();
    wallet.monitor().on(EventKind::StatusChange, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let monitor = wallet.monitor();
    chain.hold_receipts();
    monitor.start(Duration::from_millis(20));
    let receipt_calls = |n| chain.receipt_calls.load(Ordering::SeqCst) == n;
    assert!(common::wait_until(Duration::from_secs(1), || receipt_calls(1)).await);

    // The first run is parked on its first receipt when it is stopped.
    monitor.stop();
    assert!(!monitor.is_running());

    monitor.start(Duration::from_millis(20));
    assert!(common::wait_until(Duration::from_secs(1), || receipt_calls(2)).await);
    chain.release_receipts();

    let settled = |hash| wallet.transaction(&hash).map(|r| r.status) == Some(TxStatus::Success);
    assert!(common::wait_until(Duration::from_secs(2), || settled(first) && settled(second)).await);
    monitor.stop();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The stopped run fetched one receipt and acted on none.
    assert_eq!(chain.receipt_calls.load(Ordering::SeqCst), 3);
    assert_eq!(changes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_health_follows_the_node() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    assert!(wallet.is_healthy().await);

    chain.healthy.store(false, Ordering::SeqCst);
    assert!(!wallet.is_healthy().await);

    // An unreachable node does not stop the monitor.
    wallet.monitor().poll_once().await;
    wallet.start_monitor();
    assert!(wallet.monitor().is_running());
    wallet.monitor().stop();
}

#[tokio::test]
async fn test_wait_for_confirmation_survives_head_lookup_failures() {
    let chain = FakeChain::new();
    let wallet = common::wallet(&MemoryStore::new(), &chain);
    wallet.import_private_key(DEV_KEY, PASSWORD).await.unwrap();
    let hash = wallet.send(RECIPIENT, ether(1), GasSpeed::Standard).await.unwrap();

    chain.mine(hash, 1);
    chain.healthy.store(false, Ordering::SeqCst);
    let node = chain.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        node.healthy.store(true, Ordering::SeqCst);
    });

    let record = wallet.wait_for_confirmation(hash).await.unwrap().unwrap();
    assert_eq!(record.status, TxStatus::Success);
}
