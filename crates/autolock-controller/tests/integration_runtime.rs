//! Integration tests for the concurrently running sampler and scan loop.
//!
//! All tests run on a paused clock, so the 100ms switch tick and the 1s scan
//! timeout advance deterministically.
//!
//! Run with: cargo test --package autolock-controller --test integration_runtime

mod common;

use autolock_controller::{
    CardSession, ControllerSettings, LockController, SwitchSampler, runtime,
};
use autolock_core::constants::{CLOSE_CUE_HZ, OPEN_CUE_HZ};
use autolock_core::{HoldAction, LockState, ScanMode};
use autolock_hardware::mock::{MockCardReader, MockCardReaderHandle, MockSwitch, MockSwitchHandle};
use autolock_hardware::{AnyCardReader, AnySwitch, Level};
use autolock_storage::{AnyRegistryStore, MemoryRegistryStore};
use common::{Rig, card, outputs, sampler_settings};
use std::time::Duration;

struct Running {
    handle: runtime::AutolockHandle,
    rig: Rig,
    switch: MockSwitchHandle,
    reader: MockCardReaderHandle,
    store: MemoryRegistryStore,
}

async fn start(
    cards: &[&str],
    reader: (MockCardReader, MockCardReaderHandle),
    settings: ControllerSettings,
) -> Running {
    let (outputs, rig) = outputs();
    let store = MemoryRegistryStore::with_cards(cards.iter().map(|c| card(c)));
    let controller =
        LockController::new(outputs, AnyRegistryStore::Memory(store.clone()), settings).await;

    let (switch, switch_handle) = MockSwitch::new(&rig.gpio, 17).unwrap();
    let sampler = SwitchSampler::new(AnySwitch::Mock(switch), sampler_settings());

    let (reader, reader_handle) = reader;
    let session = CardSession::open(AnyCardReader::Mock(reader)).await;

    Running {
        handle: runtime::start(controller, sampler, session),
        rig,
        switch: switch_handle,
        reader: reader_handle,
        store,
    }
}

#[tokio::test(start_paused = true)]
async fn test_card_opens_lock_while_sampler_runs() {
    let running = start(&["04a1b2c3"], MockCardReader::new(), ControllerSettings::default()).await;

    running
        .reader
        .present_card(vec![0x04, 0xA1, 0xB2, 0xC3])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let controller = running.handle.controller().clone();
    assert_eq!(controller.state().await, LockState::Opened);
    assert!(running.rig.green.is_lit());
    assert_eq!(running.rig.tone_count(&OPEN_CUE_HZ), 1);

    let reports = running.handle.shutdown().await.unwrap();
    assert_eq!(reports.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_reader_keeps_loop_alive() {
    let running = start(&["04a1b2c3"], MockCardReader::unplugged(), ControllerSettings::default()).await;

    tokio::time::sleep(Duration::from_millis(10_500)).await;

    let controller = running.handle.controller().clone();
    assert!(!running.handle.is_shutdown_requested());
    assert_eq!(controller.state().await, LockState::Closed);
    assert_eq!(controller.stats().await.transitions, 0);
    assert_eq!(running.rig.cue_count(), 0);

    let reports = running.handle.shutdown().await.unwrap();
    let scan = reports.iter().find(|r| r.task == "scan loop").unwrap();
    assert!(scan.iterations >= 10);
    assert_eq!(scan.failures, scan.iterations);
}

#[tokio::test(start_paused = true)]
async fn test_press_toggles_lock() {
    let running = start(&[], MockCardReader::unplugged(), ControllerSettings::default()).await;

    running.switch.script([Level::High, Level::Low]);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let controller = running.handle.controller().clone();
    assert_eq!(controller.state().await, LockState::Opened);
    assert_eq!(running.rig.tone_count(&OPEN_CUE_HZ), 1);

    running.switch.script([Level::High, Level::Low]);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(controller.state().await, LockState::Closed);
    assert_eq!(running.rig.tone_count(&CLOSE_CUE_HZ), 1);

    running.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_hold_shuts_down_both_loops() {
    let running = start(&[], MockCardReader::new(), ControllerSettings::default()).await;

    running.switch.set_level(Level::High);
    let reports = tokio::time::timeout(Duration::from_secs(30), running.handle.wait())
        .await
        .expect("hold gesture should stop the controller")
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(!running.rig.red.is_lit());
    assert!(!running.rig.green.is_lit());

    let sampler = reports.iter().find(|r| r.task == "switch sampler").unwrap();
    assert_eq!(sampler.events, 2);
}

#[tokio::test(start_paused = true)]
async fn test_scan_in_flight_at_shutdown_is_dropped() {
    let running = start(&["04a1b2c3"], MockCardReader::new(), ControllerSettings::default()).await;
    let controller = running.handle.controller().clone();

    running.switch.set_level(Level::High);
    tokio::time::timeout(Duration::from_secs(30), running.handle.shutdown_requested())
        .await
        .expect("hold gesture should request shutdown");

    let state = controller.state().await;
    let transitions = controller.stats().await.transitions;
    let angles = running.rig.latch.angles();

    running
        .reader
        .present_card(vec![0x04, 0xA1, 0xB2, 0xC3])
        .await
        .unwrap();
    running.handle.wait().await.unwrap();

    assert_eq!(controller.state().await, state);
    assert_eq!(controller.stats().await.transitions, transitions);
    assert_eq!(running.rig.latch.angles(), angles);
    assert!(!running.rig.red.is_lit());
    assert!(!running.rig.green.is_lit());
}

#[tokio::test(start_paused = true)]
async fn test_hold_can_be_bound_to_open() {
    let settings = ControllerSettings {
        hold_action: HoldAction::Open,
        ..Default::default()
    };
    let running = start(&[], MockCardReader::unplugged(), settings).await;

    // the press opens, the hold re-runs the open sequence
    running
        .switch
        .script(std::iter::repeat_n(Level::High, 8).chain([Level::Low]));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let controller = running.handle.controller().clone();
    assert_eq!(controller.state().await, LockState::Opened);
    assert_eq!(running.rig.tone_count(&OPEN_CUE_HZ), 2);
    assert!(!running.handle.is_shutdown_requested());

    running.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_register_mode_without_stopping_loop() {
    let running = start(&[], MockCardReader::new(), ControllerSettings::default()).await;
    let controller = running.handle.controller().clone();

    controller.set_scan_mode(ScanMode::Register);
    running.reader.present_card(vec![0xCA, 0xFE, 0xBA, 0xBE]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(running.store.cards().contains(&card("cafebabe")));
    assert_eq!(controller.state().await, LockState::Closed);

    controller.set_scan_mode(ScanMode::Toggle);
    running.reader.present_card(vec![0xCA, 0xFE, 0xBA, 0xBE]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(controller.state().await, LockState::Opened);

    running.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_garbled_tag_never_toggles() {
    let running = start(&["04a1b2c3"], MockCardReader::new(), ControllerSettings::default()).await;

    running.reader.present_card(vec![0x04, 0xA1]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let controller = running.handle.controller().clone();
    assert_eq!(controller.state().await, LockState::Closed);
    assert_eq!(running.rig.cue_count(), 0);

    let reports = running.handle.shutdown().await.unwrap();
    let scan = reports.iter().find(|r| r.task == "scan loop").unwrap();
    assert_eq!(scan.failures, 1);
}
