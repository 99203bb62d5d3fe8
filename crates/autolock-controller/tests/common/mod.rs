//! Shared rig for controller integration tests.

#![allow(dead_code)]

use autolock_controller::{ControllerSettings, LockController, LockOutputs, SamplerSettings};
use autolock_core::{CardId, HoldRetrigger};
use autolock_hardware::mock::{
    MockIndicator, MockIndicatorHandle, MockLatch, MockLatchHandle, MockTone, MockToneHandle,
};
use autolock_hardware::{AnyIndicator, AnyLatch, AnyToneDevice, Gpio};
use autolock_storage::{AnyRegistryStore, MemoryRegistryStore};
use std::time::Duration;

/// Observers for the output devices.
pub struct Rig {
    pub gpio: Gpio,
    pub latch: MockLatchHandle,
    pub red: MockIndicatorHandle,
    pub green: MockIndicatorHandle,
    pub tone: MockToneHandle,
}

impl Rig {
    pub fn tone_count(&self, cue: &[u32]) -> usize {
        self.tone.count_of(cue)
    }

    pub fn cue_count(&self) -> usize {
        self.tone.sequences().len()
    }
}

pub fn card(hex: &str) -> CardId {
    CardId::parse(hex).unwrap()
}

pub fn outputs() -> (LockOutputs, Rig) {
    let gpio = Gpio::init().unwrap();
    let (latch, latch_handle) = MockLatch::new(&gpio, 18).unwrap();
    let (red, red_handle) = MockIndicator::new(&gpio, 24).unwrap();
    let (green, green_handle) = MockIndicator::new(&gpio, 23).unwrap();
    let (tone, tone_handle) = MockTone::new(&gpio, 4, Duration::from_millis(100)).unwrap();

    let outputs = LockOutputs {
        latch: AnyLatch::Mock(latch),
        red: AnyIndicator::Mock(red),
        green: AnyIndicator::Mock(green),
        tone: AnyToneDevice::Mock(tone),
    };
    let rig = Rig {
        gpio,
        latch: latch_handle,
        red: red_handle,
        green: green_handle,
        tone: tone_handle,
    };
    (outputs, rig)
}

pub async fn controller_with_store(
    store: MemoryRegistryStore,
    settings: ControllerSettings,
) -> (LockController, Rig) {
    let (outputs, rig) = outputs();
    let controller = LockController::new(outputs, AnyRegistryStore::Memory(store), settings).await;
    (controller, rig)
}

pub async fn controller(cards: &[&str]) -> (LockController, Rig, MemoryRegistryStore) {
    let store = MemoryRegistryStore::with_cards(cards.iter().map(|c| card(c)));
    let (controller, rig) = controller_with_store(store.clone(), ControllerSettings::default()).await;
    (controller, rig, store)
}

pub fn sampler_settings() -> SamplerSettings {
    SamplerSettings {
        interval: Duration::from_millis(100),
        long_window: 5,
        retrigger: HoldRetrigger::OncePerHold,
    }
}
