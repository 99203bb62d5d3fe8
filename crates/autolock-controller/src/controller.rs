//! Lock controller.
//!
//! The controller owns the lock state, the card registry and the output
//! devices, all behind one [`tokio::sync::Mutex`]. Every actuation sequence
//!
//! ```text
//! cue -> latch move (settle, neutral) -> indicators -> state commit
//! ```
//!
//! runs with that mutex held, so a switch gesture and a card scan arriving
//! together are applied one after the other, never interleaved. Registry
//! lookups and registrations take the same mutex.
//!
//! Output device failures are logged and counted; the sequence carries on
//! and the state is still committed.
//!
//! # Examples
//!
//! ```
//! use autolock_controller::{ControllerSettings, LockController, LockOutputs, ToggleOutcome};
//! use autolock_core::{CardId, LockState, ScanResult};
//! use autolock_hardware::mock::{MockIndicator, MockLatch, MockTone};
//! use autolock_hardware::{AnyIndicator, AnyLatch, AnyToneDevice, Gpio};
//! use autolock_storage::{AnyRegistryStore, MemoryRegistryStore};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> autolock_hardware::Result<()> {
//! let gpio = Gpio::init()?;
//! let outputs = LockOutputs {
//!     latch: AnyLatch::Mock(MockLatch::new(&gpio, 18)?.0),
//!     red: AnyIndicator::Mock(MockIndicator::new(&gpio, 24)?.0),
//!     green: AnyIndicator::Mock(MockIndicator::new(&gpio, 23)?.0),
//!     tone: AnyToneDevice::Mock(MockTone::new(&gpio, 4, Duration::from_millis(100))?.0),
//! };
//!
//! let card = CardId::parse("04a1b2c3").unwrap();
//! let store = AnyRegistryStore::Memory(MemoryRegistryStore::with_cards([card.clone()]));
//! let controller = LockController::new(outputs, store, ControllerSettings::default()).await;
//!
//! let outcome = controller.toggle_on_scan(&ScanResult::Card(card)).await;
//! assert_eq!(outcome, ToggleOutcome::Opened);
//! assert_eq!(controller.state().await, LockState::Opened);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use autolock_core::constants::{
    DEFAULT_CLOSE_ANGLE, DEFAULT_OPEN_ANGLE, DEFAULT_SCAN_TIMEOUT_MS, DEFAULT_SETTLE_MS,
    NEUTRAL_ANGLE,
};
use autolock_core::{CardId, Cue, Gesture, HoldAction, LockState, Registration, ScanMode, ScanResult};
use autolock_hardware::{
    AnyIndicator, AnyLatch, AnyToneDevice, Indicator, LatchActuator, ToneDevice,
};
use autolock_storage::{AnyRegistryStore, AutolockConfig, RegistryStore};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::runtime::LoopReport;
use crate::sampler::{GestureHandler, SamplerControl};
use crate::session::CardSession;
use crate::state_machine::{LockStateMachine, StateTransition};

/// Drive `latch` to `angle`, wait `settle` and return it to neutral.
///
/// The neutral angle itself is written once with no wait.
pub async fn rotate<L: LatchActuator>(
    latch: &mut L,
    angle: u16,
    settle: Duration,
) -> autolock_hardware::Result<()> {
    latch.set_position(angle)?;
    if angle > NEUTRAL_ANGLE {
        tokio::time::sleep(settle).await;
        latch.set_position(NEUTRAL_ANGLE)?;
    }
    Ok(())
}

/// Output devices driven by the controller.
#[derive(Debug)]
pub struct LockOutputs {
    pub latch: AnyLatch,
    pub red: AnyIndicator,
    pub green: AnyIndicator,
    pub tone: AnyToneDevice,
}

impl LockOutputs {
    /// Red on, green off.
    pub fn led_red(&mut self) -> autolock_hardware::Result<()> {
        self.green.off()?;
        self.red.on()
    }

    /// Green on, red off.
    pub fn led_green(&mut self) -> autolock_hardware::Result<()> {
        self.red.off()?;
        self.green.on()
    }

    /// Both dark.
    pub fn led_off(&mut self) -> autolock_hardware::Result<()> {
        self.red.off()?;
        self.green.off()
    }
}

/// Angles and timings used by the actuation sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub open_angle: u16,
    pub close_angle: u16,
    pub settle: Duration,
    pub scan_timeout: Duration,
    pub hold_action: HoldAction,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            open_angle: DEFAULT_OPEN_ANGLE,
            close_angle: DEFAULT_CLOSE_ANGLE,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            scan_timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
            hold_action: HoldAction::default(),
        }
    }
}

impl From<&AutolockConfig> for ControllerSettings {
    fn from(config: &AutolockConfig) -> Self {
        Self {
            open_angle: config.open_angle,
            close_angle: config.close_angle,
            settle: config.settle(),
            scan_timeout: config.scan_timeout_duration(),
            hold_action: config.hold_action,
        }
    }
}

/// Counters since the controller was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Scan results processed
    pub scans: u64,
    /// Scans that produced a card identifier
    pub cards_seen: u64,
    /// Unregistered cards
    pub rejections: u64,
    /// Committed state transitions
    pub transitions: u64,
    /// Cards newly added to the registry
    pub registrations: u64,
    /// Output device or registry store failures
    pub faults: u64,
}

/// Result of [`LockController::toggle_on_scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Opened,
    Closed,
    /// Card not in the registry; rejection cue played.
    Rejected(CardId),
    /// No usable card in the scan result.
    Ignored,
}

/// Result of routing one scan through the current [`ScanMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Toggle(ToggleOutcome),
    Register(CardId, Registration),
    /// Registration mode, but no card was read.
    Skipped,
}

#[derive(Debug)]
struct Inner {
    machine: LockStateMachine,
    registry: BTreeSet<CardId>,
    outputs: LockOutputs,
    stats: ControllerStats,
    /// False when the store could not be read; saves would drop its cards.
    registry_loaded: bool,
    /// Set by shutdown; scans are no longer acted on.
    halted: bool,
}

impl Inner {
    async fn actuate(&mut self, target: LockState, settings: &ControllerSettings) -> StateTransition {
        let (cue, angle) = match target {
            LockState::Opened => (Cue::Open, settings.open_angle),
            LockState::Closed => (Cue::Close, settings.close_angle),
        };

        self.play(cue).await;

        if let Err(e) = rotate(&mut self.outputs.latch, angle, settings.settle).await {
            warn!("Latch move to {} failed: {}", angle, e);
            self.stats.faults += 1;
        }

        let leds = match target {
            LockState::Opened => self.outputs.led_green(),
            LockState::Closed => self.outputs.led_red(),
        };
        if let Err(e) = leds {
            warn!("Indicator update failed: {}", e);
            self.stats.faults += 1;
        }

        let transition = self.machine.commit(target);
        self.stats.transitions += 1;
        info!("Lock {} (was {})", transition.to, transition.from);
        transition
    }

    async fn play(&mut self, cue: Cue) {
        if let Err(e) = self.outputs.tone.play(cue.frequencies()).await {
            warn!("{:?} cue failed: {}", cue, e);
            self.stats.faults += 1;
        }
    }
}

/// Shared handle to the lock state, registry and outputs.
///
/// Cloning is cheap; all clones drive the same lock.
#[derive(Debug, Clone)]
pub struct LockController {
    inner: Arc<Mutex<Inner>>,
    store: AnyRegistryStore,
    mode: Arc<watch::Sender<ScanMode>>,
    settings: ControllerSettings,
    shutdown: CancellationToken,
}

impl LockController {
    /// Create a controller in the `Closed` state.
    ///
    /// The registry is loaded from `store`; if that fails the controller
    /// starts with an empty registry and never saves over the store. No
    /// output is driven here.
    pub async fn new(outputs: LockOutputs, store: AnyRegistryStore, settings: ControllerSettings) -> Self {
        let (registry, registry_loaded) = match store.load().await {
            Ok(cards) => {
                info!("Loaded {} registered cards", cards.len());
                (cards, true)
            }
            Err(e) => {
                warn!("Registry load failed, starting empty: {}", e);
                (BTreeSet::new(), false)
            }
        };

        let inner = Inner {
            machine: LockStateMachine::new(),
            registry,
            outputs,
            stats: ControllerStats {
                faults: u64::from(!registry_loaded),
                ..Default::default()
            },
            registry_loaded,
            halted: false,
        };
        let (mode, _) = watch::channel(ScanMode::default());

        Self {
            inner: Arc::new(Mutex::new(inner)),
            store,
            mode: Arc::new(mode),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Token cancelled by the hold-to-shutdown gesture.
    ///
    /// The runtime derives both loop tokens from it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the open sequence, whatever the current state.
    pub async fn open(&self) -> StateTransition {
        let mut inner = self.inner.lock().await;
        inner.actuate(LockState::Opened, &self.settings).await
    }

    /// Run the close sequence, whatever the current state.
    pub async fn close(&self) -> StateTransition {
        let mut inner = self.inner.lock().await;
        inner.actuate(LockState::Closed, &self.settings).await
    }

    /// Invert the current state without a registry check.
    pub async fn toggle(&self) -> StateTransition {
        let mut inner = self.inner.lock().await;
        let target = inner.machine.current_state().inverted();
        inner.actuate(target, &self.settings).await
    }

    /// Toggle the lock if the scanned card is registered.
    ///
    /// An unregistered card plays the rejection cue and leaves the state
    /// alone. Results without a card (timeout, unavailable reader, garbled
    /// data) do nothing, and neither does any scan after [`shutdown`](Self::shutdown).
    pub async fn toggle_on_scan(&self, result: &ScanResult) -> ToggleOutcome {
        let mut inner = self.inner.lock().await;
        if inner.halted {
            debug!("Ignoring {} after shutdown", result);
            return ToggleOutcome::Ignored;
        }
        inner.stats.scans += 1;

        let Some(id) = result.card() else {
            return ToggleOutcome::Ignored;
        };
        inner.stats.cards_seen += 1;

        if !id.matches_any(&inner.registry) {
            info!("Card {} is not registered", id);
            inner.stats.rejections += 1;
            inner.play(Cue::Reject).await;
            return ToggleOutcome::Rejected(id.clone());
        }

        let target = inner.machine.current_state().inverted();
        inner.actuate(target, &self.settings).await;
        match target {
            LockState::Opened => ToggleOutcome::Opened,
            LockState::Closed => ToggleOutcome::Closed,
        }
    }

    /// Add `id` to the registry and persist it.
    ///
    /// A store failure is logged; the card stays registered in memory. If the
    /// registry could not be loaded at startup, nothing is saved.
    pub async fn register(&self, id: CardId) -> Registration {
        let mut inner = self.inner.lock().await;

        if inner.registry.contains(&id) {
            info!("Card {} already registered", id);
            return Registration::AlreadyRegistered;
        }

        inner.registry.insert(id.clone());
        inner.stats.registrations += 1;
        info!("Registered card {}", id);

        if !inner.registry_loaded {
            warn!("Registry was not loaded, keeping card {} in memory only", id);
        } else if let Err(e) = self.store.save(&inner.registry).await {
            warn!("Registry save failed, keeping card in memory: {}", e);
            inner.stats.faults += 1;
        }

        Registration::NewlyRegistered
    }

    /// Route a scan result according to the current scan mode.
    pub async fn process_scan(&self, result: &ScanResult) -> ScanOutcome {
        match self.scan_mode() {
            ScanMode::Toggle => ScanOutcome::Toggle(self.toggle_on_scan(result).await),
            ScanMode::Register => {
                {
                    let mut inner = self.inner.lock().await;
                    if inner.halted {
                        return ScanOutcome::Skipped;
                    }
                    inner.stats.scans += 1;
                }
                match result.card() {
                    Some(id) => {
                        let registration = self.register(id.clone()).await;
                        ScanOutcome::Register(id.clone(), registration)
                    }
                    None => ScanOutcome::Skipped,
                }
            }
        }
    }

    /// Switch what the scan loop does with the next cards.
    pub fn set_scan_mode(&self, mode: ScanMode) {
        let previous = self.mode.send_replace(mode);
        if previous != mode {
            info!("Scan mode {} -> {}", previous, mode);
        }
    }

    pub fn scan_mode(&self) -> ScanMode {
        *self.mode.borrow()
    }

    /// Watch scan mode changes.
    pub fn subscribe_scan_mode(&self) -> watch::Receiver<ScanMode> {
        self.mode.subscribe()
    }

    pub async fn state(&self) -> LockState {
        self.inner.lock().await.machine.current_state()
    }

    pub async fn is_registered(&self, id: &CardId) -> bool {
        id.matches_any(&self.inner.lock().await.registry)
    }

    /// Copy of the registry.
    pub async fn registry(&self) -> BTreeSet<CardId> {
        self.inner.lock().await.registry.clone()
    }

    pub async fn stats(&self) -> ControllerStats {
        self.inner.lock().await.stats
    }

    /// The last `count` committed transitions, oldest first.
    pub async fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.inner.lock().await.machine.last_transitions(count)
    }

    pub async fn time_in_state(&self) -> Duration {
        self.inner.lock().await.machine.time_in_current_state()
    }

    /// Darken both indicators and cancel the shutdown token.
    ///
    /// Waits for any running actuation to finish first. Scans processed
    /// afterwards are ignored.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.halted = true;
        if let Err(e) = inner.outputs.led_off() {
            warn!("Indicator shutdown failed: {}", e);
            inner.stats.faults += 1;
        }
        info!("Shutdown requested");
        self.shutdown.cancel();
    }

    /// Scan until `token` is cancelled.
    ///
    /// Cancellation is observed between scans; a scan in flight runs to its
    /// timeout and its result is dropped. An unavailable reader returns at once, so the loop waits one
    /// scan timeout before trying again.
    pub async fn run_scan_loop(self, mut session: CardSession, token: CancellationToken) -> LoopReport {
        let mut report = LoopReport::new("scan loop");
        let timeout = self.settings.scan_timeout;
        info!("Scan loop started ({}ms per scan)", timeout.as_millis());

        loop {
            if token.is_cancelled() {
                debug!("Scan loop cancelled");
                break;
            }
            report.iterations += 1;

            let result = session.scan(timeout).await;
            if token.is_cancelled() {
                debug!("Scan loop cancelled, dropping {}", result);
                break;
            }
            match &result {
                ScanResult::Unavailable => {
                    report.failures += 1;
                    tokio::time::sleep(timeout).await;
                    continue;
                }
                ScanResult::Failed { .. } => report.failures += 1,
                ScanResult::Card(_) => report.events += 1,
                ScanResult::NoCard => {}
            }

            match self.process_scan(&result).await {
                ScanOutcome::Register(id, registration) => {
                    debug!("Card {} {}", id, registration);
                }
                ScanOutcome::Toggle(outcome) => debug!("Scan outcome: {:?}", outcome),
                ScanOutcome::Skipped => {}
            }
        }

        report
    }
}

impl GestureHandler for LockController {
    async fn on_gesture(&self, gesture: Gesture) -> SamplerControl {
        match (gesture, self.settings.hold_action) {
            (Gesture::Press, _) => {
                self.toggle().await;
                SamplerControl::Continue
            }
            (Gesture::Hold, HoldAction::Open) => {
                self.open().await;
                SamplerControl::Continue
            }
            (Gesture::Hold, HoldAction::Shutdown) => {
                self.shutdown().await;
                SamplerControl::Stop
            }
        }
    }
}
