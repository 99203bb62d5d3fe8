//! Debounced switch sampler.
//!
//! The sampler reads the manual switch once per tick and keeps two sliding
//! windows over the most recent levels:
//!
//! - a short window of [`SHORT_WINDOW_LEN`] samples, which detects a rising
//!   edge (`[Low, High]`) and yields [`Gesture::Press`];
//! - a long window (5 samples by default), which detects a sustained level
//!   (all `High`) and yields [`Gesture::Hold`].
//!
//! Hold is evaluated first. When it fires the long window is reset to all
//! `Low` and the press check is skipped for that tick. With
//! [`HoldRetrigger::OncePerHold`] a hold fires at most once per continuous
//! high run; [`HoldRetrigger::EveryWindow`] fires again each time the reset
//! window refills while the switch is still down.
//!
//! Transitions faster than the tick interval are lost. The windows act as a
//! low-pass filter, not an edge-accurate detector.
//!
//! ```text
//! tick      1  2  3  4  5  6  7
//! level     0  1  1  1  1  1  0
//! gesture      P           H
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use autolock_core::constants::SHORT_WINDOW_LEN;
use autolock_core::{Gesture, HoldRetrigger};
use autolock_hardware::{AnySwitch, DigitalInput, Level};
use autolock_storage::AutolockConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::runtime::LoopReport;

/// What the sampler does after a gesture was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerControl {
    /// Keep polling.
    Continue,
    /// Leave the polling loop.
    Stop,
}

/// Receiver of classified gestures.
///
/// Handlers run on the sampler's own task. A slow handler delays the next
/// poll, so work that takes long should be handed off.
pub trait GestureHandler: Send + Sync {
    fn on_gesture(&self, gesture: Gesture) -> impl Future<Output = SamplerControl> + Send;
}

/// Short and long sample windows.
///
/// Both windows start (and [`reset`](Self::reset) to) all `Low`, so no
/// gesture can fire before enough real samples were observed.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    short: VecDeque<Level>,
    long: VecDeque<Level>,
    long_len: usize,
    retrigger: HoldRetrigger,
    hold_latched: bool,
}

impl SampleHistory {
    /// Create windows with a long window of `long_len` samples.
    ///
    /// `long_len` is raised to one more than the short window if smaller.
    pub fn new(long_len: usize, retrigger: HoldRetrigger) -> Self {
        let long_len = long_len.max(SHORT_WINDOW_LEN + 1);
        Self {
            short: VecDeque::from(vec![Level::Low; SHORT_WINDOW_LEN]),
            long: VecDeque::from(vec![Level::Low; long_len]),
            long_len,
            retrigger,
            hold_latched: false,
        }
    }

    /// Fill both windows with `Low` and forget any latched hold.
    pub fn reset(&mut self) {
        self.short.iter_mut().for_each(|s| *s = Level::Low);
        self.reset_long();
        self.hold_latched = false;
    }

    fn reset_long(&mut self) {
        self.long.iter_mut().for_each(|s| *s = Level::Low);
    }

    /// Length of the long window.
    pub fn long_len(&self) -> usize {
        self.long_len
    }

    /// Push one sample and classify the windows.
    pub fn push(&mut self, level: Level) -> Option<Gesture> {
        Self::slide(&mut self.short, level);
        Self::slide(&mut self.long, level);

        if !level.is_high() {
            self.hold_latched = false;
        }

        if !self.hold_latched && self.long.iter().all(|s| s.is_high()) {
            self.reset_long();
            if self.retrigger == HoldRetrigger::OncePerHold {
                self.hold_latched = true;
            }
            return Some(Gesture::Hold);
        }

        if self.short.front() == Some(&Level::Low) && self.short.back() == Some(&Level::High) {
            return Some(Gesture::Press);
        }

        None
    }

    fn slide(window: &mut VecDeque<Level>, level: Level) {
        window.pop_front();
        window.push_back(level);
    }
}

/// Sampler timing and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    pub interval: Duration,
    pub long_window: usize,
    pub retrigger: HoldRetrigger,
}

impl From<&AutolockConfig> for SamplerSettings {
    fn from(config: &AutolockConfig) -> Self {
        Self {
            interval: config.poll_interval_duration(),
            long_window: config.long_window,
            retrigger: config.hold_retrigger,
        }
    }
}

/// Polls the switch and dispatches gestures.
#[derive(Debug)]
pub struct SwitchSampler {
    switch: AnySwitch,
    history: SampleHistory,
    interval: Duration,
}

impl SwitchSampler {
    pub fn new(switch: AnySwitch, settings: SamplerSettings) -> Self {
        Self {
            switch,
            history: SampleHistory::new(settings.long_window, settings.retrigger),
            interval: settings.interval,
        }
    }

    /// Poll until `token` is cancelled or the handler asks to stop.
    ///
    /// Cancellation is observed at the top of each tick, after the previous
    /// sleep has completed. A failed read is logged and the tick skipped.
    pub async fn run<H: GestureHandler>(
        mut self,
        handler: H,
        token: CancellationToken,
    ) -> LoopReport {
        let mut report = LoopReport::new("switch sampler");
        self.history.reset();
        info!(
            "Switch sampler started ({}ms tick, {}-sample hold)",
            self.interval.as_millis(),
            self.history.long_len()
        );

        loop {
            if token.is_cancelled() {
                debug!("Switch sampler cancelled");
                break;
            }
            report.iterations += 1;

            match self.switch.read() {
                Ok(level) => {
                    if let Some(gesture) = self.history.push(level) {
                        debug!("Switch gesture: {}", gesture);
                        report.events += 1;
                        if handler.on_gesture(gesture).await == SamplerControl::Stop {
                            info!("Switch sampler stopped by {} gesture", gesture);
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("Switch read failed: {}", e);
                    report.failures += 1;
                }
            }

            tokio::time::sleep(self.interval).await;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autolock_hardware::Gpio;
    use autolock_hardware::mock::MockSwitch;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    fn levels(bits: &[u8]) -> Vec<Level> {
        bits.iter().map(|&b| Level::from(b != 0)).collect()
    }

    fn classify(history: &mut SampleHistory, bits: &[u8]) -> Vec<Option<Gesture>> {
        levels(bits).into_iter().map(|l| history.push(l)).collect()
    }

    #[test]
    fn test_single_edge_is_press() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        let gestures = classify(&mut history, &[0, 1, 0, 0]);
        assert_eq!(gestures, vec![None, Some(Gesture::Press), None, None]);
    }

    #[test]
    fn test_high_from_start_is_press() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        assert_eq!(history.push(Level::High), Some(Gesture::Press));
    }

    #[rstest]
    #[case::steady_low(&[0, 0, 0, 0], 0)]
    #[case::steady_high(&[1, 1, 1, 1], 1)]
    #[case::falling(&[0, 1, 0, 0], 1)]
    #[case::bouncing(&[0, 1, 0, 1, 0, 1], 3)]
    fn test_press_count(#[case] bits: &[u8], #[case] expected: usize) {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        let presses = classify(&mut history, bits)
            .into_iter()
            .filter(|g| *g == Some(Gesture::Press))
            .count();
        assert_eq!(presses, expected);
    }

    #[test]
    fn test_hold_after_five_high_samples() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        let gestures = classify(&mut history, &[0, 1, 1, 1, 1, 1]);
        assert_eq!(
            gestures,
            vec![None, Some(Gesture::Press), None, None, None, Some(Gesture::Hold)]
        );
    }

    #[test]
    fn test_four_high_samples_are_not_a_hold() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        let gestures = classify(&mut history, &[1, 1, 1, 1, 0, 0]);
        assert!(!gestures.contains(&Some(Gesture::Hold)));
    }

    #[test]
    fn test_once_per_hold_does_not_refire() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        let holds = classify(&mut history, &[1; 20])
            .into_iter()
            .filter(|g| *g == Some(Gesture::Hold))
            .count();
        assert_eq!(holds, 1);
    }

    #[test]
    fn test_every_window_refires_while_held() {
        let mut history = SampleHistory::new(5, HoldRetrigger::EveryWindow);
        let gestures = classify(&mut history, &[1; 10]);
        assert_eq!(gestures[4], Some(Gesture::Hold));
        assert_eq!(gestures[9], Some(Gesture::Hold));
        assert_eq!(
            gestures.iter().filter(|g| **g == Some(Gesture::Hold)).count(),
            2
        );
    }

    #[test]
    fn test_release_rearms_hold() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        let holds = classify(&mut history, &[1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1])
            .into_iter()
            .filter(|g| *g == Some(Gesture::Hold))
            .count();
        assert_eq!(holds, 2);
    }

    #[test]
    fn test_reset_clears_windows() {
        let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
        classify(&mut history, &[1, 1, 1, 1]);
        history.reset();
        assert_eq!(history.push(Level::High), Some(Gesture::Press));
        let gestures = classify(&mut history, &[1, 1, 1]);
        assert!(!gestures.contains(&Some(Gesture::Hold)));
    }

    #[test]
    fn test_short_long_window_is_raised() {
        let history = SampleHistory::new(1, HoldRetrigger::OncePerHold);
        assert_eq!(history.long_len(), SHORT_WINDOW_LEN + 1);
    }

    /// Lengths of the maximal high runs in `bits`.
    fn high_runs(bits: &[u8]) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = None;
        for (i, &b) in bits.iter().enumerate() {
            match (b != 0, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    runs.push((s, i));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, bits.len()));
        }
        runs
    }

    proptest! {
        #[test]
        fn prop_hold_fires_once_per_long_run(bits in prop::collection::vec(0u8..2, 0..200)) {
            let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
            let gestures = classify(&mut history, &bits);

            for (start, end) in high_runs(&bits) {
                let holds = gestures[start..end]
                    .iter()
                    .filter(|g| **g == Some(Gesture::Hold))
                    .count();
                if end - start >= 5 {
                    prop_assert_eq!(holds, 1);
                } else {
                    prop_assert_eq!(holds, 0);
                }
            }
        }

        #[test]
        fn prop_press_fires_exactly_on_rising_edges(bits in prop::collection::vec(0u8..2, 0..200)) {
            let mut history = SampleHistory::new(5, HoldRetrigger::OncePerHold);
            let gestures = classify(&mut history, &bits);

            for (i, gesture) in gestures.iter().enumerate() {
                let previous = if i == 0 { 0 } else { bits[i - 1] };
                let rising = previous == 0 && bits[i] == 1;
                prop_assert_eq!(*gesture == Some(Gesture::Press), rising);
            }
        }

        #[test]
        fn prop_gestures_only_on_high_samples(bits in prop::collection::vec(0u8..2, 0..200)) {
            let mut history = SampleHistory::new(5, HoldRetrigger::EveryWindow);
            for (bit, gesture) in bits.iter().zip(classify(&mut history, &bits)) {
                if *bit == 0 {
                    prop_assert_eq!(gesture, None);
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        gestures: Arc<Mutex<Vec<Gesture>>>,
        stop_on_hold: bool,
    }

    impl GestureHandler for Recorder {
        async fn on_gesture(&self, gesture: Gesture) -> SamplerControl {
            self.gestures.lock().unwrap().push(gesture);
            if self.stop_on_hold && gesture == Gesture::Hold {
                SamplerControl::Stop
            } else {
                SamplerControl::Continue
            }
        }
    }

    fn settings() -> SamplerSettings {
        SamplerSettings {
            interval: Duration::from_millis(100),
            long_window: 5,
            retrigger: HoldRetrigger::OncePerHold,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_hold() {
        let gpio = Gpio::init().unwrap();
        let (switch, handle) = MockSwitch::new(&gpio, 17).unwrap();
        handle.set_level(Level::High);

        let recorder = Recorder {
            stop_on_hold: true,
            ..Default::default()
        };
        let sampler = SwitchSampler::new(AnySwitch::Mock(switch), settings());

        let report = sampler
            .run(recorder.clone(), CancellationToken::new())
            .await;

        assert_eq!(
            *recorder.gestures.lock().unwrap(),
            vec![Gesture::Press, Gesture::Hold]
        );
        assert_eq!(report.iterations, 5);
        assert_eq!(handle.read_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_finishes_sleep_before_cancel() {
        let gpio = Gpio::init().unwrap();
        let (switch, handle) = MockSwitch::new(&gpio, 17).unwrap();
        let sampler = SwitchSampler::new(AnySwitch::Mock(switch), settings());
        let token = CancellationToken::new();

        let task = tokio::spawn(sampler.run(Recorder::default(), token.clone()));

        tokio::time::sleep(Duration::from_millis(250)).await;
        token.cancel();
        let report = task.await.unwrap();

        assert_eq!(report.iterations, 3);
        assert_eq!(handle.read_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_press_then_release() {
        let gpio = Gpio::init().unwrap();
        let (switch, handle) = MockSwitch::new(&gpio, 17).unwrap();
        handle.script(levels(&[0, 1, 1, 0, 0, 1, 0]));

        let recorder = Recorder::default();
        let sampler = SwitchSampler::new(AnySwitch::Mock(switch), settings());
        let token = CancellationToken::new();
        let task = tokio::spawn(sampler.run(recorder.clone(), token.clone()));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        token.cancel();
        task.await.unwrap();

        assert_eq!(
            *recorder.gestures.lock().unwrap(),
            vec![Gesture::Press, Gesture::Press]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reads_are_counted_and_skipped() {
        let gpio = Gpio::init().unwrap();
        let (switch, handle) = MockSwitch::new(&gpio, 17).unwrap();
        handle.fail_reads(2);
        handle.script(levels(&[1, 0]));

        let recorder = Recorder::default();
        let sampler = SwitchSampler::new(AnySwitch::Mock(switch), settings());
        let token = CancellationToken::new();
        let task = tokio::spawn(sampler.run(recorder.clone(), token.clone()));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        token.cancel();
        let report = task.await.unwrap();

        assert_eq!(report.failures, 2);
        assert!(report.iterations > 4);
        assert_eq!(report.events, 1);
        assert_eq!(*recorder.gestures.lock().unwrap(), vec![Gesture::Press]);
    }
}
