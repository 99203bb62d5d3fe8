//! Control loops for the Autolock door controller.
//!
//! Two long-running tasks share one [`LockController`]:
//!
//! - the [`SwitchSampler`] polls the manual switch every tick and turns
//!   press and hold gestures into controller calls;
//! - the scan loop asks the [`CardSession`] for one card at a time and
//!   toggles the lock (or registers the card, in registration mode).
//!
//! Both mutate the same lock state, which the controller guards with a single
//! mutex held for a whole actuation sequence. [`runtime::start`] spawns the
//! loops and returns a handle that stops them in order.
//!
//! # Examples
//!
//! ```no_run
//! use autolock_controller::{CardSession, ControllerSettings, LockController, LockOutputs, SwitchSampler, runtime};
//!
//! # async fn example(
//! #     outputs: LockOutputs,
//! #     store: autolock_storage::AnyRegistryStore,
//! #     switch: autolock_hardware::AnySwitch,
//! #     reader: autolock_hardware::AnyCardReader,
//! #     sampler_settings: autolock_controller::SamplerSettings,
//! # ) -> autolock_controller::Result<()> {
//! let controller = LockController::new(outputs, store, ControllerSettings::default()).await;
//! controller.close().await;
//!
//! let sampler = SwitchSampler::new(switch, sampler_settings);
//! let session = CardSession::open(reader).await;
//!
//! let handle = runtime::start(controller, sampler, session);
//! for report in handle.wait().await? {
//!     println!("{} ran {} iterations", report.task, report.iterations);
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod runtime;
pub mod sampler;
pub mod session;
pub mod state_machine;

pub use controller::{
    ControllerSettings, ControllerStats, LockController, LockOutputs, ScanOutcome, ToggleOutcome,
    rotate,
};
pub use error::{ControllerError, Result};
pub use runtime::{AutolockHandle, LoopReport};
pub use sampler::{GestureHandler, SampleHistory, SamplerControl, SamplerSettings, SwitchSampler};
pub use session::CardSession;
pub use state_machine::{LockStateMachine, StateTransition};
