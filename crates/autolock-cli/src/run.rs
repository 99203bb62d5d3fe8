//! `autolock run`: the controller with a console standing in for the door.
//!
//! Each line on stdin is one action:
//!
//! | Input       | Effect                                         |
//! |-------------|------------------------------------------------|
//! | `04a1b2c3`  | present that card to the reader                |
//! | `press`     | press and release the switch                   |
//! | `hold`      | hold the switch for a long window              |
//! | `register`  | route scanned cards to the registry            |
//! | `toggle`    | route scanned cards to the lock (default)      |
//! | `status`    | print state, scan mode and counters            |
//! | `quit`      | stop both loops and exit                       |

use std::iter;
use std::path::Path;

use autolock_controller::{
    CardSession, LockController, LoopReport, SamplerSettings, SwitchSampler, runtime,
};
use autolock_core::{CardId, ScanMode};
use autolock_hardware::Level;
use autolock_hardware::mock::{MockCardReaderHandle, MockSwitchHandle};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{SimulatedBoard, build_controller, load_config};

/// One console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Card(CardId),
    Press,
    Hold,
    Mode(ScanMode),
    Status,
    Help,
    Quit,
    Empty,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let command = match line.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "press" | "p" => Self::Press,
            "hold" | "h" => Self::Hold,
            "register" => Self::Mode(ScanMode::Register),
            "toggle" => Self::Mode(ScanMode::Toggle),
            "status" | "s" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => CardId::parse(line)
                .map(Self::Card)
                .map_err(|e| format!("unknown command {line:?} ({e})"))?,
        };
        Ok(command)
    }
}

/// Drives the simulated switch and reader from console commands.
pub struct Console {
    switch: MockSwitchHandle,
    reader: MockCardReaderHandle,
    hold_samples: usize,
}

impl Console {
    pub fn new(switch: MockSwitchHandle, reader: MockCardReaderHandle, hold_samples: usize) -> Self {
        Self {
            switch,
            reader,
            hold_samples,
        }
    }

    /// Apply one command. Returns `false` once the console should stop.
    pub async fn apply(
        &self,
        command: ConsoleCommand,
        controller: &LockController,
    ) -> anyhow::Result<bool> {
        match command {
            ConsoleCommand::Card(id) => {
                info!("Presenting card {}", id);
                self.reader.present_card(id.to_bytes()).await?;
            }
            ConsoleCommand::Press => self.switch.script([Level::High, Level::Low]),
            ConsoleCommand::Hold => self.switch.script(
                iter::repeat_n(Level::High, self.hold_samples).chain(iter::once(Level::Low)),
            ),
            ConsoleCommand::Mode(mode) => controller.set_scan_mode(mode),
            ConsoleCommand::Status => println!("{}", status(controller).await?),
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Quit => return Ok(false),
            ConsoleCommand::Empty => {}
        }
        Ok(true)
    }
}

/// Controller snapshot as pretty JSON.
pub async fn status(controller: &LockController) -> anyhow::Result<String> {
    let snapshot = json!({
        "state": controller.state().await,
        "scan_mode": controller.scan_mode(),
        "seconds_in_state": controller.time_in_state().await.as_secs_f64(),
        "registered_cards": controller.registry().await.len(),
        "stats": controller.stats().await,
    });
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

fn print_help() {
    println!("Commands: <card hex> | press | hold | register | toggle | status | quit");
}

/// Forward stdin lines from a plain thread.
///
/// Tokio's stdin keeps a blocking read alive past shutdown, which would hold
/// the process open after a hold gesture until the next newline.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub async fn execute(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path).await?;
    let SimulatedBoard {
        gpio: _gpio,
        outputs,
        switch,
        switch_handle,
        reader,
        reader_handle,
    } = SimulatedBoard::new(&config)?;

    let controller = build_controller(&config, outputs).await;
    controller.close().await;

    let sampler = SwitchSampler::new(switch, SamplerSettings::from(&config));
    let session = CardSession::open(reader).await;
    let handle = runtime::start(controller, sampler, session);

    let console = Console::new(switch_handle, reader_handle, config.long_window);
    let mut lines = spawn_stdin_reader();
    print_help();

    loop {
        tokio::select! {
            _ = handle.shutdown_requested() => {
                info!("Shutdown requested from the switch");
                break;
            }
            line = lines.recv() => {
                let Some(line) = line else { break };
                match ConsoleCommand::parse(&line) {
                    Ok(command) => {
                        if !console.apply(command, handle.controller()).await? {
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
        }
    }

    let reports = handle.shutdown().await?;
    print_reports(&reports);
    Ok(())
}

fn print_reports(reports: &[LoopReport]) {
    for report in reports {
        println!(
            "{}: {} iterations, {} events, {} failures",
            report.task, report.iterations, report.events, report.failures
        );
    }
}
