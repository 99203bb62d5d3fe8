//! `autolock register`: scan one card and add it to the registry.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use autolock_controller::CardSession;
use autolock_core::{CardId, Registration, ScanResult};
use tracing::info;

use crate::{SimulatedBoard, build_controller, load_config};

/// Scan for up to `timeout` and register the card read, if any.
///
/// With `card` set, that identifier is presented to the simulated reader
/// before the scan starts. Returns `None` when no card was read.
pub async fn register_once(
    config_path: &Path,
    card: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<Option<(CardId, Registration)>> {
    let config = load_config(config_path).await?;
    let board = SimulatedBoard::new(&config)?;
    let controller = build_controller(&config, board.outputs).await;

    // Saving over a registry that failed to load would drop its cards.
    if controller.stats().await.faults > 0 {
        bail!(
            "registry {} could not be loaded, refusing to overwrite it",
            config.registry_path.display()
        );
    }

    if let Some(hex) = card {
        let id = CardId::parse(hex).with_context(|| format!("card {hex:?}"))?;
        board.reader_handle.present_card(id.to_bytes()).await?;
    }

    let mut session = CardSession::open(board.reader).await;
    info!("Waiting {:?} for a card", timeout);

    let id = match session.scan(timeout).await {
        ScanResult::Card(id) => id,
        other => {
            info!("Nothing registered: {}", other);
            return Ok(None);
        }
    };

    let registration = controller.register(id.clone()).await;
    if controller.stats().await.faults > 0 {
        bail!(
            "card {} could not be saved to {}",
            id,
            config.registry_path.display()
        );
    }

    Ok(Some((id, registration)))
}

pub async fn execute(config_path: &Path, card: Option<&str>, timeout_ms: u64) -> anyhow::Result<()> {
    match register_once(config_path, card, Duration::from_millis(timeout_ms)).await? {
        Some((id, registration)) => println!("{id}: {registration}"),
        None => println!("No card presented"),
    }
    Ok(())
}
