use super::ui::{self, StyleType};
use crate::core::StrategyEvent;
use crate::settings::MoneySettings;
use anyhow::Result;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// One line summary of a refresh attempt.
pub fn describe(event: &StrategyEvent) -> String {
    let next = match event.delay() {
        Some(delay) => format!("next refresh in {}s", delay.as_secs()),
        None => "no refresh scheduled".to_string(),
    };
    match event {
        StrategyEvent::Loaded { .. } => format!("Factors loaded, {next}"),
        StrategyEvent::LoadError { error, .. } => format!("Factor load failed: {error}, {next}"),
    }
}

/// Prints every event until `shutdown` completes or the strategy goes away.
/// Returns the number of events seen.
pub async fn follow<S>(mut events: broadcast::Receiver<StrategyEvent>, shutdown: S) -> usize
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut seen = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = events.recv() => match received {
                Ok(event) => {
                    seen += 1;
                    let line = describe(&event);
                    if event.is_error() {
                        println!("{}", ui::style_text(&line, StyleType::Error));
                    } else {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed strategy events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    seen
}

pub async fn run(settings: &MoneySettings) -> Result<()> {
    let events = settings.strategy().subscribe();
    if let Err(e) = settings.strategy().force_update().await {
        warn!(error = %e, "Initial refresh failed");
    }
    println!(
        "{}",
        ui::style_text("Watching factor refreshes, Ctrl-C to stop", StyleType::Subtle)
    );

    let seen = follow(events, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
        }
    })
    .await;
    debug!(seen, "Stopped watching");
    Ok(())
}
