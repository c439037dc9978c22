use std::time::Duration;

use anyhow::Context;
use tokio::time::{Interval, MissedTickBehavior};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::WatchArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `vigil watch`: print the current snapshot and every change after
/// it until Ctrl-C or `--count` snapshots.
pub async fn handle(args: &WatchArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let sync = ctx.session_sync()?;
    let mut session = sync.start();
    let refresher = session.clone();

    let mut refresh = args
        .refresh_every
        .filter(|secs| *secs > 0)
        .map(|secs| {
            let period = Duration::from_secs(secs);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

    output(&session.view(), flags.format)?;
    let mut printed = 1_usize;

    while args.count.is_none_or(|limit| printed < limit) {
        tokio::select! {
            changed = session.changed() => {
                let Some(snapshot) = changed else {
                    break;
                };
                output(&snapshot.view(), flags.format)?;
                printed += 1;
            }
            () = next_tick(refresh.as_mut()) => {
                let handle = refresher.clone();
                tokio::spawn(async move { handle.refresh().await });
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                tracing::debug!("interrupted; stopping watch");
                break;
            }
        }
    }

    sync.stop();
    Ok(())
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
