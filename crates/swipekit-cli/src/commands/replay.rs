use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::info;

use swipekit_core::trace::{Replay, Step, Trace};
use swipekit_core::AppConfig;

pub async fn run(config: &AppConfig, path: &Path, realtime: bool, json: bool) -> Result<()> {
    let trace = Trace::load(path).with_context(|| format!("failed to load trace {}", path.display()))?;
    let mut replay = Replay::new(&trace, config)?;

    info!(
        consumers = trace.consumers.len(),
        steps = trace.steps.len(),
        realtime,
        "replaying {}",
        path.display()
    );

    let frame = Duration::from_millis(replay.frame_interval_ms());

    for step in &trace.steps {
        if realtime {
            let wait = step.time_ms().saturating_sub(replay.now_ms());
            if wait > 0 {
                sleep(Duration::from_millis(wait)).await;
            }
        }

        match step {
            Step::Settle { time_ms } if realtime => {
                replay.advance_to(*time_ms);
                while replay.tick() {
                    print_events(&replay, json)?;
                    sleep(frame).await;
                }
            }
            _ => replay.apply(step)?,
        }
        print_events(&replay, json)?;
    }

    let status = replay.status();
    if json {
        println!("{}", serde_json::json!({ "status": status }));
        return Ok(());
    }

    println!("\nFinal state at {}ms:", replay.now_ms());
    for s in &status {
        let tag = s.tag.as_deref().map(|t| format!(" ({})", t)).unwrap_or_default();
        let direction = s.direction.map(|d| d.name()).unwrap_or("none");
        println!(
            "  #{}{} {} - {} {} progress {:.3}",
            s.consumer, tag, s.kind, s.state, direction, s.progress
        );
    }

    Ok(())
}

fn print_events(replay: &Replay, json: bool) -> Result<()> {
    for event in replay.take_events() {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", event);
        }
    }
    Ok(())
}
