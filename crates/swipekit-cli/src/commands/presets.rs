use anyhow::Result;

use swipekit_core::{AppConfig, ConsumerKind, SwipeConsumer};

pub async fn run(config: &AppConfig) -> Result<()> {
    println!("Consumer kinds ({}):\n", ConsumerKind::ALL.len());

    for kind in ConsumerKind::ALL {
        let consumer = SwipeConsumer::with_kind(kind, config)?;

        let open = if consumer.open_distance() == f32::MAX {
            "unbounded".to_string()
        } else {
            format!("{}px", consumer.open_distance())
        };

        let damped = if consumer.has_distance_calculator() {
            " [damped]"
        } else {
            ""
        };

        println!("  {} - {}{}", kind, kind.description(), damped);
        println!(
            "    release: {:?}, open: {}, over-swipe: {}, settle: {}ms",
            consumer.release_mode(),
            open,
            consumer.over_swipe_factor(),
            consumer.max_settle_duration_ms()
        );
        println!();
    }

    Ok(())
}
