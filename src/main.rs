//! missionsync demo binary
//!
//! Connects to a backend, subscribes to the topics given on the command line
//! and prints merged updates until interrupted.
//!
//! Usage:
//!   missionsync --endpoint ws://localhost:9300/ws --token <token> \
//!       --topic m1 --topic m2 [--class research|documents] \
//!       [--log-level <level>] [--debug-all]

use anyhow::{anyhow, Result};
use std::sync::Arc;

use missionsync::arguments;
use missionsync::config::{self, AuthConfig};
use missionsync::logger::{self, LogTag};
use missionsync::realtime::{ChannelClass, ConnKey, ConnectionPool, LinkState};
use missionsync::topics::{SubscriptionManager, TopicEvent};

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    if let Err(e) = config::load_config() {
        logger::warning(LogTag::Config, &format!("{} - using defaults", e));
        config::load_config_from_path("/nonexistent").map_err(|e| anyhow!(e))?;
    }

    let endpoint = arguments::get_arg_value("--endpoint")
        .ok_or_else(|| anyhow!("--endpoint is required (e.g. ws://localhost:9300/ws)"))?;

    let topics = arguments::get_arg_values("--topic");
    if topics.is_empty() {
        return Err(anyhow!("at least one --topic is required"));
    }

    let class = match arguments::get_arg_value("--class").as_deref() {
        None => ChannelClass::Research,
        Some(code) => ChannelClass::from_code(code)
            .ok_or_else(|| anyhow!("unknown channel class '{}'", code))?,
    };

    // --token overrides the configured one
    let mut cfg = config::get_config_clone();
    if let Some(token) = arguments::get_arg_value("--token") {
        cfg.auth = AuthConfig {
            token: Some(token),
            ..cfg.auth
        };
    }

    let pool = Arc::new(ConnectionPool::from_config(&cfg));
    let key = ConnKey::new(class, endpoint);

    logger::info(LogTag::Main, &format!("Acquiring connection {}", key));
    let conn = pool.acquire(key.clone()).await?;

    // Surface live/disconnected transitions the way a UI would
    let mut state_rx = conn.state_watch();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow();
            match state {
                LinkState::Open => logger::info(LogTag::Main, "Status: live"),
                LinkState::Connecting => logger::info(LogTag::Main, "Status: reconnecting"),
                LinkState::Closed => logger::warning(LogTag::Main, "Status: disconnected"),
                _ => {}
            }
        }
    });

    let manager = SubscriptionManager::new(conn);
    let mut handles = Vec::new();

    for topic_id in &topics {
        let processor = manager.subscribe_topic(topic_id)?;
        let topic = topic_id.clone();
        handles.push(processor.on_event(move |event| match event {
            TopicEvent::Updated { kind, items } => {
                logger::info(
                    LogTag::Main,
                    &format!("[{}] {} -> {} item(s)", topic, kind, items.len()),
                );
            }
            TopicEvent::Invalidated => {
                logger::warning(
                    LogTag::Main,
                    &format!("[{}] state invalidated - re-fetch via the HTTP API", topic),
                );
            }
        }));
    }

    logger::info(
        LogTag::Main,
        &format!("Watching {} topic(s), ctrl-c to exit", topics.len()),
    );
    tokio::signal::ctrl_c().await?;

    logger::info(LogTag::Main, "Shutting down");
    for handle in handles {
        handle.dispose();
    }
    for topic_id in &topics {
        manager.unsubscribe_topic(topic_id);
    }
    pool.disconnect_all();

    Ok(())
}
