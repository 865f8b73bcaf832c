//! Drives both call paths against a downstream that fails for a while.
//!
//! Circuit breaker events are logged at info level:
//!
//! ```text
//! cargo run -p tower-guard --example downstream_client
//! ```

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower_guard::{
    Downstream, DownstreamClient, DownstreamError, GuardSettings, ResilienceRegistry,
};

/// Answers 503 for the first `failures` requests, then "OK".
struct FlakyDownstream {
    failures: usize,
    requests: AtomicUsize,
}

impl Downstream for FlakyDownstream {
    fn get_data(&self) -> BoxFuture<'_, Result<String, DownstreamError>> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if n < self.failures {
                Err(DownstreamError::remote(503, "service unavailable"))
            } else {
                Ok("OK".to_string())
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut settings = GuardSettings::downstream_a();
    // Shorter open state so the demo recovers quickly
    if let Some(cb) = settings.circuit_breakers.get_mut(GuardSettings::DOWNSTREAM_A) {
        cb.wait_duration_in_open_state_ms = 500;
    }

    let registry = ResilienceRegistry::from_settings(&settings)?;
    let client = DownstreamClient::new(
        FlakyDownstream {
            failures: 12,
            requests: AtomicUsize::new(0),
        },
        &registry,
        GuardSettings::DOWNSTREAM_A,
    )?;

    println!("--- retry path ---");
    for i in 1..=8 {
        match client.get_data().await {
            Ok(outcome) if outcome.is_degraded() => {
                println!("call {i}: degraded -> {}", outcome.into_inner())
            }
            Ok(outcome) => println!("call {i}: {}", outcome.into_inner()),
            Err(e) => println!("call {i}: error -> {e}"),
        }
        if i == 5 {
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
    }

    if let Some(breaker) = registry.circuit_breaker(GuardSettings::DOWNSTREAM_A) {
        println!("breaker state: {}", breaker.state());
    }

    println!("--- admission path ---");
    let calls: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get_data_without_retry().await })
        })
        .collect();
    for (i, call) in calls.into_iter().enumerate() {
        match call.await? {
            Ok(body) => println!("call {}: {body}", i + 1),
            Err(e) => println!("call {}: rejected -> {e}", i + 1),
        }
    }

    Ok(())
}
