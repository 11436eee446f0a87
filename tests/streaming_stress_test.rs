use market_pulse::core::config::SimulatorConfig;
use market_pulse::core::PipelineMetrics;
use market_pulse::market::{default_instruments, PriceSimulator, VolatilityRegime};
use market_pulse::notifications::{build_alert, Alert};
use market_pulse::strategy::SignalGenerator;
use market_pulse::streaming::{Broadcaster, Event};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Any real signal from a seeded run, turned into an alert payload.
fn sample_alert() -> Alert {
    let config = SimulatorConfig {
        seed: Some(17),
        ..Default::default()
    };
    let mut sim = PriceSimulator::new(default_instruments(), &config);
    let generator = SignalGenerator::default();
    for _ in 0..5_000 {
        sim.advance();
        for instrument in default_instruments() {
            let history = sim.snapshot(&instrument.symbol).unwrap();
            if let Some(signal) =
                generator.generate(&instrument.symbol, &history, VolatilityRegime::Normal)
            {
                return build_alert(&signal);
            }
        }
    }
    panic!("seeded run produced no signal");
}

#[tokio::test]
#[ignore] // Run with: cargo test --release -- --ignored --nocapture
async fn stress_test_broadcast_fan_out() {
    let subscribers = 2_000;
    let events = 500;

    let metrics = Arc::new(PipelineMetrics::new().unwrap());
    let hub = Broadcaster::new(events + 1, metrics.clone());
    let event = Event::TradingAlert(sample_alert());

    let mut handles = Vec::new();
    for _ in 0..subscribers {
        let mut sub = hub.subscribe().await;
        handles.push(tokio::spawn(async move {
            let mut received = 0usize;
            while received < events {
                match sub.rx.recv().await {
                    Some(_) => received += 1,
                    None => break,
                }
            }
            received
        }));
    }

    println!("🚀 Publishing {} events to {} subscribers...", events, subscribers);
    let start = Instant::now();
    let mut latencies = Vec::with_capacity(events);
    for _ in 0..events {
        let publish_start = Instant::now();
        let delivered = hub.publish(&event).await;
        latencies.push(publish_start.elapsed());
        assert_eq!(delivered, subscribers);
    }
    let total = start.elapsed();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), events);
    }

    latencies.sort();
    let p50 = latencies[latencies.len() / 2];
    let p99 = latencies[(latencies.len() as f64 * 0.99) as usize];
    let deliveries = (subscribers * events) as f64;

    println!("📊 FAN-OUT RESULTS:");
    println!("   • Deliveries:           {}", deliveries);
    println!("   • Duration:             {:?}", total);
    println!("   • Deliveries/sec:       {:.0}", deliveries / total.as_secs_f64());
    println!("   • Publish P50:          {:?}", p50);
    println!("   • Publish P99:          {:?}", p99);

    assert_eq!(metrics.broadcast_evictions.get(), 0);
    assert!(p99 < Duration::from_millis(100), "P99 publish must stay under 100ms");
}

#[tokio::test]
#[ignore]
async fn stress_test_churn_during_publish() {
    let metrics = Arc::new(PipelineMetrics::new().unwrap());
    let hub = Broadcaster::new(64, metrics.clone());
    let event = Event::TradingAlert(sample_alert());

    let publisher = {
        let hub = hub.clone();
        tokio::spawn(async move {
            for _ in 0..5_000 {
                hub.publish(&event).await;
                tokio::task::yield_now().await;
            }
        })
    };

    // subscribers that connect and drop without ever reading
    let churn = {
        let hub = hub.clone();
        tokio::spawn(async move {
            for _ in 0..1_000 {
                let sub = hub.subscribe().await;
                drop(sub);
                tokio::task::yield_now().await;
            }
        })
    };

    publisher.await.unwrap();
    churn.await.unwrap();
    hub.publish(&Event::TradingAlert(sample_alert())).await;

    println!("🧹 Evictions after churn: {}", metrics.broadcast_evictions.get());
    assert_eq!(hub.subscriber_count().await, 0);
    assert_eq!(metrics.subscribers.get(), 0);
}
