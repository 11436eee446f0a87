use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Prometheus counters for the pipeline loops. Each instance owns its own
/// registry so tests never collide on metric names.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    pub ticks: IntCounter,
    pub tick_faults: IntCounter,
    pub signals_emitted: IntCounter,
    pub signals_discarded: IntCounter,
    pub alerts_delivered: IntCounter,
    pub alerts_suppressed: IntCounter,
    pub store_failures: IntCounter,
    pub broadcast_evictions: IntCounter,
    pub subscribers: IntGauge,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("market_pulse".to_string()), None)?;

        let ticks = IntCounter::new("ticks_total", "Simulator price steps applied")?;
        let tick_faults = IntCounter::new(
            "tick_faults_total",
            "Per-instrument price steps skipped after an error",
        )?;
        let signals_emitted =
            IntCounter::new("signals_emitted_total", "Signals that passed all gates")?;
        let signals_discarded = IntCounter::new(
            "signals_discarded_total",
            "Scored setups rejected by the confidence or risk-reward gate",
        )?;
        let alerts_delivered =
            IntCounter::new("alerts_delivered_total", "Alerts built and broadcast")?;
        let alerts_suppressed = IntCounter::new(
            "alerts_suppressed_total",
            "Signals filtered out by notification policy or rate limit",
        )?;
        let store_failures =
            IntCounter::new("store_failures_total", "Swallowed persistence write failures")?;
        let broadcast_evictions = IntCounter::new(
            "broadcast_evictions_total",
            "Subscribers removed after a failed send",
        )?;
        let subscribers = IntGauge::new("subscribers", "Live broadcast subscribers")?;

        registry.register(Box::new(ticks.clone()))?;
        registry.register(Box::new(tick_faults.clone()))?;
        registry.register(Box::new(signals_emitted.clone()))?;
        registry.register(Box::new(signals_discarded.clone()))?;
        registry.register(Box::new(alerts_delivered.clone()))?;
        registry.register(Box::new(alerts_suppressed.clone()))?;
        registry.register(Box::new(store_failures.clone()))?;
        registry.register(Box::new(broadcast_evictions.clone()))?;
        registry.register(Box::new(subscribers.clone()))?;

        Ok(Self {
            registry,
            ticks,
            tick_faults,
            signals_emitted,
            signals_discarded,
            alerts_delivered,
            alerts_suppressed,
            store_failures,
            broadcast_evictions,
            subscribers,
        })
    }

    /// Text exposition format for `GET /metrics`.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_prefixed_counters() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.ticks.inc_by(3);
        metrics.subscribers.set(2);

        let text = metrics.render().unwrap();
        assert!(text.contains("market_pulse_ticks_total 3"));
        assert!(text.contains("market_pulse_subscribers 2"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = PipelineMetrics::new().unwrap();
        let b = PipelineMetrics::new().unwrap();
        a.signals_emitted.inc();
        assert_eq!(a.signals_emitted.get(), 1);
        assert_eq!(b.signals_emitted.get(), 0);
    }
}
