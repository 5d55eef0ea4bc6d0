use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: availability queries served.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "slotwise_availability_queries_total";

/// Histogram: slots returned per availability query.
pub const SLOTS_RETURNED: &str = "slotwise_slots_returned";

/// Counter: consolidation queries served.
pub const CONSOLIDATION_QUERIES_TOTAL: &str = "slotwise_consolidation_queries_total";

/// Counter: bookings committed.
pub const BOOKINGS_COMMITTED_TOTAL: &str = "slotwise_bookings_committed_total";

/// Counter: booking commits that lost the race (slot no longer free).
pub const BOOKING_CONFLICTS_TOTAL: &str = "slotwise_booking_conflicts_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "slotwise_bookings_cancelled_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
