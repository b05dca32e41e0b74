use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_total: IntCounterVec,
    pub otp_verifications_total: IntCounterVec,
    pub events_in_queue: IntGauge,
    pub notifications_total: IntCounterVec,
    pub push_deliveries_total: IntCounterVec,
    pub listing_cache_lookups_total: IntCounterVec,
    pub realtime_connections: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bookings_total = IntCounterVec::new(
            Opts::new("bookings_total", "Booking requests by outcome"),
            &["outcome"],
        )
        .expect("valid bookings_total metric");

        let otp_verifications_total = IntCounterVec::new(
            Opts::new(
                "otp_verifications_total",
                "Handover OTP verifications by leg and outcome",
            ),
            &["leg", "outcome"],
        )
        .expect("valid otp_verifications_total metric");

        let events_in_queue =
            IntGauge::new("events_in_queue", "Domain events waiting for the dispatcher")
                .expect("valid events_in_queue metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notification records by outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let push_deliveries_total = IntCounterVec::new(
            Opts::new("push_deliveries_total", "Push deliveries by outcome"),
            &["outcome"],
        )
        .expect("valid push_deliveries_total metric");

        let listing_cache_lookups_total = IntCounterVec::new(
            Opts::new("listing_cache_lookups_total", "Listing cache lookups by result"),
            &["result"],
        )
        .expect("valid listing_cache_lookups_total metric");

        let realtime_connections =
            IntGauge::new("realtime_connections", "Open realtime socket connections")
                .expect("valid realtime_connections metric");

        registry
            .register(Box::new(bookings_total.clone()))
            .expect("register bookings_total");
        registry
            .register(Box::new(otp_verifications_total.clone()))
            .expect("register otp_verifications_total");
        registry
            .register(Box::new(events_in_queue.clone()))
            .expect("register events_in_queue");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(push_deliveries_total.clone()))
            .expect("register push_deliveries_total");
        registry
            .register(Box::new(listing_cache_lookups_total.clone()))
            .expect("register listing_cache_lookups_total");
        registry
            .register(Box::new(realtime_connections.clone()))
            .expect("register realtime_connections");

        Self {
            registry,
            bookings_total,
            otp_verifications_total,
            events_in_queue,
            notifications_total,
            push_deliveries_total,
            listing_cache_lookups_total,
            realtime_connections,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
