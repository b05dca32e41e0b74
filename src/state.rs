use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::cache::{ListingCache, TtlCache};
use crate::clients::checkout::{CheckoutProvider, UnconfiguredCheckout};
use crate::clients::push::{LoggingPushTransport, PushTransport};
use crate::config::Config;
use crate::engine::events::DomainEvent;
use crate::engine::otp::OtpPolicy;
use crate::models::booking::Booking;
use crate::models::chat::ChatMessage;
use crate::models::handover::Handover;
use crate::models::location::VehicleLocation;
use crate::models::notification::Notification;
use crate::models::payment::Payment;
use crate::models::ride_history::RideHistory;
use crate::models::user::User;
use crate::models::vehicle::Vehicle;
use crate::observability::metrics::Metrics;
use crate::realtime::RealtimeHub;

pub struct AppState {
    pub users: DashMap<Uuid, User>,
    /// Lowercased email to user id; the uniqueness guard for signups.
    pub user_emails: DashMap<String, Uuid>,
    pub vehicles: DashMap<Uuid, Vehicle>,
    pub bookings: DashMap<Uuid, Booking>,
    /// Keyed by booking id: one handover per booking.
    pub handovers: DashMap<Uuid, Handover>,
    /// Keyed by booking id: one snapshot per completed booking.
    pub ride_history: DashMap<Uuid, RideHistory>,
    pub payments: DashMap<Uuid, Payment>,
    pub notifications: DashMap<Uuid, Notification>,
    /// Keyed by booking id: latest reported position only.
    pub vehicle_locations: DashMap<Uuid, VehicleLocation>,
    pub chat_messages: DashMap<Uuid, ChatMessage>,
    pub listing_cache: Arc<dyn ListingCache>,
    pub push: Arc<dyn PushTransport>,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub events_tx: mpsc::Sender<DomainEvent>,
    pub realtime: RealtimeHub,
    pub otp_policy: OtpPolicy,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<DomainEvent>) {
        Self::with_integrations(
            config,
            Arc::new(LoggingPushTransport),
            Arc::new(UnconfiguredCheckout),
        )
    }

    pub fn with_integrations(
        config: &Config,
        push: Arc<dyn PushTransport>,
        checkout: Arc<dyn CheckoutProvider>,
    ) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_size);

        (
            Self {
                users: DashMap::new(),
                user_emails: DashMap::new(),
                vehicles: DashMap::new(),
                bookings: DashMap::new(),
                handovers: DashMap::new(),
                ride_history: DashMap::new(),
                payments: DashMap::new(),
                notifications: DashMap::new(),
                vehicle_locations: DashMap::new(),
                chat_messages: DashMap::new(),
                listing_cache: Arc::new(TtlCache::new(config.listing_cache_ttl())),
                push,
                checkout,
                events_tx,
                realtime: RealtimeHub::new(config.realtime_buffer_size),
                otp_policy: OtpPolicy::from_config(config),
                metrics: Metrics::new(),
            },
            events_rx,
        )
    }

    pub fn admin_ids(&self) -> Vec<Uuid> {
        self.users
            .iter()
            .filter(|entry| entry.value().is_admin())
            .map(|entry| *entry.key())
            .collect()
    }
}
