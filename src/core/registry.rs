use crate::core::request::IntegrationRequest;
use crate::core::{PendingState, RelationBus, CHANGED, REQUESTS_PENDING};
use std::cell::OnceCell;

/// One evaluation cycle over the integrator's endpoint.
///
/// The request list is built on first use and reused for the life of the
/// registry. Build a new registry for every notification; nothing here
/// notices units joining or departing afterwards.
pub struct RequestRegistry<'a, B: RelationBus + ?Sized> {
    bus: &'a B,
    requests: OnceCell<Vec<IntegrationRequest<'a, B>>>,
}

impl<'a, B: RelationBus + ?Sized> RequestRegistry<'a, B> {
    pub fn new(bus: &'a B) -> Self {
        Self {
            bus,
            requests: OnceCell::new(),
        }
    }

    /// Every joined unit's request, in join order.
    pub fn all_requests(&self) -> &[IntegrationRequest<'a, B>] {
        self.requests.get_or_init(|| {
            let bus = self.bus;
            let requests: Vec<_> = bus
                .joined_units()
                .into_iter()
                .map(|unit| IntegrationRequest::new(bus, unit))
                .collect();
            tracing::debug!(
                "Loaded {} request(s) on endpoint {}",
                requests.len(),
                bus.endpoint_name()
            );
            requests
        })
    }

    /// Requests that have not been answered with credentials yet.
    pub fn new_requests(&self) -> Vec<&IntegrationRequest<'a, B>> {
        self.all_requests()
            .iter()
            .filter(|request| request.is_changed())
            .collect()
    }

    /// Handler for the endpoint's `changed` notification.
    ///
    /// Raises `requests-pending` when any request is unanswered, clears it
    /// otherwise, then consumes the `changed` flag.
    pub fn on_relation_changed(&self) -> PendingState {
        let pending = !self.new_requests().is_empty();
        let was = self.pending_state();
        self.bus.toggle_flag(&self.bus.expand_name(REQUESTS_PENDING), pending);
        self.bus.clear_flag(&self.bus.expand_name(CHANGED));

        let state = PendingState::from_flag(pending);
        if state != was {
            tracing::info!("Endpoint {} is now {:?}", self.bus.endpoint_name(), state);
        }
        state
    }

    /// Marks every request completed by dropping `requests-pending`.
    ///
    /// Individual requests are untouched; the next change notification
    /// raises the flag again if any of them still lacks credentials.
    pub fn mark_completed(&self) {
        self.bus.clear_flag(&self.bus.expand_name(REQUESTS_PENDING));
        tracing::debug!("Requests on {} marked completed", self.bus.endpoint_name());
    }

    pub fn pending_state(&self) -> PendingState {
        PendingState::from_flag(self.bus.is_flag_set(&self.bus.expand_name(REQUESTS_PENDING)))
    }
}
