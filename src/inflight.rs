use crate::{
    error::ValidationError,
    types::{DeviceEvent, EventId, EventReport},
};
use fxhash::FxHashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

/// Events handed to the transport that still await an acknowledgment,
/// keyed by their correlation ID.
///
/// Events without an `event_id` can't be correlated and are never tracked.
#[derive(Clone, Debug, Default)]
pub struct InFlightEvents {
    pending: FxHashMap<EventId, DeviceEvent>,
}

impl InFlightEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the event was tracked.
    pub fn track(&mut self, event: &DeviceEvent) -> Result<bool, ValidationError> {
        let Some(id) = event.event_id() else {
            return Ok(false);
        };

        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => {
                warn!(event_id = %id, "Event ID is already in flight");
                Err(ValidationError::DuplicateEventId(id.clone()))
            }
            Entry::Vacant(e) => {
                debug!(event_id = %id, service_id = event.service_id(), "Tracking event");
                e.insert(event.clone());
                Ok(true)
            }
        }
    }

    /// Tracks every correlated event of the report, or none of them.
    ///
    /// Returns the number of events tracked.
    pub fn track_report(&mut self, report: &EventReport) -> Result<usize, ValidationError> {
        if let Some(id) = report
            .services()
            .iter()
            .filter_map(DeviceEvent::event_id)
            .find(|id| self.pending.contains_key(*id))
        {
            warn!(event_id = %id, "Event ID is already in flight");
            return Err(ValidationError::DuplicateEventId(id.clone()));
        }

        let mut tracked = 0;
        for event in report.services() {
            if self.track(event)? {
                tracked += 1;
            }
        }
        Ok(tracked)
    }

    /// Removes and returns the event acknowledged by `id`.
    pub fn acknowledge(&mut self, id: &EventId) -> Option<DeviceEvent> {
        let event = self.pending.remove(id);
        if event.is_none() {
            warn!(event_id = %id, "Acknowledgment for an event that isn't in flight");
        }
        event
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EventId> {
        self.pending.keys()
    }
}
