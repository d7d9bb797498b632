use crate::{
    config::Config,
    error::{Error, FormatError, ValidationError},
    types::{event::RawDeviceEvent, DeviceEvent},
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A batch of device events reported together, optionally on behalf of
/// another (sub-)device.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawEventReport")]
pub struct EventReport {
    /// Target device; absent means the reporting device itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    object_device_id: Option<String>,
    services: Vec<DeviceEvent>,
}

impl EventReport {
    pub fn new(
        object_device_id: Option<String>,
        services: Vec<DeviceEvent>,
    ) -> Result<Self, ValidationError> {
        if matches!(object_device_id.as_deref(), Some("")) {
            return Err(ValidationError::EmptyField("object_device_id"));
        }
        if services.is_empty() {
            return Err(ValidationError::EmptyReport);
        }
        // Correlation IDs must be unique within the batch
        if let Some(id) = services
            .iter()
            .filter_map(DeviceEvent::event_id)
            .duplicates()
            .next()
        {
            return Err(ValidationError::DuplicateEventId(id.clone()));
        }

        Ok(Self {
            object_device_id,
            services,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_slice_with_config(&Config::default(), bytes)
    }

    pub fn from_slice_with_config(cfg: &Config, bytes: &[u8]) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(FormatError::from)?;
        if !value.is_object() {
            return Err(FormatError::not_an_object(&value).into());
        }
        let raw: RawEventReport = serde_json::from_value(value).map_err(FormatError::from)?;
        Ok(raw.validate(cfg)?)
    }

    pub fn from_json(s: &str) -> Result<Self, Error> {
        Self::from_slice(s.as_bytes())
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::Encode)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(Error::Encode)
    }

    pub fn object_device_id(&self) -> Option<&str> {
        self.object_device_id.as_deref()
    }

    pub fn services(&self) -> &[DeviceEvent] {
        &self.services
    }

    pub fn into_services(self) -> Vec<DeviceEvent> {
        self.services
    }
}

impl From<DeviceEvent> for EventReport {
    fn from(event: DeviceEvent) -> Self {
        Self {
            object_device_id: None,
            services: vec![event],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEventReport {
    object_device_id: Option<String>,
    services: Option<Vec<RawDeviceEvent>>,
}

impl RawEventReport {
    fn validate(self, cfg: &Config) -> Result<EventReport, ValidationError> {
        let services = self
            .services
            .ok_or(ValidationError::MissingField("services"))?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.validate(cfg).map_err(|e| e.in_service(index)))
            .collect::<Result<Vec<_>, _>>()?;
        EventReport::new(self.object_device_id, services)
    }
}

impl TryFrom<RawEventReport> for EventReport {
    type Error = ValidationError;

    fn try_from(raw: RawEventReport) -> Result<Self, Self::Error> {
        raw.validate(&Config::default())
    }
}
