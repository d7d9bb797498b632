use crate::{
    config::{Config, EventTimeFormat},
    error::{Error, FormatError, ValidationError},
    types::{check_paras, time::check_event_time, EventId, Paras},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reportable occurrence from a device service.
///
/// Instances are always valid: every constructor checks the invariants, and
/// the value can't be mutated afterwards.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawDeviceEvent")]
pub struct DeviceEvent {
    service_id: String,
    event_type: String,
    event_time: String,
    paras: Paras,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<EventId>,
}

impl DeviceEvent {
    /// Builds an event checked against the default [`Config`].
    pub fn new<S, T, U>(
        service_id: S,
        event_type: T,
        event_time: U,
        paras: Paras,
        event_id: Option<EventId>,
    ) -> Result<Self, ValidationError>
    where
        S: Into<String>,
        T: Into<String>,
        U: Into<String>,
    {
        Self::with_config(
            &Config::default(),
            service_id,
            event_type,
            event_time,
            paras,
            event_id,
        )
    }

    pub fn with_config<S, T, U>(
        cfg: &Config,
        service_id: S,
        event_type: T,
        event_time: U,
        paras: Paras,
        event_id: Option<EventId>,
    ) -> Result<Self, ValidationError>
    where
        S: Into<String>,
        T: Into<String>,
        U: Into<String>,
    {
        let service_id = non_empty("service_id", service_id.into())?;
        let event_type = non_empty("event_type", event_type.into())?;
        let event_time = non_empty("event_time", event_time.into())?;
        check_event_time(&event_time, cfg.event_time_format)?;
        check_paras(&paras, "paras", 1, cfg.effective_max_paras_depth())?;
        if cfg.require_event_id && event_id.is_none() {
            return Err(ValidationError::MissingField("event_id"));
        }

        Ok(Self {
            service_id,
            event_type,
            event_time,
            paras,
            event_id,
        })
    }

    /// Decodes a JSON-encoded event checked against the default [`Config`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_slice_with_config(&Config::default(), bytes)
    }

    pub fn from_slice_with_config(cfg: &Config, bytes: &[u8]) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(FormatError::from)?;
        Self::from_value_with_config(cfg, value)
    }

    pub fn from_json(s: &str) -> Result<Self, Error> {
        Self::from_slice(s.as_bytes())
    }

    pub fn from_json_with_config(cfg: &Config, s: &str) -> Result<Self, Error> {
        Self::from_slice_with_config(cfg, s.as_bytes())
    }

    pub(crate) fn from_value_with_config(
        cfg: &Config,
        value: serde_json::Value,
    ) -> Result<Self, Error> {
        if !value.is_object() {
            return Err(FormatError::not_an_object(&value).into());
        }
        let raw: RawDeviceEvent = serde_json::from_value(value).map_err(FormatError::from)?;
        Ok(raw.validate(cfg)?)
    }

    /// Compact JSON encoding. `event_id` is omitted when absent.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::Encode)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(Error::Encode)
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_time(&self) -> &str {
        &self.event_time
    }

    /// The event time as a UTC instant, if it is RFC 3339 or compact.
    pub fn event_time_utc(&self) -> Option<DateTime<Utc>> {
        super::parse_event_time(&self.event_time, EventTimeFormat::Unchecked)
    }

    pub fn paras(&self) -> &Paras {
        &self.paras
    }

    pub fn event_id(&self) -> Option<&EventId> {
        self.event_id.as_ref()
    }

    pub fn into_paras(self) -> Paras {
        self.paras
    }
}

/// Wire shape of a [`DeviceEvent`] before its invariants are checked.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDeviceEvent {
    service_id: Option<String>,
    event_type: Option<String>,
    event_time: Option<String>,
    paras: Option<Paras>,
    event_id: Option<String>,
}

impl RawDeviceEvent {
    pub(crate) fn validate(self, cfg: &Config) -> Result<DeviceEvent, ValidationError> {
        let service_id = self
            .service_id
            .ok_or(ValidationError::MissingField("service_id"))?;
        let event_type = self
            .event_type
            .ok_or(ValidationError::MissingField("event_type"))?;
        let event_time = self
            .event_time
            .ok_or(ValidationError::MissingField("event_time"))?;
        let paras = self.paras.ok_or(ValidationError::MissingField("paras"))?;
        let event_id = self.event_id.map(EventId::try_from).transpose()?;
        DeviceEvent::with_config(cfg, service_id, event_type, event_time, paras, event_id)
    }
}

impl TryFrom<RawDeviceEvent> for DeviceEvent {
    type Error = ValidationError;

    fn try_from(raw: RawDeviceEvent) -> Result<Self, Self::Error> {
        raw.validate(&Config::default())
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(value)
    }
}
