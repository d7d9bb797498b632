#![doc = include_str!("../README.md")]

pub use crate::codec::DeviceEventCodec;
pub use crate::config::*;
pub use crate::error::{Error, FormatError, ValidationError};
pub use crate::inflight::InFlightEvents;
pub use crate::types::*;

pub mod codec;
pub mod config;
pub mod error;
pub mod inflight;
pub mod types;
