use crate::{config::Config, error::Error, types::DeviceEvent};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// A newline-delimited JSON device event codec.
///
/// Each frame is one compactly encoded [`DeviceEvent`] followed by `\n`.
#[derive(Clone, Debug, Default)]
pub struct DeviceEventCodec {
    cfg: Config,
    /// Offset up to which the buffer has already been searched for a delimiter
    next_index: usize,
}

impl DeviceEventCodec {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            next_index: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    fn decode_frame(&self, frame: &[u8]) -> Result<DeviceEvent, Error> {
        if frame.len() > self.cfg.max_frame_length {
            return Err(Error::FrameTooLong {
                len: frame.len(),
                max: self.cfg.max_frame_length,
            });
        }

        let event = DeviceEvent::from_slice_with_config(&self.cfg, frame)?;
        debug!(
            service_id = event.service_id(),
            event_type = event.event_type(),
            event_id = event.event_id().map(|id| id.as_str()),
            "Decoded device event"
        );
        Ok(event)
    }
}

impl Decoder for DeviceEventCodec {
    type Item = DeviceEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // The caller may hand us a different buffer than last time
        if self.next_index > src.len() {
            self.next_index = 0;
        }

        // Loop until we've got a non-blank frame or need more data
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                // A trailing '\r' may be the first half of the delimiter
                let pending = if src.ends_with(b"\r") {
                    src.len() - 1
                } else {
                    src.len()
                };
                if pending > self.cfg.max_frame_length {
                    return Err(Error::FrameTooLong {
                        len: pending,
                        max: self.cfg.max_frame_length,
                    });
                }
                return Ok(None);
            };

            let newline = self.next_index + offset;
            self.next_index = 0;
            let line = src.split_to(newline + 1);
            let frame = line[..newline].trim_ascii();
            if frame.is_empty() {
                trace!("Skipping blank line");
                continue;
            }

            return self.decode_frame(frame).map(Some);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }

        // Unterminated trailing frame
        self.next_index = 0;
        let rest = src.split();
        let frame = rest.trim_ascii();
        if frame.is_empty() {
            Ok(None)
        } else {
            self.decode_frame(frame).map(Some)
        }
    }
}

impl Encoder<&DeviceEvent> for DeviceEventCodec {
    type Error = Error;

    fn encode(&mut self, item: &DeviceEvent, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = item.to_vec()?;
        if frame.len() > self.cfg.max_frame_length {
            return Err(Error::FrameTooLong {
                len: frame.len(),
                max: self.cfg.max_frame_length,
            });
        }

        dst.reserve(frame.len() + 1);
        dst.put_slice(&frame);
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Encoder<DeviceEvent> for DeviceEventCodec {
    type Error = Error;

    fn encode(&mut self, item: DeviceEvent, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&DeviceEvent>>::encode(self, &item, dst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{error::ValidationError, types::Paras};
    use pretty_assertions::assert_eq;

    const LINE: &str = r#"{"service_id":"s","event_type":"t","event_time":"2024-01-01T00:00:00Z","paras":{}}"#;

    fn event() -> DeviceEvent {
        DeviceEvent::new("s", "t", "2024-01-01T00:00:00Z", Paras::new(), None).unwrap()
    }

    #[test]
    fn partial_frames() {
        let mut codec = DeviceEventCodec::default();
        let mut buf = BytesMut::from(&LINE.as_bytes()[..10]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(&LINE.as_bytes()[10..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\r\n\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(event()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn trailing_frame_at_eof() {
        let mut codec = DeviceEventCodec::default();
        let mut buf = BytesMut::from(LINE);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some(event()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn oversized_frame() {
        let cfg = Config {
            max_frame_length: 16,
            ..Default::default()
        };
        let mut codec = DeviceEventCodec::new(&cfg);
        let mut buf = BytesMut::from(LINE);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(Error::FrameTooLong { max: 16, .. })
        ));

        let mut dst = BytesMut::new();
        assert!(matches!(
            codec.encode(&event(), &mut dst),
            Err(Error::FrameTooLong { max: 16, .. })
        ));
        assert!(dst.is_empty());
    }

    #[test]
    fn max_length_frame_with_split_crlf() {
        let cfg = Config {
            max_frame_length: LINE.len(),
            ..Default::default()
        };
        let mut codec = DeviceEventCodec::new(&cfg);
        let mut buf = BytesMut::from(format!("{LINE}\r").as_str());
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(event()));

        // One byte of payload past the limit is still rejected
        let mut buf = BytesMut::from(format!("{LINE} \r").as_str());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(Error::FrameTooLong { len, .. }) if len == LINE.len() + 1
        ));
    }

    #[test]
    fn shorter_buffer_between_calls() {
        let mut codec = DeviceEventCodec::default();
        let mut buf = BytesMut::from(&LINE.as_bytes()[..40]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        let mut short = BytesMut::from(&b"{"[..]);
        assert_eq!(codec.decode(&mut short).unwrap(), None);

        let mut full = BytesMut::from(format!("{LINE}\n").as_str());
        assert_eq!(codec.decode(&mut full).unwrap(), Some(event()));
    }

    #[test]
    fn invalid_frame() {
        let mut codec = DeviceEventCodec::default();
        let mut buf = BytesMut::from(
            r#"{"service_id":"","event_type":"t","event_time":"2024-01-01T00:00:00Z","paras":{}}
"#,
        );
        assert!(matches!(
            codec.decode(&mut buf),
            Err(Error::Validation(ValidationError::EmptyField("service_id")))
        ));
    }

    #[test]
    fn encode_appends_delimiter() {
        let mut codec = DeviceEventCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(event(), &mut dst).unwrap();
        codec.encode(&event(), &mut dst).unwrap();
        assert_eq!(dst, format!("{LINE}\n{LINE}\n").as_bytes());
    }
}
