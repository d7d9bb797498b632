use device_event::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_log::test;

const TIME: &str = "2024-01-01T00:00:00Z";

fn paras(value: serde_json::Value) -> Paras {
    match ParaValue::from(value) {
        ParaValue::Mapping(m) => m,
        v => panic!("not a mapping: {v:?}"),
    }
}

fn sample_paras() -> Vec<Paras> {
    vec![
        Paras::new(),
        paras(json!({"temperature": 21.5, "unit": "C"})),
        paras(json!({
            "alarm": true,
            "zones": [1, 2, 3],
            "limits": {"min": -40, "max": 18446744073709551615_u64},
            "note": null,
        })),
    ]
}

#[test]
fn round_trip_without_event_id() {
    for p in sample_paras() {
        let event = DeviceEvent::new("sensor", "reading", TIME, p, None).unwrap();
        let encoded = event.to_vec().unwrap();
        assert_eq!(DeviceEvent::from_slice(&encoded).unwrap(), event);

        let object: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert!(object.get("event_id").is_none());
    }
}

#[test]
fn round_trip_with_event_id() {
    for p in sample_paras() {
        let id = EventId::generate();
        let event = DeviceEvent::new("sensor", "reading", TIME, p, Some(id.clone())).unwrap();
        let encoded = event.to_vec().unwrap();
        assert_eq!(DeviceEvent::from_slice(&encoded).unwrap(), event);

        let object: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(object["event_id"], json!(id.as_str()));
    }
}

#[test]
fn empty_service_id_is_a_validation_error() {
    assert_eq!(
        DeviceEvent::new("", "reading", TIME, Paras::new(), None),
        Err(ValidationError::EmptyField("service_id"))
    );
}

#[test]
fn non_serializable_paras_are_a_validation_error() {
    let mut p = paras(json!({"nested": {"ok": 1}}));
    p.insert("ratio".to_owned(), f64::NEG_INFINITY.into());
    assert!(matches!(
        DeviceEvent::new("sensor", "reading", TIME, p, None),
        Err(ValidationError::NonSerializableParam { .. })
    ));
}

#[test]
fn minimal_event_decodes_without_event_id() {
    let event = DeviceEvent::from_json(
        r#"{"service_id":"s1","event_type":"t1","event_time":"2024-01-01T00:00:00Z","paras":{}}"#,
    )
    .unwrap();
    assert_eq!(event.service_id(), "s1");
    assert_eq!(event.event_type(), "t1");
    assert_eq!(event.event_time(), TIME);
    assert!(event.paras().is_empty());
    assert_eq!(event.event_id(), None);
}

#[test]
fn malformed_input_is_a_format_error() {
    for input in [
        r#"{"service_id":"s1","event_type":"t1","event_ti"#,
        "42",
        "null",
        r#"["s1","t1","2024-01-01T00:00:00Z",{}]"#,
        "not json",
    ] {
        assert!(
            matches!(DeviceEvent::from_json(input), Err(Error::Format(_))),
            "{input}"
        );
    }
}

#[test]
fn encoding_is_deterministic() {
    let mut forward = Paras::new();
    let mut backward = Paras::new();
    for (k, v) in [("a", 1_i32), ("b", 2), ("c", 3)] {
        forward.insert(k.to_owned(), v.into());
    }
    for (k, v) in [("c", 3_i32), ("b", 2), ("a", 1)] {
        backward.insert(k.to_owned(), v.into());
    }
    let a = DeviceEvent::new("s", "t", TIME, forward, None).unwrap();
    let b = DeviceEvent::new("s", "t", TIME, backward, None).unwrap();
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn event_time_convention_is_configurable() {
    let input =
        r#"{"service_id":"s1","event_type":"t1","event_time":"1700000000","paras":{}}"#;
    assert!(matches!(
        DeviceEvent::from_json(input),
        Err(Error::Validation(ValidationError::InvalidEventTime { .. }))
    ));

    let cfg = Config {
        event_time_format: EventTimeFormat::Unchecked,
        ..Default::default()
    };
    let event = DeviceEvent::from_json_with_config(&cfg, input).unwrap();
    assert_eq!(event.event_time(), "1700000000");
    assert_eq!(event.event_time_utc(), None);
}

#[test]
fn generated_event_time_is_accepted() {
    let event = DeviceEvent::new(
        "s",
        "t",
        event_time_now(EventTimeFormat::Rfc3339Utc),
        Paras::new(),
        None,
    )
    .unwrap();
    assert!(event.event_time_utc().is_some());
}

/// `paras` whose innermost (empty) mapping sits at `depth`.
fn nested_paras(depth: usize) -> Paras {
    let mut value = ParaValue::Mapping(Paras::new());
    for _ in 1..depth {
        let mut wrapper = Paras::new();
        wrapper.insert("n".to_owned(), value);
        value = ParaValue::Mapping(wrapper);
    }
    let mut p = Paras::new();
    p.insert("n".to_owned(), value);
    p
}

#[test]
fn deepest_accepted_paras_round_trip() {
    let cfg = Config {
        max_paras_depth: 200,
        ..Default::default()
    };

    let event = DeviceEvent::with_config(
        &cfg,
        "s",
        "t",
        TIME,
        nested_paras(MAX_PARAS_DEPTH_LIMIT),
        None,
    )
    .unwrap();
    let encoded = event.to_vec().unwrap();
    assert_eq!(
        DeviceEvent::from_slice_with_config(&cfg, &encoded).unwrap(),
        event
    );

    let report = EventReport::from(event);
    let encoded = report.to_vec().unwrap();
    assert_eq!(
        EventReport::from_slice_with_config(&cfg, &encoded).unwrap(),
        report
    );

    assert!(matches!(
        DeviceEvent::with_config(
            &cfg,
            "s",
            "t",
            TIME,
            nested_paras(MAX_PARAS_DEPTH_LIMIT + 1),
            None
        ),
        Err(ValidationError::ParasTooDeep { max_depth, .. }) if max_depth == MAX_PARAS_DEPTH_LIMIT
    ));
}
