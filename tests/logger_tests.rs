//! End-to-end behaviour of auto-flush loggers.

mod test_utils;

use std::sync::mpsc;

use hec_logging::test_utils::RecordingTransport;
use hec_logging::{
    ConfigOverrides, Context, DeliveryError, LogEvent, Message, Metadata, MiddlewareFailure,
    Outcome, RequestOverrides,
};
use rstest::rstest;
use serde_json::{Value, json};
use test_utils::{WAIT, bodies, harness, harness_with};

fn marker(tag: &'static str) -> impl Fn(Context) -> Result<Context, MiddlewareFailure> {
    move |mut ctx: Context| {
        let text = ctx.message.as_text().unwrap_or_default().to_owned();
        ctx.message = Message::Text(format!("{text}[{tag}]"));
        Ok(ctx)
    }
}

#[rstest]
fn each_send_is_one_json_request() {
    let h = harness(ConfigOverrides::new());
    h.logger
        .send(
            LogEvent::new("deployed")
                .with_severity("notice")
                .with_metadata(Metadata::new().with_host("web-3").with_time(1_700_000_000i64)),
        )
        .expect("send");
    assert!(h.logger.wait_for_dispatch(WAIT));

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.url,
        "https://localhost:8088/services/collector/event/1.0"
    );
    assert_eq!(request.header("Authorization"), Some("Splunk integration-token"));
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    let body: Value = serde_json::from_str(request.body.as_str()).expect("json");
    assert_eq!(
        body,
        json!({
            "time": "1700000000.000",
            "host": "web-3",
            "event": {"message": "deployed", "severity": "notice"}
        })
    );
}

#[rstest]
fn structured_messages_are_sent_as_objects() {
    let h = harness(ConfigOverrides::new());
    let message = Message::try_from(json!({"user": "ada", "action": "login"})).expect("message");
    h.logger.send(LogEvent::new(message)).expect("send");
    assert!(h.logger.wait_for_dispatch(WAIT));
    let body: Value = serde_json::from_str(&bodies(&h.transport)[0]).expect("json");
    assert_eq!(body["event"]["message"], json!({"user": "ada", "action": "login"}));
    assert_eq!(body["event"]["severity"], "info");
}

#[rstest]
fn middleware_runs_in_registration_order() {
    let h = harness(ConfigOverrides::new());
    for tag in ["m1", "m2", "m3"] {
        h.logger.use_middleware(marker(tag)).expect("register");
    }
    h.logger.send(LogEvent::new("msg")).expect("send");
    assert!(h.logger.wait_for_dispatch(WAIT));
    let body: Value = serde_json::from_str(&bodies(&h.transport)[0]).expect("json");
    assert_eq!(body["event"]["message"], "msg[m1][m2][m3]");
}

#[rstest]
fn failing_middleware_short_circuits() {
    let h = harness(ConfigOverrides::new());
    h.logger.use_named("m1", marker("m1")).expect("register");
    h.logger
        .use_named("m2", |ctx: Context| -> Result<Context, MiddlewareFailure> {
            Err(MiddlewareFailure::new("m2 refused").with_context(ctx))
        })
        .expect("register");
    h.logger.use_named("m3", marker("m3")).expect("register");

    h.logger.send(LogEvent::new("msg")).expect("send");
    assert!(h.errors.wait_for(1, WAIT));
    let error = &h.errors.collected()[0];
    assert_eq!(error.kind, "Chain");
    assert!(error.message.contains("m2"));
    let context = error.context.as_ref().expect("context");
    assert_eq!(context.message, Message::from("msg[m1]"));
    assert!(h.logger.wait_for_dispatch(WAIT));
    assert_eq!(h.transport.request_count(), 0);
}

#[rstest]
fn remote_rejection_reaches_handler_and_callback() {
    let transport =
        RecordingTransport::new().with_response(401, r#"{"text":"Invalid token","code":"4"}"#);
    let h = harness_with(ConfigOverrides::new(), transport);
    let (tx, rx) = mpsc::channel();
    h.logger
        .send_with(LogEvent::new("x"), move |result| {
            let _ = tx.send(result);
        })
        .expect("send");

    let Ok(Outcome::Delivered(response)) = rx.recv_timeout(WAIT).expect("callback") else {
        panic!("callback should receive the raw response");
    };
    assert_eq!(response.status, 401);
    assert_eq!(response.body, r#"{"text":"Invalid token","code":"4"}"#);
    assert!(h.errors.wait_for(1, WAIT));
    let error = &h.errors.collected()[0];
    assert_eq!(error.code.as_deref(), Some("4"));
}

#[rstest]
fn transport_failure_reaches_handler_and_callback() {
    let transport = RecordingTransport::new();
    transport.push_response(Err(hec_logging::TransportError::Connect {
        url: "https://localhost:8088".into(),
        reason: "refused".into(),
    }));
    let h = harness_with(ConfigOverrides::new(), transport);
    let (tx, rx) = mpsc::channel();
    h.logger
        .send_with(LogEvent::new("x"), move |result| {
            let _ = tx.send(result);
        })
        .expect("send");
    let result = rx.recv_timeout(WAIT).expect("callback");
    assert!(matches!(result, Err(DeliveryError::Transport(_))));
    assert!(h.errors.wait_for(1, WAIT));
    assert_eq!(h.errors.collected()[0].kind, "Transport");
}

#[rstest]
fn per_event_overrides_change_the_target() {
    let h = harness(ConfigOverrides::new());
    let event = LogEvent::new("x")
        .with_config(ConfigOverrides::new().with_url("http://collector.internal:9088"))
        .with_request(RequestOverrides {
            strict_ssl: Some(true),
            ..RequestOverrides::default()
        });
    h.logger.send(event).expect("send");
    assert!(h.logger.wait_for_dispatch(WAIT));
    let request = &h.transport.requests()[0];
    assert_eq!(
        request.url,
        "http://collector.internal:9088/services/collector/event/1.0"
    );
    assert!(request.strict_ssl);
}

#[rstest]
fn replaced_error_handler_takes_over() {
    let transport = RecordingTransport::new().with_response(400, r#"{"text":"No data","code":5}"#);
    let h = harness_with(ConfigOverrides::new(), transport);
    let (tx, rx) = mpsc::channel();
    h.logger
        .set_error_handler(move |err: &DeliveryError, _ctx: Option<&Context>| {
            let _ = tx.send(err.code().map(str::to_owned));
        });
    h.logger.flush();
    assert_eq!(rx.recv_timeout(WAIT).expect("handler"), Some("5".to_owned()));
    assert!(h.errors.is_empty());
}

#[rstest]
fn json_configuration_builds_a_logger() {
    let logger = hec_logging::HecLogger::builder(
        ConfigOverrides::from_json(&json!({
            "token": "abc",
            "url": "http://splunk.local:9000",
            "autoFlush": false,
            "maxBatchCount": 10
        }))
        .expect("overrides"),
    )
    .with_transport(RecordingTransport::new())
    .build()
    .expect("build");
    let config = logger.config();
    assert_eq!(config.url(), "http://splunk.local:9000/services/collector/event/1.0");
    assert!(!config.auto_flush);
    assert_eq!(config.max_batch_count, Some(10));
}
