use bytes::Bytes;
use responsewriter::{
    response_handler, Context, Envelope, Event, Exception, HttpRequestMethod, Params, Registry,
    Reply, Request, Sink, Transport, TypeHandler,
};

use std::{
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// 记录所有调用的传输层，写正文总是失败
#[derive(Default)]
struct HeaderOnlyTransport {
    headers: HashMap<String, String>,
    statuses: Vec<i32>,
    writes: Vec<Vec<u8>>,
}

impl Transport for HeaderOnlyTransport {
    fn set_header(&mut self, key: &str, value: &str) {
        self.headers.insert(key.to_string(), value.to_string());
    }

    fn write_status(&mut self, code: i32) {
        self.statuses.push(code);
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        self.writes.push(body.to_vec());
        Err(io::Error::new(io::ErrorKind::Other, "write failed intentional"))
    }
}

#[derive(Default)]
struct CountingSink {
    messages: Mutex<Vec<String>>,
}

impl Sink for CountingSink {
    fn emit(&self, event: &Event<'_>) {
        let cause = event.cause.map(|c| c.to_string()).unwrap_or_default();
        self.messages.lock().unwrap().push(cause);
    }
}

#[derive(Clone)]
struct MockResponse {
    code: i32,
    body: Option<&'static str>,
    content_type: &'static str,
}

impl Envelope for MockResponse {
    fn code(&self) -> i32 {
        self.code
    }

    fn body(&self) -> Bytes {
        self.body.map(|s| Bytes::from_static(s.as_bytes())).unwrap_or_default()
    }

    fn content_type(&self) -> &str {
        self.content_type
    }

    fn handle(&self) -> (i32, Option<Bytes>) {
        (self.code, self.body.map(|s| Bytes::from_static(s.as_bytes())))
    }
}

struct MockType {
    accepted: &'static str,
    response: Option<MockResponse>,
    default_error: MockResponse,
}

impl TypeHandler for MockType {
    fn accepted_type(&self) -> &str {
        self.accepted
    }

    fn convert(&self, _reply: &Reply) -> Option<Box<dyn Envelope>> {
        self.response
            .clone()
            .map(|response| Box::new(response) as Box<dyn Envelope>)
    }

    fn default_error(&self) -> Box<dyn Envelope> {
        Box::new(self.default_error.clone())
    }
}

fn unused_default() -> MockResponse {
    MockResponse {
        code: 500,
        body: Some("unused"),
        content_type: "",
    }
}

fn context(accept: &str) -> Context {
    Context::new(
        Request::new(HttpRequestMethod::Get, "/").with_header("Accept", accept),
        Params::new(),
    )
}

#[test]
fn test_empty_preferred_type_is_rejected() {
    let preferred = MockType {
        accepted: "",
        response: None,
        default_error: unused_default(),
    };

    let result = response_handler(|_| Reply::Nothing, preferred, vec![]);

    match result {
        Err(e) => {
            assert_eq!(e, Exception::EmptyAcceptedType);
            assert_eq!(e.to_string(), "Invalid accepted response type given");
        }
        Ok(_) => panic!("expected an invalid accepted type error"),
    }
}

#[test]
fn test_builder_without_preferred_type_is_rejected() {
    let result = Registry::builder().build();

    match result {
        Err(e) => assert_eq!(
            e.to_string(),
            "Invalid response type given for response handler"
        ),
        Ok(_) => panic!("expected a missing preferred type error"),
    }
}

#[test]
fn test_negotiation_across_three_types() {
    let first = MockType {
        accepted: "first/content-type",
        response: Some(MockResponse {
            code: 101,
            body: Some("noempty-first"),
            content_type: "first/resp-content-type",
        }),
        default_error: unused_default(),
    };
    let second: Arc<dyn TypeHandler> = Arc::new(MockType {
        accepted: "second/content-type",
        response: Some(MockResponse {
            code: 102,
            body: Some("noempty-second"),
            content_type: "",
        }),
        default_error: unused_default(),
    });
    let third: Arc<dyn TypeHandler> = Arc::new(MockType {
        accepted: "third/content-type",
        response: None,
        default_error: MockResponse {
            code: 200,
            body: None,
            content_type: "third/resp-content-type",
        },
    });

    let called = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&called);
    let sink = Arc::new(CountingSink::default());

    let dispatcher = response_handler(
        move |_: &Context| {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply::Nothing
        },
        first,
        vec![second, third],
    )
    .unwrap()
    .with_sink(sink.clone());

    let mut transport = HeaderOnlyTransport::default();

    // 首选类型
    assert_eq!(dispatcher.dispatch(&context("first/content-type"), &mut transport), 101);
    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.headers.get("Content-Type").map(String::as_str),
        Some("first/resp-content-type")
    );
    assert_eq!(transport.statuses, vec![101]);
    assert_eq!(transport.writes, vec![b"noempty-first".to_vec()]);
    assert_eq!(sink.messages.lock().unwrap().len(), 1);

    // 未声明内容类型时退回 text/plain
    transport.headers.remove("Content-Type");
    assert_eq!(dispatcher.dispatch(&context("second/content-type"), &mut transport), 102);
    assert_eq!(called.load(Ordering::SeqCst), 2);
    assert_eq!(
        transport.headers.get("Content-Type").map(String::as_str),
        Some("text/plain")
    );
    assert_eq!(transport.statuses, vec![101, 102]);
    assert_eq!(sink.messages.lock().unwrap().len(), 2);

    // 无法转换，默认错误没有正文：200 改为 204，不写正文也不设内容类型
    transport.headers.remove("Content-Type");
    assert_eq!(dispatcher.dispatch(&context("third/content-type"), &mut transport), 204);
    assert_eq!(called.load(Ordering::SeqCst), 3);
    assert!(transport.headers.get("Content-Type").is_none());
    assert_eq!(transport.statuses, vec![101, 102, 204]);
    assert_eq!(transport.writes.len(), 2);
    assert_eq!(sink.messages.lock().unwrap().len(), 2);
    assert!(sink
        .messages
        .lock()
        .unwrap()
        .iter()
        .all(|m| m == "write failed intentional"));
}

#[test]
fn test_unknown_accept_uses_preferred_type() {
    let first = MockType {
        accepted: "first/content-type",
        response: Some(MockResponse {
            code: 201,
            body: Some("first"),
            content_type: "first/resp-content-type",
        }),
        default_error: unused_default(),
    };
    let second: Arc<dyn TypeHandler> = Arc::new(MockType {
        accepted: "second/content-type",
        response: Some(MockResponse {
            code: 202,
            body: Some("second"),
            content_type: "second/resp-content-type",
        }),
        default_error: unused_default(),
    });

    let dispatcher = response_handler(|_| Reply::Nothing, first, vec![second])
        .unwrap()
        .with_sink(Arc::new(CountingSink::default()));

    for accept in ["", "text/html", "first/content-type, second/content-type"] {
        let mut transport = HeaderOnlyTransport::default();
        assert_eq!(dispatcher.dispatch(&context(accept), &mut transport), 201);
        assert_eq!(transport.writes, vec![b"first".to_vec()]);
    }
}

#[test]
fn test_preferred_type_wins_duplicate_id() {
    let first = MockType {
        accepted: "shared/content-type",
        response: Some(MockResponse {
            code: 201,
            body: Some("preferred"),
            content_type: "a/b",
        }),
        default_error: unused_default(),
    };
    let duplicate: Arc<dyn TypeHandler> = Arc::new(MockType {
        accepted: "shared/content-type",
        response: Some(MockResponse {
            code: 202,
            body: Some("duplicate"),
            content_type: "a/b",
        }),
        default_error: unused_default(),
    });

    let dispatcher = response_handler(|_| Reply::Nothing, first, vec![duplicate])
        .unwrap()
        .with_sink(Arc::new(CountingSink::default()));

    let mut transport = HeaderOnlyTransport::default();
    assert_eq!(
        dispatcher.dispatch(&context("shared/content-type"), &mut transport),
        201
    );
    assert_eq!(dispatcher.registry().len(), 1);
}
