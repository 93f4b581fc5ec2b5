// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 响应信封模块
//!
//! 信封（[`Envelope`]）是尚未写出的响应：状态码、正文以及附带的错误原因。
//! [`Json`] 是 JSON 格式的具体信封，[`ErrorDescriptor`] 是通用的错误正文。
//!
//! ## 物化规则
//! 1. 状态码为 0 且正文为空：强制为 `500` 和缓存的默认错误正文。
//! 2. 正文与缓存的默认错误正文逐字节相等：无论原状态码为何，强制为 `500`。
//! 3. 状态码为 0：默认为 `200`。
//!
//! 附带错误原因且挂接了日志出口时，物化会按状态码对应的级别输出一条结构化日志。

use bytes::Bytes;
use lazy_static::lazy_static;
use log::{warn, Level};
use serde_derive::Serialize;
use serde_json::Value;

use std::{error::Error, fmt, sync::Arc};

use crate::{
    param::APPLICATION_JSON,
    sink::{Event, Sink},
    util::{reason, severity, status_text},
};

/// 附着在响应上的错误原因。
pub type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// 通用错误正文的固定描述文本
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

const INTERNAL_SERVER_ERROR_FALLBACK: &[u8] = br#"{"code":500,"description":"Internal Server Error"}"#;

lazy_static! {
    /// `ErrorDescriptor { code: 500, description: "Internal Server Error" }` 的 JSON 渲染结果。
    ///
    /// 进程启动后只计算一次，既用作渲染失败时的兜底正文，也用作“正文已表示失败”的哨兵值。
    pub static ref INTERNAL_SERVER_ERROR_JSON: Bytes = ErrorDescriptor::internal()
        .render()
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(INTERNAL_SERVER_ERROR_FALLBACK));
}

/// 可以把自身渲染为 JSON 字节序列的值。
///
/// 所有实现了 `Serialize` 的类型都自动实现该特性；渲染可能失败，
/// 例如自定义的 `Serialize` 实现返回错误，或映射的键不是字符串。
pub trait Render: Send + Sync {
    fn render(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: serde::Serialize + Send + Sync + ?Sized> Render for T {
    fn render(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// 尚未写出的响应所需满足的契约。
pub trait Envelope: Send {
    /// 原样返回存储的状态码，包括表示“未决”的 0。
    fn code(&self) -> i32;
    /// 渲染后的正文。
    fn body(&self) -> Bytes;
    /// 声明的内容类型，可以为空。
    fn content_type(&self) -> &str;
    /// 解析最终的状态码与正文。`None` 表示没有正文，调用方不应写出任何字节。
    fn handle(&self) -> (i32, Option<Bytes>);
}

/// 响应正文。
#[derive(Clone, Default)]
pub enum Body {
    #[default]
    Absent,
    Bytes(Bytes),
    Text(String),
    /// 在物化时才渲染的结构化值
    Value(Arc<dyn Render>),
}

impl Body {
    pub fn value<T: serde::Serialize + Send + Sync + 'static>(value: T) -> Self {
        Body::Value(Arc::new(value))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Body::Absent)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Absent => write!(f, "Absent"),
            Body::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Body::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Body::Value(_) => write!(f, "Value(..)"),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

/// 通用的可序列化错误正文。错误原因不参与序列化。
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescriptor {
    pub code: i32,
    pub description: Value,
    #[serde(skip)]
    pub cause: Option<Cause>,
}

impl ErrorDescriptor {
    /// 构造错误正文。未给出描述时使用状态码的原因短语，状态码未登记则描述为 `null`。
    pub fn new(code: i32, description: Option<Value>, cause: Option<Cause>) -> Self {
        let description = description
            .or_else(|| reason(code).map(Value::from))
            .unwrap_or(Value::Null);
        Self {
            code,
            description,
            cause,
        }
    }

    /// `{500, "Internal Server Error"}`
    pub fn internal() -> Self {
        Self {
            code: 500,
            description: Value::from(INTERNAL_SERVER_ERROR),
            cause: None,
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

/// JSON 格式的响应信封。
///
/// 字段全部公开，直接用结构体字面量即可一次性给出状态码、正文、错误原因和日志出口。
#[derive(Clone, Default)]
pub struct Json {
    pub code: i32,
    pub body: Body,
    pub cause: Option<Cause>,
    pub sink: Option<Arc<dyn Sink>>,
}

impl Json {
    pub fn new(code: i32, body: impl Into<Body>) -> Self {
        Self {
            code,
            body: body.into(),
            cause: None,
            sink: None,
        }
    }

    /// 以 [`ErrorDescriptor`] 为正文的错误响应，信封与正文携带同一个错误原因。
    pub fn error(code: i32, description: Option<Value>, cause: Option<Cause>) -> Self {
        Self {
            code,
            body: Body::value(ErrorDescriptor::new(code, description, cause.clone())),
            cause,
            sink: None,
        }
    }

    /// `{500, ErrorDescriptor{500, "Internal Server Error"}}`
    pub fn internal_error() -> Self {
        Self::new(500, Body::value(ErrorDescriptor::internal()))
    }

    fn report_render_failure(&self, err: &serde_json::Error) {
        match &self.sink {
            Some(sink) => sink.emit(&Event {
                level: Level::Warn,
                message: "JSON响应序列化失败",
                code: self.code,
                status: status_text(self.code),
                cause: Some(err),
            }),
            None => warn!("JSON响应序列化失败：{}", err),
        }
    }
}

impl fmt::Debug for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Json")
            .field("code", &self.code)
            .field("body", &self.body)
            .field("cause", &self.cause)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Envelope for Json {
    fn code(&self) -> i32 {
        self.code
    }

    fn body(&self) -> Bytes {
        match &self.body {
            Body::Absent => Bytes::new(),
            Body::Bytes(bytes) => bytes.clone(),
            Body::Text(text) => Bytes::from(text.clone()),
            Body::Value(value) => match value.render() {
                Ok(rendered) => Bytes::from(rendered),
                Err(e) => {
                    self.report_render_failure(&e);
                    INTERNAL_SERVER_ERROR_JSON.clone()
                }
            },
        }
    }

    fn content_type(&self) -> &str {
        APPLICATION_JSON
    }

    fn handle(&self) -> (i32, Option<Bytes>) {
        let mut code = self.code;
        let mut body = self.body();

        if code == 0 && body.is_empty() {
            code = 500;
            body = INTERNAL_SERVER_ERROR_JSON.clone();
        } else if body == *INTERNAL_SERVER_ERROR_JSON {
            code = 500;
        } else if code == 0 {
            code = 200;
        }

        if let (Some(cause), Some(sink)) = (&self.cause, &self.sink) {
            sink.emit(&Event {
                level: severity(code),
                message: "响应处理过程中遇到错误",
                code,
                status: status_text(code),
                cause: Some(&**cause),
            });
        }

        (code, Some(body))
    }
}
