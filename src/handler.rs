// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 类型处理器与注册表
//!
//! 类型处理器（[`TypeHandler`]）把一个媒体类型标识与该格式的转换器、默认错误工厂绑定在一起。
//! 每条路由在启动时构建一张只读的注册表（[`Registry`]），请求到来时按 `Accept` 头精确匹配。
//!
//! [`JsonType`] 是 `application/json` 的处理器，其转换器按以下优先级把回调返回值转换为信封，
//! 命中第一条即返回：
//!
//! 1. 空值 → `204`，无正文
//! 2. 自描述值 → 原样采用它给出的信封
//! 3. 字符串 → 空串为 `204` 无正文，否则 `200` 加文本正文
//! 4. 信封（按值或按引用）→ 复制一份独立的信封
//! 5. 错误正文 → 状态码取自错误正文，正文为错误正文本身
//! 6. 整数 → 仅设置状态码
//! 7. 错误值 → 默认 `500` 错误信封，附带错误原因，再按状态码和自序列化能力覆盖
//! 8. 非错误的自序列化值 → 状态码优先取自身携带的，否则 `200`
//! 9. 映射、列表、定长数组 → `200`
//! 10. 其他 → 无法转换

use log::{debug, warn};
use serde_json::Value;

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    envelope::{Body, Envelope, ErrorDescriptor, Json, INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR_JSON},
    exception::Exception,
    param::APPLICATION_JSON,
    reply::{Payload, Reply},
    sink::Sink,
    util::reason,
};

/// 可协商的编码策略。
pub trait TypeHandler: Send + Sync {
    /// 非空的媒体类型标识。
    fn accepted_type(&self) -> &str;
    /// 把回调返回值转换为信封，无法转换时返回 `None`。
    fn convert(&self, reply: &Reply) -> Option<Box<dyn Envelope>>;
    /// 固定的兜底错误信封。
    fn default_error(&self) -> Box<dyn Envelope>;
}

/// 仅携带状态码的错误值转换为错误正文时，描述文本的来源。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DescriptionPolicy {
    /// 无论状态码为何，描述均为 `"Internal Server Error"`
    #[default]
    Fixed,
    /// 使用状态码的原因短语，状态码未登记时退回固定文本
    StatusText,
}

impl DescriptionPolicy {
    pub fn describe(&self, code: i32) -> Value {
        match self {
            DescriptionPolicy::Fixed => Value::from(INTERNAL_SERVER_ERROR),
            DescriptionPolicy::StatusText => {
                Value::from(reason(code).unwrap_or(INTERNAL_SERVER_ERROR))
            }
        }
    }
}

/// `application/json` 的类型处理器。
#[derive(Clone, Default)]
pub struct JsonType {
    policy: DescriptionPolicy,
    sink: Option<Arc<dyn Sink>>,
}

impl JsonType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: DescriptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 为转换出的、携带错误原因的信封挂接日志出口。
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn policy(&self) -> DescriptionPolicy {
        self.policy
    }

    /// 具体类型版本的转换器，便于直接检查生成的 [`Json`]。
    pub fn to_json(&self, reply: &Reply) -> Option<Json> {
        let json = match reply {
            Reply::Nothing => Json::new(204, Body::Absent),
            Reply::Value(payload) => return self.from_payload(payload),
            Reply::Text(text) if text.is_empty() => Json::new(204, Body::Absent),
            Reply::Text(text) => Json::new(200, Body::Text(text.clone())),
            Reply::Envelope(json) => return Some(json.clone()),
            Reply::SharedEnvelope(json) => return Some(json.as_ref().clone()),
            Reply::Error(error) => self.from_descriptor(error),
            Reply::SharedError(error) => self.from_descriptor(error),
            Reply::Code(code) => Json::new(*code, Body::Absent),
            Reply::Collection(value) => Json::new(200, Body::Value(Arc::clone(value))),
            Reply::Response(_) | Reply::Other(_) => return None,
        };
        Some(json)
    }

    fn from_descriptor(&self, error: &ErrorDescriptor) -> Json {
        self.attach_sink(Json {
            code: error.code,
            body: Body::value(error.clone()),
            cause: error.cause.clone(),
            sink: None,
        })
    }

    // 规则 2、7、8：自描述优先，其次是错误，最后是非错误的自序列化值
    fn from_payload(&self, payload: &Arc<dyn Payload>) -> Option<Json> {
        if let Some(json) = payload.to_json() {
            return Some(json);
        }

        let code = payload.code();
        let render = Arc::clone(payload).as_render();

        if let Some(cause) = Arc::clone(payload).as_error() {
            let mut json = Json::internal_error();
            json.cause = Some(Arc::clone(&cause));

            if let Some(code) = code {
                json.code = code;
            }

            if let Some(render) = render {
                json.body = Body::Value(render);
            } else if code.is_some() {
                json.body = Body::value(ErrorDescriptor {
                    code: json.code,
                    description: self.policy.describe(json.code),
                    cause: Some(cause),
                });
            }

            return Some(self.attach_sink(json));
        }

        render.map(|render| Json::new(code.unwrap_or(200), Body::Value(render)))
    }

    fn attach_sink(&self, mut json: Json) -> Json {
        if json.cause.is_some() && json.sink.is_none() {
            json.sink = self.sink.clone();
        }
        json
    }
}

impl TypeHandler for JsonType {
    fn accepted_type(&self) -> &str {
        APPLICATION_JSON
    }

    fn convert(&self, reply: &Reply) -> Option<Box<dyn Envelope>> {
        self.to_json(reply)
            .map(|json| Box::new(json) as Box<dyn Envelope>)
    }

    fn default_error(&self) -> Box<dyn Envelope> {
        Box::new(Json::new(500, INTERNAL_SERVER_ERROR_JSON.clone()))
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.accepted_type())
    }
}

/// 媒体类型标识到类型处理器的只读映射，启动时构建一次。
#[derive(Clone)]
pub struct Registry {
    preferred: Arc<dyn TypeHandler>,
    types: HashMap<String, Arc<dyn TypeHandler>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// 先插入其余处理器，最后插入首选处理器，因此首选处理器总会覆盖同名的键。
    pub fn new(
        preferred: Arc<dyn TypeHandler>,
        allowed: Vec<Arc<dyn TypeHandler>>,
    ) -> Result<Self, Exception> {
        let preferred_type = preferred.accepted_type().to_string();
        if preferred_type.is_empty() {
            return Err(Exception::EmptyAcceptedType);
        }

        let mut types = HashMap::new();
        for handler in allowed {
            let accepted = handler.accepted_type().to_string();
            if accepted.is_empty() {
                warn!("忽略接受类型为空的类型处理器");
                continue;
            }
            types.insert(accepted, handler);
        }
        types.insert(preferred_type, Arc::clone(&preferred));

        let registry = Self { preferred, types };
        debug!("类型注册表构建完成：{:?}", registry.accepted_types());
        Ok(registry)
    }

    /// 按协商头精确匹配；头为空或未登记时选择首选处理器。
    pub fn select(&self, accept: &str) -> &dyn TypeHandler {
        if !accept.is_empty() {
            if let Some(handler) = self.types.get(accept) {
                return handler.as_ref();
            }
        }
        self.preferred.as_ref()
    }

    pub fn preferred(&self) -> &dyn TypeHandler {
        self.preferred.as_ref()
    }

    /// 已登记的媒体类型，按字典序排列。
    pub fn accepted_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.types.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// [`Registry`] 的构建器，首选处理器缺失时构建失败。
#[derive(Default)]
pub struct RegistryBuilder {
    preferred: Option<Arc<dyn TypeHandler>>,
    allowed: Vec<Arc<dyn TypeHandler>>,
}

impl RegistryBuilder {
    pub fn prefer<H: TypeHandler + 'static>(self, handler: H) -> Self {
        self.prefer_shared(Arc::new(handler))
    }

    pub fn prefer_shared(mut self, handler: Arc<dyn TypeHandler>) -> Self {
        self.preferred = Some(handler);
        self
    }

    pub fn allow<H: TypeHandler + 'static>(self, handler: H) -> Self {
        self.allow_shared(Arc::new(handler))
    }

    pub fn allow_shared(mut self, handler: Arc<dyn TypeHandler>) -> Self {
        self.allowed.push(handler);
        self
    }

    pub fn build(self) -> Result<Registry, Exception> {
        match self.preferred {
            Some(preferred) => Registry::new(preferred, self.allowed),
            None => Err(Exception::MissingPreferredType),
        }
    }
}
