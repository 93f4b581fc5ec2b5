// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 业务回调的返回值
//!
//! 业务回调可以返回任意值，这里用封闭的 [`Reply`] 枚举来表示这些值的形态。
//! 内建形态（空值、字符串、信封、错误正文、整数状态码、映射与序列）各自对应一个变体；
//! 用户自定义类型则通过 [`Payload`] 声明自己具备哪些能力。

use serde::Serialize;
use serde_json::Value;

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::envelope::{Cause, Envelope, ErrorDescriptor, Json, Render};

/// 用户类型可以声明的能力，每项能力都可以独立查询，默认都不具备。
///
/// ```
/// use std::{fmt, sync::Arc};
/// use responsewriter::{Cause, Payload};
///
/// #[derive(Debug)]
/// struct RateLimited;
///
/// impl fmt::Display for RateLimited {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "rate limited")
///     }
/// }
///
/// impl std::error::Error for RateLimited {}
///
/// impl Payload for RateLimited {
///     fn as_error(self: Arc<Self>) -> Option<Cause> {
///         Some(self)
///     }
///
///     fn code(&self) -> Option<i32> {
///         Some(429)
///     }
/// }
/// ```
pub trait Payload: Send + Sync + 'static {
    /// 自描述：直接给出自己的 JSON 信封。
    fn to_json(&self) -> Option<Json> {
        None
    }

    /// 错误：可以作为响应的错误原因。
    fn as_error(self: Arc<Self>) -> Option<Cause> {
        None
    }

    /// 携带状态码。
    fn code(&self) -> Option<i32> {
        None
    }

    /// 自序列化：可以渲染自己的线上字节。
    fn as_render(self: Arc<Self>) -> Option<Arc<dyn Render>> {
        None
    }
}

/// 业务回调返回的值。
pub enum Reply {
    /// 空值
    Nothing,
    Text(String),
    /// 按值传递的信封
    Envelope(Json),
    /// 按引用传递的信封
    SharedEnvelope(Arc<Json>),
    Error(ErrorDescriptor),
    SharedError(Arc<ErrorDescriptor>),
    /// 整数状态码
    Code(i32),
    /// 映射、列表或定长数组，物化时再渲染
    Collection(Arc<dyn Render>),
    /// 通过 [`Payload`] 声明能力的用户类型
    Value(Arc<dyn Payload>),
    /// 转换器不认识、但本身已满足信封契约的值
    Response(Box<dyn Envelope>),
    /// 其他任何值
    Other(Box<dyn Any + Send>),
}

impl Reply {
    pub fn payload<P: Payload>(payload: P) -> Self {
        Reply::Value(Arc::new(payload))
    }

    pub fn map<K, V>(map: BTreeMap<K, V>) -> Self
    where
        K: Serialize + Send + Sync + 'static,
        V: Serialize + Send + Sync + 'static,
    {
        Reply::Collection(Arc::new(map))
    }

    pub fn hash_map<K, V>(map: HashMap<K, V>) -> Self
    where
        K: Serialize + Send + Sync + 'static,
        V: Serialize + Send + Sync + 'static,
    {
        Reply::Collection(Arc::new(map))
    }

    pub fn list<T: Serialize + Send + Sync + 'static>(list: Vec<T>) -> Self {
        Reply::Collection(Arc::new(list))
    }

    pub fn array<T: Serialize + Send + Sync + 'static, const N: usize>(array: [T; N]) -> Self {
        Reply::Collection(Arc::new(array.into_iter().collect::<Vec<T>>()))
    }

    pub fn response<E: Envelope + 'static>(envelope: E) -> Self {
        Reply::Response(Box::new(envelope))
    }

    pub fn other<T: Any + Send>(value: T) -> Self {
        Reply::Other(Box::new(value))
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Reply::Nothing)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Nothing
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<Json> for Reply {
    fn from(json: Json) -> Self {
        Reply::Envelope(json)
    }
}

impl From<Arc<Json>> for Reply {
    fn from(json: Arc<Json>) -> Self {
        Reply::SharedEnvelope(json)
    }
}

impl From<ErrorDescriptor> for Reply {
    fn from(error: ErrorDescriptor) -> Self {
        Reply::Error(error)
    }
}

impl From<Arc<ErrorDescriptor>> for Reply {
    fn from(error: Arc<ErrorDescriptor>) -> Self {
        Reply::SharedError(error)
    }
}

macro_rules! code_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Reply {
                fn from(code: $t) -> Self {
                    Reply::Code(i32::from(code))
                }
            }
        )*
    };
}

code_from!(i8, i16, i32, u8, u16);

// 超出 i32 范围的值无法作为状态码，保持为无法转换
macro_rules! wide_code_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Reply {
                fn from(code: $t) -> Self {
                    match i32::try_from(code) {
                        Ok(code) => Reply::Code(code),
                        Err(_) => Reply::Other(Box::new(code)),
                    }
                }
            }
        )*
    };
}

wide_code_from!(i64, isize, u32, u64, usize);

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Reply::Nothing,
        }
    }
}

/// JSON 对象与数组视为集合，`null` 视为空值，字符串视为文本，布尔值和数字无法转换。
impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Reply::Nothing,
            Value::String(text) => Reply::Text(text),
            Value::Object(_) | Value::Array(_) => Reply::Collection(Arc::new(value)),
            other => Reply::Other(Box::new(other)),
        }
    }
}
