// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容协商分发器
//!
//! 每个请求经过一次同步的处理流程：
//! 1. 按 `Accept` 头选择类型处理器；
//! 2. 调用业务回调得到返回值；
//! 3. 通过选中的处理器把返回值转换为信封，无法转换时退回处理器的默认错误；
//! 4. 物化信封并写出到传输层，状态行只写一次。

use bytes::Bytes;
use log::{debug, Level};

use std::{io, sync::Arc};

use crate::{
    envelope::Envelope,
    exception::Exception,
    handler::{Registry, TypeHandler},
    param::{ACCEPT, CONTENT_TYPE, TEXT_PLAIN},
    reply::Reply,
    request::Context,
    sink::{Event, LogSink, Sink},
    util::status_text,
};

/// 分发器写出响应所需的传输层能力。
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn set_header(&mut self, key: &str, value: &str);
    fn write_status(&mut self, code: i32);
    fn write(&mut self, body: &[u8]) -> io::Result<usize>;
}

/// 业务回调
pub type Handler = Arc<dyn Fn(&Context) -> Reply + Send + Sync>;

/// 绑定了业务回调与类型注册表的分发器，可在多个请求间共享。
#[derive(Clone)]
pub struct Dispatcher {
    handler: Handler,
    registry: Arc<Registry>,
    sink: Arc<dyn Sink>,
}

impl Dispatcher {
    pub fn new<F>(handler: F, registry: Arc<Registry>) -> Self
    where
        F: Fn(&Context) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            registry,
            sink: Arc::new(LogSink::default()),
        }
    }

    /// 替换写出失败时使用的日志出口
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 处理一个请求，返回实际写出的状态码。
    pub fn dispatch(&self, context: &Context, transport: &mut dyn Transport) -> i32 {
        let accept = context.request.header(ACCEPT).unwrap_or_default();
        let handler = self.registry.select(accept);

        let reply = (self.handler)(context);

        let envelope = match handler.convert(&reply) {
            Some(envelope) => envelope,
            None => match reply {
                Reply::Response(envelope) => envelope,
                _ => {
                    debug!("返回值无法转换为{}，使用默认错误响应", handler.accepted_type());
                    handler.default_error()
                }
            },
        };

        transmit(envelope.as_ref(), transport, self.sink.as_ref())
    }
}

/// 以一个首选类型处理器和若干其他处理器构建分发器。
///
/// 配置错误会在启动阶段返回，调用方应中止启动。
pub fn response_handler<F, H>(
    handler: F,
    preferred: H,
    allowed: Vec<Arc<dyn TypeHandler>>,
) -> Result<Dispatcher, Exception>
where
    F: Fn(&Context) -> Reply + Send + Sync + 'static,
    H: TypeHandler + 'static,
{
    let registry = Registry::new(Arc::new(preferred), allowed)?;
    Ok(Dispatcher::new(handler, Arc::new(registry)))
}

/// 物化信封并写出。
///
/// 有正文时（包括长度为零的正文）先设置内容类型再写状态行；没有正文且状态码为 `200` 时改为 `204`。
/// 写出失败只记录日志，状态行已经提交，无法撤回。
pub fn transmit(envelope: &dyn Envelope, transport: &mut dyn Transport, sink: &dyn Sink) -> i32 {
    let (mut code, body): (i32, Option<Bytes>) = envelope.handle();

    match &body {
        Some(_) => {
            let content_type = match envelope.content_type() {
                "" => TEXT_PLAIN,
                declared => declared,
            };
            transport.set_header(CONTENT_TYPE, content_type);
        }
        None if code == 200 => code = 204,
        None => {}
    }

    transport.write_status(code);

    if let Some(body) = body {
        if let Err(e) = transport.write(&body) {
            sink.emit(&Event {
                level: Level::Error,
                message: "响应正文写出失败",
                code,
                status: status_text(code),
                cause: Some(&e),
            });
        }
    }

    code
}
