// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 诊断日志出口
//!
//! 响应在物化时可以携带一个可选的日志出口（[`Sink`]）。出口只负责接收结构化事件，
//! 具体写到哪里由实现决定；默认实现 [`LogSink`] 转发到 `log` 门面。

use log::Level;
use std::error::Error;

/// 一条结构化诊断事件。
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub level: Level,
    pub message: &'a str,
    pub code: i32,
    pub status: &'a str,
    pub cause: Option<&'a (dyn Error + 'static)>,
}

/// 带级别和字段的诊断日志出口。
pub trait Sink: Send + Sync {
    fn emit(&self, event: &Event<'_>);
}

/// 转发到 `log` 门面的日志出口，`target` 用于区分来源模块。
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("responsewriter")
    }
}

impl Sink for LogSink {
    fn emit(&self, event: &Event<'_>) {
        match event.cause {
            Some(cause) => log::log!(
                target: self.target.as_str(),
                event.level,
                "{} code={} status={} error={}",
                event.message,
                event.code,
                event.status,
                cause
            ),
            None => log::log!(
                target: self.target.as_str(),
                event.level,
                "{} code={} status={}",
                event.message,
                event.code,
                event.status
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// 记录所有事件的出口，仅供测试使用。
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<(Level, String, i32, String, Option<String>)>>,
    }

    impl RecordingSink {
        pub fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    impl Sink for RecordingSink {
        fn emit(&self, event: &Event<'_>) {
            self.events.lock().unwrap().push((
                event.level,
                event.message.to_string(),
                event.code,
                event.status.to_string(),
                event.cause.map(|c| c.to_string()),
            ));
        }
    }
}
