// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了响应写出器在启动配置与请求解析阶段可能出现的各类异常情况。
//!
//! ## 分类
//! - **配置异常**：首选类型处理器缺失、接受类型为空、路由模式非法、配置文件不可读。
//!   这类异常只会在启动阶段出现，必须中止服务器启动。
//! - **请求异常**：请求字节流无法解析、方法或协议版本不受支持、路由未命中。
//!
//! 单个请求的转换、渲染和写出失败不会以 `Exception` 的形式出现，它们会被折叠为默认错误响应。

use std::fmt;

/// 启动配置或请求解析过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了服务器暂不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 没有任何路由与请求的方法和路径匹配。对应 `404 Not Found`。
    RouteNotFound,
    /// 构建类型注册表时没有指定首选类型处理器。
    MissingPreferredType,
    /// 首选类型处理器声明的接受类型为空字符串。
    EmptyAcceptedType,
    /// 路由模式无法编译为合法的匹配规则。
    InvalidRoute,
    /// 配置文件不存在或无法读取。
    ConfigUnreadable,
}

use Exception::*;

impl Exception {
    /// 是否属于启动阶段的致命配置异常。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MissingPreferredType | EmptyAcceptedType | InvalidRoute | ConfigUnreadable
        )
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            RouteNotFound => write!(f, "No route matched (404)"),
            MissingPreferredType => write!(f, "Invalid response type given for response handler"),
            EmptyAcceptedType => write!(f, "Invalid accepted response type given"),
            InvalidRoute => write!(f, "Invalid route pattern"),
            ConfigUnreadable => write!(f, "Configuration file can't be read"),
        }
    }
}

impl std::error::Error for Exception {}
