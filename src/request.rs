// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责将 TCP 流中读取的原始字节解析为强类型的 [`Request`]，
//! 并把请求与路由参数打包为业务回调接收的 [`Context`]。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 请求头（Headers）的提取，按名称大小写不敏感地查询。
//! 3. 请求体的原样保留。

use crate::{exception::Exception, param::*};
use log::error;

use std::{collections::HashMap, ops::Deref};

/// 表示一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// 请求的资源路径（包含查询字符串）
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 请求头，键统一为小写
    headers: HashMap<String, String>,
    /// 请求体
    body: String,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 迭代解析标头，直到遇到空行；空行之后的内容作为请求体。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        // 读缓冲区末尾的填充零不属于报文
        let end = buffer
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        let request_string = match std::str::from_utf8(&buffer[..end]) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let (head, body) = match request_string.split_once("\r\n\r\n") {
            Some((head, body)) => (head, body),
            None => (request_string, ""),
        };
        let mut request_lines = head.split(CRLF);

        // 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let first_line = request_lines.next().unwrap_or_default();
        let first_line_parts: Vec<&str> = first_line.split(' ').collect();

        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::UnSupportedRequestMethod);
        }

        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            "PUT" => HttpRequestMethod::Put,
            "PATCH" => HttpRequestMethod::Patch,
            "DELETE" => HttpRequestMethod::Delete,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let path = first_line_parts[1..first_line_parts.len() - 1].join(" ");

        let mut headers = HashMap::new();
        for line in request_lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        Ok(Self {
            method,
            path,
            version,
            headers,
            body: body.to_string(),
        })
    }

    /// 供测试和内部组装使用的构造函数
    pub fn new(method: HttpRequestMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            version: HttpVersion::V1_1,
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }
}

impl Request {
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取不含查询参数的路径
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 按名称查询请求头，名称大小写不敏感
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// 单个路由参数
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// 按路由模式中出现顺序排列的路由参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: &str) {
        self.0.push(Param {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// 第一个同名参数的值，不存在时返回空字符串
    pub fn by_name(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|p| p.key == name)
            .map_or("", |p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(key, value)| Param { key, value })
                .collect(),
        )
    }
}

/// 业务回调接收的请求上下文：原始请求加上路由参数。
#[derive(Debug, Clone)]
pub struct Context {
    pub request: Request,
    pub params: Params,
}

impl Context {
    pub fn new(request: Request, params: Params) -> Self {
        Self { request, params }
    }
}

impl Deref for Context {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path 和 Headers
    #[test]
    fn test_parse_get_request() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\nAccept: application/json\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.path(), "/");
        assert_eq!(request.user_agent(), "Test-Browser");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("host"), Some("localhost:7878"));
    }

    /// 读缓冲区末尾的零字节会被忽略
    #[test]
    fn test_parse_zero_padded_buffer() {
        let mut buffer = b"GET /a HTTP/1.1\r\nAccept: text/plain\r\n\r\n".to_vec();
        buffer.resize(1024, 0);

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.header("accept"), Some("text/plain"));
        assert_eq!(request.body(), "");
    }

    #[test]
    fn test_parse_post_request_body() {
        let request_str =
            "POST /submit HTTP/1.1\r\nHost: localhost:7878\r\nContent-Length: 10\r\n\r\ntest=value";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Post);
        assert_eq!(request.path(), "/submit");
        assert_eq!(request.body(), "test=value");
    }

    /// 确保不支持的 HTTP 方法会返回错误
    #[test]
    fn test_unsupported_method() {
        let buffer = b"TRACE /resource HTTP/1.1\r\nHost: localhost:7878\r\n\r\n".to_vec();

        let result = Request::try_from(&buffer, 0);

        assert_eq!(result.unwrap_err(), Exception::UnSupportedRequestMethod);
    }

    /// 确保不支持的版本（如 HTTP/2.0）被正确拒绝
    #[test]
    fn test_unsupported_http_version() {
        let buffer = b"GET / HTTP/2.0\r\nHost: localhost:7878\r\n\r\n".to_vec();

        let result = Request::try_from(&buffer, 0);

        assert_eq!(result.unwrap_err(), Exception::UnsupportedHttpVersion);
    }

    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];

        let result = Request::try_from(&buffer, 0);

        assert_eq!(result.unwrap_err(), Exception::RequestIsNotUtf8);
    }

    #[test]
    fn test_malformed_request_line() {
        let result = Request::try_from(b"GET\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::UnSupportedRequestMethod);
    }

    #[test]
    fn test_route_path_strips_query() {
        let request = Request::new(HttpRequestMethod::Get, "/page?id=123&name=test");
        assert_eq!(request.path(), "/page?id=123&name=test");
        assert_eq!(request.route_path(), "/page");
    }

    #[test]
    fn test_new_request_context() {
        let request = Request::new(HttpRequestMethod::Delete, "/users/7");
        let params: Params = vec![("testparam".to_string(), "testvalue".to_string())]
            .into_iter()
            .collect();

        let context = Context::new(request, params);

        assert_eq!(context.method(), HttpRequestMethod::Delete);
        assert_eq!(context.params.by_name("testparam"), "testvalue");
        assert_eq!(context.params.by_name("missing"), "");
        assert_eq!(context.params.len(), 1);
    }
}
