// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模块
//!
//! 把 `(方法, 路径模式)` 映射到分发器。路径模式支持两种参数：
//! - `:name`：匹配一个路径段；
//! - `*name`：匹配剩余的全部路径，只能出现在末尾。
//!
//! 模式在启动时编译为正则表达式，非法模式是启动阶段的致命错误。
//! 未命中的请求由路由自身以 JSON 错误正文应答：路径存在但方法不符为 `405`，否则为 `404`。

use log::{debug, error};
use regex::Regex;

use std::sync::Arc;

use crate::{
    dispatcher::{transmit, Dispatcher, Transport},
    envelope::Json,
    exception::Exception,
    param::HttpRequestMethod,
    request::{Context, Params, Request},
    sink::{LogSink, Sink},
};

struct Route {
    method: HttpRequestMethod,
    pattern: String,
    regex: Regex,
    names: Vec<String>,
    dispatcher: Dispatcher,
}

pub struct Router {
    routes: Vec<Route>,
    sink: Arc<dyn Sink>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            sink: Arc::new(LogSink::default()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn handle(
        &mut self,
        method: HttpRequestMethod,
        pattern: &str,
        dispatcher: Dispatcher,
    ) -> Result<&mut Self, Exception> {
        let (regex, names) = compile(pattern)?;
        debug!("注册路由：{} {}", method, pattern);
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            regex,
            names,
            dispatcher,
        });
        Ok(self)
    }

    pub fn get(&mut self, pattern: &str, dispatcher: Dispatcher) -> Result<&mut Self, Exception> {
        self.handle(HttpRequestMethod::Get, pattern, dispatcher)
    }

    pub fn post(&mut self, pattern: &str, dispatcher: Dispatcher) -> Result<&mut Self, Exception> {
        self.handle(HttpRequestMethod::Post, pattern, dispatcher)
    }

    /// 已注册的路由，按注册顺序排列
    pub fn routes(&self) -> Vec<(HttpRequestMethod, &str)> {
        self.routes
            .iter()
            .map(|r| (r.method, r.pattern.as_str()))
            .collect()
    }

    /// 按注册顺序查找第一个匹配的路由。
    ///
    /// HEAD 请求在没有专门路由时回退到 GET 路由。
    pub fn lookup(
        &self,
        method: HttpRequestMethod,
        path: &str,
    ) -> Result<(&Dispatcher, Params), Exception> {
        let mut path_matched = false;
        for route in &self.routes {
            let Some(captures) = route.regex.captures(path) else {
                continue;
            };
            path_matched = true;
            if route.method != method {
                continue;
            }
            let params = route
                .names
                .iter()
                .zip(captures.iter().skip(1))
                .map(|(name, value)| {
                    (
                        name.clone(),
                        value.map_or(String::new(), |m| m.as_str().to_string()),
                    )
                })
                .collect();
            return Ok((&route.dispatcher, params));
        }

        if method == HttpRequestMethod::Head {
            return self.lookup(HttpRequestMethod::Get, path);
        }

        match path_matched {
            true => Err(Exception::UnSupportedRequestMethod),
            false => Err(Exception::RouteNotFound),
        }
    }

    /// 路由并处理一个请求，返回实际写出的状态码。
    pub fn serve(&self, request: Request, transport: &mut dyn Transport) -> i32 {
        match self.lookup(request.method(), request.route_path()) {
            Ok((dispatcher, params)) => dispatcher.dispatch(&Context::new(request, params), transport),
            Err(Exception::UnSupportedRequestMethod) => {
                transmit(&Json::error(405, None, None), transport, self.sink.as_ref())
            }
            Err(_) => transmit(&Json::error(404, None, None), transport, self.sink.as_ref()),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Result<(Regex, Vec<String>), Exception> {
    if !pattern.starts_with('/') {
        error!("路由模式必须以/开头：{}", pattern);
        return Err(Exception::InvalidRoute);
    }

    let segments: Vec<&str> = pattern[1..].split('/').collect();
    let mut names = Vec::new();
    let mut parts = Vec::with_capacity(segments.len());

    for (index, segment) in segments.iter().enumerate() {
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                error!("路由参数缺少名称：{}", pattern);
                return Err(Exception::InvalidRoute);
            }
            names.push(name.to_string());
            parts.push("([^/]+)".to_string());
        } else if let Some(name) = segment.strip_prefix('*') {
            if name.is_empty() || index != segments.len() - 1 {
                error!("通配参数必须具名且位于末尾：{}", pattern);
                return Err(Exception::InvalidRoute);
            }
            names.push(name.to_string());
            parts.push("(.*)".to_string());
        } else {
            parts.push(regex::escape(segment));
        }
    }

    let source = format!("^/{}$", parts.join("/"));
    match Regex::new(&source) {
        Ok(regex) => Ok((regex, names)),
        Err(e) => {
            error!("无法编译路由模式{}：{}", pattern, e);
            Err(Exception::InvalidRoute)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler::JsonType, reply::Reply, response::HttpResponse};
    use crate::dispatcher::response_handler;

    fn echo(name: &'static str) -> Dispatcher {
        response_handler(
            move |context: &Context| Reply::from(format!("{}:{}", name, context.params.by_name("id"))),
            JsonType::new(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_compile_rejects_bad_patterns() {
        assert!(compile("users").is_err());
        assert!(compile("/users/:").is_err());
        assert!(compile("/files/*/tail").is_err());
        assert!(compile("/files/*path/tail").is_err());
    }

    #[test]
    fn test_compile_escapes_literals() {
        let (regex, names) = compile("/v1.0/:id").unwrap();
        assert!(regex.is_match("/v1.0/7"));
        assert!(!regex.is_match("/v1x0/7"));
        assert_eq!(names, vec!["id".to_string()]);
    }

    #[test]
    fn test_lookup_params() {
        let mut router = Router::new();
        router.get("/users/:id", echo("user")).unwrap();
        router.get("/files/*path", echo("file")).unwrap();

        let (_, params) = router.lookup(HttpRequestMethod::Get, "/users/42").unwrap();
        assert_eq!(params.by_name("id"), "42");

        let (_, params) = router
            .lookup(HttpRequestMethod::Get, "/files/a/b/c.txt")
            .unwrap();
        assert_eq!(params.by_name("path"), "a/b/c.txt");
    }

    #[test]
    fn test_lookup_misses() {
        let mut router = Router::new();
        router.get("/users/:id", echo("user")).unwrap();

        assert_eq!(
            router.lookup(HttpRequestMethod::Get, "/nothing").err(),
            Some(Exception::RouteNotFound)
        );
        assert_eq!(
            router.lookup(HttpRequestMethod::Post, "/users/1").err(),
            Some(Exception::UnSupportedRequestMethod)
        );
        assert!(router.lookup(HttpRequestMethod::Head, "/users/1").is_ok());
    }

    #[test]
    fn test_serve_matched_route() {
        let mut router = Router::new();
        router.get("/users/:id", echo("user")).unwrap();

        let mut response = HttpResponse::new();
        let code = router.serve(Request::new(HttpRequestMethod::Get, "/users/9?x=1"), &mut response);

        assert_eq!(code, 200);
        assert_eq!(response.content().unwrap(), "user:9".as_bytes());
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_serve_not_found_and_not_allowed() {
        let mut router = Router::new();
        router.get("/users/:id", echo("user")).unwrap();

        let mut response = HttpResponse::new();
        assert_eq!(router.serve(Request::new(HttpRequestMethod::Get, "/x"), &mut response), 404);
        assert_eq!(
            response.content().unwrap(),
            r#"{"code":404,"description":"Not Found"}"#.as_bytes()
        );

        let mut response = HttpResponse::new();
        assert_eq!(
            router.serve(Request::new(HttpRequestMethod::Delete, "/users/1"), &mut response),
            405
        );
    }

    #[test]
    fn test_routes_in_registration_order() {
        let mut router = Router::new();
        router
            .get("/a", echo("a"))
            .unwrap()
            .post("/b", echo("b"))
            .unwrap();
        assert_eq!(
            router.routes(),
            vec![(HttpRequestMethod::Get, "/a"), (HttpRequestMethod::Post, "/b")]
        );
    }
}
