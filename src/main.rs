// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容协商演示服务器
//!
//! 基于 Tokio 运行时的多线程服务器，用几条演示路由展示回调返回值如何被协商、转换并写出：
//! - `GET /health`：纯文本
//! - `GET /users/:id`：映射，或参数非法时的错误正文
//! - `GET /teapot`：仅状态码
//! - `GET /files/*path`：列表
//! - `POST /echo`：原样返回请求体
//! - `GET /limited`：携带状态码的错误值

use responsewriter::{
    response_handler, transmit, Cause, Config, Context, Dispatcher, ErrorDescriptor, Exception,
    HttpRequestMethod, HttpResponse, Json, JsonType, LogSink, Payload, Reply, Request, Router, Sink,
};

use log::{debug, error, info};
use serde_json::Value;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    runtime::Builder,
};

use std::{
    collections::BTreeMap,
    fmt, io,
    net::{Ipv4Addr, SocketAddrV4},
    process,
    sync::Arc,
    time::Instant,
};

/// 超出访问频率限制
#[derive(Debug)]
struct RateLimited;

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limit exceeded")
    }
}

impl std::error::Error for RateLimited {}

impl Payload for RateLimited {
    fn as_error(self: Arc<Self>) -> Option<Cause> {
        Some(self)
    }

    fn code(&self) -> Option<i32> {
        Some(429)
    }
}

fn main() {
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    let config = match Config::from_toml("config/development.toml") {
        Ok(config) => config,
        Err(e) => fatal(e),
    };
    info!("配置文件已载入");

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            process::exit(1);
        }
    };

    let router = match build_router(&config) {
        Ok(router) => Arc::new(router),
        Err(e) => fatal(e),
    };
    for (method, pattern) in router.routes() {
        info!("路由：{} {}", method, pattern);
    }

    runtime.block_on(serve(config, router));
}

fn fatal(e: Exception) -> ! {
    error!("启动失败：{}", e);
    process::exit(1);
}

fn build_router(config: &Config) -> Result<Router, Exception> {
    let sink: Arc<dyn Sink> = Arc::new(LogSink::new(config.log_target()));
    let json = JsonType::new()
        .with_policy(config.description_policy())
        .with_sink(Arc::clone(&sink));

    let route = |handler: fn(&Context) -> Reply| -> Result<Dispatcher, Exception> {
        Ok(response_handler(handler, json.clone(), vec![])?.with_sink(Arc::clone(&sink)))
    };

    let mut router = Router::new().with_sink(Arc::clone(&sink));
    router
        .get("/health", route(health)?)?
        .get("/users/:id", route(user)?)?
        .get("/teapot", route(|_| Reply::from(418i32))?)?
        .get("/files/*path", route(files)?)?
        .post("/echo", route(|context| Reply::from(context.body().to_string()))?)?
        .get("/limited", route(|_| Reply::payload(RateLimited))?)?;
    Ok(router)
}

fn health(_: &Context) -> Reply {
    Reply::from("ok")
}

fn user(context: &Context) -> Reply {
    match context.params.by_name("id").parse::<u32>() {
        Ok(id) => {
            let mut user = BTreeMap::new();
            user.insert("id", Value::from(id));
            user.insert("name", Value::from(format!("user-{}", id)));
            Reply::map(user)
        }
        Err(e) => Reply::from(ErrorDescriptor::new(
            400,
            Some(Value::from("invalid user id")),
            Some(Arc::new(e)),
        )),
    }
}

fn files(context: &Context) -> Reply {
    let segments: Vec<String> = context
        .params
        .by_name("path")
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Reply::list(segments)
}

async fn serve(config: Config, router: Arc<Router>) {
    let port: u16 = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let socket = SocketAddrV4::new(address, port);

    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            process::exit(1);
        }
    };
    info!("端口{}绑定完成", port);

    let buffer_size = config.buffer_size();
    let mut id: u128 = 0;

    loop {
        let (mut stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("接受连接失败：{}", e);
                continue;
            }
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let router = Arc::clone(&router);
        tokio::spawn(async move {
            handle_connection(&mut stream, id, &router, buffer_size).await;
        });
        id += 1;
    }
}

/// 读取一次请求数据，返回读取的字节数；连接关闭或出错时返回 `None`。
///
/// 可读通知可能是虚假的，`WouldBlock` 时重新等待。
async fn read_request(stream: &TcpStream, buffer: &mut [u8], id: u128) -> Option<usize> {
    loop {
        if let Err(e) = stream.readable().await {
            error!("[ID{}]等待TCPStream可读时遇到错误: {}", id, e);
            return None;
        }

        match stream.try_read(buffer) {
            Ok(0) => return None,
            Ok(n) => return Some(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => {
                error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                return None;
            }
        }
    }
}

/// 读取并解析一个请求，经路由处理后把缓冲的响应一次性写回。
async fn handle_connection(stream: &mut TcpStream, id: u128, router: &Router, buffer_size: usize) {
    let mut buffer = vec![0; buffer_size];

    if read_request(stream, &mut buffer, id).await.is_none() {
        return;
    }
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();

    let (request, response) = match Request::try_from(&buffer, id) {
        Ok(request) => {
            let mut response = match request.method() {
                HttpRequestMethod::Head => HttpResponse::head(),
                _ => HttpResponse::new(),
            };
            let summary = (
                request.version().to_string(),
                request.path().to_string(),
                request.method(),
                request.user_agent().to_string(),
            );
            router.serve(request, &mut response);
            (Some(summary), response)
        }
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {}", id, e);
            let mut response = HttpResponse::new();
            transmit(
                &Json::error(400, None, None),
                &mut response,
                &LogSink::default(),
            );
            (None, response)
        }
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    if let Some((version, path, method, user_agent)) = request {
        info!(
            "[ID{}] {}, {}, {}, {}, {}, {}, ",
            id,
            version,
            path,
            method,
            response.status_code(),
            response.information(),
            user_agent,
        );
    }

    let response_bytes = response.as_bytes();
    debug!("[ID{}]发送响应，长度: {}", id, response_bytes.len());
    if let Err(e) = stream.write_all(&response_bytes).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}
