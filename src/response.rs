use bytes::{Bytes, BytesMut};
use chrono::prelude::*;
use log::warn;

use std::io;

use crate::{dispatcher::Transport, param::*, util::status_text};

/// 缓冲式的 HTTP/1.1 传输层：先记录状态行、头部和正文，再一次性序列化为报文。
#[derive(Debug, Clone)]
pub struct HttpResponse {
    version: HttpVersion,
    status_code: Option<i32>,
    headers: Vec<(String, String)>,
    date: DateTime<Utc>,
    server_name: String,
    content: Option<BytesMut>,
    headonly: bool,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: None,
            headers: Vec::new(),
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            content: None,
            headonly: false,
        }
    }

    /// HEAD 请求只写出头部，`Content-Length` 仍按正文长度计算
    pub fn head() -> Self {
        Self {
            headonly: true,
            ..Self::new()
        }
    }

    /// 尚未写状态行时按 `200` 处理
    pub fn status_code(&self) -> i32 {
        self.status_code.unwrap_or(200)
    }

    pub fn information(&self) -> &'static str {
        status_text(self.status_code())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn content(&self) -> Option<Bytes> {
        self.content.as_ref().map(|c| c.clone().freeze())
    }

    pub fn content_length(&self) -> usize {
        self.content.as_ref().map_or(0, |c| c.len())
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let status_code = self.status_code();
        let mut header = format!(
            "{} {} {}{}",
            self.version,
            status_code,
            status_text(status_code),
            CRLF
        );
        for (key, value) in &self.headers {
            header.push_str(&[key.as_str(), ": ", value.as_str(), CRLF].concat());
        }
        if !is_informational(status_code) && status_code != 204 {
            header.push_str(&["Content-Length: ", &self.content_length().to_string(), CRLF].concat());
        }
        header.push_str(&["Date: ", &format_date(&self.date), CRLF].concat());
        header.push_str(&["Server: ", &self.server_name, CRLF].concat());
        header.push_str(CRLF);

        let body: &[u8] = match (&self.content, self.headonly || !allows_body(status_code)) {
            (Some(c), false) => &c[..],
            _ => b"",
        };
        [header.as_bytes(), body].concat()
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpResponse {
    fn set_header(&mut self, key: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((key.to_string(), value.to_string())),
        }
    }

    fn write_status(&mut self, code: i32) {
        match self.status_code {
            Some(previous) => warn!("状态行已写出（{}），忽略重复的状态码{}", previous, code),
            None => self.status_code = Some(code),
        }
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        let status_code = *self.status_code.get_or_insert(200);
        if !body.is_empty() && !allows_body(status_code) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("状态码{}的响应不允许携带正文", status_code),
            ));
        }
        self.content
            .get_or_insert_with(BytesMut::new)
            .extend_from_slice(body);
        Ok(body.len())
    }
}

fn is_informational(code: i32) -> bool {
    (100..200).contains(&code)
}

/// 1xx、204 和 304 响应不能携带正文
fn allows_body(code: i32) -> bool {
    !is_informational(code) && code != 204 && code != 304
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
