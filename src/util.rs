use log::Level;

use crate::param::{STATUS_CODES, UNKNOWN_ERROR};

/// 根据状态码决定日志级别。
///
/// 非法状态码（小于 200 或不小于 600）落入最低的 `Trace` 级别。
pub fn severity(code: i32) -> Level {
    match code {
        200..=299 => Level::Debug,
        300..=399 => Level::Info,
        400..=499 => Level::Warn,
        500..=599 => Level::Error,
        _ => Level::Trace,
    }
}

/// 查询状态码的标准原因短语，未登记的状态码返回 `None`。
pub fn reason(code: i32) -> Option<&'static str> {
    u16::try_from(code)
        .ok()
        .and_then(|c| STATUS_CODES.get(&c))
        .copied()
}

/// 状态码对应的可读文本，未知状态码统一为 `"Unknown error"`。
pub fn status_text(code: i32) -> &'static str {
    reason(code).unwrap_or(UNKNOWN_ERROR)
}
