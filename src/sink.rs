// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异常处理器
//!
//! 管道内部从不捕获异常。未被任何拦截器恢复的异常在进程边界
//! （`Application::run`）交给这里安装的异常处理器，由它写出最终的错误响应。
//!
//! 处理器是进程级的单例：后安装的覆盖先安装的。

use std::{
    backtrace::Backtrace,
    sync::{Arc, RwLock},
};

use lazy_static::lazy_static;
use log::{error, warn};

use crate::{
    exception::Exception,
    param::reason_phrase,
    request::Request,
    response::Response,
    util::{escape_html, HtmlBuilder},
};

/// 最后一道异常处理
#[cfg_attr(test, mockall::automock)]
pub trait ExceptionSink: Send + Sync {
    fn exception(&self, failure: &Exception, output: &mut Output);
}

/// 尚未关闭的响应通道
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    status: u16,
    headers_sent: bool,
    body: String,
    host: String,
}

impl Output {
    pub fn new(host: &str) -> Self {
        Self {
            status: 500,
            headers_sent: false,
            body: String::new(),
            host: host.to_string(),
        }
    }

    /// 根据请求的 `HTTPS`、`SERVER_PORT`、`HTTP_HOST` 服务器参数计算主机链接
    pub fn for_request(request: &Request) -> Self {
        Self::new(&host_link(request))
    }

    /// 设置状态码，响应头已经发出时不做任何事并返回 `false`
    pub fn set_status(&mut self, code: u16) -> bool {
        if self.headers_sent {
            warn!("响应头已发出，忽略状态码 {}", code);
            return false;
        }
        self.status = code;
        true
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn mark_headers_sent(&mut self) {
        self.headers_sent = true;
    }

    pub fn write(&mut self, text: &str) {
        self.body.push_str(text);
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn into_response(self) -> Response {
        Response::html(self.body).with_status(self.status)
    }
}

fn host_link(request: &Request) -> String {
    let https = match request.server_param("HTTPS") {
        Some(value) => !value.is_empty() && !value.eq_ignore_ascii_case("off"),
        None => false,
    } || request.server_param("SERVER_PORT") == Some("443");
    let scheme = if https { "https" } else { "http" };

    let host = request
        .server_param("HTTP_HOST")
        .or_else(|| request.header("Host"))
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

/// 默认异常处理器：写出一个简单的 HTML 错误页面。
///
/// 开发模式下会在页面末尾附加异常的调试输出与调用栈。
#[derive(Debug, Clone, Default)]
pub struct ExceptionHandler {
    development: bool,
}

impl ExceptionHandler {
    pub fn new(development: bool) -> Self {
        Self { development }
    }

    pub fn development(&self) -> bool {
        self.development
    }
}

impl ExceptionSink for ExceptionHandler {
    fn exception(&self, failure: &Exception, output: &mut Output) {
        let code = failure.code();
        let message = failure.to_string();
        let title = match code {
            0 => failure.kind().to_string(),
            code => format!("{} {}", failure.kind(), code),
        };

        if reason_phrase(code).is_some() && !output.headers_sent() {
            output.set_status(code);
        }
        error!("{}: {}", title, message);

        let host = escape_html(output.host());
        let body = format!(
            r#"
            <h1>{}</h1>
            <p>{}</p>
            <p><a href="{}">{}</a></p>
            "#,
            escape_html(&title),
            escape_html(&message),
            host,
            host
        );
        let mut page = HtmlBuilder::new(&title, body);
        if self.development {
            let trace = format!("{:#?}\n\n{}", failure, Backtrace::force_capture());
            page = page.append(&format!("<hr><pre>{}</pre>", escape_html(&trace)));
        }
        output.write(&page.build());
    }
}

lazy_static! {
    static ref INSTALLED: RwLock<Option<Arc<dyn ExceptionSink>>> = RwLock::new(None);
}

/// 安装进程级异常处理器，返回此前安装的处理器
pub fn install(sink: Arc<dyn ExceptionSink>) -> Option<Arc<dyn ExceptionSink>> {
    let mut slot = match INSTALLED.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.replace(sink)
}

/// 当前安装的处理器
pub fn current() -> Option<Arc<dyn ExceptionSink>> {
    let slot = match INSTALLED.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.clone()
}

/// 卸载处理器
pub fn reset() -> Option<Arc<dyn ExceptionSink>> {
    let mut slot = match INSTALLED.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.take()
}

#[cfg(test)]
lazy_static! {
    static ref TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}

/// 串行化会触碰进程级处理器的单元测试
#[cfg(test)]
pub(crate) fn serial() -> std::sync::MutexGuard<'static, ()> {
    match TEST_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
