// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应模块
//!
//! `Response` 与 `Request` 一样是不可变值：`with_*` 系列方法消费旧值并返回新值。
//! 当处理器没有返回响应时，分发器使用 `Response::no_content()` 作为规范的默认响应。

use bytes::Bytes;
use chrono::prelude::*;
use log::warn;
use serde_json::Value;

use crate::{headers::Headers, param::*, util::HtmlBuilder};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    headers: Headers,
    content: Option<Bytes>,
}

impl Response {
    /// 200 OK，无响应体
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            headers: Headers::new(),
            content: None,
        }
    }

    /// 规范的“无内容”响应（204），处理器未产出响应时的默认值
    pub fn no_content() -> Self {
        Self::new().with_status(204)
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self::new()
            .with_header("Content-Type", "text/html;charset=utf-8")
            .with_body(html.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new()
            .with_header("Content-Type", "text/plain;charset=utf-8")
            .with_body(text.into())
    }

    pub fn json(value: &Value) -> Self {
        Self::new()
            .with_header("Content-Type", "application/json")
            .with_body(value.to_string())
    }

    /// 以状态码生成一个简单的 HTML 状态页面
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        Self::html(HtmlBuilder::from_status_code(code, note).build()).with_status(code)
    }

    /// 设置状态码及其原因短语。未登记的状态码使用通用短语。
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = code;
        self.information = match reason_phrase(code) {
            Some(phrase) => phrase.to_string(),
            None => {
                warn!("未登记的状态码：{}", code);
                "Unknown Status".to_string()
            }
        };
        self
    }

    /// 设置响应头，字段名大小写不敏感，同名字段会被替换
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.content = if body.is_empty() { None } else { Some(body) };
        self
    }

    /// 序列化为 HTTP/1.1 报文，`Date` 头取序列化时刻
    pub fn as_bytes(&self) -> Vec<u8> {
        let version = match self.version {
            HttpVersion::V1_0 => "HTTP/1.0",
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let mut header = format!(
            "{} {} {}{}",
            version, self.status_code, self.information, CRLF
        );
        for (name, value) in self.headers.iter() {
            header.push_str(&[name, ": ", value, CRLF].concat());
        }
        header.push_str(&format!("Content-Length: {}{}", self.content_length(), CRLF));
        header.push_str(&format!("Date: {}{}", format_date(&Utc::now()), CRLF));
        header.push_str(&format!("Server: {}{}", SERVER_NAME, CRLF));
        header.push_str(CRLF);

        [header.as_bytes(), self.body()].concat()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        match &self.content {
            Some(c) => c,
            None => b"",
        }
    }

    pub fn content_length(&self) -> usize {
        self.body().len()
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_date(&date), "Mon, 1 Jan 2024 00:00:00 +0000");
    }

    #[test]
    fn test_response_new() {
        let response = Response::new();

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.information(), "OK");
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_no_content() {
        let response = Response::no_content();
        assert_eq!(response.status_code(), 204);
        assert_eq!(response.information(), "No Content");
        assert_eq!(response.content_length(), 0);
    }

    #[test]
    fn test_response_as_bytes_basic() {
        let bytes = Response::new().as_bytes();
        let response_str = String::from_utf8_lossy(&bytes);

        assert!(response_str.starts_with("HTTP/1.1 200 OK"));
        assert!(response_str.contains("Content-Length: 0"));
        assert!(response_str.contains("Server: webapp"));
        assert!(response_str.contains("Date: "));
        assert!(response_str.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_as_bytes_with_content() {
        let bytes = Response::text("Hello").as_bytes();
        let response_str = String::from_utf8_lossy(&bytes);

        assert!(response_str.contains("Content-Type: text/plain;charset=utf-8"));
        assert!(response_str.contains("Content-Length: 5"));
        assert!(response_str.ends_with("Hello"));
    }

    #[test]
    fn test_response_status_code_various() {
        for (code, expected_info) in [
            (200, "OK"),
            (201, "Created"),
            (204, "No Content"),
            (301, "Moved Permanently"),
            (400, "Bad Request"),
            (401, "Unauthorized"),
            (404, "Not Found"),
            (500, "Internal Server Error"),
            (501, "Not Implemented"),
        ] {
            let response = Response::new().with_status(code);
            assert_eq!(response.status_code(), code);
            assert_eq!(response.information(), expected_info);
        }
    }

    #[test]
    fn test_unknown_status_code() {
        let response = Response::new().with_status(799);
        assert_eq!(response.status_code(), 799);
        assert_eq!(response.information(), "Unknown Status");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let response = Response::new().with_header("end_time", "1.0");
        assert_eq!(response.header("END_TIME"), Some("1.0"));
    }

    #[test]
    fn test_with_header_leaves_original_untouched() {
        let original = Response::new();
        let modified = original.clone().with_header("X-Test", "1");
        assert!(original.header("X-Test").is_none());
        assert_eq!(modified.header("x-test"), Some("1"));
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(&json!({"id": 123}));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"id":123}"#);
    }

    #[test]
    fn test_from_status_code_page() {
        let response = Response::from_status_code(404, None);
        let body = String::from_utf8_lossy(response.body());
        assert_eq!(response.status_code(), 404);
        assert!(body.contains("Not Found"));
        assert!(body.contains("<!DOCTYPE html>"));
    }
}
