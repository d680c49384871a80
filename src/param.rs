// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了请求分发核心遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - HTTP 方法、版本及编码格式的强类型枚举。
//! - 分发器向请求注入上下文时使用的保留属性名。

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "webapp";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 路由参数桶在请求属性中的保留键名
pub const ATTR_PARAMS: &str = "params";

/// 路由注册表实例在请求属性中的保留键名
pub const ATTR_ROUTER: &str = "router";

/// 挂载路径信号所在的服务器参数名
pub const SCRIPT_NAME: &str = "SCRIPT_NAME";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    /// 异常处理器仅在错误码出现在此表中时才会改写响应状态。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        // 1xx: 信息响应 (Informational)
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        // 2xx: 成功响应 (Successful)
        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(203, "Non-Authoritative Information");
        map.insert(204, "No Content");
        map.insert(205, "Reset Content");
        map.insert(206, "Partial Content");

        // 3xx: 重定向 (Redirection)
        map.insert(300, "Multiple Choices");
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(303, "See Other");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        // 4xx: 客户端错误 (Client Error)
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(402, "Payment Required");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(410, "Gone");
        map.insert(411, "Length Required");
        map.insert(412, "Precondition Failed");
        map.insert(413, "Content Too Large");
        map.insert(414, "URI Too Long");
        map.insert(415, "Unsupported Media Type");
        map.insert(418, "I'm a teapot");
        map.insert(422, "Unprocessable Content");
        map.insert(429, "Too Many Requests");

        // 5xx: 服务端错误 (Server Error)
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

/// 查询状态码对应的原因短语，未知状态码返回 `None`。
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    STATUS_CODES.get(&code).copied()
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    /// HTTP/1.0 版本（CGI 网关常见）
    V1_0,
    /// HTTP/1.1 版本
    V1_1,
}

/// 标准 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 获取资源的元数据（不包含响应体）
    Head,
    /// 提交数据或执行操作
    Post,
    /// 替换资源
    Put,
    /// 局部修改资源
    Patch,
    /// 删除资源
    Delete,
    /// 查询服务器支持的选项
    Options,
}

impl HttpRequestMethod {
    /// 路由注册 `any` 时使用的完整方法集合
    pub const ALL: [HttpRequestMethod; 7] = [
        HttpRequestMethod::Get,
        HttpRequestMethod::Head,
        HttpRequestMethod::Post,
        HttpRequestMethod::Put,
        HttpRequestMethod::Patch,
        HttpRequestMethod::Delete,
        HttpRequestMethod::Options,
    ];

    /// 按大小写敏感的方式解析方法名（RFC 9110 §9.1），无法识别时返回 `None`。
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(HttpRequestMethod::Get),
            "HEAD" => Some(HttpRequestMethod::Head),
            "POST" => Some(HttpRequestMethod::Post),
            "PUT" => Some(HttpRequestMethod::Put),
            "PATCH" => Some(HttpRequestMethod::Patch),
            "DELETE" => Some(HttpRequestMethod::Delete),
            "OPTIONS" => Some(HttpRequestMethod::Options),
            _ => None,
        }
    }
}

/// 支持的内容编码（压缩）格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpEncoding {
    /// GNU zip 压缩
    Gzip,
    /// zlib 压缩
    Deflate,
    /// Brotli 压缩
    Br,
}

impl HttpEncoding {
    /// q 值相同时的服务端偏好顺序
    pub const PREFERENCE: [HttpEncoding; 3] =
        [HttpEncoding::Gzip, HttpEncoding::Deflate, HttpEncoding::Br];

    /// 解析 `Accept-Encoding` 中的编码名，`identity` 与未知编码返回 `None`
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Some(HttpEncoding::Gzip),
            "deflate" => Some(HttpEncoding::Deflate),
            "br" => Some(HttpEncoding::Br),
            _ => None,
        }
    }

    fn rank(self) -> usize {
        match self {
            HttpEncoding::Gzip => 0,
            HttpEncoding::Deflate => 1,
            HttpEncoding::Br => 2,
        }
    }

    /// 按 q 值从高到低排序，q 值相同时按 `PREFERENCE` 排序
    pub fn sort_by_quality(encodings: &mut [(HttpEncoding, f32)]) {
        encodings.sort_by(|(a, qa), (b, qb)| {
            qb.partial_cmp(qa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.rank().cmp(&b.rank()))
        });
    }
}

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "1.0"),
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Post => write!(f, "POST"),
            HttpRequestMethod::Put => write!(f, "PUT"),
            HttpRequestMethod::Patch => write!(f, "PATCH"),
            HttpRequestMethod::Delete => write!(f, "DELETE"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
        }
    }
}

impl fmt::Display for HttpEncoding {
    /// 将枚举格式化为 `Content-Encoding` 头所使用的标识符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
            HttpEncoding::Deflate => write!(f, "deflate"),
            HttpEncoding::Br => write!(f, "br"),
        }
    }
}
