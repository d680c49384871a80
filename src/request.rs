// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模块
//!
//! `Request` 是一个不可变的值对象：每一次“修改”都会消费旧值并返回一个新值，
//! 不存在通过共享引用的原地修改。它在一次 `handle` 调用中按值穿过整个管道，
//! 拦截器可以通过属性覆盖（`with_attribute`）把上下文传递给下游。
//!
//! 该模块同时包含宿主适配器使用的原始报文解析器：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. HTTP 标头（Headers）的提取。
//! 3. 根据 `Content-Type` 解析请求体（JSON 或 URL 编码表单）。

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use log::{error, warn};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::{
    exception::Exception,
    handler::Params,
    headers::Headers,
    param::*,
    router::Router,
};

/// 请求属性值：引用计数的任意类型，复制请求时只增加引用计数。
type AttributeValue = Arc<dyn Any + Send + Sync>;

/// 表示一次完整的 HTTP 请求。
#[derive(Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 原始请求目标（包含查询字符串）
    uri: String,
    /// 解码后的路径部分（不含查询字符串）
    path: String,
    /// 查询参数
    query: HashMap<String, String>,
    /// 请求头
    headers: Headers,
    /// 由宿主适配器解析出的请求体
    parsed_body: Map<String, Value>,
    /// 服务器/环境参数，如 `SCRIPT_NAME`、`HTTP_HOST`
    server_params: HashMap<String, String>,
    /// 请求属性（路由参数、路由注册表以及拦截器附加的上下文）
    attributes: HashMap<String, AttributeValue>,
}

impl Request {
    /// 以方法和请求目标构造请求，路径会被百分号解码，查询字符串会被拆分为参数。
    pub fn new(method: HttpRequestMethod, uri: &str) -> Self {
        let (raw_path, raw_query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        let path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();
        let query = url::form_urlencoded::parse(raw_query.as_bytes())
            .into_owned()
            .collect();

        Self {
            method,
            version: HttpVersion::V1_1,
            uri: uri.to_string(),
            path,
            query,
            headers: Headers::new(),
            parsed_body: Map::new(),
            server_params: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、请求目标和协议版本。
    /// 3. 迭代解析标头，直到遇到空行。
    /// 4. 解析请求体：根据 `Content-Type` 识别 JSON 与表单。
    ///
    /// # 参数
    /// * `buffer` - 宿主读取到的原始报文。
    /// * `id` - 请求 ID，用于追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        // 1. 将字节流转换为字符串，失败则判定为非法的 HTTP 请求
        let request_string = match std::str::from_utf8(buffer) {
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
        let mut lines = head.split(CRLF);

        // 2. 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let request_line = lines.next().unwrap_or_default();
        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequest);
        }

        let method = match HttpRequestMethod::parse(parts[0]) {
            Some(m) => m,
            None => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, parts[0]);
                return Err(Exception::UnsupportedRequestMethod);
            }
        };

        let version_str = parts[parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格（虽然不规范），通过 join 尝试恢复
        let target = parts[1..parts.len() - 1].join(" ");

        let mut request = Self::new(method, &target);
        request.version = version;

        // 3. 迭代各行解析 Headers
        for line in lines {
            match line.split_once(':') {
                Some((name, value)) => request.headers.insert(name.trim(), value.trim()),
                None => warn!("[ID{}]忽略无法解析的请求头：{}", id, line),
            }
        }

        // 4. 解析请求体
        if !body.is_empty() {
            let content_type = request
                .header("content-type")
                .unwrap_or_default()
                .to_string();
            request.parsed_body = parse_body(&content_type, body, id);
        }

        Ok(request)
    }
}

/// 按 `Content-Type` 把请求体解析为键值映射，无法识别的格式得到空映射。
fn parse_body(content_type: &str, body: &str, id: u128) -> Map<String, Value> {
    if content_type.contains("application/json") {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("[ID{}]JSON请求体不是对象，忽略", id);
                Map::new()
            }
            Err(e) => {
                warn!("[ID{}]JSON请求体解析失败：{}", id, e);
                Map::new()
            }
        }
    } else if content_type.contains("application/x-www-form-urlencoded") {
        url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    } else {
        Map::new()
    }
}

// --- 写时复制（copy-on-write）的修改器 ---

impl Request {
    /// 返回带有新属性的请求，同名属性会被覆盖
    pub fn with_attribute<T: Any + Send + Sync>(mut self, name: &str, value: T) -> Self {
        self.attributes.insert(name.to_string(), Arc::new(value));
        self
    }

    /// 返回移除了指定属性的请求
    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_server_param(mut self, name: &str, value: &str) -> Self {
        self.server_params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_parsed_body(mut self, body: Map<String, Value>) -> Self {
        self.parsed_body = body;
        self
    }
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取 HTTP 协议版本
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取原始请求目标（含查询字符串）
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 获取解码后的请求路径
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    /// 获取客户端可接受的压缩算法，按 q 值从高到低排列。
    ///
    /// `q=0` 表示明确拒绝，不会出现在结果中；`*` 代表其余未列出的编码。
    /// `identity` 与未知编码被忽略。
    pub fn accept_encoding(&self) -> Vec<HttpEncoding> {
        let header = match self.header("accept-encoding") {
            Some(header) => header,
            None => return vec![],
        };
        let mut listed: Vec<(HttpEncoding, f32)> = vec![];
        let mut wildcard = None;
        for item in header.split(',') {
            let mut parts = item.split(';');
            let token = parts.next().unwrap_or_default().trim();
            if token.is_empty() {
                continue;
            }
            let quality = parts
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
                .map(|(_, value)| value.trim().parse::<f32>().unwrap_or(0.0))
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            if token == "*" {
                wildcard.get_or_insert(quality);
                continue;
            }
            if let Some(encoding) = HttpEncoding::from_token(token) {
                if !listed.iter().any(|(e, _)| *e == encoding) {
                    listed.push((encoding, quality));
                }
            }
        }
        if let Some(quality) = wildcard {
            for encoding in HttpEncoding::PREFERENCE {
                if !listed.iter().any(|(e, _)| *e == encoding) {
                    listed.push((encoding, quality));
                }
            }
        }
        listed.retain(|(_, quality)| *quality > 0.0);
        HttpEncoding::sort_by_quality(&mut listed);
        listed.into_iter().map(|(encoding, _)| encoding).collect()
    }

    /// POST/PUT/JSON 解析后的请求体，没有请求体时为空映射
    pub fn parsed_body(&self) -> &Map<String, Value> {
        &self.parsed_body
    }

    pub fn server_params(&self) -> &HashMap<String, String> {
        &self.server_params
    }

    pub fn server_param(&self, name: &str) -> Option<&str> {
        self.server_params.get(name).map(String::as_str)
    }

    /// 按类型读取属性，属性不存在或类型不符时返回 `None`
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.attributes
            .get(name)
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// 所有属性名（顺序不保证）
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    /// 分发器注入的路由参数桶
    pub fn params(&self) -> Option<&Params> {
        self.attribute::<Params>(ATTR_PARAMS)
    }

    /// 分发器注入的路由注册表
    pub fn router(&self) -> Option<&Arc<Router>> {
        self.attribute::<Arc<Router>>(ATTR_ROUTER)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes = self.attribute_names();
        attributes.sort_unstable();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("version", &self.version)
            .field("uri", &self.uri)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("parsed_body", &self.parsed_body)
            .field("server_params", &self.server_params)
            .field("attributes", &attributes)
            .finish()
    }
}
