// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了请求分发核心在配置阶段与请求处理生命周期中可能抛出的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了路由解析错误、处理器解析错误、配置错误以及任意业务失败。
//! - **语义映射**：每个变体都携带一个机器可读的错误码（`code`），多数与 HTTP 状态码一致，
//!   便于最终的异常处理器将其转化为对应的响应状态。
//! - **不做捕获**：管道本身从不吞掉异常，所有变体都沿调用链原样向外传播。

use std::fmt;

/// 请求分发过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 没有任何路由与规范化后的路径及请求方法匹配。对应 `404 Not Found`。
    RouteNotFound { path: String },
    /// 控制器标识无法解析为已注册的控制器。对应 `501 Not Implemented`。
    HandlerUnavailable { controller: String },
    /// 控制器实例上不存在指定的动作。对应 `501 Not Implemented`。
    ActionNotFound { controller: String, action: String },
    /// 注册了无法识别的组件（配置阶段错误，与请求无关）。
    InvalidComponent(String),
    /// 路由模式无法编译（未知的参数类型、括号不匹配或参数重名）。
    InvalidRoutePattern { pattern: String, reason: String },
    /// 某个阶段在终端分发完成后再次调用了 `next`。
    PipelineExhausted,
    /// 路由处理器或拦截器主动抛出的任意失败，错误码由抛出方决定（0 表示无码）。
    Failure { code: u16, message: String },
    /// 管道执行过程中发生 panic，在进程边界被转换为异常。
    Panic(String),
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求报文缺少请求行或请求行格式不正确。
    MalformedRequest,
    /// 客户端使用了无法识别的 HTTP 方法。
    UnsupportedRequestMethod,
    /// 客户端使用了不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 配置文件无法读取。
    ConfigUnreadable { path: String, reason: String },
}

use Exception::*;

impl Exception {
    /// 以错误码与消息构造一个任意失败，供处理器与拦截器使用。
    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Failure {
            code,
            message: message.into(),
        }
    }

    /// 机器可读的错误码。
    ///
    /// 路由与处理器相关的变体与 HTTP 状态码一致；配置阶段的错误没有对应状态，返回 0。
    pub fn code(&self) -> u16 {
        match self {
            RouteNotFound { .. } => 404,
            HandlerUnavailable { .. } | ActionNotFound { .. } => 501,
            InvalidComponent(_) | InvalidRoutePattern { .. } | ConfigUnreadable { .. } => 0,
            PipelineExhausted | Panic(_) => 500,
            Failure { code, .. } => *code,
            RequestIsNotUtf8 | MalformedRequest | UnsupportedRequestMethod
            | UnsupportedHttpVersion => 400,
        }
    }

    /// 异常的类型名，用作错误页面标题与日志前缀。
    pub fn kind(&self) -> &'static str {
        match self {
            RouteNotFound { .. } => "RouteNotFound",
            HandlerUnavailable { .. } => "HandlerUnavailable",
            ActionNotFound { .. } => "ActionNotFound",
            InvalidComponent(_) => "InvalidComponent",
            InvalidRoutePattern { .. } => "InvalidRoutePattern",
            PipelineExhausted => "PipelineExhausted",
            Failure { .. } => "Failure",
            Panic(_) => "Panic",
            RequestIsNotUtf8 => "RequestIsNotUtf8",
            MalformedRequest => "MalformedRequest",
            UnsupportedRequestMethod => "UnsupportedRequestMethod",
            UnsupportedHttpVersion => "UnsupportedHttpVersion",
            ConfigUnreadable { .. } => "ConfigUnreadable",
        }
    }
}

/// 为 `Exception` 实现 `Display` 特性，输出人类可读的错误消息。
///
/// 该文本会出现在日志以及最终异常处理器生成的错误页面中。
impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteNotFound { path } => write!(f, "Unknown route pattern [{}]", path),
            HandlerUnavailable { controller } => write!(f, "{} is not available", controller),
            ActionNotFound { controller, action } => {
                write!(f, "Action named {} is not part of {}", action, controller)
            }
            InvalidComponent(name) => write!(f, "Unrecognized component [{}]", name),
            InvalidRoutePattern { pattern, reason } => {
                write!(f, "Invalid route pattern [{}]: {}", pattern, reason)
            }
            PipelineExhausted => write!(f, "Request pipeline has no stage left to run"),
            Failure { message, .. } => write!(f, "{}", message),
            Panic(message) => write!(f, "Panicked while handling request: {}", message),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed request line"),
            UnsupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            ConfigUnreadable { path, reason } => {
                write!(f, "Couldn't read config file {}: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_carries_path() {
        let e = RouteNotFound {
            path: "/missing".to_string(),
        };
        assert_eq!(e.code(), 404);
        assert!(e.to_string().contains("/missing"));
    }

    #[test]
    fn test_handler_errors_are_501() {
        let unavailable = HandlerUnavailable {
            controller: "MyController".to_string(),
        };
        let missing = ActionNotFound {
            controller: "MyController".to_string(),
            action: "show".to_string(),
        };
        assert_eq!(unavailable.code(), 501);
        assert_eq!(missing.code(), 501);
        assert_eq!(unavailable.to_string(), "MyController is not available");
    }

    #[test]
    fn test_failure_keeps_code_and_message() {
        let e = Exception::failure(401, "Unauthorized");
        assert_eq!(e.code(), 401);
        assert_eq!(e.kind(), "Failure");
        assert_eq!(e.to_string(), "Unauthorized");
    }

    #[test]
    fn test_configuration_errors_have_no_code() {
        assert_eq!(InvalidComponent("gzip2".to_string()).code(), 0);
    }
}
