//! # 处理器描述符
//!
//! 路由注册表持有的处理器描述符是一个封闭的标签联合：
//! - `Function`：接收请求的普通函数或闭包，自身不持有每请求状态；
//! - `Action`：控制器标识 + 动作名，每个请求都会重新实例化控制器。
//!
//! 描述符在匹配时一次性确定形态，分发器只需对枚举做一次 `match`。

use std::{fmt, sync::Arc};

use crate::{exception::Exception, request::Request, response::Response};

/// 处理器的执行结果：`None` 表示没有产出响应，分发器会将其强制转换为“无内容”响应。
pub type HandlerResult = Result<Option<Response>, Exception>;

/// 函数式处理器
pub type HandlerFn = Arc<dyn Fn(Request) -> HandlerResult + Send + Sync>;

/// 处理器返回值到“可选响应”的转换。
///
/// 只有 `Response` 会被原样保留，其他返回值一律视为“没有响应”。
pub trait IntoReply {
    fn into_reply(self) -> Option<Response>;
}

impl IntoReply for Response {
    fn into_reply(self) -> Option<Response> {
        Some(self)
    }
}

impl IntoReply for Option<Response> {
    fn into_reply(self) -> Option<Response> {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Option<Response> {
        None
    }
}

#[derive(Clone)]
pub enum Handler {
    Function(HandlerFn),
    Action { controller: String, action: String },
}

impl Handler {
    /// 把闭包包装成函数式处理器，闭包可以返回 `Response`、`Option<Response>` 或 `()`。
    pub fn function<F, R>(f: F) -> Self
    where
        F: Fn(Request) -> Result<R, Exception> + Send + Sync + 'static,
        R: IntoReply,
    {
        Handler::Function(Arc::new(move |request| f(request).map(IntoReply::into_reply)))
    }

    pub fn action(controller: &str, action: &str) -> Self {
        Handler::Action {
            controller: controller.to_string(),
            action: action.to_string(),
        }
    }

    /// 只给出控制器标识时，动作默认为 `index`
    pub fn controller(controller: &str) -> Self {
        Self::action(controller, "index")
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Function(_) => write!(f, "Function(..)"),
            Handler::Action { controller, action } => write!(f, "Action({}::{})", controller, action),
        }
    }
}

/// 按路由模式声明的类型转换后的参数值
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 整数视图，`Uint` 超出 `i64` 范围时返回 `None`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Uint(v) => Some(*v),
            ParamValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Uint(v) => Some(*v as f64),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Uint(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// 路由参数桶：保持路由模式中声明的顺序，作为控制器动作的位置参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: ParamValue) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// 按声明顺序排列的参数值
    pub fn values(&self) -> Vec<ParamValue> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 一次匹配的结果，由分发器立即消费
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub handler: Handler,
    pub name: Option<String>,
    pub params: Params,
}
