//! # 路由注册表
//!
//! 把（方法集合，路径模式）映射到处理器描述符，并在匹配时完成参数的类型转换。
//!
//! ## 模式语法
//! - 字面量片段：`/user/list`
//! - 无类型占位符：`{name}`，匹配一个 URL 安全的片段
//! - 带类型占位符：`{type:name}`，`type` 取值：
//!   - `int`：有符号整数，转换为 `ParamValue::Int`
//!   - `uint`：无符号整数，转换为 `ParamValue::Uint`
//!   - `float`：浮点数，转换为 `ParamValue::Float`
//!   - `utf8` / `string`：任意不含 `/` 的文本
//!   - `word`：单个单词（字母、数字、下划线）
//!
//! 匹配按注册顺序进行，第一个方法与路径都符合、且参数转换成功的路由胜出。

use log::{debug, trace};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::{
    exception::Exception,
    handler::{Handler, MatchResult, ParamValue, Params},
    param::HttpRequestMethod,
};

/// 无类型占位符允许的字符：RFC 3986 中的非保留字符与子分隔符
const UNTYPED_PATTERN: &str = r"[\w\-.~!$&'()*+,;=:@%]+";

/// 反向生成路径时保留原样的字符：RFC 3986 非保留字符
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamKind {
    Untyped,
    Int,
    Uint,
    Float,
    Utf8,
    Word,
}

impl ParamKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ParamKind::Int),
            "uint" => Some(ParamKind::Uint),
            "float" => Some(ParamKind::Float),
            "utf8" | "string" => Some(ParamKind::Utf8),
            "word" => Some(ParamKind::Word),
            _ => None,
        }
    }

    fn regex(&self) -> &'static str {
        match self {
            ParamKind::Untyped => UNTYPED_PATTERN,
            ParamKind::Int => r"-?\d+",
            ParamKind::Uint => r"\d+",
            ParamKind::Float => r"-?\d+(?:\.\d+)?",
            ParamKind::Utf8 => r"[^/]+",
            ParamKind::Word => r"\w+",
        }
    }

    /// 把捕获到的文本转换为带类型的值，数值溢出时返回 `None`（视为不匹配）
    fn convert(&self, raw: &str) -> Option<ParamValue> {
        match self {
            ParamKind::Int => raw.parse().ok().map(ParamValue::Int),
            ParamKind::Uint => raw.parse().ok().map(ParamValue::Uint),
            ParamKind::Float => raw.parse().ok().map(ParamValue::Float),
            ParamKind::Untyped | ParamKind::Utf8 | ParamKind::Word => {
                Some(ParamValue::Text(raw.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param {
        name: String,
        kind: ParamKind,
        /// 整段匹配单个参数值，用于反向生成时校验
        matcher: Regex,
    },
}

/// 一条已注册的路由
#[derive(Debug, Clone)]
pub struct Route {
    methods: Vec<HttpRequestMethod>,
    pattern: String,
    regex: Regex,
    segments: Vec<Segment>,
    handler: Handler,
    name: Option<String>,
}

impl Route {
    fn compile(
        methods: &[HttpRequestMethod],
        pattern: &str,
        handler: Handler,
    ) -> Result<Self, Exception> {
        let segments = parse_pattern(pattern)?;
        let mut source = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => source.push_str(&regex::escape(text)),
                Segment::Param { kind, .. } => {
                    source.push('(');
                    source.push_str(kind.regex());
                    source.push(')');
                }
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| Exception::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            methods: methods.to_vec(),
            pattern: pattern.to_string(),
            regex,
            segments,
            handler,
            name: None,
        })
    }

    /// 为路由命名，命名后可用于反向生成 URL
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn methods(&self) -> &[HttpRequestMethod] {
        &self.methods
    }

    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn matches(&self, path: &str, method: HttpRequestMethod) -> Option<Params> {
        if !self.methods.contains(&method) {
            return None;
        }
        let captures = self.regex.captures(path)?;
        let mut params = Params::new();
        let declared = self.segments.iter().filter_map(|segment| match segment {
            Segment::Param { name, kind, .. } => Some((name, kind)),
            Segment::Literal(_) => None,
        });
        for (index, (name, kind)) in declared.enumerate() {
            let raw = captures.get(index + 1)?.as_str();
            params.push(name, kind.convert(raw)?);
        }
        Some(params)
    }
}

/// 把模式拆分为字面量与占位符片段，并校验占位符语法
fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, Exception> {
    let invalid = |reason: &str| Exception::InvalidRoutePattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = vec![];
    let mut names: Vec<String> = vec![];
    let mut rest = pattern;
    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(invalid("unexpected '}'"));
        }
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let close = match rest[open..].find('}') {
            Some(offset) => open + offset,
            None => return Err(invalid("unclosed '{'")),
        };
        let inner = &rest[open + 1..close];
        if inner.contains('{') {
            return Err(invalid("nested '{'"));
        }
        let (kind, name) = match inner.split_once(':') {
            Some((type_name, name)) => match ParamKind::from_name(type_name) {
                Some(kind) => (kind, name),
                None => return Err(invalid(&format!("unknown parameter type '{}'", type_name))),
            },
            None => (ParamKind::Untyped, inner),
        };
        let valid_name = name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid_name {
            return Err(invalid(&format!("invalid parameter name '{}'", name)));
        }
        if names.iter().any(|n| n == name) {
            return Err(invalid(&format!("duplicate parameter name '{}'", name)));
        }
        names.push(name.to_string());
        let matcher = Regex::new(&format!("^(?:{})$", kind.regex()))
            .map_err(|e| invalid(&e.to_string()))?;
        segments.push(Segment::Param {
            name: name.to_string(),
            kind,
            matcher,
        });
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

/// 路由注册表
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为一组方法注册路由。模式无法编译时返回 `InvalidRoutePattern`。
    pub fn map(
        &mut self,
        methods: &[HttpRequestMethod],
        pattern: &str,
        handler: Handler,
    ) -> Result<&mut Route, Exception> {
        let route = Route::compile(methods, pattern, handler)?;
        debug!("注册路由：{:?} {} -> {:?}", methods, pattern, route.handler);
        self.routes.push(route);
        let index = self.routes.len() - 1;
        Ok(&mut self.routes[index])
    }

    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&[HttpRequestMethod::Get], pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&[HttpRequestMethod::Post], pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&[HttpRequestMethod::Put], pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&[HttpRequestMethod::Patch], pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&[HttpRequestMethod::Delete], pattern, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&[HttpRequestMethod::Options], pattern, handler)
    }

    /// 对所有方法注册同一路由
    pub fn any(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.map(&HttpRequestMethod::ALL, pattern, handler)
    }

    /// 按注册顺序查找第一个匹配的路由
    pub fn match_route(&self, path: &str, method: HttpRequestMethod) -> Option<MatchResult> {
        trace!("在{}条路由中匹配 {} {}", self.routes.len(), method, path);
        self.routes.iter().find_map(|route| {
            route.matches(path, method).map(|params| MatchResult {
                handler: route.handler.clone(),
                name: route.name.clone(),
                params,
            })
        })
    }

    /// 合并另一个注册表的全部路由，追加在已有路由之后
    pub fn merge(&mut self, other: Router) {
        debug!("合并{}条路由", other.routes.len());
        self.routes.extend(other.routes);
    }

    /// 以参数值反向生成命名路由的路径。
    ///
    /// 名称未知、缺少参数，或参数值不符合占位符类型时返回 `None`。
    /// 参数值按路径片段做百分号编码，生成的路径总能被同一条路由匹配。
    pub fn generate(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let route = self
            .routes
            .iter()
            .find(|route| route.name.as_deref() == Some(name))?;
        let mut path = String::new();
        for segment in &route.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param {
                    name,
                    kind,
                    matcher,
                } => {
                    let (_, value) = params.iter().find(|(key, _)| key == name)?;
                    if !matcher.is_match(value) || kind.convert(value).is_none() {
                        debug!("参数{}的值'{}'不符合类型{:?}", name, value, kind);
                        return None;
                    }
                    path.extend(utf8_percent_encode(value, PATH_SEGMENT));
                }
            }
        }
        Some(path)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
