//! # 控制器
//!
//! 控制器动作型处理器以字符串标识引用控制器。标识在注册表中查找对应的工厂，
//! 工厂以（已注入路由参数的）请求为输入构造控制器实例，每个请求一个实例。

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use serde_json::{Map, Value};

use crate::{
    handler::{HandlerResult, ParamValue, Params},
    request::Request,
};

/// 控制器能力：由请求构造，并按名称分发动作。
///
/// `dispatch` 在控制器上不存在该动作时返回 `None`，
/// 路由参数按模式中声明的顺序作为位置参数传入。
/// 其余方法是对所持请求的便捷访问。
pub trait Controller: Send {
    fn new(request: Request) -> Self
    where
        Self: Sized;

    fn dispatch(&mut self, action: &str, args: &[ParamValue]) -> Option<HandlerResult>;

    fn request(&self) -> &Request;

    fn parsed_body(&self) -> &Map<String, Value> {
        self.request().parsed_body()
    }

    fn query_params(&self) -> &HashMap<String, String> {
        self.request().query_params()
    }

    fn query_param(&self, name: &str) -> Option<&str> {
        self.request().query_param(name)
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.request().attribute_names()
    }

    /// 读取请求属性，不存在或类型不符时返回 `default`
    fn attribute_or<'a, T: Any + Send + Sync>(&'a self, name: &str, default: &'a T) -> &'a T
    where
        Self: Sized,
    {
        self.request().attribute::<T>(name).unwrap_or(default)
    }

    /// 匹配到的路由参数
    fn param(&self, name: &str) -> Option<&ParamValue> {
        self.request().params().and_then(|params| params.get(name))
    }

    fn params(&self) -> Option<&Params> {
        self.request().params()
    }
}

type ControllerFactory = Arc<dyn Fn(Request) -> Box<dyn Controller> + Send + Sync>;

/// 控制器标识到工厂的映射
#[derive(Clone, Default)]
pub struct Controllers {
    factories: HashMap<String, ControllerFactory>,
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以标识注册控制器类型，同名注册会覆盖旧值
    pub fn register<C: Controller + 'static>(&mut self, identifier: &str) {
        let factory: ControllerFactory =
            Arc::new(|request: Request| -> Box<dyn Controller> { Box::new(C::new(request)) });
        self.factories.insert(identifier.to_string(), factory);
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// 以请求实例化控制器，标识无法解析时返回 `None`
    pub fn instantiate(&self, identifier: &str, request: Request) -> Option<Box<dyn Controller>> {
        self.factories.get(identifier).map(|factory| factory(request))
    }

    /// 合并另一组控制器注册，同名标识以 `other` 为准
    pub fn extend(&mut self, other: Controllers) {
        self.factories.extend(other.factories);
    }
}

impl fmt::Debug for Controllers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identifiers: Vec<&String> = self.factories.keys().collect();
        identifiers.sort();
        f.debug_struct("Controllers")
            .field("identifiers", &identifiers)
            .finish()
    }
}
