// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 应用程序
//!
//! `Application` 是对外的注册面与请求入口：
//! - `attach` 挂载组件：拦截器进入队列，路由表被合并，异常处理器被安装为进程级单例；
//! - `get`、`post` 等方法直接转发给内部的路由注册表；
//! - `handle` 为每个请求新建一个管道执行器，以分发器作为终端步骤；
//! - `run` 是进程边界，把未恢复的异常（包括 panic）交给异常处理器。

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::{error, info};

use crate::{
    config::Config,
    controller::{Controller, Controllers},
    dispatcher::Dispatcher,
    exception::Exception,
    handler::Handler,
    interceptors::{Compression, Stopwatch},
    param::{reason_phrase, HttpRequestMethod},
    pipeline::{Interceptor, Next, Runner},
    request::Request,
    response::Response,
    router::{Route, Router},
    sink::{self, ExceptionHandler, ExceptionSink, Output},
};

/// 可挂载到应用上的组件
#[derive(Clone)]
pub enum Component {
    Interceptor(Arc<dyn Interceptor>),
    Router(Router),
    ExceptionSink(Arc<dyn ExceptionSink>),
}

impl Component {
    pub fn interceptor<I: Interceptor + 'static>(interceptor: I) -> Self {
        Component::Interceptor(Arc::new(interceptor))
    }

    pub fn sink<S: ExceptionSink + 'static>(sink: S) -> Self {
        Component::ExceptionSink(Arc::new(sink))
    }

    /// 按配置中的名称构造内置组件，无法识别的名称返回 `InvalidComponent`
    pub fn named(name: &str, config: &Config) -> Result<Self, Exception> {
        match name {
            "stopwatch" => Ok(Self::interceptor(Stopwatch)),
            "compression" => Ok(Self::interceptor(Compression)),
            "exception_handler" => Ok(Self::sink(ExceptionHandler::new(config.development()))),
            _ => Err(Exception::InvalidComponent(name.to_string())),
        }
    }
}

impl From<Router> for Component {
    fn from(router: Router) -> Self {
        Component::Router(router)
    }
}

impl From<Arc<dyn Interceptor>> for Component {
    fn from(interceptor: Arc<dyn Interceptor>) -> Self {
        Component::Interceptor(interceptor)
    }
}

impl From<Arc<dyn ExceptionSink>> for Component {
    fn from(sink: Arc<dyn ExceptionSink>) -> Self {
        Component::ExceptionSink(sink)
    }
}

impl From<Stopwatch> for Component {
    fn from(interceptor: Stopwatch) -> Self {
        Self::interceptor(interceptor)
    }
}

impl From<Compression> for Component {
    fn from(interceptor: Compression) -> Self {
        Self::interceptor(interceptor)
    }
}

impl From<ExceptionHandler> for Component {
    fn from(handler: ExceptionHandler) -> Self {
        Self::sink(handler)
    }
}

#[derive(Clone, Default)]
pub struct Application {
    router: Arc<Router>,
    controllers: Controllers,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置挂载内置组件
    pub fn from_config(config: &Config) -> Result<Self, Exception> {
        let mut application = Self::new();
        for name in config.interceptors() {
            application.attach(Component::named(name, config)?);
        }
        Ok(application)
    }

    /// 挂载组件。拦截器按挂载顺序执行 before 部分，逆序执行 after 部分。
    pub fn attach(&mut self, component: impl Into<Component>) -> &mut Self {
        match component.into() {
            Component::Interceptor(interceptor) => {
                self.interceptors.push(interceptor);
            }
            Component::Router(router) => {
                info!("合并路由表，新增{}条路由", router.len());
                self.router_mut().merge(router);
            }
            Component::ExceptionSink(handler) => {
                if sink::install(handler).is_some() {
                    info!("异常处理器已被替换");
                }
            }
        }
        self
    }

    /// 按名称挂载内置组件
    pub fn attach_named(&mut self, name: &str, config: &Config) -> Result<&mut Self, Exception> {
        let component = Component::named(name, config)?;
        Ok(self.attach(component))
    }

    /// 以标识注册控制器类型，供 `Handler::action` 引用
    pub fn controller<C: Controller + 'static>(&mut self, identifier: &str) -> &mut Self {
        self.controllers.register::<C>(identifier);
        self
    }

    fn router_mut(&mut self) -> &mut Router {
        Arc::make_mut(&mut self.router)
    }

    pub fn map(
        &mut self,
        methods: &[HttpRequestMethod],
        pattern: &str,
        handler: Handler,
    ) -> Result<&mut Route, Exception> {
        self.router_mut().map(methods, pattern, handler)
    }

    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().get(pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().post(pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().put(pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().patch(pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().delete(pattern, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().options(pattern, handler)
    }

    pub fn any(&mut self, pattern: &str, handler: Handler) -> Result<&mut Route, Exception> {
        self.router_mut().any(pattern, handler)
    }

    pub fn merge(&mut self, router: Router) -> &mut Self {
        self.router_mut().merge(router);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn controllers(&self) -> &Controllers {
        &self.controllers
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// 让请求穿过整个管道。每次调用都有独立的执行器与游标，异常原样返回。
    pub fn handle(&self, request: Request) -> Result<Response, Exception> {
        let dispatcher = Dispatcher::new(&self.router, &self.controllers);
        let terminal = |request: Request| dispatcher.dispatch(request);
        let mut runner = Runner::new(&self.interceptors, &terminal);
        runner.handle(request)
    }

    /// 进程边界：总是产出一个响应。
    ///
    /// 未恢复的异常与管道中的 panic 交给已安装的异常处理器；
    /// 没有安装处理器时记录日志并返回状态页面。
    pub fn run(&self, request: Request) -> Response {
        let mut output = Output::for_request(&request);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.handle(request)))
            .unwrap_or_else(|payload| Err(Exception::Panic(panic_message(&*payload))));

        let failure = match result {
            Ok(response) => return response,
            Err(failure) => failure,
        };
        match sink::current() {
            Some(handler) => {
                handler.exception(&failure, &mut output);
                output.into_response()
            }
            None => {
                error!("{}: {}", failure.kind(), failure);
                let code = match reason_phrase(failure.code()) {
                    Some(_) => failure.code(),
                    None => 500,
                };
                Response::from_status_code(code, None)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
