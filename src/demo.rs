//! # 示例应用
//!
//! 宿主程序默认挂载的一组路由，演示函数处理器、控制器动作、类型化参数与命名路由。

use log::debug;
use serde_json::Value;

use crate::{
    application::Application,
    config::Config,
    controller::Controller,
    exception::Exception,
    handler::{Handler, HandlerResult, ParamValue},
    param::HttpRequestMethod,
    request::Request,
    response::Response,
    router::Router,
};

pub const EXAMPLE_CONTROLLER: &str = "ExampleController";

pub struct ExampleController {
    request: Request,
}

impl Controller for ExampleController {
    fn new(request: Request) -> Self {
        Self { request }
    }

    fn dispatch(&mut self, action: &str, args: &[ParamValue]) -> Option<HandlerResult> {
        let result = match action {
            "index" => Ok(self.index()),
            "hello" => {
                let firstname = args.first().map(ToString::to_string).unwrap_or_default();
                Ok(self.hello(&firstname))
            }
            "post_put" => self.post_put(),
            "float" => {
                let number = args.first().and_then(ParamValue::as_f64).unwrap_or_default();
                Ok(self.float(number))
            }
            _ => return None,
        };
        Some(result.map(Some))
    }

    fn request(&self) -> &Request {
        &self.request
    }
}

impl ExampleController {
    pub fn index(&self) -> Response {
        Response::html(format!("<br/>It works! [{}]<br/><br/>", EXAMPLE_CONTROLLER))
    }

    /// 问候，`lastname` 查询参数非空时附加在名字后面
    pub fn hello(&self, firstname: &str) -> Response {
        let mut user = firstname.to_string();
        if let Some(lastname) = self.query_param("lastname").filter(|l| !l.is_empty()) {
            user.push(' ');
            user.push_str(lastname);
        }
        Response::text(format!("Hello {}!", user))
    }

    pub fn post_put(&self) -> Result<Response, Exception> {
        let user = user_from_payload(self.parsed_body())?;
        Ok(self.hello(&user))
    }

    pub fn float(&self, number: f64) -> Response {
        Response::text(format!("float({})", number))
    }
}

fn user_from_payload(payload: &serde_json::Map<String, Value>) -> Result<String, Exception> {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    let firstname = text("firstname").ok_or_else(|| Exception::failure(400, "Invalid request!"))?;
    Ok(match text("lastname") {
        Some(lastname) => format!("{} {}", firstname, lastname),
        None => firstname.to_string(),
    })
}

/// 可单独合并进应用的示例路由表
pub fn example_router() -> Result<Router, Exception> {
    let mut router = Router::new();
    router
        .get("/hello/{utf8:firstname}", Handler::action(EXAMPLE_CONTROLLER, "hello"))?
        .name("hi");
    router.map(
        &[HttpRequestMethod::Post, HttpRequestMethod::Put],
        "/post-or-put",
        Handler::action(EXAMPLE_CONTROLLER, "post_put"),
    )?;
    router
        .any(
            "/echo/{singleword}",
            Handler::function(|req: Request| {
                let word = req
                    .params()
                    .and_then(|p| p.get("singleword"))
                    .map(ToString::to_string)
                    .unwrap_or_default();
                Ok(Response::html(format!("<br/>{}", word)))
            }),
        )?
        .name("echo");
    router
        .get("/float/{float:number}", Handler::action(EXAMPLE_CONTROLLER, "float"))?
        .name("float");
    router
        .get(
            "/sum/{int:a}/{uint:b}",
            Handler::function(|req: Request| {
                let params = req.params().cloned().unwrap_or_default();
                let a = params.get("a").and_then(ParamValue::as_i64).unwrap_or_default();
                let b = params.get("b").and_then(ParamValue::as_u64).unwrap_or_default();
                let sum = i128::from(a) + i128::from(b);
                debug!("sum: {} + {} = {}", a, b, sum);
                Ok(Response::text(format!("{} + {} = {}", a, b, sum)))
            }),
        )?
        .name("sum");
    Ok(router)
}

/// 按配置构建示例应用
pub fn example_application(config: &Config) -> Result<Application, Exception> {
    let mut app = Application::from_config(config)?;
    app.controller::<ExampleController>(EXAMPLE_CONTROLLER);

    app.any("/", Handler::controller(EXAMPLE_CONTROLLER))?;
    app.merge(example_router()?);

    app.get(
        "/home",
        Handler::function(|req: Request| Ok(ExampleController::new(req).index())),
    )?
    .name("home");
    app.get(
        "/hello/{string:firstname}/{lastname}",
        Handler::function(|req: Request| {
            let params = req.params().cloned().unwrap_or_default();
            let user = format!(
                "{} {}",
                params.get("firstname").map(ToString::to_string).unwrap_or_default(),
                params.get("lastname").map(ToString::to_string).unwrap_or_default()
            );
            Ok(ExampleController::new(req).hello(&user))
        }),
    )?
    .name("hello");
    app.post(
        "/hello/post",
        Handler::function(|req: Request| {
            let user = user_from_payload(req.parsed_body())?;
            Ok(ExampleController::new(req).hello(&user))
        }),
    )?;
    Ok(app)
}
