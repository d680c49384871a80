// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 终端分发步骤
//!
//! 管道的最后一个阶段，负责把请求解析到具体的处理器并产出响应：
//! 1. 路径规范化：按挂载路径剥离前缀，空结果归一为 `/`；
//! 2. 路由解析：查询路由注册表，无匹配则抛出 `RouteNotFound`；
//! 3. 参数投射：把匹配到的参数桶与路由注册表写入请求属性；
//! 4. 处理器调用：函数直接调用，控制器动作先实例化再分发；
//! 5. 响应强制转换：没有产出响应时返回“无内容”响应。
//!
//! 第 2 步与第 4 步的失败不会重试，直接向外抛出。

use std::sync::Arc;

use log::debug;

use crate::{
    controller::Controllers,
    exception::Exception,
    handler::Handler,
    param::*,
    request::Request,
    response::Response,
    router::Router,
    util::dirname,
};

pub struct Dispatcher<'a> {
    router: &'a Arc<Router>,
    controllers: &'a Controllers,
}

impl<'a> Dispatcher<'a> {
    pub fn new(router: &'a Arc<Router>, controllers: &'a Controllers) -> Self {
        Self {
            router,
            controllers,
        }
    }

    pub fn dispatch(&self, request: Request) -> Result<Response, Exception> {
        let path = target_path(&request);
        let method = request.method();

        let matched = match self.router.match_route(&path, method) {
            Some(m) => m,
            None => {
                debug!("没有路由匹配 {} {}", method, path);
                return Err(Exception::RouteNotFound { path });
            }
        };
        debug!("{} {} 匹配到 {:?}", method, path, matched.handler);

        let request = request
            .with_attribute(ATTR_PARAMS, matched.params.clone())
            .with_attribute(ATTR_ROUTER, Arc::clone(self.router));

        let reply = match matched.handler {
            Handler::Function(function) => function(request)?,
            Handler::Action { controller, action } => {
                let mut instance = match self.controllers.instantiate(&controller, request) {
                    Some(instance) => instance,
                    None => return Err(Exception::HandlerUnavailable { controller }),
                };
                match instance.dispatch(&action, &matched.params.values()) {
                    Some(result) => result?,
                    None => return Err(Exception::ActionNotFound { controller, action }),
                }
            }
        };

        Ok(reply.unwrap_or_else(Response::no_content))
    }
}

/// 由 `SCRIPT_NAME` 推导的挂载路径；未挂载或挂载在根上时返回 `None`
pub fn mount_path(request: &Request) -> Option<&str> {
    let script_name = request.server_param(SCRIPT_NAME)?;
    match dirname(script_name) {
        "" | "/" | "\\" | "." => None,
        mount => Some(mount),
    }
}

/// 规范化后的路由目标路径。
///
/// 只剥离位于路径开头、且落在片段边界上的挂载前缀（按长度截取，而不是子串替换），
/// 因此路径中其他位置出现的挂载片段不会被破坏。
pub fn target_path(request: &Request) -> String {
    let path = request.path();
    let stripped = match mount_path(request) {
        Some(mount) if on_prefix_boundary(path, mount) => &path[mount.len()..],
        _ => path,
    };
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

fn on_prefix_boundary(path: &str, mount: &str) -> bool {
    path.starts_with(mount)
        && matches!(path.as_bytes().get(mount.len()), None | Some(b'/'))
}
