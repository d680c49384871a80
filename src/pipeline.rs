// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 洋葱模型请求管道
//!
//! 管道由一组有序的拦截器和一个终端分发步骤组成，按嵌套（洋葱）顺序执行：
//!
//! ```text
//! A-before -> B-before -> C-before -> 终端 -> C-after -> B-after -> A-after
//! ```
//!
//! `Runner` 持有一个只前进、不回退的游标。每当某个阶段调用 `next.handle`，
//! 游标前进一格并执行该位置上的阶段：拦截器收到 `(request, runner)`，
//! 终端步骤只收到 `(request)`。某个拦截器若不调用 `next`，其后的所有阶段
//! （包括终端分发）都会被跳过，这就是短路（例如鉴权拒绝）的机制。
//!
//! 管道不做任何隐式捕获，任一阶段返回的 `Err` 会原样传给上一层的 `next` 调用者。

use std::sync::Arc;

use log::trace;

use crate::{exception::Exception, request::Request, response::Response};

/// “下一个处理者”能力，拦截器通过它把请求交给管道的剩余部分
pub trait Next {
    fn handle(&mut self, request: Request) -> Result<Response, Exception>;
}

/// 拦截器：可以检查或替换请求，决定继续还是短路，并检查或替换响应。
pub trait Interceptor: Send + Sync {
    fn process(&self, request: Request, next: &mut dyn Next) -> Result<Response, Exception>;
}

/// 闭包形式的拦截器
impl<F> Interceptor for F
where
    F: Fn(Request, &mut dyn Next) -> Result<Response, Exception> + Send + Sync,
{
    fn process(&self, request: Request, next: &mut dyn Next) -> Result<Response, Exception> {
        self(request, next)
    }
}

/// 把闭包包装为拦截器。直接传入闭包时参数类型可以被推断。
pub fn from_fn<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(Request, &mut dyn Next) -> Result<Response, Exception> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 终端步骤：只接收请求
pub type Terminal<'a> = dyn Fn(Request) -> Result<Response, Exception> + 'a;

/// 单次请求的管道执行器，每次顶层 `handle` 都会新建一个实例。
pub struct Runner<'a> {
    queue: &'a [Arc<dyn Interceptor>],
    terminal: &'a Terminal<'a>,
    cursor: usize,
}

impl<'a> Runner<'a> {
    pub fn new(queue: &'a [Arc<dyn Interceptor>], terminal: &'a Terminal<'a>) -> Self {
        Self {
            queue,
            terminal,
            cursor: 0,
        }
    }

    /// 已经被调度过的阶段数
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 调度游标处的下一个阶段，调用方无需引入 `Next`
    pub fn handle(&mut self, request: Request) -> Result<Response, Exception> {
        Next::handle(self, request)
    }
}

impl Next for Runner<'_> {
    fn handle(&mut self, request: Request) -> Result<Response, Exception> {
        let position = self.cursor;
        self.cursor += 1;

        let queue = self.queue;
        match queue.get(position) {
            Some(interceptor) => {
                trace!("执行第{}个拦截器", position);
                interceptor.process(request, self)
            }
            None if position == queue.len() => {
                trace!("执行终端分发");
                (self.terminal)(request)
            }
            None => Err(Exception::PipelineExhausted),
        }
    }
}
