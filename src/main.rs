// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 一次性宿主程序
//!
//! 以 CGI 的方式运行：从标准输入读取一个完整的 HTTP 请求报文，
//! 交给示例应用处理，再把响应报文写到标准输出，然后退出。
//! 日志只写到标准错误，不会污染响应。

use std::{
    io::{self, Read, Write},
    process::ExitCode,
};

use chrono::Utc;
use log::{error, info, warn, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};

use webapp::{config::Config, demo, sink::ExceptionHandler, Request, Response};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const APP_CONFIG: &str = "config/development.toml";

fn main() -> ExitCode {
    // 1. 日志系统：优先使用外部 YAML 配置，缺失时退回到标准错误输出
    init_logger();

    // 2. 应用配置
    let config = match Config::from_toml(APP_CONFIG) {
        Ok(config) => {
            info!("配置文件已载入");
            config
        }
        Err(e) => {
            warn!("{}，使用默认配置", e);
            Config::new()
        }
    };

    // 3. 构建应用并安装默认异常处理器
    let mut app = match demo::example_application(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("无法构建应用：{}", e);
            return ExitCode::FAILURE;
        }
    };
    app.attach(ExceptionHandler::new(config.development()));
    info!("应用已就绪，共{}条路由", app.router().len());

    // 4. 读取请求
    let mut buffer = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut buffer) {
        error!("无法读取请求：{}", e);
        return ExitCode::FAILURE;
    }
    let id = Utc::now().timestamp_micros().unsigned_abs() as u128;

    // 5. 处理
    let response = match Request::try_from(&buffer, id) {
        Ok(request) => {
            let request = config
                .server_params()
                .iter()
                .fold(request, |request, (name, value)| {
                    request.with_server_param(name, value)
                });
            info!("[ID{}]{} {}", id, request.method(), request.uri());
            app.run(request)
        }
        Err(e) => Response::from_status_code(e.code(), Some(&e.to_string())),
    };
    info!("[ID{}]响应 {} {}", id, response.status_code(), response.information());

    // 6. 写出响应
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout
        .write_all(&response.as_bytes())
        .and_then(|_| stdout.flush())
    {
        error!("[ID{}]无法写出响应：{}", id, e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_logger() {
    let e = match log4rs::init_file(LOG_CONFIG, Default::default()) {
        Ok(()) => return,
        Err(e) => e,
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if log4rs::init_config(config).is_ok() {
                warn!("无法读取日志配置{}：{}，使用标准错误输出", LOG_CONFIG, e);
            }
        }
        Err(e) => eprintln!("无法初始化日志：{}", e),
    }
}
