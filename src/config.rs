use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::exception::Exception;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// 入口脚本路径，其所在目录即挂载路径
    #[serde(default = "default_script_name")]
    script_name: String,
    #[serde(default)]
    development: bool,
    /// 按顺序挂载的内置拦截器名称
    #[serde(default)]
    interceptors: Vec<String>,
    #[serde(default)]
    https: bool,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

fn default_script_name() -> String {
    "/index.php".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    7878
}

impl Config {
    pub fn new() -> Self {
        Self {
            script_name: default_script_name(),
            development: false,
            interceptors: vec![],
            https: false,
            host: default_host(),
            port: default_port(),
        }
    }

    /// 从 TOML 文件读取配置。
    ///
    /// 文件无法读取时返回 `ConfigUnreadable`；内容无法解析时记录错误并使用默认配置。
    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let unreadable = |e: std::io::Error| Exception::ConfigUnreadable {
            path: filename.to_string(),
            reason: e.to_string(),
        };
        let mut file = File::open(filename).map_err(unreadable)?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val).map_err(unreadable)?;

        let raw_config = match toml::from_str::<Config>(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.port == 0 {
            warn!("port被设置为0，传递给请求的 SERVER_PORT 将没有意义");
        }
        Ok(raw_config)
    }

    /// 交给每个请求的服务器参数
    pub fn server_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("SCRIPT_NAME", self.script_name.clone()),
            ("HTTP_HOST", self.host.clone()),
            ("SERVER_PORT", self.port.to_string()),
        ];
        if self.https {
            params.push(("HTTPS", "on".to_string()));
        }
        params
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn development(&self) -> bool {
        self.development
    }

    pub fn interceptors(&self) -> &[String] {
        &self.interceptors
    }

    pub fn https(&self) -> bool {
        self.https
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
