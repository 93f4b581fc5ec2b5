use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::{exception::Exception, handler::DescriptionPolicy};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_buffer_size")]
    buffer_size: usize,
    #[serde(default = "default_log_target")]
    log_target: String,
    #[serde(default)]
    describe_with_status_text: bool,
}

fn default_buffer_size() -> usize {
    1024
}

fn default_log_target() -> String {
    "responsewriter".to_string()
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 7878,
            worker_threads: 0,
            local: true,
            buffer_size: default_buffer_size(),
            log_target: default_log_target(),
            describe_with_status_text: false,
        }
    }

    /// 从 TOML 文件载入配置。
    ///
    /// 文件无法读取时返回错误；内容无法解析时记录错误并使用默认配置。
    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!("无法打开配置文件{}：{}", filename, e);
                return Err(Exception::ConfigUnreadable);
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}失败：{}", filename, e);
            return Err(Exception::ConfigUnreadable);
        }

        Ok(Self::from_toml_str(&str_val))
    }

    fn from_toml_str(str_val: &str) -> Self {
        let mut raw_config: Config = match toml::from_str(str_val) {
            Ok(t) => t,
            Err(_) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置");
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.buffer_size == 0 {
            warn!("buffer_size被设置为0，无法读取任何请求，因此该值将被改为1024。");
            raw_config.buffer_size = default_buffer_size();
        }
        raw_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    pub fn description_policy(&self) -> DescriptionPolicy {
        match self.describe_with_status_text {
            true => DescriptionPolicy::StatusText,
            false => DescriptionPolicy::Fixed,
        }
    }
}
