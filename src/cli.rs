//! 命令行参数定义（clap derive）

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_CONFIG_FILE: &str = "lutim.json";

/// 上传图片到 Lutim 并输出访问链接
#[derive(Debug, Parser)]
#[command(name = "lutim-upload")]
#[command(version)]
#[command(about = "上传图片到 Lutim 并输出访问链接", long_about = None)]
pub struct Cli {
    /// 要上传的图片文件
    pub image: PathBuf,

    /// 配置文件路径（不存在时使用默认配置）
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}
