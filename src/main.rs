//! # Lutim 上传工具：命令行入口
//!
//! 仅做参数解析与装配：读取配置、打开历史数据库、上传图片文件并输出链接。
//! 业务逻辑全部在库中，详见 `lib.rs` 架构文档。
//!
//! 用法：`lutim-upload <图片路径> [--config <配置文件>]`

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use lutim_uploader::capture::{CaptureDetails, FileSurface};
use lutim_uploader::config::LutimConfig;
use lutim_uploader::error::AppError;
use lutim_uploader::history::HistoryDb;
use lutim_uploader::uploader::LutimUploader;

use crate::cli::Cli;

const HISTORY_DB_FILE: &str = "lutim_history.db";

fn history_db_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join(HISTORY_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(HISTORY_DB_FILE))
}

fn run(args: Cli) -> Result<bool, AppError> {
    let config = LutimConfig::load_from_path(&args.config)?;
    let db = HistoryDb::open(&history_db_path(&args.config))?;

    let uploader = Arc::new(LutimUploader::new(config).with_history_db(db)?);
    uploader.on_history_changed(|count| log::info!("历史记录数: {}", count))?;

    let title = args
        .image
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let surface = Arc::new(FileSurface::new(&args.image));

    let outcome = uploader.upload_blocking(CaptureDetails::new(title), surface);
    if outcome.success {
        match outcome.info.as_ref() {
            Some(info) => println!("{}", info.uri()),
            None => println!("{}", outcome.url),
        }
    } else if let Some(message) = outcome.failure_message {
        eprintln!("{}", message);
    }
    Ok(outcome.success)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("启动失败: {err}");
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}
