//! 内核命令行入口

use anyhow::Context;
use clap::{Parser, Subcommand};
use coach_core::core::config::CoreConfig;
use coach_core::module::{
    FileModuleSource, HotReloadCoordinator, ModuleRegistry, ModuleSource, RegistryOptions,
};
use coach_core::utils::logger::{Logger, LoggerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "coach-core")]
#[command(version = coach_core::CORE_VERSION)]
#[command(about = "教练平台模块内核", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动内核
    Start {
        /// 配置文件路径（YAML 或 JSON）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// 显示版本信息
    Version,
    /// 校验配置文件
    CheckConfig {
        /// 配置文件路径
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => start(config).await,
        Commands::Version => {
            println!("{} v{}", coach_core::CORE_NAME, coach_core::CORE_VERSION);
            Ok(())
        }
        Commands::CheckConfig { config } => {
            let parsed = CoreConfig::from_file(&config)
                .with_context(|| format!("配置文件 {} 校验失败", config.display()))?;
            println!("配置文件有效: {}", config.display());
            println!("  内核版本: {}", parsed.core_version);
            println!("  模块目录: {:?}", parsed.modules.module_dirs);
            println!("  热重载: {}", parsed.modules.hot_reload);
            Ok(())
        }
    }
}

async fn start(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => CoreConfig::from_file(&path)
            .with_context(|| format!("加载配置文件 {} 失败", path.display()))?,
        None => CoreConfig::default(),
    };

    let mut logger_config = LoggerConfig::from_log_config(&config.logging);
    if config.dev_mode {
        logger_config.level = "debug".to_string();
        logger_config.show_file_line = true;
    }
    let _log_guard = Logger::init(logger_config)?;

    info!(
        version = coach_core::CORE_VERSION,
        dev_mode = config.dev_mode,
        "内核启动中"
    );

    let registry = ModuleRegistry::new(RegistryOptions::from_config(&config)?);

    // 扫描模块目录并批量注册
    if config.modules.auto_register && !config.modules.module_dirs.is_empty() {
        let source = FileModuleSource::new(config.modules.module_dirs.clone());
        let descriptors = source.load().await?;
        info!(count = descriptors.len(), "扫描到模块描述文件");

        for (key, result) in registry.register_many(descriptors).await {
            match result {
                Ok(()) => info!(module_key = %key, "模块注册成功"),
                Err(e) => warn!(module_key = %key, error_msg = %e, "模块注册失败"),
            }
        }
    }

    let coordinator = HotReloadCoordinator::new(
        registry.clone(),
        Duration::from_millis(config.modules.debounce_ms),
    );
    if !config.modules.hot_reload {
        coordinator.disable().await;
    }

    let summary = registry.system_health_summary().await;
    info!(
        total = summary.total,
        active = summary.active,
        "内核启动完成，等待停止信号"
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到停止信号，开始关闭"),
        Err(e) => error!(error_msg = %e, "监听停止信号失败"),
    }

    coordinator.disable().await;
    registry.disable_health_monitoring().await;
    info!("内核已关闭");
    Ok(())
}
