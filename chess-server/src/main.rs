use std::path::PathBuf;

use anyhow::{Context, Result};
use chess_server::{Matchmaker, Server, ServerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;

    // 初始化日志，RUST_LOG 优先于配置
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("日志过滤规则无效")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("国际象棋对战服务端启动中...");

    let matchmaker = Matchmaker::spawn(&config);
    let server = Server::bind(&config, matchmaker).await?;
    info!(addr = ?server.local_addr(), "监听地址");

    tokio::select! {
        result = server.run() => result?,
        result = tokio::signal::ctrl_c() => {
            result.context("无法监听退出信号")?;
            info!("收到退出信号，服务端关闭");
        }
    }

    Ok(())
}
