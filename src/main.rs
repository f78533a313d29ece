use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, Command};
use review_exporter::{logger, Config, JobFlow, JobOutcome, Server};
use std::path::PathBuf;
use tracing::info;

fn cli() -> Command {
    Command::new("review_exporter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("地点评论导出服务")
        .subcommand(Command::new("serve").about("启动 WebSocket 服务（默认）"))
        .subcommand(
            Command::new("replay")
                .about("离线重放一个原始数据归档")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("归档文件 <base>.json"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("输出根目录，默认使用配置中的 output_root"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let mut config = Config::load()?;

    match cli().get_matches().subcommand() {
        Some(("replay", args)) => {
            let input = args
                .get_one::<PathBuf>("input")
                .context("缺少 --input 参数")?;
            if let Some(output) = args.get_one::<PathBuf>("output") {
                config.output_root = output.clone();
            }

            match JobFlow::new(config).replay(input).await {
                JobOutcome::Complete(report) => {
                    info!("✅ 重放完成: {:?}", report.artifact);
                }
                JobOutcome::Error(e) => bail!("重放失败: {}", e),
            }
        }
        _ => {
            // 启动服务
            let server = Server::bind(config).await?;

            tokio::select! {
                result = server.run() => result?,
                _ = tokio::signal::ctrl_c() => info!("👋 收到退出信号，服务停止"),
            }
        }
    }

    Ok(())
}
