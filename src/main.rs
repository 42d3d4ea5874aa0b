use clap::Parser;
use vdisk_fs::FsConfig;

use crate::shell::start_shell;

mod shell;

/// 内存虚拟磁盘上的 inode 文件系统 shell
#[derive(Debug, Parser)]
#[command(name = "vdisk-fs", version, about)]
struct Cli {
    /// 虚拟磁盘的块数（每块 1KB）
    #[arg(long, default_value_t = FsConfig::default().total_blocks)]
    blocks: u32,
    /// inode 表容量
    #[arg(long, default_value_t = FsConfig::default().total_inodes)]
    inodes: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if let Err(e) = start_shell(FsConfig::new(cli.blocks, cli.inodes)) {
        eprintln!("vdisk-fs: {}", e);
        std::process::exit(1);
    }
}
