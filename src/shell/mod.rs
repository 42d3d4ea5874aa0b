pub mod command;
pub mod parse;

use std::path::PathBuf;

use colored::*;
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use vdisk_fs::{FileSystem, FsConfig};

use crate::shell::{
    command::{execute_command, Command},
    parse::parse_command,
};

const COMMANDS: &[&str] = &[
    "help", "ls", "pwd", "cd", "df", "mkdir", "touch", "more", "cat", "write", ">>", "rm", "mv",
    "cp", "stat", "exit",
];

pub fn start_shell(config: FsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut fs = FileSystem::initialize_with(config)?;
    let usage = fs.usage()?;

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
    let mut current_dir = String::from("/");

    println!(
        "{}",
        format!(
            "vdisk-fs ready: {} data blocks, {} inodes.",
            usage.data_blocks, usage.total_inodes
        )
        .cyan()
    );
    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history.\n".bright_black()
    );

    // 历史记录放在用户主目录
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vdisk_fs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("history disabled: {}", e),
    }

    let completer = DefaultCompleter::new_with_wordlen(
        COMMANDS.iter().map(|c| c.to_string()).collect(),
        2,
    );
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(format!(
                "{}:{}",
                format!("{}@{}", username, hostname).green(),
                current_dir.blue()
            )),
            DefaultPromptSegment::Basic("vdisk-fs".bright_blue().bold().to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&mut fs, &cmd, &mut current_dir) {
                            println!(
                                "{} {} [{}]: {}",
                                "❌ Error:".red().bold(),
                                cmd.name(),
                                e.kind(),
                                e
                            );
                        }
                        if matches!(cmd, Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command or missing arguments. Type 'help' for command list."
                            .yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting vdisk-fs...".yellow());
                break;
            }
            #[allow(unreachable_patterns)]
            Ok(_) => continue,
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
    Ok(())
}
