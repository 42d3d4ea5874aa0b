use colored::*;
use vdisk_fs::{FileSystem, FileSystemError, OpenMode, Result};

use vdisk_fs::utils::format_timestamp;

#[derive(Debug)]
pub enum Command {
    Help,
    Ls(Option<String>),
    Pwd,
    Df,
    Cd(String),
    Mkdir(String),
    Touch(String),
    More(String),
    Rm(String),
    Stat(String),
    Write(String, String),
    Append(String, String),
    Mv(String, String),
    Cp(String, String),
    Exit,
}

impl Command {
    /// 报错时显示的命令名
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Ls(_) => "ls",
            Self::Pwd => "pwd",
            Self::Df => "df",
            Self::Cd(_) => "cd",
            Self::Mkdir(_) => "mkdir",
            Self::Touch(_) => "touch",
            Self::More(_) => "more",
            Self::Rm(_) => "rm",
            Self::Stat(_) => "stat",
            Self::Write(..) => "write",
            Self::Append(..) => ">>",
            Self::Mv(..) => "mv",
            Self::Cp(..) => "cp",
            Self::Exit => "exit",
        }
    }
}

/// 把相对路径接到当前目录上，并折叠 "." 和 ".."
pub fn absolute_path(current_dir: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", current_dir, path)
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

/// 去掉块对齐带来的尾部 0 填充。
/// 文件不记录长度，真正以 0 结尾的内容也会被截掉；shell 只写入文本，所以够用。
fn logical_content(mut bytes: Vec<u8>) -> Vec<u8> {
    let len = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    bytes.truncate(len);
    bytes
}

fn read_path(fs: &FileSystem, path: &str) -> Result<Vec<u8>> {
    let (inode, _) = fs.find_subdirectories(path)?;
    Ok(logical_content(fs.read(&inode)?))
}

/// 以 Create 模式打开路径并整体写入
fn write_path(fs: &mut FileSystem, path: &str, content: &[u8]) -> Result<()> {
    let (parent, _, name) = fs.resolve_parent(path)?;
    let (mut inode, num) = fs.open(OpenMode::Create, name, &parent)?;
    fs.write(&mut inode, num, content)
}

fn remove_path(fs: &mut FileSystem, path: &str) -> Result<()> {
    let (parent, _, name) = fs.resolve_parent(path)?;
    let (_, num) = fs.open(OpenMode::Read, name, &parent)?;
    fs.unlink(num, &parent)
}

pub fn execute_command(
    fs: &mut FileSystem,
    cmd: &Command,
    current_dir: &mut String,
) -> Result<()> {
    match cmd {
        Command::Help => print_help(),
        Command::Ls(path) => {
            let target = absolute_path(current_dir, path.as_deref().unwrap_or("."));
            let (dir, _) = fs.find_subdirectories(&target)?;
            for entry in fs.list_directory(&dir)? {
                let name = entry.name()?;
                let inode = fs.read_inode(entry.inode_number)?;
                if inode.is_directory {
                    println!("📁  {}", name.blue().bold());
                } else {
                    println!("📄  {}", name);
                }
            }
        }
        Command::Pwd => println!("📍 {}", current_dir.cyan()),
        Command::Df => {
            let usage = fs.usage()?;
            println!(
                "inodes: {}/{} free, data blocks: {}/{} free",
                usage.free_inodes,
                usage.total_inodes - 1,
                usage.free_blocks,
                usage.data_blocks
            );
        }
        Command::Cd(path) => {
            let target = absolute_path(current_dir, path);
            let (dir, _) = fs.find_subdirectories(&target)?;
            if !dir.is_directory {
                return Err(FileSystemError::InvalidOperand(format!(
                    "{} is not a directory",
                    target
                )));
            }
            *current_dir = target;
        }
        Command::Mkdir(path) => {
            let target = absolute_path(current_dir, path);
            let (parent, _, name) = fs.resolve_parent(&target)?;
            fs.make_directory(name, &parent)?;
            println!("✅ Created directory: {}", target.green());
        }
        Command::Touch(path) => {
            let target = absolute_path(current_dir, path);
            let (parent, _, name) = fs.resolve_parent(&target)?;
            fs.open(OpenMode::Create, name, &parent)?;
        }
        Command::More(path) => {
            let content = read_path(fs, &absolute_path(current_dir, path))?;
            println!("{}", String::from_utf8_lossy(&content));
        }
        Command::Rm(path) => {
            let target = absolute_path(current_dir, path);
            remove_path(fs, &target)?;
            println!("❌ Deleted: {}", target.red());
        }
        Command::Stat(path) => {
            let target = absolute_path(current_dir, path);
            let (inode, num) = fs.find_subdirectories(&target)?;
            let blocks = if inode.is_directory {
                vec![inode.direct_block_1]
            } else {
                fs.file_blocks(&inode)?
            };
            println!("{}", "📊 File Info".bright_yellow().bold());
            println!("{}: {}", "Path".blue(), target);
            println!("{}: {}", "Inode".blue(), num);
            println!(
                "{}: {}",
                "Type".blue(),
                if inode.is_directory { "Directory" } else { "File" }
            );
            println!("{}: {:?}", "Blocks".blue(), blocks);
            println!("{}: {}", "Version".blue(), inode.version);
            println!("{}: {}", "Created".blue(), format_timestamp(inode.create_time));
            println!("{}: {}", "Modified".blue(), format_timestamp(inode.modify_time));
        }
        Command::Write(path, text) => {
            write_path(fs, &absolute_path(current_dir, path), text.as_bytes())?;
        }
        Command::Append(path, text) => {
            // 追加 = 先读出旧内容，再整体写回
            let target = absolute_path(current_dir, path);
            let mut content = match read_path(fs, &target) {
                Ok(existing) => existing,
                Err(FileSystemError::NotFound(_)) => Vec::new(),
                Err(e) => return Err(e),
            };
            content.extend_from_slice(text.as_bytes());
            write_path(fs, &target, &content)?;
        }
        Command::Cp(src, dst) => {
            let content = read_path(fs, &absolute_path(current_dir, src))?;
            write_path(fs, &absolute_path(current_dir, dst), &content)?;
        }
        Command::Mv(src, dst) => {
            let source = absolute_path(current_dir, src);
            let destination = absolute_path(current_dir, dst);
            if source == destination {
                return Ok(());
            }
            let content = read_path(fs, &source)?;
            write_path(fs, &destination, &content)?;
            remove_path(fs, &source)?;
        }
        Command::Exit => println!("{}", "👋 Exiting vdisk-fs shell...".yellow().bold()),
    }

    Ok(())
}

fn print_help() {
    println!("{}", "📘 vdisk-fs Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls [dir]             List directory entries
  pwd                  Print current path
  cd <dir>             Change directory
  df                   Show free inodes and data blocks
  mkdir <dir>          Create directory
  touch <file>         Create empty file
  more <file>          Print file content
  write <file> <text>  Overwrite file with text
  >> <file> <text>     Append text to file
  rm <file|dir>        Remove file or empty directory
  mv <src> <dst>       Move file
  cp <src> <dst>       Copy file
  stat <path>          Show inode info
  help                 Show this help message
  exit                 Quit the shell
"
        .bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fs: &mut FileSystem, cwd: &mut String, line: &str) -> Result<()> {
        let cmd = crate::shell::parse::parse_command(line).unwrap();
        execute_command(fs, &cmd, cwd)
    }

    #[test]
    fn absolute_path_normalizes() {
        assert_eq!(absolute_path("/", "a"), "/a");
        assert_eq!(absolute_path("/a/b", "../c"), "/a/c");
        assert_eq!(absolute_path("/a", "/x/./y/"), "/x/y");
        assert_eq!(absolute_path("/", ".."), "/");
    }

    #[test]
    fn append_move_and_copy() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let mut cwd = String::from("/");
        run(&mut fs, &mut cwd, "mkdir docs").unwrap();
        run(&mut fs, &mut cwd, "cd docs").unwrap();
        assert_eq!(cwd, "/docs");

        run(&mut fs, &mut cwd, ">> log hello").unwrap();
        run(&mut fs, &mut cwd, ">> log world").unwrap();
        assert_eq!(read_path(&fs, "/docs/log").unwrap(), b"helloworld");

        run(&mut fs, &mut cwd, "cp log /copy").unwrap();
        run(&mut fs, &mut cwd, "mv log moved").unwrap();
        assert_eq!(read_path(&fs, "/copy").unwrap(), b"helloworld");
        assert_eq!(read_path(&fs, "/docs/moved").unwrap(), b"helloworld");
        assert!(matches!(
            read_path(&fs, "/docs/log"),
            Err(FileSystemError::NotFound(_))
        ));
    }

    #[test]
    fn cd_into_file_fails() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let mut cwd = String::from("/");
        run(&mut fs, &mut cwd, "touch f").unwrap();
        assert!(run(&mut fs, &mut cwd, "cd f").is_err());
        assert_eq!(cwd, "/");
    }

    #[test]
    fn trailing_zero_bytes_are_treated_as_padding() {
        assert_eq!(logical_content(b"text\0\0\0".to_vec()), b"text");
        assert_eq!(logical_content(b"a\0b".to_vec()), b"a\0b");
        assert!(logical_content(vec![0; 16]).is_empty());
    }
}
