use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    let (&cmd, args) = tokens.split_first()?;

    let one = |make: fn(String) -> Command| args.first().map(|&a| make(a.to_string()));
    let two = |make: fn(String, String) -> Command| match args {
        [a, b] => Some(make(a.to_string(), b.to_string())),
        _ => None,
    };
    // 文件名之后的所有参数拼成内容
    let text = |make: fn(String, String) -> Command| match args {
        [file, rest @ ..] if !rest.is_empty() => Some(make(file.to_string(), rest.join(" "))),
        _ => None,
    };

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls(args.first().map(|a| a.to_string()))),
        "pwd" => Some(Command::Pwd),
        "df" => Some(Command::Df),
        "cd" => one(Command::Cd),
        "mkdir" => one(Command::Mkdir),
        "touch" => one(Command::Touch),
        "more" | "cat" => one(Command::More),
        "rm" => one(Command::Rm),
        "stat" => one(Command::Stat),
        "write" => text(Command::Write),
        ">>" => text(Command::Append),
        "mv" => two(Command::Mv),
        "cp" => two(Command::Cp),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}
