// Terminal styling for the CLI

use std::io::IsTerminal;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warning",
            Level::Error => "error",
        }
    }

    fn style(self) -> &'static str {
        match self {
            Level::Info => "\x1b[36m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
        }
    }
}

/// Print a status line as `pathprof: <level>: <message>`
///
/// Info lands on stdout, warnings and errors on stderr. The level tag is
/// colored only when the target stream is a terminal.
pub fn status(level: Level, msg: &str) {
    match level {
        Level::Info => {
            let tty = std::io::stdout().is_terminal();
            println!("pathprof: {}: {}", paint(level, tty), msg);
        }
        Level::Warn | Level::Error => {
            let tty = std::io::stderr().is_terminal();
            eprintln!("pathprof: {}: {}", paint(level, tty), msg);
        }
    }
}

fn paint(level: Level, tty: bool) -> String {
    if tty {
        format!("{}{}{}", level.style(), level.tag(), RESET)
    } else {
        level.tag().to_string()
    }
}

/// Print a section heading, bold on terminals, followed by a blank line
pub fn header(msg: &str) {
    if std::io::stdout().is_terminal() {
        println!("{}{}{}", BOLD, msg, RESET);
    } else {
        println!("{}", msg);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tag_without_terminal() {
        assert_eq!(paint(Level::Warn, false), "warning");
        assert_eq!(paint(Level::Error, false), "error");
    }

    #[test]
    fn test_styled_tag_wraps_with_reset() {
        let styled = paint(Level::Info, true);
        assert!(styled.starts_with("\x1b["));
        assert!(styled.ends_with(RESET));
        assert!(styled.contains("info"));
    }
}
