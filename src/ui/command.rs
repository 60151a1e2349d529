//! Screen input parsing

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start when idle, stop when running
    Toggle,
    Stop,
    /// New contents of the duration field
    Duration(String),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "t" | "toggle" | "start" => Self::Toggle,
            "s" | "stop" => Self::Stop,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            _ => Self::Duration(line.trim().to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  <minutes>   set the duration field (e.g. 25)
  <enter>, t  start or stop the timer
  s           stop the timer
  h           show this help
  q           quit";
