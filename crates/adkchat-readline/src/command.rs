/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Prompt(String),
    Apps,
    SelectApp(String),
    Sessions,
    Load(String),
    New,
    Cancel,
    Logs,
    Help,
    Quit,
    /// A slash command that is unknown or missing its argument.
    Invalid(String),
}

pub const COMMANDS: &[&str] = &[
    "/apps", "/app", "/sessions", "/load", "/new", "/cancel", "/logs", "/help",
];

pub const HELP: &[(&str, &str)] = &[
    ("/apps", "list available agent apps"),
    ("/app <name>", "switch to another app"),
    ("/sessions", "list recent sessions of the current app"),
    ("/load <id>", "load a past session"),
    ("/new", "start a new session"),
    ("/cancel", "stop the active response"),
    ("/logs", "show queued warnings and errors"),
    ("/help", "show this help"),
    ("quit", "leave"),
];

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed == "quit" || trimmed == "exit" {
            return Self::Quit;
        }
        if !trimmed.starts_with('/') {
            return Self::Prompt(line.to_string());
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };

        match (name, arg) {
            ("/apps", _) => Self::Apps,
            ("/sessions", _) => Self::Sessions,
            ("/new", _) => Self::New,
            ("/cancel", _) => Self::Cancel,
            ("/logs", _) => Self::Logs,
            ("/help", _) => Self::Help,
            ("/app", "") => Self::Invalid("usage: /app <name>".into()),
            ("/app", app) => Self::SelectApp(app.to_string()),
            ("/load", "") => Self::Invalid("usage: /load <session id>".into()),
            ("/load", id) => Self::Load(id.to_string()),
            (other, _) => Self::Invalid(format!("unknown command: {} (try /help)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_prompt() {
        assert_eq!(
            ReplCommand::parse("plot sales by month"),
            ReplCommand::Prompt("plot sales by month".into())
        );
        assert_eq!(ReplCommand::parse("  exit "), ReplCommand::Quit);
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            ReplCommand::parse("/app  data_science "),
            ReplCommand::SelectApp("data_science".into())
        );
        assert_eq!(ReplCommand::parse("/load s-42"), ReplCommand::Load("s-42".into()));
        assert!(matches!(ReplCommand::parse("/load"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/plan"), ReplCommand::Invalid(_)));
    }
}
