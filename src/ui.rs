use colored::Colorize;
use stackkit::{Action, StackStatus};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Stack Formatting
// ============================================================================

/// Color an action by how disruptive it is.
pub fn action(action: Action) -> String {
    let label = action.to_string();
    match action {
        Action::NoChange => label.dimmed().to_string(),
        Action::Create => label.green().to_string(),
        Action::Update => label.yellow().to_string(),
        Action::Replace | Action::Delete => label.red().bold().to_string(),
    }
}

/// Color a stack status: failed red, in progress yellow, settled green.
pub fn status(status: &StackStatus) -> String {
    let label = status.as_str();
    if status.is_failed() {
        label.red().to_string()
    } else if status.is_in_progress() {
        label.yellow().to_string()
    } else {
        label.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_keeps_label() {
        colored::control::set_override(false);
        assert_eq!(action(Action::Replace), "replace");
        assert_eq!(action(Action::NoChange), Action::NoChange.to_string());
    }

    #[test]
    fn test_status_keeps_wire_string() {
        colored::control::set_override(false);
        assert_eq!(status(&StackStatus::UpdateRollbackFailed), "UPDATE_ROLLBACK_FAILED");
        assert_eq!(status(&StackStatus::CreateInProgress), "CREATE_IN_PROGRESS");
    }
}
