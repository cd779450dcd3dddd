use crossterm::style::{Color, Stylize};

/// Print a success message in green to stdout.
pub fn success(msg: &str) {
    println!("{}", msg.with(Color::Green));
}

/// Print an error message in red to stderr.
pub fn error(msg: &str) {
    eprintln!("{}", msg.with(Color::Red));
}

/// Print an info message in cyan to stdout.
pub fn info(msg: &str) {
    println!("{}", msg.with(Color::Cyan));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_do_not_panic() {
        success("Listening on http://127.0.0.1:8080");
        error("Invalid JSON input");
        info("Check the configuration file");
    }
}
