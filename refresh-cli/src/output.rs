// Output formatting helpers for CLI commands

/// Print a status message: "   Running python3 ..."
pub fn status(action: &str, message: &str) {
    eprintln!("\x1b[1;36m{:>10}\x1b[0m {}", action, message);
}

/// Print the terminal success line (stdout, it is the runner's report)
pub fn success(message: &str) {
    println!("\x1b[1;32m\u{2713}\x1b[0m {}", message);
}

/// Print the terminal failure line (stdout, it is the runner's report)
pub fn failure(message: &str) {
    println!("\x1b[1;31m\u{2717}\x1b[0m {}", message);
}

/// Print a check/pass item
pub fn check(message: &str) {
    eprintln!("\x1b[32m  \u{2713}\x1b[0m {}", message);
}

/// Print a warning message
pub fn warning(message: &str) {
    eprintln!("\x1b[33m  !\x1b[0m {}", message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("\x1b[1;31merror:\x1b[0m {}", message);
}

/// Print an info message
pub fn info(message: &str) {
    eprintln!("\x1b[36m  i\x1b[0m {}", message);
}

/// Print a pipeline output line (indented)
pub fn pipeline_output(line: &str) {
    println!("  | {}", line);
}

/// Print a pipeline stderr line (indented, red)
pub fn pipeline_error(line: &str) {
    eprintln!("\x1b[31m  | {}\x1b[0m", line);
}
