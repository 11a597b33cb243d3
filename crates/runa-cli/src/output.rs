//! Status lines written to stderr.
//!
//! Stdout belongs to the container, so everything runa itself says goes to
//! stderr. Styling follows stderr's color support.

use console::{Term, style};

/// Reports a completed step, e.g. `Built my/app (busybox:1.36)`.
pub fn done(action: &str, subject: &str, detail: &str) {
    let mut line = format!(
        "{} {}",
        style(action).for_stderr().green(),
        style(subject).for_stderr().bold()
    );
    if !detail.is_empty() {
        line.push(' ');
        line.push_str(&style(format!("({detail})")).for_stderr().dim().to_string());
    }
    write(&line);
}

/// Reports a failed invocation with its error chain.
pub fn failure(err: &anyhow::Error) {
    write(&format!("{} {err}", style("error:").for_stderr().red().bold()));
    for cause in err.chain().skip(1) {
        write(&format!("  {} {cause}", style("caused by:").for_stderr().dim()));
    }
}

fn write(line: &str) {
    if let Err(e) = Term::stderr().write_line(line) {
        tracing::debug!(error = %e, "failed to write status line");
    }
}
