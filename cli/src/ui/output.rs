//! Styled user-facing output. Everything goes to stderr so stdout stays
//! clean for the deploy URL.

use colored::Colorize;

pub fn note(message: &str) {
    eprintln!("{}", message);
}

pub fn step(message: &str) {
    eprintln!("{} {}", "›".cyan().bold(), message.bold());
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "!".yellow().bold(), message.yellow());
}

pub fn progress(message: &str) {
    eprintln!("  {}", message.dimmed());
}

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}
