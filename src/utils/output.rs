use colored::*;

pub struct OutputStyle;

impl OutputStyle {
    pub fn title(text: &str) -> ColoredString {
        text.bright_blue().bold()
    }

    pub fn header(text: &str) -> ColoredString {
        text.bold()
    }

    pub fn label(text: &str) -> ColoredString {
        text.cyan()
    }

    pub fn value(text: &str) -> ColoredString {
        text.bright_green()
    }

    pub fn command(text: &str) -> ColoredString {
        text.bright_yellow()
    }

    pub fn success(text: &str) -> ColoredString {
        text.green()
    }

    pub fn error(text: &str) -> ColoredString {
        text.red()
    }

    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    pub fn info(text: &str) -> ColoredString {
        text.blue()
    }

    pub fn muted(text: &str) -> ColoredString {
        text.dimmed()
    }
}

pub fn print_success(message: &str) {
    println!("✅ {}", OutputStyle::success(message));
}

pub fn print_warning(message: &str) {
    println!("⚠️  {}", OutputStyle::warning(message));
}

pub fn print_info(message: &str) {
    println!("ℹ️  {}", OutputStyle::info(message));
}

pub fn print_error(message: &str) {
    eprintln!("❌ {}", OutputStyle::error(message));
}

/// Stage banner for pipeline steps, e.g. `print_stage(2, "Meshing flow domain")`
pub fn print_stage(step: u32, message: &str) {
    println!(
        "{} {}",
        OutputStyle::header(&format!("=== {})", step)),
        OutputStyle::header(message)
    );
}
