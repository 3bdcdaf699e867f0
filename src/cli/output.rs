//! Styled terminal output for rangebench commands

use console::style;

/// Output handler for consistent CLI formatting
pub struct Output {
    quiet: bool,
}

impl Output {
    /// Create a new output handler
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Print a header/title
    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    /// Print a table row
    pub fn table_row(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<20} {}", style(key).dim(), value);
        }
    }

    /// Print a report or document verbatim; shown even in quiet mode
    pub fn document(&self, body: &str) {
        print!("{body}");
        if !body.ends_with('\n') {
            println!();
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
