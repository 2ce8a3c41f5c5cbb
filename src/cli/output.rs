//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Sophia CLI.

use crate::types::{ContextDocument, RecommendationItem, UpsertResult};
use owo_colors::OwoColorize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy)]
enum Status {
    Success,
    Info,
    Warning,
    Error,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Status::Success => "OK",
            Status::Info => "INFO",
            Status::Warning => "WARN",
            Status::Error => "ERROR",
        }
    }
}

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the startup banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "Sophia".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   Sophia v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        self.status(Status::Success, message);
    }

    pub fn info(&self, message: &str) {
        self.status(Status::Info, message);
    }

    /// Warnings go to stderr so piped output stays parseable.
    pub fn warning(&self, message: &str) {
        self.status(Status::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.status(Status::Error, message);
    }

    fn status(&self, status: Status, message: &str) {
        let line = if self.colored {
            match status {
                Status::Success => format!("  {} {}", "✓".green().bold(), message.green()),
                Status::Info => format!("  {} {}", "•".blue(), message),
                Status::Warning => format!("  {} {}", "⚠".yellow().bold(), message.yellow()),
                Status::Error => format!("  {} {}", "✗".red().bold(), message.red()),
            }
        } else {
            format!("  [{}] {}", status.tag(), message)
        };

        match status {
            Status::Success | Status::Info => println!("{}", line),
            Status::Warning | Status::Error => eprintln!("{}", line),
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Summary of a finished ingestion
    pub fn ingested(&self, result: &UpsertResult) {
        self.success(&format!(
            "Ingested '{}' into namespace '{}'",
            result.source_id, result.namespace
        ));
        self.kv("chunks", &result.chunks.to_string());
        self.kv("records", &result.records_upserted.to_string());
        self.kv("tokens", &result.total_tokens.to_string());
        self.kv("embedding model", &result.embedding_model);
    }

    /// One numbered recommendation
    pub fn recommendation(&self, position: usize, item: &RecommendationItem) {
        if self.colored {
            println!(
                "\n  {} {} {}",
                format!("{}.", position).bright_cyan().bold(),
                item.title.bright_white().bold(),
                format!("/ {}", item.author).cyan()
            );
        } else {
            println!("\n  {}. {} / {}", position, item.title, item.author);
        }
        println!("     {}", item.reason);
    }

    /// One retrieved passage, shortened to a single line
    pub fn source(&self, doc: &ContextDocument) {
        let preview: String = doc
            .page_content
            .chars()
            .take(80)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        if self.colored {
            println!(
                "    {} {} {}",
                format!("{:.3}", doc.score).dimmed(),
                doc.metadata.source.cyan(),
                preview.dimmed()
            );
        } else {
            println!("    {:.3} {} {}", doc.score, doc.metadata.source, preview);
        }
    }

    /// Prompt for confirmation (returns true if user confirms)
    pub fn confirm(&self, message: &str) -> bool {
        if self.colored {
            print!(
                "  {} {} [y/N]: ",
                "?".bright_yellow().bold(),
                message.bright_white()
            );
        } else {
            print!("  [?] {} [y/N]: ", message);
        }

        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            let input = input.trim().to_lowercase();
            input == "y" || input == "yes"
        } else {
            false
        }
    }
}
