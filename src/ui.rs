//! Terminal output.
//!
//! Status lines use a colored glyph prefix. Diagnostics are printed only with
//! `--verbose`, through [`Log`]. [`Summary`] draws the resolved invocation as a
//! two-column box table that wraps long values to the terminal width.

use colored::*;
use std::fmt::Display;

const SEPARATOR_WIDTH: usize = 60;

/// Verbose-gated diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Log {
    verbose: bool,
}

impl Log {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn verbose(&self, message: impl Display) {
        if self.verbose {
            println!("{}", message);
        }
    }

    pub fn separator(&self) {
        if self.verbose {
            println!("{}", "=".repeat(SEPARATOR_WIDTH).dimmed());
        }
    }
}

pub fn success(message: impl Display) {
    println!("{} {}", "✓".green(), message);
}

pub fn warn(message: impl Display) {
    println!("{} {}", "!".yellow(), message);
}

pub fn error(message: impl Display) {
    eprintln!("{} {}", "x".red(), message);
}

/// Banner that sets tool messages apart from compiler output in matrix runs.
pub fn banner(message: impl Display) {
    println!("\n          {} {} {}\n", ">>>>>".cyan(), message, "<<<<<".cyan());
}

pub struct Summary {
    rows: Vec<(String, String)>,
}

impl Summary {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn row(&mut self, label: &str, value: impl Display) -> &mut Self {
        self.rows.push((label.to_string(), sanitize(&value.to_string())));
        self
    }

    /// `[a, b, c]`
    pub fn list<T: Display>(&mut self, label: &str, items: &[T]) -> &mut Self {
        let joined = items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.row(label, format!("[{}]", joined))
    }

    pub fn print(&self) {
        let (_, term_width) = console::Term::stdout().size();
        for line in self.render(term_width as usize) {
            println!("{}", line);
        }
    }

    fn render(&self, term_width: usize) -> Vec<String> {
        let label_width = self
            .rows
            .iter()
            .map(|(l, _)| console::measure_text_width(l))
            .max()
            .unwrap_or(0);
        // "  │ label │ value │"
        let overhead = 2 + 7 + label_width;
        let value_width = term_width.saturating_sub(overhead).max(20);

        let border = |left: &str, mid: &str, right: &str| {
            format!(
                "  {}{}{}{}{}",
                left,
                "─".repeat(label_width + 2),
                mid,
                "─".repeat(value_width + 2),
                right
            )
        };

        let mut lines = vec![border("┌", "┬", "┐")];
        for (label, value) in &self.rows {
            for (i, chunk) in wrap(value, value_width).into_iter().enumerate() {
                let shown_label = if i == 0 { label.as_str() } else { "" };
                let label_pad = label_width - console::measure_text_width(shown_label);
                let value_pad = value_width.saturating_sub(console::measure_text_width(&chunk));
                lines.push(format!(
                    "  │ {}{} │ {}{} │",
                    shown_label.bold(),
                    " ".repeat(label_pad),
                    chunk,
                    " ".repeat(value_pad)
                ));
            }
        }
        lines.push(border("└", "┴", "┘"));
        lines
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}

/// Splits `s` into chunks of at most `width` characters.
fn wrap(s: &str, width: usize) -> Vec<String> {
    if s.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("abcdef", 4), ["abcd", "ef"]);
        assert_eq!(wrap("", 4), [""]);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\tb\nc"), "a b c");
    }

    #[test]
    fn test_summary_render_wraps_long_values() {
        colored::control::set_override(false);
        let mut summary = Summary::new();
        summary
            .row("Compiler", "g++")
            .list("Defines", &["A", "B"])
            .row("Command", "x".repeat(50));
        let lines = summary.render(40);
        assert!(lines[0].starts_with("  ┌"));
        assert!(lines.last().unwrap().starts_with("  └"));
        assert!(lines.iter().any(|l| l.contains("[A, B]")));
        // 50 characters at the minimum width of 20 take three lines
        let command_lines = lines.iter().filter(|l| l.contains("xxxx")).count();
        assert_eq!(command_lines, 3);
        let widths: Vec<usize> = lines[1..lines.len() - 1]
            .iter()
            .map(|l| console::measure_text_width(l))
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
