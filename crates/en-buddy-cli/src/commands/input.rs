use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Reads text from `file`, or from stdin when no file is given.
pub fn read_text(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Prints the part of `text` not yet printed and advances `printed`.
pub fn print_delta(text: &str, printed: &mut usize) {
    use std::io::Write;

    if let Some(delta) = text.get(*printed..) {
        if !delta.is_empty() {
            print!("{delta}");
            let _ = std::io::stdout().flush();
            *printed = text.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_delta_advances_past_printed_text() {
        let mut printed = 0;
        print_delta("Hel", &mut printed);
        assert_eq!(printed, 3);
        print_delta("Hello", &mut printed);
        assert_eq!(printed, 5);
        print_delta("Hello", &mut printed);
        assert_eq!(printed, 5);
    }
}
