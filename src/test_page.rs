// src/test_page.rs - Built-in single page describing the printing host
use std::io::{self, Write};

use chrono::Utc;

use crate::document::{PageStatus, Printable};

const LEFT: u32 = 36;
const VALUE_LEFT: u32 = 150;
const TOP: u32 = 800;
const LINE_HEIGHT: u32 = 12;

/// One page of PostScript listing print time, host and printer.
#[derive(Debug, Clone)]
pub struct TestPage {
    printer_name: String,
}

impl TestPage {
    pub fn new(printer_name: impl Into<String>) -> Self {
        Self {
            printer_name: printer_name.into(),
        }
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Print date/time:", Utc::now().to_rfc2822()),
            ("Host name:", host_name()),
            ("OS name:", std::env::consts::OS.to_string()),
            ("OS architecture:", std::env::consts::ARCH.to_string()),
            ("OS family:", std::env::consts::FAMILY.to_string()),
            ("Printer name:", self.printer_name.clone()),
        ]
    }
}

impl Printable for TestPage {
    fn print_page(&self, page_index: usize, out: &mut dyn Write) -> io::Result<PageStatus> {
        if page_index > 0 {
            return Ok(PageStatus::NoSuchPage);
        }
        writeln!(out, "/Courier-Bold findfont 10 scalefont setfont")?;
        writeln!(out, "{} {} moveto ({}) show", LEFT, TOP, escape("Test Page"))?;
        writeln!(out, "0.4 setlinewidth 0 {} moveto 595 {} lineto stroke", TOP - 6, TOP - 6)?;

        let mut y = TOP - 6 - 2 * LINE_HEIGHT;
        for (key, value) in self.entries() {
            writeln!(out, "/Courier-Bold findfont 8 scalefont setfont")?;
            writeln!(out, "{} {} moveto ({}) show", LEFT, y, escape(key))?;
            writeln!(out, "/Courier findfont 8 scalefont setfont")?;
            writeln!(out, "{} {} moveto ({}) show", VALUE_LEFT, y, escape(&value))?;
            y -= LINE_HEIGHT;
        }
        writeln!(out, "0.2 setlinewidth 0 {} moveto 595 {} lineto stroke", y, y)?;
        Ok(PageStatus::Exists)
    }
}

fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

// PostScript string literals treat parentheses and backslashes specially.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
