use crate::oee::round1;

pub struct Styler {
    color_enabled: bool,
}

impl Styler {
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    fn wrap(&self, code: &str, s: &str) -> String {
        if !self.color_enabled {
            return s.to_string();
        }
        format!("{}{}\u{001b}[0m", code, s)
    }

    pub fn green(&self, s: &str) -> String {
        self.wrap("\u{001b}[32m", s)
    }

    pub fn red(&self, s: &str) -> String {
        self.wrap("\u{001b}[31m", s)
    }

    pub fn gray(&self, s: &str) -> String {
        self.wrap("\u{001b}[90m", s)
    }
}

/// One-decimal percentage, the only form metrics take on screen or in the
/// store.
pub fn fmt_pct(v: f64) -> String {
    format!("{:.1}%", round1(v))
}

fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}

pub fn render_simple_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows.iter() {
        for (i, cell) in row.iter().enumerate() {
            let w = cell.chars().count();
            if i >= widths.len() {
                widths.push(w);
            } else {
                widths[i] = widths[i].max(w);
            }
        }
    }

    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .enumerate()
            .map(|(i, h)| pad_right(h, widths[i]))
            .collect::<Vec<String>>()
            .join("  "),
    );
    for row in rows.iter() {
        lines.push(
            row.iter()
                .enumerate()
                .map(|(i, cell)| pad_right(cell, widths[i]))
                .collect::<Vec<String>>()
                .join("  "),
        );
    }
    lines.join("\n")
}
