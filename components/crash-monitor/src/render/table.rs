// External crates
use owo_colors::{OwoColorize, Stream, Style};
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "  ";
const RULE: char = '─';

/// Horizontal alignment of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Column {
    header: String,
    align: Align,
    style: Option<Style>,
}

/// A single table cell, optionally overriding its column style.
#[derive(Debug, Clone)]
pub struct Cell {
    text: String,
    style: Option<Style>,
}

impl Cell {
    /// Cell rendered with an explicit style.
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style: Some(style),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, style: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

/// Titled, column-aligned text table.
///
/// Colour is applied only when stdout supports it, and always after padding,
/// so escape codes never skew the alignment.
#[derive(Debug, Clone)]
pub struct Table {
    title: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column(self, header: impl Into<String>) -> Self {
        self.push_column(header.into(), Align::Left, None)
    }

    pub fn styled_column(self, header: impl Into<String>, style: Style) -> Self {
        self.push_column(header.into(), Align::Left, Some(style))
    }

    pub fn right_aligned_column(self, header: impl Into<String>) -> Self {
        self.push_column(header.into(), Align::Right, None)
    }

    fn push_column(mut self, header: String, align: Align, style: Option<Style>) -> Self {
        self.columns.push(Column {
            header,
            align,
            style,
        });
        self
    }

    /// Append a row. Missing trailing cells render empty, extra cells are
    /// ignored.
    pub fn add_row<I, C>(&mut self, cells: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        let mut row: Vec<Cell> = cells
            .into_iter()
            .take(self.columns.len())
            .map(Into::into)
            .collect();
        row.resize_with(self.columns.len(), || Cell::from(String::new()));
        self.rows.push(row);
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                self.rows
                    .iter()
                    .map(|row| text_width(&row[idx].text))
                    .chain(std::iter::once(text_width(&column.header)))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let total_width =
            widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);

        writeln!(
            out,
            "{}",
            self.title
                .if_supports_color(Stream::Stdout, |text| text.bold())
        )?;

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| {
                let padded = pad(&column.header, *width, column.align);
                padded
                    .if_supports_color(Stream::Stdout, |text| text.bold())
                    .to_string()
            })
            .collect();
        writeln!(out, "{}", header.join(COLUMN_GAP).trim_end())?;
        writeln!(out, "{}", RULE.to_string().repeat(total_width))?;

        for row in &self.rows {
            let line: Vec<String> = row
                .iter()
                .zip(&self.columns)
                .zip(&widths)
                .map(|((cell, column), width)| {
                    let padded = pad(&cell.text, *width, column.align);
                    match cell.style.or(column.style) {
                        Some(style) => padded
                            .if_supports_color(Stream::Stdout, |text| text.style(style))
                            .to_string(),
                        None => padded,
                    }
                })
                .collect();
            writeln!(out, "{}", line.join(COLUMN_GAP).trim_end())?;
        }

        Ok(())
    }
}

/// Cut `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// Terminal columns, so wide CJK and emoji cells stay aligned
fn text_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(text_width(text)));
    match align {
        Align::Left => format!("{text}{fill}"),
        Align::Right => format!("{fill}{text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(table: &Table) -> String {
        let mut out = Vec::new();
        table.render(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn columns_are_padded_to_widest_cell() {
        let mut table = Table::new("Incident Summary (7d)")
            .column("Severity")
            .right_aligned_column("Count");
        table.add_row(["critical", "3"]);
        table.add_row(["low", "12"]);

        let text = rendered(&table);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Incident Summary (7d)");
        assert_eq!(lines[1], "Severity  Count");
        assert_eq!(lines[2], "─".repeat(15));
        assert_eq!(lines[3], "critical      3");
        assert_eq!(lines[4], "low          12");
    }

    #[test]
    fn short_rows_are_filled_and_long_rows_cut() {
        let mut table = Table::new("t").column("a").column("b");
        table.add_row(["only"]);
        table.add_row(["x", "y", "ignored"]);

        let text = rendered(&table);
        assert!(text.lines().any(|line| line == "only"));
        assert!(text.lines().any(|line| line == "x     y"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn wide_characters_pad_by_display_width() {
        let mut table = Table::new("t").column("Title").column("Origin");
        table.add_row(["日本語", "api"]);
        table.add_row(["ok", "db"]);

        let text = rendered(&table);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "Title   Origin");
        assert_eq!(lines[3], "日本語  api");
        assert_eq!(lines[4], "ok      db");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("abc", 60), "abc");
    }
}
