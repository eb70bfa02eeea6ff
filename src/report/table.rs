//! Fixed-width plain-text tables.

/// A table rendered with space-padded columns. The first column is
/// left-aligned (row labels), the rest right-aligned.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with empty cells.
    pub fn add_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len().max(row.len()), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        (0..columns)
            .map(|i| {
                std::iter::once(&self.headers)
                    .chain(self.rows.iter())
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn render_row(row: &[String], widths: &[usize]) -> String {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            if i == 0 {
                line.push_str(&format!("{:<width$}", cell, width = width));
            } else {
                line.push_str("  ");
                line.push_str(&format!("{:>width$}", cell, width = width));
            }
        }
        line.trim_end().to_string()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut output = String::new();

        output.push_str(&Self::render_row(&self.headers, &widths));
        output.push('\n');
        for row in &self.rows {
            output.push_str(&Self::render_row(row, &widths));
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_aligns_columns() {
        let mut table = TextTable::new(["", "age", "salary"]);
        table.add_row(["count", "4", "4"]);
        table.add_row(["mean", "29.5", "58750"]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "        age  salary");
        assert_eq!(lines[1], "count     4       4");
        assert_eq!(lines[2], "mean   29.5   58750");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = TextTable::new(["k", "v"]);
        table.add_row(["only"]);
        assert!(!table.is_empty());
        assert_eq!(table.render(), "k     v\nonly\n");
    }
}
