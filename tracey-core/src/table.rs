//! トレースの表形式での表示

use crate::config::ColumnWidths;
use crate::entry::Entry;
use crate::markers::ELLIPSIS;
use crate::trace::Trace;

/// 列の区切り
const COLUMN_SEPARATOR: &str = "  ";

/// 行と列から表文字列を組み立てる
pub trait TableFormatter {
    fn format(&self, rows: &[Vec<String>]) -> String;
}

/// 各列を最長のセルに合わせて空白で埋める表
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignedTable;

impl TableFormatter for AlignedTable {
    fn format(&self, rows: &[Vec<String>]) -> String {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|i| {
                rows.iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        rows.iter()
            .map(|row| {
                widths
                    .iter()
                    .enumerate()
                    .map(|(i, width)| {
                        let cell = row.get(i).map_or("", String::as_str);
                        let padding = width - cell.chars().count();
                        format!("{}{}", cell, " ".repeat(padding))
                    })
                    .collect::<Vec<_>>()
                    .join(COLUMN_SEPARATOR)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 末尾を切り詰める（`n` 文字を超える場合、先頭 `n-1` 文字と省略記号）
pub fn trim_end(s: &str, n: usize) -> String {
    if s.chars().count() <= n {
        return s.to_string();
    }
    if n == 0 {
        return String::new();
    }

    let mut trimmed: String = s.chars().take(n - 1).collect();
    trimmed.push(ELLIPSIS);
    trimmed
}

/// 先頭を切り詰める（`n` 文字を超える場合、省略記号と末尾 `n-1` 文字）
pub fn trim_start(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if len <= n {
        return s.to_string();
    }
    if n == 0 {
        return String::new();
    }

    let mut trimmed = String::from(ELLIPSIS);
    trimmed.extend(s.chars().skip(len - (n - 1)));
    trimmed
}

/// エントリを表の1行に変換する
fn row(entry: &Entry, widths: &ColumnWidths) -> Vec<String> {
    let location = match (entry.file_short.as_str(), entry.line) {
        ("", _) => String::new(),
        (file, Some(line)) => format!("{}:{}", file, line),
        (file, None) => file.to_string(),
    };

    vec![
        format!("at {}", trim_end(&entry.callee_short, widths.callee)),
        trim_start(&location, widths.file),
        trim_end(entry.source_line.trim(), widths.source_line),
    ]
}

impl Trace {
    /// 設定の列幅で表を作る
    pub fn as_table(&self) -> String {
        self.as_table_with(self.config().column_widths)
    }

    /// 列幅を指定して表を作る
    pub fn as_table_with(&self, widths: ColumnWidths) -> String {
        self.render_with(widths, &AlignedTable)
    }

    /// 列幅と表の組み立て方を指定して表を作る
    pub fn render_with(&self, widths: ColumnWidths, formatter: &impl TableFormatter) -> String {
        formatter.format(&self.table_rows(widths))
    }

    /// 切り詰め済みのセル
    pub fn table_rows(&self, widths: ColumnWidths) -> Vec<Vec<String>> {
        self.iter().map(|entry| row(entry, &widths)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_end() {
        assert_eq!(trim_end("abcdef", 4), "abc…");
        assert_eq!(trim_end("abcd", 4), "abcd");
        assert_eq!(trim_end("abcd", 0), "");
        assert_eq!(trim_end("", 3), "");
    }

    #[test]
    fn test_trim_start() {
        assert_eq!(trim_start("abcdef", 4), "…def");
        assert_eq!(trim_start("abc", 4), "abc");
        assert_eq!(trim_start("abc", 0), "");
    }

    #[test]
    fn test_trim_counts_chars() {
        assert_eq!(trim_end("→→→→", 3), "→→…");
        assert_eq!(trim_start("→→→→", 3), "…→→");
    }

    #[test]
    fn test_aligned_table() {
        let rows = vec![
            vec!["at a".to_string(), "x.js:1".to_string(), "foo ()".to_string()],
            vec!["at bcd".to_string(), "y.js:10".to_string(), String::new()],
        ];
        let table = AlignedTable.format(&rows);
        let lines: Vec<&str> = table.split('\n').collect();
        assert_eq!(lines[0], "at a    x.js:1   foo ()");
        assert_eq!(lines[1], "at bcd  y.js:10        ");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(AlignedTable.format(&[]), "");
    }

    #[test]
    fn test_row_location_column() {
        let widths = ColumnWidths::default();

        let mut entry = Entry::new("a.js", Some(3), None);
        entry.file_short = "a.js".to_string();
        entry.callee_short = "go".to_string();
        entry.source_line = "   go ()   ".to_string();
        assert_eq!(row(&entry, &widths), vec!["at go", "a.js:3", "go ()"]);

        entry.line = None;
        assert_eq!(row(&entry, &widths)[1], "a.js");

        entry.file_short.clear();
        assert_eq!(row(&entry, &widths)[1], "");
    }
}
