use std::path::Path;

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

use crate::error::Result;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv export");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    debug!(path = %path.display(), "wrote json export");
    Ok(())
}

/// Markdown rendering of at most `max_rows` rows.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionTotalRow;

    #[test]
    fn renders_markdown_and_empty_tables() {
        let rows = vec![
            RegionTotalRow {
                region: "LAGOS".to_string(),
                tonnes: "100.00".to_string(),
            },
            RegionTotalRow {
                region: "SOUTH WEST".to_string(),
                tonnes: "30.00".to_string(),
            },
        ];
        let table = render_table(&rows, 1);
        assert!(table.contains("Region"));
        assert!(table.contains("LAGOS"));
        assert!(!table.contains("SOUTH WEST"));
        assert_eq!(render_table::<RegionTotalRow>(&[], 5), "(no rows)");
    }
}
