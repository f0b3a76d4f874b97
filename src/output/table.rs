//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Format rows as a rounded table with centered headers
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No vehicles configured.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Tabled)]
    struct Row {
        #[tabled(rename = "VEHICLE")]
        title: String,
        #[tabled(rename = "SOC")]
        soc: String,
    }

    fn row(title: &str, soc: &str) -> Row {
        Row {
            title: title.to_string(),
            soc: soc.to_string(),
        }
    }

    #[test]
    fn test_empty() {
        let rows: Vec<Row> = vec![];
        assert_eq!(format_table(&rows), "No vehicles configured.");
    }

    #[test]
    fn test_rows_and_headers() {
        let result = format_table(&[row("XC40", "81%"), row("Model 3", "-")]);

        assert!(result.contains("VEHICLE"));
        assert!(result.contains("SOC"));
        assert!(result.contains("XC40"));
        assert!(result.contains("Model 3"));
        assert!(result.contains("81%"));
    }

    #[test]
    fn test_rounded_style() {
        let result = format_table(&[row("XC40", "81%")]);

        // Rounded style uses ╭ for top-left corner
        assert!(result.contains("╭"));
        assert!(result.contains("╰"));
    }
}
