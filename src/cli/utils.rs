use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print rows as aligned text columns, or as a JSON array
pub fn output_table(
    output_format: OutputFormat,
    headers: &[&str],
    rows: Vec<Vec<String>>,
    json_rows: Value,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_rows)?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No results");
                return Ok(());
            }
            let widths: Vec<usize> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    rows.iter()
                        .map(|r| r.get(i).map_or(0, String::len))
                        .max()
                        .unwrap_or(0)
                        .max(h.len())
                })
                .collect();

            let line = |cells: Vec<&str>| {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                    .collect::<Vec<_>>()
                    .join("  ")
            };
            println!("{}", line(headers.to_vec()));
            for row in &rows {
                println!("{}", line(row.iter().map(String::as_str).collect()));
            }
        }
    }
    Ok(())
}
