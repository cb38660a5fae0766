use std::collections::HashMap;

use super::schema::OutputSchema;

/// Remap a parsed grid onto the canonical header and render it as
/// quoted CSV text.
///
/// Row 0 of the grid is the uploaded file's header. Every output line
/// has exactly one quoted field per canonical column; canonical fields
/// with no source mapping, no matching source column, or an empty value
/// render as `""`. An empty grid produces an empty string.
pub fn convert_to_text_format(schema: &OutputSchema, grid: &[Vec<String>]) -> String {
    if grid.is_empty() {
        return String::new();
    }

    let header_index = header_index_map(&grid[0]);

    // Resolve each canonical field to a source column index once
    let resolved: Vec<Option<usize>> = schema
        .canonical_header()
        .iter()
        .map(|field| {
            schema
                .source_column(field)
                .and_then(|source| header_index.get(&source.trim().to_lowercase()).copied())
        })
        .collect();

    let mut text = String::new();

    let header_line = schema
        .canonical_header()
        .iter()
        .map(|field| quote_field(field))
        .collect::<Vec<_>>()
        .join(",");
    text.push_str(&header_line);
    text.push('\n');

    for row in &grid[1..] {
        let line = resolved
            .iter()
            .map(|idx| match idx.and_then(|i| row.get(i)) {
                Some(value) if !value.is_empty() => quote_field(value),
                _ => "\"\"".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");
        text.push_str(&line);
        text.push('\n');
    }

    text
}

/// Trimmed, lower-cased source header cell -> column index. Empty
/// header cells are skipped; on duplicate names the last occurrence
/// wins.
fn header_index_map(header: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, cell) in header.iter().enumerate() {
        let key = cell.trim().to_lowercase();
        if !key.is_empty() {
            map.insert(key, idx);
        }
    }
    map
}

// RFC4180: double embedded quotes, wrap the field in quotes
fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
