//! Plain-text rendering for command results.

use cybertrack_core::Marker;

const MARKER_HEADERS: [&str; 7] = ["ID", "NAME", "LAT", "LNG", "RANK", "REGION", "CAPTURED"];

pub fn print_markers<'a>(markers: impl IntoIterator<Item = &'a Marker>) {
    let rows = markers.into_iter().map(marker_row).collect::<Vec<_>>();
    if rows.is_empty() {
        println!("no targets");
        return;
    }
    print_table(&MARKER_HEADERS, &rows);
}

pub fn print_marker(marker: &Marker) {
    print_table(&MARKER_HEADERS, &[marker_row(marker)]);
}

fn marker_row(marker: &Marker) -> Vec<String> {
    vec![
        marker.id.clone(),
        single_line(marker.display_name()),
        format!("{:.6}", marker.lat),
        format!("{:.6}", marker.lng),
        marker.rank.to_string(),
        marker.effective_region().to_string(),
        marker.captured_at.clone(),
    ]
}

fn single_line(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{h:w$}"))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{cell:w$}")
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}
