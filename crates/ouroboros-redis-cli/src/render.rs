//! Plain-text rendering of stats and deletion reports

use ouroboros_redis::{DeleteReport, KeyStats};

const HEADERS: [&str; 5] = ["Key", "Type", "Number of Items", "Size (Bytes)", "Size (MB)"];

/// Fixed-width table, one row per key, in the order given
pub fn stats_table(stats: &[KeyStats]) -> String {
    let rows: Vec<[String; 5]> = stats
        .iter()
        .map(|s| {
            [
                s.key.clone(),
                s.kind.to_string(),
                s.item_count.to_string(),
                s.size_bytes.to_string(),
                format!("{:.6}", s.size_mib),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            // Key and type left-aligned, numbers right-aligned
            if i < 2 {
                format!("{:<width$}", cell, width = *width)
            } else {
                format!("{:>width$}", cell, width = *width)
            }
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

pub fn delete_report(report: &DeleteReport) -> String {
    let mut out = format!("Deleted keys: {}\n", report.deleted_count);
    if !report.missing_keys.is_empty() {
        out.push_str(&format!(
            "Non-existent keys: {}\n",
            report.missing_keys.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouroboros_redis::{KeyKind, BYTES_PER_MIB};

    fn stats(key: &str, kind: KeyKind, items: u64, bytes: u64) -> KeyStats {
        KeyStats {
            key: key.to_string(),
            kind,
            item_count: items,
            size_bytes: bytes,
            size_mib: bytes as f64 / BYTES_PER_MIB,
        }
    }

    #[test]
    fn test_stats_table_layout() {
        let table = stats_table(&[
            stats("x", KeyKind::String, 1, 5),
            stats("quotes:SPY", KeyKind::List, 1200, 1_048_576),
        ]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Key         Type"));
        assert!(lines[2].starts_with("x           string"));
        assert!(lines[2].ends_with("0.000005"));
        assert!(lines[3].starts_with("quotes:SPY  list"));
        assert!(lines[3].ends_with("1.000000"));
    }

    #[test]
    fn test_stats_table_empty() {
        assert_eq!(stats_table(&[]).lines().count(), 2);
    }

    #[test]
    fn test_delete_report() {
        let report = DeleteReport {
            deleted_count: 1,
            missing_keys: vec!["b".to_string(), "c".to_string()],
        };
        assert_eq!(
            delete_report(&report),
            "Deleted keys: 1\nNon-existent keys: b, c\n"
        );
    }
}
