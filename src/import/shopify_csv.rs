use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::translate::{
    count_untranslated, locale_summary, validate_columns, LocaleStats, TranslationRow, COL_SOURCE_FILE,
};

/// A Shopify translation export held in memory, headers lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvTable {
    pub filename: String,
    pub headers: Vec<String>,
    pub rows: Vec<TranslationRow>,
}

/// Counts shown after an upload or for the whole session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsvSummary {
    pub filename: String,
    pub total_rows: usize,
    pub untranslated_rows: usize,
    pub locales: Vec<String>,
    pub locale_stats: BTreeMap<String, LocaleStats>,
}

impl CsvTable {
    pub fn summary(&self) -> CsvSummary {
        let locale_stats = locale_summary(&self.rows);
        CsvSummary {
            filename: self.filename.clone(),
            total_rows: self.rows.len(),
            untranslated_rows: count_untranslated(&self.rows),
            locales: locale_stats.keys().cloned().collect(),
            locale_stats,
        }
    }

    fn add_header(&mut self, header: &str) {
        if !self.headers.iter().any(|h| h == header) {
            self.headers.push(header.to_string());
        }
    }
}

pub fn is_csv_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".csv")
}

/// Parse an uploaded export.
///
/// Header names are trimmed and lower-cased, the required columns must all
/// be present and at least one row must carry a locale.
pub fn parse_csv(bytes: &[u8], filename: &str) -> Result<CsvTable, String> {
    if !is_csv_filename(filename) {
        return Err(format!("{} is not a CSV file", filename));
    }
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Could not read {}: {}", filename, e))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    validate_columns(&headers).map_err(|e| format!("{}: {}", filename, e))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("Could not read {}: {}", filename, e))?;
        let mut row = TranslationRow::default();
        for (i, header) in headers.iter().enumerate() {
            row.set(header, record.get(i).unwrap_or(""));
        }
        rows.push(row);
    }

    if !rows.iter().any(|r| !r.locale().is_empty()) {
        return Err(format!("{} has no values in the locale column", filename));
    }

    Ok(CsvTable {
        filename: filename.to_string(),
        headers,
        rows,
    })
}

/// Serialize a table back to CSV in header order, leaving out `exclude`.
pub fn write_csv(table: &CsvTable, exclude: &[&str]) -> Result<Vec<u8>, String> {
    let columns: Vec<&str> = table
        .headers
        .iter()
        .map(String::as_str)
        .filter(|h| !exclude.contains(h))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns).map_err(|e| e.to_string())?;
    for row in &table.rows {
        writer
            .write_record(columns.iter().map(|c| row.get(c)))
            .map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

/// Combine the given rows of several files into one table, tagging each row
/// with the file it came from.
pub fn combine<'a>(
    filename: &str,
    parts: impl IntoIterator<Item = (&'a CsvTable, Vec<usize>)>,
) -> CsvTable {
    let mut combined = CsvTable {
        filename: filename.to_string(),
        ..Default::default()
    };
    for (table, indices) in parts {
        for header in &table.headers {
            combined.add_header(header);
        }
        for idx in indices {
            if let Some(row) = table.rows.get(idx) {
                let mut row = row.clone();
                if row.source_file().is_none() {
                    row.set(COL_SOURCE_FILE, table.filename.clone());
                }
                combined.rows.push(row);
            }
        }
    }
    combined.add_header(COL_SOURCE_FILE);
    combined
}

/// `products.csv` becomes `products_translated.csv`.
pub fn translated_filename(filename: &str) -> String {
    let base = filename
        .strip_suffix(".csv")
        .or_else(|| filename.strip_suffix(".CSV"))
        .unwrap_or(filename);
    format!("{}_translated.csv", base)
}

pub fn untranslated_export_filename(now: NaiveDateTime) -> String {
    format!("untranslated_rows_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{COL_DEFAULT, COL_LOCALE, COL_TRANSLATED};

    const SAMPLE: &str = "Type,Identification,Field,Locale,Market,Status,Default content,Translated content\n\
PRODUCT,123,title,de,,,Rød jakke,\n\
PRODUCT,123,body_html,de,,,\"<p>Varm, vandtæt</p>\",<p>Warm</p>\n\
PRODUCT,124,title,fr,,,Blå hue,\n";

    #[test]
    fn test_parse_normalizes_headers() {
        let table = parse_csv(SAMPLE.as_bytes(), "products.csv").unwrap();
        assert_eq!(table.headers[0], "type");
        assert!(table.headers.contains(&"default content".to_string()));
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].get(COL_DEFAULT), "<p>Varm, vandtæt</p>");
        assert_eq!(table.rows[0].get(COL_LOCALE), "de");
    }

    #[test]
    fn test_parse_rejects_non_csv_and_missing_columns() {
        assert!(parse_csv(SAMPLE.as_bytes(), "products.xlsx").is_err());
        let err = parse_csv(b"Locale,Type\nde,PRODUCT\n", "x.csv").unwrap_err();
        assert!(err.contains("default content"));
        assert!(err.contains("field"));
    }

    #[test]
    fn test_parse_rejects_file_without_locales() {
        let csv = "locale,default content,translated content,type,field\n,Hej,,PRODUCT,title\n";
        let err = parse_csv(csv.as_bytes(), "empty.csv").unwrap_err();
        assert!(err.contains("locale"));
    }

    #[test]
    fn test_summary_counts() {
        let table = parse_csv(SAMPLE.as_bytes(), "products.csv").unwrap();
        let summary = table.summary();
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.untranslated_rows, 2);
        assert_eq!(summary.locales, vec!["de", "fr"]);
        assert_eq!(summary.locale_stats["de"].needs_translation, 1);
    }

    #[test]
    fn test_export_then_import_keeps_values() {
        let table = parse_csv(SAMPLE.as_bytes(), "products.csv").unwrap();
        let bytes = write_csv(&table, &[]).unwrap();
        let again = parse_csv(&bytes, "products.csv").unwrap();
        assert_eq!(again.headers, table.headers);
        assert_eq!(again.rows, table.rows);
    }

    #[test]
    fn test_combine_tags_source_and_export_excludes_it() {
        let a = parse_csv(SAMPLE.as_bytes(), "a.csv").unwrap();
        let combined = combine("filtered_untranslated.csv", [(&a, vec![0, 2])]);
        assert_eq!(combined.rows.len(), 2);
        assert_eq!(combined.rows[1].source_file(), Some("a.csv"));
        assert_eq!(combined.headers.last().map(String::as_str), Some(COL_SOURCE_FILE));

        let bytes = write_csv(&combined, &[COL_SOURCE_FILE]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains(COL_SOURCE_FILE));
        assert!(text.contains("Blå hue"));
        assert_eq!(combined.rows[0].get(COL_TRANSLATED), "");
    }

    #[test]
    fn test_filenames() {
        assert_eq!(translated_filename("products.csv"), "products_translated.csv");
        assert_eq!(translated_filename("filtered"), "filtered_translated.csv");
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        assert_eq!(untranslated_export_filename(at), "untranslated_rows_20240309_140507.csv");
    }
}
