use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ai::prompts::{compose, PromptMode, TRANSLATE_ROW_MAX_TOKENS};
use crate::ai::Completer;
use crate::throttle::Throttle;

pub const COL_LOCALE: &str = "locale";
pub const COL_DEFAULT: &str = "default content";
pub const COL_TRANSLATED: &str = "translated content";
pub const COL_TYPE: &str = "type";
pub const COL_FIELD: &str = "field";
/// Added to combined rows so each can be traced to its upload.
pub const COL_SOURCE_FILE: &str = "_source_file";

pub const REQUIRED_COLUMNS: [&str; 5] = [COL_LOCALE, COL_DEFAULT, COL_TRANSLATED, COL_TYPE, COL_FIELD];

/// Cell value spreadsheet exports use for an empty cell.
pub const MISSING_TOKEN: &str = "nan";
/// Prefix written into the translation of a row whose call failed.
pub const ERROR_MARKER: &str = "[ERROR] ";

/// Locales the translator handles, with the Danish name of each language.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("da", "dansk"),
    ("de", "tysk"),
    ("en", "engelsk"),
    ("es", "spansk"),
    ("fr", "fransk"),
    ("it", "italiensk"),
    ("nl", "hollandsk"),
    ("sv", "svensk"),
    ("no", "norsk"),
    ("fi", "finsk"),
    ("pl", "polsk"),
    ("pt", "portugisisk"),
    ("ru", "russisk"),
    ("zh", "kinesisk"),
    ("ja", "japansk"),
    ("ko", "koreansk"),
];

pub fn language_name(locale: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(code, _)| *code == locale)
        .map(|(_, name)| *name)
}

/// A cell counts as empty when blank or holding the missing-value token.
pub fn is_blank(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == MISSING_TOKEN
}

/// One row of a translation export, keyed by lower-cased column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationRow {
    pub cells: BTreeMap<String, String>,
}

impl TranslationRow {
    #[cfg(test)]
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        TranslationRow {
            cells: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.to_string(), value.into());
    }

    pub fn locale(&self) -> &str {
        self.get(COL_LOCALE).trim()
    }

    pub fn default_content(&self) -> &str {
        self.get(COL_DEFAULT)
    }

    pub fn translated_content(&self) -> &str {
        self.get(COL_TRANSLATED)
    }

    pub fn source_file(&self) -> Option<&str> {
        self.cells.get(COL_SOURCE_FILE).map(String::as_str)
    }

    pub fn is_error_marked(&self) -> bool {
        self.translated_content().starts_with(ERROR_MARKER)
    }

    /// No translation yet, error markers count as a translation.
    pub fn lacks_translation(&self) -> bool {
        is_blank(self.translated_content())
    }

    pub fn has_source_text(&self) -> bool {
        !is_blank(self.default_content())
    }
}

/// Fail naming every required column that is absent.
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> Result<(), String> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.as_ref().trim().to_lowercase() == *col))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Missing required columns: {}", missing.join(", ")))
    }
}

/// Whether rows marked with a failed translation are picked up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorRowPolicy {
    /// An error marker counts as translated content.
    #[default]
    Skip,
    Retry,
}

impl ErrorRowPolicy {
    pub fn from_retry_flag(retry: bool) -> Self {
        if retry {
            Self::Retry
        } else {
            Self::Skip
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocaleStats {
    pub total_rows: usize,
    pub needs_translation: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    /// Indices of pending rows, in row order.
    pub indices: Vec<usize>,
    pub locale_stats: BTreeMap<String, LocaleStats>,
}

/// True when the row has source text but no usable translation.
pub fn is_pending(row: &TranslationRow, policy: ErrorRowPolicy) -> bool {
    if row.locale().is_empty() || !row.has_source_text() {
        return false;
    }
    row.lacks_translation() || (policy == ErrorRowPolicy::Retry && row.is_error_marked())
}

/// Pick the rows that still need a translation.
///
/// With an allowlist only rows of those locales are looked at, both for
/// selection and for the per-locale counts.
pub fn select_pending<S: AsRef<str>>(
    rows: &[TranslationRow],
    allowlist: Option<&[S]>,
    policy: ErrorRowPolicy,
) -> Selection {
    let mut selection = Selection::default();

    for (i, row) in rows.iter().enumerate() {
        let locale = row.locale();
        if locale.is_empty() {
            continue;
        }
        if let Some(allowed) = allowlist {
            if !allowed.iter().any(|a| a.as_ref() == locale) {
                continue;
            }
        }

        let pending = is_pending(row, policy);
        let stats = selection.locale_stats.entry(locale.to_string()).or_default();
        stats.total_rows += 1;
        if pending {
            stats.needs_translation += 1;
            selection.indices.push(i);
        }
    }

    selection
}

/// Rows with no translation yet, regardless of source text. Used for the
/// upload summary.
pub fn count_untranslated(rows: &[TranslationRow]) -> usize {
    rows.iter().filter(|r| r.lacks_translation()).count()
}

/// Per-locale totals and untranslated counts over all rows.
pub fn locale_summary(rows: &[TranslationRow]) -> BTreeMap<String, LocaleStats> {
    let mut stats: BTreeMap<String, LocaleStats> = BTreeMap::new();
    for row in rows {
        let locale = row.locale();
        if locale.is_empty() {
            continue;
        }
        let entry = stats.entry(locale.to_string()).or_default();
        entry.total_rows += 1;
        if row.lacks_translation() {
            entry.needs_translation += 1;
        }
    }
    stats
}

// ── Batch translation ─────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RowProgress {
    pub row_index: usize,
    pub locale: String,
    pub original_text: String,
    pub translated_text: String,
    pub status: &'static str,
    pub progress: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TranslationReport {
    pub translated_count: usize,
    pub total_rows: usize,
    pub errors: Vec<String>,
    pub progress_updates: Vec<RowProgress>,
}

fn preview(text: &str) -> String {
    if text.chars().count() > 100 {
        let cut: String = text.chars().take(100).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Translate every pending row of the selected, supported locales in place.
///
/// Rows are sent one at a time. A failed row gets `[ERROR] <original>` as
/// its translation, is reported and the loop moves on.
pub fn translate_rows<S: AsRef<str>>(
    completer: &dyn Completer,
    rows: &mut [TranslationRow],
    locales: &[S],
    policy: ErrorRowPolicy,
    model: &str,
    throttle: &Throttle,
) -> TranslationReport {
    let wanted: Vec<&str> = locales
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| language_name(l).is_some())
        .collect();
    let selection = select_pending(rows, Some(&wanted), policy);
    let total = selection.indices.len();
    let mut report = TranslationReport {
        total_rows: total,
        ..Default::default()
    };

    log::info!("[translate] Starting translation of {} rows", total);

    for (n, &idx) in selection.indices.iter().enumerate() {
        let locale = rows[idx].locale().to_string();
        let original = rows[idx].default_content().to_string();
        let language = match language_name(&locale) {
            Some(l) => l,
            None => continue,
        };

        let req = compose(
            &PromptMode::Translation {
                text: &original,
                language,
                max_tokens: TRANSLATE_ROW_MAX_TOKENS,
            },
            None,
        )
        .with_model(model);

        let progress = format!("{}/{}", n + 1, total);
        match completer.complete(&req) {
            Ok(resp) => {
                let translated = resp.text.trim().to_string();
                rows[idx].set(COL_TRANSLATED, translated.clone());
                report.translated_count += 1;
                report.progress_updates.push(RowProgress {
                    row_index: idx,
                    locale,
                    original_text: preview(&original),
                    translated_text: preview(&translated),
                    status: "completed",
                    progress,
                });
                throttle.pause(true, false);
            }
            Err(e) => {
                let msg = format!("Failed to translate row {}: {}", idx + 1, e);
                log::warn!("[translate] {}", msg);
                report.errors.push(msg);
                rows[idx].set(COL_TRANSLATED, format!("{}{}", ERROR_MARKER, original));
                report.progress_updates.push(RowProgress {
                    row_index: idx,
                    locale,
                    original_text: preview(&original),
                    translated_text: format!("{}{}", ERROR_MARKER, e),
                    status: "error",
                    progress,
                });
                throttle.pause(false, e.is_rate_limit());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, AiRequest, AiResponse};
    use std::sync::Mutex;

    fn row(locale: &str, default: &str, translated: &str) -> TranslationRow {
        TranslationRow::from_pairs([
            (COL_LOCALE, locale),
            (COL_DEFAULT, default),
            (COL_TRANSLATED, translated),
            (COL_TYPE, "PRODUCT"),
            (COL_FIELD, "title"),
        ])
    }

    #[test]
    fn test_select_pending_example() {
        let rows = vec![row("de", "Hej", ""), row("de", "Hej", "Hallo"), row("fr", "", "")];
        let sel = select_pending::<&str>(&rows, None, ErrorRowPolicy::Skip);
        assert_eq!(sel.indices, vec![0]);
        assert_eq!(sel.locale_stats["de"], LocaleStats { total_rows: 2, needs_translation: 1 });
        assert_eq!(sel.locale_stats["fr"], LocaleStats { total_rows: 1, needs_translation: 0 });
    }

    #[test]
    fn test_allowlist_limits_counting() {
        let rows = vec![row("de", "Hej", ""), row("fr", "Hej", ""), row("de", "Farvel", "nan")];
        let sel = select_pending(&rows, Some(&["de"]), ErrorRowPolicy::Skip);
        assert_eq!(sel.indices, vec![0, 2]);
        assert!(!sel.locale_stats.contains_key("fr"));
    }

    #[test]
    fn test_missing_token_and_whitespace() {
        assert!(is_blank("  "));
        assert!(is_blank("nan"));
        assert!(!is_blank("Nan-bread"));
        let rows = vec![row("de", "nan", ""), row("de", "Hej", "   ")];
        let sel = select_pending::<&str>(&rows, None, ErrorRowPolicy::Skip);
        assert_eq!(sel.indices, vec![1]);
    }

    #[test]
    fn test_rows_without_locale_are_ignored() {
        let rows = vec![row("", "Hej", ""), row("  ", "Hej", "")];
        let sel = select_pending::<&str>(&rows, None, ErrorRowPolicy::Skip);
        assert!(sel.indices.is_empty());
        assert!(sel.locale_stats.is_empty());
    }

    #[test]
    fn test_error_rows_follow_policy() {
        let rows = vec![row("de", "Hej", "[ERROR] Hej"), row("de", "Ja", "Ja")];
        let skip = select_pending::<&str>(&rows, None, ErrorRowPolicy::Skip);
        assert!(skip.indices.is_empty());
        let retry = select_pending::<&str>(&rows, None, ErrorRowPolicy::Retry);
        assert_eq!(retry.indices, vec![0]);
    }

    #[test]
    fn test_validate_columns() {
        let ok = ["Locale", " default content ", "translated content", "type", "field", "extra"];
        assert!(validate_columns(&ok).is_ok());
        let err = validate_columns(&["locale", "type"]).unwrap_err();
        assert!(err.contains("default content, translated content, field"));
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("de"), Some("tysk"));
        assert_eq!(language_name("ko"), Some("koreansk"));
        assert_eq!(language_name("xx"), None);
        assert_eq!(SUPPORTED_LANGUAGES.len(), 16);
    }

    #[test]
    fn test_locale_summary_counts_untranslated() {
        let rows = vec![row("de", "Hej", ""), row("de", "", ""), row("sv", "Hej", "Hej")];
        let stats = locale_summary(&rows);
        assert_eq!(stats["de"], LocaleStats { total_rows: 2, needs_translation: 2 });
        assert_eq!(stats["sv"], LocaleStats { total_rows: 1, needs_translation: 0 });
        assert_eq!(count_untranslated(&rows), 2);
    }

    struct Echo {
        fail_on: &'static str,
        calls: Mutex<usize>,
    }

    impl Completer for Echo {
        fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError> {
            *self.calls.lock().unwrap() += 1;
            if req.prompt == self.fail_on {
                return Err(AiError("rate_limit_exceeded".into()));
            }
            Ok(AiResponse {
                text: format!(" {} (oversat) ", req.prompt),
                provider: "echo".into(),
                model: String::new(),
            })
        }
    }

    #[test]
    fn test_translate_rows_marks_failures() {
        let mut rows = vec![
            row("de", "Hej", ""),
            row("de", "Stop", ""),
            row("xx", "Ukendt", ""),
            row("fr", "Tak", ""),
            row("de", "Færdig", "Fertig"),
        ];
        let completer = Echo { fail_on: "Stop", calls: Mutex::new(0) };
        let report = translate_rows(
            &completer,
            &mut rows,
            &["de", "xx"],
            ErrorRowPolicy::Skip,
            "gpt-4o-mini",
            &Throttle::none(),
        );
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.translated_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(rows[0].translated_content(), "Hej (oversat)");
        assert_eq!(rows[1].translated_content(), "[ERROR] Stop");
        assert_eq!(rows[2].translated_content(), "");
        assert_eq!(rows[3].translated_content(), "");
        assert_eq!(rows[4].translated_content(), "Fertig");
        assert_eq!(*completer.calls.lock().unwrap(), 2);

        // a second pass leaves marked rows alone unless asked to retry
        let again = select_pending(&rows, Some(&["de"]), ErrorRowPolicy::Skip);
        assert!(again.indices.is_empty());
        let retry = select_pending(&rows, Some(&["de"]), ErrorRowPolicy::Retry);
        assert_eq!(retry.indices, vec![1]);
    }
}
