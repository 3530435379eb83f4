use regex::{NoExpand, RegexBuilder};

/// Replacement used for blocked terms with no entry in `REPLACEMENTS`.
pub const GENERIC_REPLACEMENT: &str = "kvalitetselement";

/// Known blocked terms and the phrasing that replaces them, keyed by the
/// lower-cased term.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("konkurrent", "anden leverandør"),
    ("billig", "prisvenlig"),
    ("billigt", "prismæssigt attraktivt"),
    ("dårlig", "mindre optimal"),
    ("problem", "udfordring"),
    ("fejl", "uoverensstemmelse"),
    ("svindel", "tvivlsom praksis"),
    ("spam", "uønsket indhold"),
    ("scam", "tvivlsom aktivitet"),
    ("bæredygtighed", "miljøansvar"),
    ("bæredygtig", "miljøvenlig"),
    ("bæredyg", "miljøvenlig"),
    ("klima", "miljø"),
    ("klimavenlig", "miljøvenlig"),
    ("skovbrug", "træforvaltning"),
    ("statement piece", "designelement"),
];

/// Replacement phrasing for a blocked term.
pub fn replacement_for(term: &str) -> &'static str {
    let key = term.trim().to_lowercase();
    REPLACEMENTS
        .iter()
        .find(|(blocked, _)| *blocked == key)
        .map(|(_, replacement)| *replacement)
        .unwrap_or(GENERIC_REPLACEMENT)
}

/// Flatten a blocked-word list into individual terms.
/// Entries may themselves hold several comma-separated terms; every term is
/// trimmed and empty ones are dropped. Order is preserved.
pub fn normalize_blocked_words<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| entry.as_ref().split(','))
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Replace every whole-word, case-insensitive occurrence of a blocked term.
///
/// Terms are applied one after another, each seeing the text produced by the
/// previous one. Replacement text is not rescanned for terms that were
/// already applied.
pub fn filter_blocked_words<S: AsRef<str>>(text: &str, blocked_words: &[S]) -> String {
    if text.is_empty() || blocked_words.is_empty() {
        return text.to_string();
    }

    let mut filtered = text.to_string();
    let mut found: Vec<String> = Vec::new();

    for term in normalize_blocked_words(blocked_words) {
        let pattern = format!(r"\b{}\b", regex::escape(&term));
        let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                log::warn!("Skipping blocked word {:?}: {}", term, e);
                continue;
            }
        };

        let matches: Vec<String> = re
            .find_iter(&filtered)
            .map(|m| m.as_str().to_string())
            .collect();
        if matches.is_empty() {
            continue;
        }

        found.extend(matches);
        filtered = re
            .replace_all(&filtered, NoExpand(replacement_for(&term)))
            .into_owned();
    }

    if !found.is_empty() {
        log::info!("Filtered blocked words: {:?}", found);
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_mapped_term() {
        assert_eq!(
            filter_blocked_words("Det er billigt", &["billigt"]),
            "Det er prismæssigt attraktivt"
        );
    }

    #[test]
    fn test_whole_word_only() {
        // "billig" must not match inside "billigt"
        assert_eq!(
            filter_blocked_words("Dette er billigt.", &["billig"]),
            "Dette er billigt."
        );
        assert_eq!(
            filter_blocked_words("En billig løsning", &["billig"]),
            "En prisvenlig løsning"
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            filter_blocked_words("KLIMA og Klima", &["klima"]),
            "miljø og miljø"
        );
    }

    #[test]
    fn test_unmapped_term_uses_generic() {
        assert_eq!(
            filter_blocked_words("Vores gadget er god", &["gadget"]),
            format!("Vores {} er god", GENERIC_REPLACEMENT)
        );
    }

    #[test]
    fn test_comma_joined_entries_are_flattened() {
        let words = vec!["problem, fejl".to_string(), " ".to_string(), "spam".to_string()];
        assert_eq!(
            normalize_blocked_words(&words),
            vec!["problem", "fejl", "spam"]
        );
        assert_eq!(
            filter_blocked_words("Et problem, en fejl og spam", &words),
            "Et udfordring, en uoverensstemmelse og uønsket indhold"
        );
    }

    #[test]
    fn test_multi_word_term() {
        assert_eq!(
            filter_blocked_words("Et ægte statement piece i stuen", &["statement piece"]),
            "Et ægte designelement i stuen"
        );
    }

    #[test]
    fn test_idempotent() {
        let words = ["billig", "klima", "konkurrent", "bæredygtig"];
        let text = "Billig og bæredygtig – bedre end din konkurrent. Klima er vigtigt.";
        let once = filter_blocked_words(text, &words);
        let twice = filter_blocked_words(&once, &words);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_replacement_text_is_not_special() {
        // "$" in the source must survive untouched next to a replacement
        assert_eq!(
            filter_blocked_words("spam $1", &["spam"]),
            "uønsket indhold $1"
        );
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert_eq!(filter_blocked_words("tekst", &none), "tekst");
        assert_eq!(filter_blocked_words("", &["spam"]), "");
    }

    #[test]
    fn test_later_terms_see_earlier_replacements() {
        // "bæredygtig" becomes "miljøvenlig", which the next term then replaces
        let out = filter_blocked_words("bæredygtig", &["bæredygtig", "miljøvenlig"]);
        assert_eq!(out, GENERIC_REPLACEMENT);
    }
}
