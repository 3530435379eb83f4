use std::sync::OnceLock;

use regex::Regex;

/// Meta descriptions synthesised from body text are cut to this many chars.
const FALLBACK_META_CHARS: usize = 150;
/// Body lines shorter than this are not used as a fallback meta description.
const FALLBACK_MIN_CHARS: usize = 50;

/// Title of the generated text: the first line starting with `# `.
pub fn extract_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with("# "))
        .map(|line| line[2..].trim().to_string())
        .unwrap_or_default()
}

/// True for a line carrying a meta description, either the Danish
/// "Meta beskrivelse: ..." form or a `META: ` prefixed line.
fn is_meta_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if !line.contains(':') {
        return false;
    }
    (lower.contains("meta") && lower.contains("beskrivelse")) || lower.starts_with("meta:")
}

/// Index and value of the line carrying the meta description: the first
/// meta line with text after its colon.
fn meta_line(text: &str) -> Option<(usize, String)> {
    text.lines().map(str::trim).enumerate().find_map(|(i, line)| {
        if line.starts_with("# ") || !is_meta_line(line) {
            return None;
        }
        let (_, rest) = line.split_once(':')?;
        let meta = rest.trim().trim_start_matches('*').trim();
        (!meta.is_empty()).then(|| (i, meta.to_string()))
    })
}

/// Meta description of the generated text.
///
/// Uses the first meta line (text after its first colon, with any bold
/// markers left by the label removed). When there is none
/// and `fallback` is set, the first plain body line longer than 50 chars is
/// used, cut to 150 chars with a trailing ellipsis.
pub fn extract_meta_description(text: &str, fallback: bool) -> String {
    if let Some((_, meta)) = meta_line(text) {
        return meta;
    }

    if !fallback {
        return String::new();
    }

    text.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with("**")
                && line.chars().count() > FALLBACK_MIN_CHARS
        })
        .map(|line| {
            if line.chars().count() > FALLBACK_META_CHARS {
                let cut: String = line.chars().take(FALLBACK_META_CHARS).collect();
                format!("{}...", cut)
            } else {
                line.to_string()
            }
        })
        .unwrap_or_default()
}

/// Generated text without its H1 title line and the meta description line,
/// ready to be stored as a body. Other lines mentioning a meta description
/// are body text and stay.
pub fn body_markdown(text: &str) -> String {
    let meta_index = meta_line(text).map(|(i, _)| i);
    let mut title_seen = false;
    let kept: Vec<&str> = text
        .lines()
        .enumerate()
        .filter(|(i, line)| {
            if !title_seen && line.trim().starts_with("# ") {
                title_seen = true;
                return false;
            }
            Some(*i) != meta_index
        })
        .map(|(_, line)| line)
        .collect();
    kept.join("\n").trim().to_string()
}

/// Drop every paragraph whose text contains a `META:` marker.
pub fn strip_meta_paragraphs(html: &str) -> String {
    static PARAGRAPH: OnceLock<Regex> = OnceLock::new();
    let re = PARAGRAPH.get_or_init(|| Regex::new(r"(?s)<p>(.*?)</p>\s*").expect("valid regex"));

    re.replace_all(html, |caps: &regex::Captures| {
        if caps[1].to_lowercase().contains("meta:") {
            String::new()
        } else {
            caps[0].to_string()
        }
    })
    .trim_end()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("# Sådan vælger du rigtigt\n\nBody..."),
            "Sådan vælger du rigtigt"
        );
        assert_eq!(extract_title("  #   Luft omkring  \ntekst"), "Luft omkring");
        assert_eq!(extract_title("## Ikke en H1\ntekst"), "");
    }

    #[test]
    fn test_extract_meta_danish_label() {
        let text = "# Titel\n**Meta beskrivelse:** Kort og præcis beskrivelse\nBrødtekst";
        assert_eq!(
            extract_meta_description(text, true),
            "Kort og præcis beskrivelse"
        );
        let plain = "# Titel\nMeta beskrivelse: Kort og præcis\nBrødtekst";
        assert_eq!(extract_meta_description(plain, false), "Kort og præcis");
    }

    #[test]
    fn test_extract_meta_prefixed_line() {
        let text = "# Titel\nMETA: Find den rette jakke til vinteren\nBrødtekst";
        assert_eq!(
            extract_meta_description(text, true),
            "Find den rette jakke til vinteren"
        );
    }

    #[test]
    fn test_meta_fallback_truncates() {
        let long = "a".repeat(200);
        let text = format!("# Titel\n\nKort linje\n{}\n", long);
        let meta = extract_meta_description(&text, true);
        assert_eq!(meta.chars().count(), 153);
        assert!(meta.ends_with("..."));
        assert_eq!(extract_meta_description(&text, false), "");
    }

    #[test]
    fn test_meta_fallback_skips_bold_and_headings() {
        let bold = format!("**{}**", "b".repeat(60));
        let body = "Dette er en almindelig brødtekstlinje som er længere end halvtreds tegn.";
        let text = format!("# Titel\n## {}\n{}\n{}", "h".repeat(60), bold, body);
        assert_eq!(extract_meta_description(&text, true), body);
    }

    #[test]
    fn test_body_markdown_drops_title_and_meta() {
        let text = "# Titel\nMETA: beskrivelse her\n\nFørste afsnit.\n\n## Del to\nMere.";
        assert_eq!(body_markdown(text), "Første afsnit.\n\n## Del to\nMere.");
    }

    #[test]
    fn test_body_markdown_keeps_sentences_about_meta_descriptions() {
        let text = "# Guide til SEO\nMETA: kort\n\nEn god metabeskrivelse er vigtig: den skal være under 155 tegn.\n\nSlut.";
        assert_eq!(
            body_markdown(text),
            "En god metabeskrivelse er vigtig: den skal være under 155 tegn.\n\nSlut."
        );
        assert_eq!(extract_meta_description(text, false), "kort");
    }

    #[test]
    fn test_strip_meta_paragraphs() {
        let html = "<h1>T</h1>\n<p>META: short desc</p>\n<p>Intro</p>\n<p>Slut</p>";
        assert_eq!(strip_meta_paragraphs(html), "<h1>T</h1>\n<p>Intro</p>\n<p>Slut</p>");
    }

    #[test]
    fn test_strip_meta_paragraph_with_markup() {
        let html = "<p>Intro</p>\n<p><strong>Meta:</strong> skjult</p>\n<p>Slut</p>";
        assert_eq!(strip_meta_paragraphs(html), "<p>Intro</p>\n<p>Slut</p>");
    }

    #[test]
    fn test_strip_meta_keeps_other_paragraphs_intact() {
        let html = "<p>Metadata er ikke en markør</p>";
        assert_eq!(strip_meta_paragraphs(html), html);
    }
}
