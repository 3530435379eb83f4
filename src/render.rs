use std::sync::OnceLock;

use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;

// ── Markdown → HTML ───────────────────────────────────

/// Render generated markdown to cleaned-up HTML.
/// Tables are supported and single newlines become `<br />`.
pub fn markdown_to_html(markdown: &str) -> String {
    clean_html(&markdown_to_raw_html(markdown))
}

/// Render markdown without the whitespace normalisation pass.
pub fn markdown_to_raw_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

// ── HTML normalisation ────────────────────────────────

struct CleanupPatterns {
    between_tags: Regex,
    close_then_open: Regex,
    paragraphs: Regex,
    after_heading: Regex,
    paragraph_then_heading: Regex,
}

fn patterns() -> &'static CleanupPatterns {
    static PATTERNS: OnceLock<CleanupPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| CleanupPatterns {
        between_tags: Regex::new(r">\s+<").expect("valid regex"),
        close_then_open: Regex::new(r"</([^>]+)><([^/>][^>]*)>").expect("valid regex"),
        paragraphs: Regex::new(r"</p>\s*<p>").expect("valid regex"),
        after_heading: Regex::new(r"</h([1-6])>\s*<").expect("valid regex"),
        paragraph_then_heading: Regex::new(r"</p>\s*<h([1-6])").expect("valid regex"),
    })
}

/// Normalise whitespace between tags so every block starts on its own line.
/// Running it on already-cleaned HTML returns the input unchanged.
pub fn clean_html(html: &str) -> String {
    let p = patterns();
    let out = p.between_tags.replace_all(html, "><");
    let out = p.close_then_open.replace_all(&out, "</$1>\n<$2>");
    let out = p.paragraphs.replace_all(&out, "</p>\n<p>");
    let out = p.after_heading.replace_all(&out, "</h$1>\n<");
    let out = p.paragraph_then_heading.replace_all(&out, "</p>\n<h$1");
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let html = markdown_to_html("# Titel\n\nFørste afsnit.\n\n## Underoverskrift\n\nAndet afsnit.");
        assert_eq!(
            html,
            "<h1>Titel</h1>\n<p>Første afsnit.</p>\n<h2>Underoverskrift</h2>\n<p>Andet afsnit.</p>"
        );
    }

    #[test]
    fn test_soft_break_becomes_br() {
        let html = markdown_to_html("linje et\nlinje to");
        assert!(html.contains("linje et<br />"));
        assert!(html.contains("linje to"));
    }

    #[test]
    fn test_bold_and_emphasis() {
        let html = markdown_to_html("Dette er **fed** og *kursiv*.");
        assert_eq!(html, "<p>Dette er <strong>fed</strong> og <em>kursiv</em>.</p>");
    }

    #[test]
    fn test_tables() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |";
        let html = markdown_to_html(md);
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("</tr>\n<tr>") || html.contains("</thead>\n<tbody>"));
    }

    #[test]
    fn test_all_heading_levels() {
        for level in 1..=6 {
            let md = format!("{} Overskrift", "#".repeat(level));
            let html = markdown_to_html(&md);
            assert_eq!(html, format!("<h{0}>Overskrift</h{0}>", level));
        }
    }

    #[test]
    fn test_clean_html_collapses_and_breaks() {
        let raw = "  <h2>A</h2>   <p>x</p>\n\n<p>y</p> <h3>B</h3>  ";
        assert_eq!(clean_html(raw), "<h2>A</h2>\n<p>x</p>\n<p>y</p>\n<h3>B</h3>");
    }

    #[test]
    fn test_clean_html_heading_before_closing_tag() {
        assert_eq!(
            clean_html("<div><h2>A</h2> </div>"),
            "<div><h2>A</h2>\n</div>"
        );
    }

    #[test]
    fn test_clean_html_idempotent() {
        let samples = [
            "<h1>T</h1>\n<p>a<br />\nb</p>\n<ul>\n<li>x</li>\n<li>y</li>\n</ul>\n",
            "  <table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>",
            "<p>tekst</p>   <h2>H</h2><p><strong>fed</strong> <em>kursiv</em></p>",
            "",
        ];
        for s in samples {
            let once = clean_html(s);
            assert_eq!(clean_html(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_render_is_stable() {
        let md = "# Titel\n\nTekst med **fed**.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert_eq!(markdown_to_html(md), markdown_to_html(md));
    }
}
