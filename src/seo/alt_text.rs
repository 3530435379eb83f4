/// Most words kept from the title before it is turned into alt text.
const MAX_ALT_WORDS: usize = 8;

/// Build image alt text from an article title.
///
/// The title is cut at the first `?` (or, failing that, at the first
/// `" – "` separator), capped at eight words, lower-cased and prefixed
/// with "Guide til".
pub fn build_alt_text(title: &str) -> String {
    let short = if let Some(pos) = title.find('?') {
        &title[..pos]
    } else if let Some(pos) = title.find(" – ") {
        &title[..pos]
    } else {
        title
    };

    let words: Vec<&str> = short.split_whitespace().collect();
    let phrase = if words.len() > MAX_ALT_WORDS {
        words[..MAX_ALT_WORDS].join(" ")
    } else {
        short.to_string()
    };

    format!("Guide til {}", phrase.to_lowercase())
}
