use serde::Serialize;

use crate::ai::prompts::{compose, GenerationRequest, PromptMode, RevisionInstruction, VariationStyle};
use crate::ai::{AiError, AiRequest, Completer};
use crate::filter::filter_blocked_words;
use crate::models::profile::Profile;
use crate::render::markdown_to_html;
use crate::seo::meta::{body_markdown, extract_meta_description, extract_title, strip_meta_paragraphs};
use crate::throttle::Throttle;

/// Phrases models like to wrap a rewrite in; removed from revision output.
const ASSISTANT_CHATTER: &[&str] = &[
    "Her er den reviderede tekst:",
    "Her er teksten:",
    "Jeg håber, at dette opfylder dine behov",
    "Lad mig vide, hvis der er behov for yderligere ændringer",
    "---",
    "Her er resultatet:",
    "Her er den omskrevne version:",
    "Den reviderede tekst:",
];

/// Upper bound on the token budget of a raw `generate_text` call.
pub const RAW_MAX_TOKENS: u32 = 4000;

/// Which generation produced the text. Only enhanced output follows the
/// line contract with a `META:` line that has to be kept out of the HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Basic,
    Enhanced,
    Variation,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub title: String,
    pub meta_description: String,
    /// Filtered model output, title and meta lines included.
    pub text: String,
    /// Body only, without title and meta lines.
    pub body: String,
    pub html: String,
    pub keywords: String,
    pub profile: Option<String>,
}

/// Turn raw model output into title, meta description, text and HTML.
///
/// Blocked words are filtered from the text, then again from the rendered
/// HTML so words split by markup are caught too.
pub fn process(
    raw: &str,
    profile: Option<&Profile>,
    kind: OutputKind,
    include_meta: bool,
) -> GenerationResult {
    let blocked = profile.map(|p| p.blocked_terms()).unwrap_or_default();

    let text = if blocked.is_empty() {
        raw.to_string()
    } else {
        filter_blocked_words(raw, &blocked)
    };

    let mut html = markdown_to_html(&text);
    if !blocked.is_empty() {
        html = filter_blocked_words(&html, &blocked);
    }
    if kind == OutputKind::Enhanced {
        html = strip_meta_paragraphs(&html);
    }

    GenerationResult {
        title: extract_title(&text),
        meta_description: extract_meta_description(&text, include_meta),
        body: body_markdown(&text),
        text,
        html,
        keywords: String::new(),
        profile: profile.map(|p| p.name.clone()),
    }
}

/// Drop filler phrases and stray separator dashes from a rewrite.
pub fn strip_assistant_chatter(text: &str) -> String {
    let mut out = text.trim().to_string();
    for phrase in ASSISTANT_CHATTER {
        out = out.replace(phrase, "").trim().to_string();
    }
    out.trim_matches('-').trim().to_string()
}

// ── Flows ─────────────────────────────────────────────

/// Basic or enhanced single-text generation.
pub fn generate(
    completer: &dyn Completer,
    profile: Option<&Profile>,
    req: &GenerationRequest,
    enhanced: bool,
    model: &str,
) -> Result<GenerationResult, AiError> {
    let (mode, kind) = if enhanced {
        (PromptMode::Enhanced(req), OutputKind::Enhanced)
    } else {
        (PromptMode::Basic(req), OutputKind::Basic)
    };
    let ai_req = compose(&mode, profile).with_model(model);
    log::debug!("[ai] {:?} prompt: {} chars", kind, ai_req.prompt.len());

    let resp = completer.complete(&ai_req)?;
    log::debug!("[ai] {:?} output: {} chars", kind, resp.text.len());

    let mut result = process(&resp.text, profile, kind, req.include_meta);
    result.keywords = req.keywords.trim().to_string();
    Ok(result)
}

#[derive(Debug, Clone, Serialize)]
pub struct Variation {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub title: String,
    pub content: String,
    pub html_content: String,
    pub keywords: String,
    pub temperature: f32,
    pub approach: Option<String>,
    pub error: Option<String>,
}

/// Generate up to five texts for the same keywords, one per variation
/// style. A failed variation is recorded in its slot and the loop continues.
pub fn generate_variations(
    completer: &dyn Completer,
    profile: &Profile,
    keywords: &str,
    count: usize,
    model: &str,
    throttle: &Throttle,
) -> Vec<Variation> {
    let keywords = keywords.trim();
    let styles = VariationStyle::first(count);
    let mut results = Vec::with_capacity(styles.len());

    for (i, style) in styles.iter().enumerate() {
        log::info!("[ai] Generating variation {}: {}", i + 1, style.name());
        let ai_req = compose(
            &PromptMode::Variation {
                keywords,
                style: *style,
            },
            Some(profile),
        )
        .with_model(model);

        let outcome = completer.complete(&ai_req);
        let succeeded = outcome.is_ok();
        let rate_limited = outcome.as_ref().err().map(|e| e.is_rate_limit()).unwrap_or(false);

        let variation = match outcome {
            Ok(resp) => {
                let processed = process(&resp.text, Some(profile), OutputKind::Variation, false);
                let title = if processed.title.is_empty() {
                    format!("{} - {}", keywords, style.name())
                } else {
                    processed.title
                };
                Variation {
                    id: i + 1,
                    name: style.name().into(),
                    description: style.description().into(),
                    title,
                    content: processed.text,
                    html_content: processed.html,
                    keywords: keywords.to_string(),
                    temperature: style.temperature(),
                    approach: Some(style.approach().into()),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("[ai] Variation {} failed: {}", i + 1, e);
                Variation {
                    id: i + 1,
                    name: style.name().into(),
                    description: style.description().into(),
                    title: format!("Fejl i {}", style.name()),
                    content: format!("Fejl ved generering: {}", e),
                    html_content: format!("<p>Fejl ved generering: {}</p>", e),
                    keywords: keywords.to_string(),
                    temperature: style.temperature(),
                    approach: None,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(variation);

        if i + 1 < styles.len() {
            throttle.pause(succeeded, rate_limited);
        }
    }

    results
}

#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    pub revised_text: String,
    pub revised_html: String,
}

/// Rewrite a whole text according to an instruction.
pub fn revise(
    completer: &dyn Completer,
    profile: Option<&Profile>,
    text: &str,
    instruction: &RevisionInstruction,
    model: &str,
) -> Result<Revision, AiError> {
    let ai_req = compose(
        &PromptMode::Revision {
            text: text.trim(),
            instruction,
        },
        profile,
    )
    .with_model(model);
    let resp = completer.complete(&ai_req)?;

    let mut revised = resp.text.trim().to_string();
    let blocked = profile.map(|p| p.blocked_terms()).unwrap_or_default();
    if !blocked.is_empty() {
        revised = filter_blocked_words(&revised, &blocked);
    }
    let revised = strip_assistant_chatter(&revised);

    Ok(Revision {
        revised_html: markdown_to_html(&revised),
        revised_text: revised,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionEdit {
    pub edited_selection: String,
    pub new_full_text: String,
    pub original_selection: String,
}

/// Replace the characters `start..end` of `full_text` with `replacement`.
/// Offsets count characters and are clamped to the text.
pub fn splice_chars(full_text: &str, start: usize, end: usize, replacement: &str) -> String {
    let len = full_text.chars().count();
    let start = start.min(len);
    let end = end.clamp(start, len);
    let head: String = full_text.chars().take(start).collect();
    let tail: String = full_text.chars().skip(end).collect();
    format!("{}{}{}", head, replacement, tail)
}

/// Rewrite only the selected part of a text and splice the result back in.
pub fn edit_selection(
    completer: &dyn Completer,
    profile: Option<&Profile>,
    full_text: &str,
    selection: &str,
    range: (usize, usize),
    instruction: &RevisionInstruction,
    model: &str,
) -> Result<SelectionEdit, AiError> {
    let ai_req = compose(
        &PromptMode::SelectionEdit {
            selection: selection.trim(),
            instruction,
        },
        profile,
    )
    .with_model(model);
    let resp = completer.complete(&ai_req)?;

    let mut edited = resp.text.trim().to_string();
    let blocked = profile.map(|p| p.blocked_terms()).unwrap_or_default();
    if !blocked.is_empty() {
        edited = filter_blocked_words(&edited, &blocked);
    }

    Ok(SelectionEdit {
        new_full_text: splice_chars(full_text, range.0, range.1, &edited),
        edited_selection: edited,
        original_selection: selection.trim().to_string(),
    })
}

/// One-off translation of a text into a named language.
pub fn quick_translate(
    completer: &dyn Completer,
    text: &str,
    language: &str,
    model: &str,
) -> Result<String, AiError> {
    let ai_req = compose(
        &PromptMode::Translation {
            text: text.trim(),
            language,
            max_tokens: crate::ai::prompts::TRANSLATE_QUICK_MAX_TOKENS,
        },
        None,
    )
    .with_model(model);
    let resp = completer.complete(&ai_req)?;
    Ok(resp.text.trim().to_string())
}

/// Free-form completion of a bare prompt, no system instruction and no
/// post-processing.
pub fn generate_text(
    completer: &dyn Completer,
    prompt: &str,
    max_tokens: u32,
    temperature: f32,
    model: &str,
) -> Result<String, AiError> {
    let ai_req = AiRequest::new("", prompt.trim())
        .with_budget(max_tokens.clamp(1, RAW_MAX_TOKENS), temperature.clamp(0.0, 2.0))
        .with_model(model);
    let resp = completer.complete(&ai_req)?;
    Ok(resp.text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiResponse;
    use crate::models::profile::test_profile;
    use std::sync::Mutex;

    /// Replays canned answers in order and records every request.
    struct Scripted {
        answers: Mutex<Vec<Result<String, AiError>>>,
        seen: Mutex<Vec<AiRequest>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<&str, &str>>) -> Self {
            Scripted {
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .rev()
                        .map(|a| a.map(String::from).map_err(|e| AiError(e.into())))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Completer for Scripted {
        fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError> {
            self.seen.lock().unwrap().push(req.clone());
            let next = self
                .answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AiError("no more answers".into())));
            next.map(|text| AiResponse {
                text,
                provider: "scripted".into(),
                model: req.model.clone().unwrap_or_default(),
            })
        }
    }

    fn blocking_profile() -> Profile {
        let mut p = test_profile("Butik");
        p.blocked_words = vec!["billig".into()];
        p
    }

    #[test]
    fn test_process_enhanced_output() {
        let raw = "# Sådan vælger du rigtigt\nMETA: Kort beskrivelse\n\nEn billig løsning.\n\n## Mere\nTekst.";
        let profile = blocking_profile();
        let r = process(raw, Some(&profile), OutputKind::Enhanced, true);
        assert_eq!(r.title, "Sådan vælger du rigtigt");
        assert_eq!(r.meta_description, "Kort beskrivelse");
        assert!(r.text.contains("En prisvenlig løsning."));
        assert!(!r.html.contains("META"));
        assert!(!r.html.contains("billig"));
        assert!(r.html.starts_with("<h1>Sådan vælger du rigtigt</h1>"));
        assert!(!r.body.contains("META"));
        assert!(!r.body.contains("# Sådan"));
        assert_eq!(r.profile.as_deref(), Some("Butik"));
    }

    #[test]
    fn test_process_basic_keeps_meta_paragraph() {
        let raw = "# T\nMETA: synlig\n\nBrødtekst.";
        let r = process(raw, None, OutputKind::Basic, true);
        assert!(r.html.contains("META: synlig"));
    }

    #[test]
    fn test_html_is_filtered() {
        let raw = "## Billig og god\n\nEn *billig* stol.";
        let profile = blocking_profile();
        let r = process(raw, Some(&profile), OutputKind::Basic, false);
        assert_eq!(
            r.html,
            "<h2>prisvenlig og god</h2>\n<p>En <em>prisvenlig</em> stol.</p>"
        );
    }

    #[test]
    fn test_strip_assistant_chatter() {
        assert_eq!(
            strip_assistant_chatter("Her er den reviderede tekst:\n\nNy tekst her.\n---"),
            "Ny tekst her."
        );
        assert_eq!(strip_assistant_chatter("-- Kort --"), "Kort");
    }

    #[test]
    fn test_generate_enhanced_uses_model_and_echoes_keywords() {
        let completer = Scripted::new(vec![Ok("# Titel\nMETA: m\n\nBrød.")]);
        let req = GenerationRequest::for_keywords(" spiseborde ");
        let profile = test_profile("Butik");
        let r = generate(&completer, Some(&profile), &req, true, "gpt-4.1-mini").unwrap();
        assert_eq!(r.keywords, "spiseborde");
        assert_eq!(r.title, "Titel");
        let seen = completer.seen.lock().unwrap();
        assert_eq!(seen[0].model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(seen[0].max_tokens, Some(3000));
    }

    #[test]
    fn test_generate_propagates_model_errors() {
        let completer = Scripted::new(vec![Err("OpenAI returned 401")]);
        let req = GenerationRequest::for_keywords("x");
        let err = generate(&completer, None, &req, false, "gpt-3.5-turbo").unwrap_err();
        assert_eq!(err.0, "OpenAI returned 401");
    }

    #[test]
    fn test_variations_record_failures_and_continue() {
        let completer = Scripted::new(vec![
            Ok("# Første\nTekst"),
            Err("boom"),
            Ok("Ingen overskrift"),
        ]);
        let profile = blocking_profile();
        let out = generate_variations(&completer, &profile, "stole", 3, "m", &Throttle::none());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].title, "Første");
        assert_eq!(out[1].title, "Fejl i Engagerende Tilgang");
        assert_eq!(out[1].error.as_deref(), Some("boom"));
        assert_eq!(out[2].title, "stole - Ekspert Tilgang");
        assert_eq!(out[2].temperature, 0.7);
        assert_eq!(completer.seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_variation_count_is_clamped() {
        let completer = Scripted::new(vec![Ok("a"), Ok("b"), Ok("c"), Ok("d"), Ok("e"), Ok("f")]);
        let profile = test_profile("Butik");
        let out = generate_variations(&completer, &profile, "x", 10, "m", &Throttle::none());
        assert_eq!(out.len(), 5);
        let completer = Scripted::new(vec![Ok("a"), Ok("b")]);
        let out = generate_variations(&completer, &profile, "x", 0, "m", &Throttle::none());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_revise_filters_and_cleans() {
        let completer = Scripted::new(vec![Ok("Her er teksten:\nEn billig **stol**.")]);
        let profile = blocking_profile();
        let rev = revise(&completer, Some(&profile), "En stol.", &RevisionInstruction::Shorten, "m").unwrap();
        assert_eq!(rev.revised_text, "En prisvenlig **stol**.");
        assert_eq!(rev.revised_html, "<p>En prisvenlig <strong>stol</strong>.</p>");
        assert!(completer.seen.lock().unwrap()[0].prompt.contains("KRITISK"));
    }

    #[test]
    fn test_edit_selection_splices_by_chars() {
        let completer = Scripted::new(vec![Ok("  billig stol ")]);
        let profile = blocking_profile();
        let full = "Æbler og pærer. Gammel stol. Slut.";
        let start = full.find("Gammel stol").map(|b| full[..b].chars().count()).unwrap();
        let end = start + "Gammel stol".chars().count();
        let edit = edit_selection(
            &completer,
            Some(&profile),
            full,
            "Gammel stol",
            (start, end),
            &RevisionInstruction::Simplify,
            "m",
        )
        .unwrap();
        assert_eq!(edit.edited_selection, "prisvenlig stol");
        assert_eq!(edit.new_full_text, "Æbler og pærer. prisvenlig stol. Slut.");
        assert_eq!(edit.original_selection, "Gammel stol");
    }

    #[test]
    fn test_splice_clamps_offsets() {
        assert_eq!(splice_chars("abc", 5, 9, "x"), "abcx");
        assert_eq!(splice_chars("abc", 2, 1, "x"), "abxc");
    }

    #[test]
    fn test_quick_translate() {
        let completer = Scripted::new(vec![Ok(" Hallo Welt ")]);
        let out = quick_translate(&completer, "Hej verden", "tysk", "gpt-4o-mini").unwrap();
        assert_eq!(out, "Hallo Welt");
        let seen = completer.seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, Some(2000));
        assert!(seen[0].system.contains("til tysk"));
    }

    #[test]
    fn test_generate_text_sends_bare_prompt() {
        let completer = Scripted::new(vec![Ok(" Et kort digt. ")]);
        let out = generate_text(&completer, " Skriv et digt ", 100, 0.7, "gpt-3.5-turbo").unwrap();
        assert_eq!(out, "Et kort digt.");
        let seen = completer.seen.lock().unwrap();
        assert_eq!(seen[0].system, "");
        assert_eq!(seen[0].prompt, "Skriv et digt");
        assert_eq!(seen[0].max_tokens, Some(100));
        assert_eq!(seen[0].model.as_deref(), Some("gpt-3.5-turbo"));
    }

    #[test]
    fn test_generate_text_clamps_budget() {
        let completer = Scripted::new(vec![Ok("a"), Ok("b")]);
        generate_text(&completer, "p", 0, -1.0, "m").unwrap();
        generate_text(&completer, "p", 1_000_000, 9.0, "m").unwrap();
        let seen = completer.seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, Some(1));
        assert_eq!(seen[0].temperature, Some(0.0));
        assert_eq!(seen[1].max_tokens, Some(RAW_MAX_TOKENS));
        assert_eq!(seen[1].temperature, Some(2.0));
    }
}
