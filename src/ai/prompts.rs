use serde::Deserialize;

use super::AiRequest;
use crate::models::profile::Profile;

// ── System instructions ───────────────────────────────

const SEO_SYSTEM: &str = "Du er en ekspert SEO-tekstforfatter der skriver på dansk. Du fokuserer altid på keyword-relevans og undgår generelle virksomhedsoplysninger der ikke relaterer til det specifikke keyword.";
const ENHANCED_SYSTEM_SUFFIX: &str = " Du følger danske sproglige konventioner og skriver engagerende indhold.";
const REVISION_SYSTEM: &str = "Du er en ekspert tekstredaktør der laver præcise ændringer til tekst. Du returnerer KUN den redigerede tekst uden forklaringer eller kommentarer.";
const EDIT_SYSTEM: &str = "Du er en ekspert tekstredaktør der laver præcise ændringer til valgte tekstafsnit uden at påvirke andre dele af teksten.";

/// Company descriptions longer than this are cut before they reach a prompt.
const COMPANY_CONTEXT_CHARS: usize = 150;
const MAX_INTERNAL_LINKS: usize = 3;

// ── Token budgets ─────────────────────────────────────

pub const BASIC_MAX_TOKENS: u32 = 1500;
pub const ENHANCED_MIN_TOKENS: u32 = 3000;
pub const VARIATION_MAX_TOKENS: u32 = 2000;
pub const REVISION_MAX_TOKENS: u32 = 1500;
pub const TRANSLATE_ROW_MAX_TOKENS: u32 = 4000;
pub const TRANSLATE_QUICK_MAX_TOKENS: u32 = 2000;
pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const TRANSLATE_TEMPERATURE: f32 = 0.3;

/// Room for roughly `words` words of output plus title, meta and markup.
pub fn enhanced_max_tokens(words: u32) -> u32 {
    let estimated = (words as f64 * 1.5) as u32 + 500;
    estimated.max(ENHANCED_MIN_TOKENS)
}

// ── Generation request ────────────────────────────────

fn default_audience() -> String {
    "Alle".into()
}
fn default_purpose() -> String {
    "Information".into()
}
fn default_content_type() -> String {
    "Blog Post".into()
}
fn default_text_length() -> u32 {
    500
}
fn yes() -> bool {
    true
}

/// What the caller asked for in a single generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub keywords: String,
    #[serde(default)]
    pub secondary_keywords: String,
    #[serde(default)]
    pub lsi_keywords: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    #[serde(default = "default_purpose")]
    pub content_purpose: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub custom_instructions: String,
    #[serde(default = "default_text_length")]
    pub text_length: u32,
    #[serde(default = "yes", alias = "includeMetaDesc")]
    pub include_meta: bool,
    #[serde(default = "yes", alias = "includeKeywords")]
    pub include_keywords: bool,
    #[serde(default)]
    pub include_faq: bool,
    #[serde(default)]
    pub include_cta: bool,
    #[serde(default)]
    pub include_schema: bool,
    #[serde(default)]
    pub include_internal_links: bool,
    #[serde(default)]
    pub selected_products: Vec<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

#[cfg(test)]
impl GenerationRequest {
    pub fn for_keywords(keywords: &str) -> Self {
        GenerationRequest {
            keywords: keywords.to_string(),
            secondary_keywords: String::new(),
            lsi_keywords: String::new(),
            target_audience: default_audience(),
            content_purpose: default_purpose(),
            content_type: default_content_type(),
            custom_instructions: String::new(),
            text_length: default_text_length(),
            include_meta: true,
            include_keywords: true,
            include_faq: false,
            include_cta: false,
            include_schema: false,
            include_internal_links: false,
            selected_products: Vec::new(),
            profile: None,
        }
    }
}

// ── Variations ────────────────────────────────────────

/// The fixed approaches used for batch generation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationStyle {
    Focused,
    Engaging,
    Expert,
    SolutionOriented,
    Creative,
}

impl VariationStyle {
    pub const ALL: [VariationStyle; 5] = [
        VariationStyle::Focused,
        VariationStyle::Engaging,
        VariationStyle::Expert,
        VariationStyle::SolutionOriented,
        VariationStyle::Creative,
    ];

    /// The first `count` styles, with `count` clamped to 2..=5.
    pub fn first(count: usize) -> &'static [VariationStyle] {
        &Self::ALL[..count.clamp(2, Self::ALL.len())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Focused => "Fokuseret Tilgang",
            Self::Engaging => "Engagerende Tilgang",
            Self::Expert => "Ekspert Tilgang",
            Self::SolutionOriented => "Løsningsorienteret",
            Self::Creative => "Kreativ Vinkel",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Focused => "Konkret og direkte tilgang til emnet",
            Self::Engaging => "Mere engagerende og personlig stil",
            Self::Expert => "Dybdegående og autoritativ vinkel",
            Self::SolutionOriented => "Fokus på problemer og løsninger",
            Self::Creative => "Unik og kreativ tilgang til emnet",
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            Self::Focused => 0.6,
            Self::Engaging => 0.8,
            Self::Expert => 0.7,
            Self::SolutionOriented => 0.75,
            Self::Creative => 0.9,
        }
    }

    pub fn approach(&self) -> &'static str {
        match self {
            Self::Focused => "Skriv en fokuseret og konkret tekst der går direkte til sagen og giver praktiske informationer.",
            Self::Engaging => "Skriv en engagerende tekst der fanger læserens interesse med personlige elementer og relaterbare eksempler.",
            Self::Expert => "Skriv en autoritativ tekst der viser ekspertise og går i dybden med tekniske detaljer og baggrundsviden.",
            Self::SolutionOriented => "Skriv en løsningsorienteret tekst der identificerer problemer og præsenterer konkrete løsninger.",
            Self::Creative => "Skriv en kreativ tekst med en unik vinkel eller perspektiv der adskiller sig fra mainstream tilgange.",
        }
    }

    pub fn style(&self) -> &'static str {
        match self {
            Self::Focused => "Klar og direkte kommunikation med fokus på faktuelle oplysninger og praktisk anvendelse.",
            Self::Engaging => "Varm og personlig tone der skaber forbindelse til læseren gennem historier og relaterbare situationer.",
            Self::Expert => "Professionel og pålidelig tone der demonstrerer dyb viden og troværdighed inden for emnet.",
            Self::SolutionOriented => "Hjælpsom og løsningsorienteret tilgang med fokus på at guide læseren til handling.",
            Self::Creative => "Innovativ og tankevækkende tilgang der udfordrer konventionel tænkning og byder på nye perspektiver.",
        }
    }
}

// ── Revision instructions ─────────────────────────────

/// How a text (or a selected part of it) should be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionInstruction {
    Shorten,
    Lengthen,
    MorePersuasive,
    FreshAngle,
    Simplify,
    Custom(String),
}

impl RevisionInstruction {
    /// Map an instruction keyword to its kind; anything unknown is kept as a
    /// free-form instruction.
    pub fn parse(instruction: &str) -> Self {
        let trimmed = instruction.trim();
        match trimmed.to_lowercase().as_str() {
            "forkort" | "shorten" => Self::Shorten,
            "forlæng" | "lengthen" => Self::Lengthen,
            "gør mere sælgende" | "more persuasive" => Self::MorePersuasive,
            "ny vinkel" | "fresh angle" => Self::FreshAngle,
            "mere simpel" | "simplify" => Self::Simplify,
            _ => Self::Custom(trimmed.to_string()),
        }
    }
}

/// Whether a rewrite targets a whole text or a selection inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteScope {
    WholeText,
    Selection,
}

struct RewriteTemplate {
    heading: String,
    selection_label: &'static str,
    result: &'static str,
    before_format: &'static [&'static str],
    after_grammar: &'static [&'static str],
}

fn rewrite_template(instruction: &RevisionInstruction) -> RewriteTemplate {
    match instruction {
        RevisionInstruction::Shorten => RewriteTemplate {
            heading: "Forkort KUN det følgende tekstafsnit betydeligt, mens du bevarer de vigtigste pointer og budskabet:".into(),
            selection_label: "Tekst der skal forkortes:",
            result: "den forkortede version",
            before_format: &["Bevar den oprindelige tone og stil"],
            after_grammar: &["Reducer længden med mindst 30-50%"],
        },
        RevisionInstruction::Lengthen => RewriteTemplate {
            heading: "Forlæng KUN det følgende tekstafsnit med flere detaljer, eksempler eller forklaringer:".into(),
            selection_label: "Tekst der skal forlænges:",
            result: "den forlængede version",
            before_format: &[
                "Tilføj relevant indhold der uddyber emnet",
                "Bevar den oprindelige tone og stil",
            ],
            after_grammar: &["Sigt efter at udvide teksten med 30-50% mere indhold"],
        },
        RevisionInstruction::MorePersuasive => RewriteTemplate {
            heading: "Omskriv KUN det følgende tekstafsnit for at gøre det mere overbevisende og sælgende:".into(),
            selection_label: "Tekst der skal gøres mere sælgende:",
            result: "den mere sælgende version",
            before_format: &[
                "Tilføj overbevisende elementer, fordele og call-to-action",
                "Bevar den oprindelige tone men gør den mere engagerende",
            ],
            after_grammar: &[],
        },
        RevisionInstruction::FreshAngle => RewriteTemplate {
            heading: "Omskriv KUN det følgende tekstafsnit med en ny og frisk vinkel eller tilgang:".into(),
            selection_label: "Tekst der skal have ny vinkel:",
            result: "versionen med ny vinkel",
            before_format: &[
                "Bevar samme information men præsenter den fra en ny vinkel",
                "Bevar den oprindelige tone og stil",
            ],
            after_grammar: &[],
        },
        RevisionInstruction::Simplify => RewriteTemplate {
            heading: "Omskriv KUN det følgende tekstafsnit for at gøre det mere simpelt og lettere at forstå:".into(),
            selection_label: "Tekst der skal simplificeres:",
            result: "den simplificerede version",
            before_format: &[
                "Brug simplere ord og kortere sætninger",
                "Gør komplekse koncepter mere tilgængelige",
            ],
            after_grammar: &[],
        },
        RevisionInstruction::Custom(text) => RewriteTemplate {
            heading: format!(
                "Omskriv KUN det følgende tekstafsnit baseret på denne instruktion: \"{}\"",
                text
            ),
            selection_label: "Tekst der skal omskrives:",
            result: "den omskrevne version",
            before_format: &[],
            after_grammar: &[],
        },
    }
}

fn rewrite_prompt(
    instruction: &RevisionInstruction,
    text: &str,
    scope: RewriteScope,
    blocked_words: &[String],
) -> String {
    let t = rewrite_template(instruction);
    let mut lines: Vec<String> = vec![t.heading, String::new()];

    if scope == RewriteScope::Selection {
        lines.push(t.selection_label.to_string());
    }
    lines.push(text.to_string());
    lines.push(String::new());
    lines.push("VIGTIGT:".into());

    match scope {
        RewriteScope::WholeText => {
            lines.push(format!("- Returner KUN {} af afsnittet, intet andet", t.result));
            lines.push("- Ingen forklaringer, ingen \"Her er teksten:\", ingen kommentarer".into());
        }
        RewriteScope::Selection => {
            lines.push(format!(
                "- Returner KUN {} af det valgte afsnit, intet andet",
                t.result
            ));
        }
    }
    lines.extend(t.before_format.iter().map(|l| format!("- {}", l)));
    lines.push("- Bevar formatering hvis relevant (markdown overskrifter etc.)".into());
    lines.push("- Dansk retskrivning og grammatik".into());
    lines.extend(t.after_grammar.iter().map(|l| format!("- {}", l)));

    if scope == RewriteScope::WholeText && !blocked_words.is_empty() {
        lines.push(format!(
            "- KRITISK: Du må ALDRIG bruge disse ord: {}",
            blocked_words.join(", ")
        ));
    }

    lines.join("\n")
}

// ── Composer ──────────────────────────────────────────

/// A prompt to build, with the data only that mode needs.
#[derive(Debug, Clone)]
pub enum PromptMode<'a> {
    Basic(&'a GenerationRequest),
    Enhanced(&'a GenerationRequest),
    Variation {
        keywords: &'a str,
        style: VariationStyle,
    },
    Revision {
        text: &'a str,
        instruction: &'a RevisionInstruction,
    },
    SelectionEdit {
        selection: &'a str,
        instruction: &'a RevisionInstruction,
    },
    Translation {
        text: &'a str,
        language: &'a str,
        max_tokens: u32,
    },
}

/// Build the model request for a mode. Callers validate keywords, profile
/// and API key beforehand.
pub fn compose(mode: &PromptMode<'_>, profile: Option<&Profile>) -> AiRequest {
    let blocked = profile.map(|p| p.blocked_terms()).unwrap_or_default();
    match mode {
        PromptMode::Basic(req) => AiRequest::new(SEO_SYSTEM, basic_prompt(req, profile))
            .with_budget(BASIC_MAX_TOKENS, GENERATION_TEMPERATURE),
        PromptMode::Enhanced(req) => AiRequest::new(
            format!("{}{}", SEO_SYSTEM, ENHANCED_SYSTEM_SUFFIX),
            enhanced_prompt(req, profile),
        )
        .with_budget(enhanced_max_tokens(req.text_length), GENERATION_TEMPERATURE),
        PromptMode::Variation { keywords, style } => AiRequest::new(
            format!("Du er en ekspert SEO-tekstforfatter der skriver på dansk. {}", style.style()),
            variation_prompt(keywords, *style, profile),
        )
        .with_budget(VARIATION_MAX_TOKENS, style.temperature()),
        PromptMode::Revision { text, instruction } => AiRequest::new(
            REVISION_SYSTEM,
            rewrite_prompt(instruction, text, RewriteScope::WholeText, &blocked),
        )
        .with_budget(REVISION_MAX_TOKENS, GENERATION_TEMPERATURE),
        PromptMode::SelectionEdit {
            selection,
            instruction,
        } => AiRequest::new(
            EDIT_SYSTEM,
            rewrite_prompt(instruction, selection, RewriteScope::Selection, &[]),
        )
        .with_budget(REVISION_MAX_TOKENS, GENERATION_TEMPERATURE),
        PromptMode::Translation {
            text,
            language,
            max_tokens,
        } => AiRequest::new(translation_system(language), *text)
            .with_budget(*max_tokens, TRANSLATE_TEMPERATURE),
    }
}

pub fn translation_system(language: &str) -> String {
    format!(
        "Du er en professionel oversætter. Oversæt nøjagtigt og ordret fra dansk til {}. \
         Bevar alle HTML-tags og strukturen præcis som den er. Du må ikke forklare noget. \
         Returnér KUN den oversatte tekst.",
        language
    )
}

/// Company description trimmed so it cannot crowd out the keyword.
pub fn company_context(description: &str) -> String {
    if description.chars().count() <= COMPANY_CONTEXT_CHARS {
        return description.to_string();
    }
    let first_sentence = format!("{}.", description.split('.').next().unwrap_or(""));
    if first_sentence.chars().count() <= COMPANY_CONTEXT_CHARS {
        first_sentence
    } else {
        let cut: String = description.chars().take(COMPANY_CONTEXT_CHARS - 3).collect();
        format!("{}...", cut)
    }
}

fn basic_prompt(req: &GenerationRequest, profile: Option<&Profile>) -> String {
    let keywords = req.keywords.trim();
    let mut parts: Vec<String> = vec![
        format!(
            "PRIMÆRT FOKUS: Skriv SEO-optimeret indhold der er 100% relevant for keywordet: {}",
            keywords
        ),
        format!(
            "VIGTIGT: Hele teksten skal handle om '{}' - undgå generelle oplysninger der ikke relaterer direkte til dette emne.",
            keywords
        ),
    ];

    if let Some(p) = profile {
        let product_info: Vec<String> = p
            .products
            .iter()
            .filter(|prod| !prod.description.is_empty())
            .map(|prod| format!("- {}: {}", prod.name, prod.description))
            .collect();
        if !product_info.is_empty() {
            parts.push(format!(
                "\nHØJ PRIORITET - Integrer disse produkter naturligt med '{}':\n{}",
                keywords,
                product_info.join("\n")
            ));
        }
    }

    let settings = profile.map(|p| p.settings.clone()).unwrap_or_default();
    parts.push("\nIndstillinger:".into());
    parts.push(format!("- Tone: {}", settings.tone));
    parts.push(format!("- Målgruppe: {}", settings.target_audience));
    parts.push(format!("- Sprog: {}", settings.language));
    parts.push(format!("- SEO fokus: {}", settings.seo_focus));
    parts.push("\nStruktur:".into());

    if req.include_meta {
        parts.push("- H1 overskrift med keyword".into());
        parts.push("- Meta beskrivelse (150-160 tegn)".into());
    }
    parts.push(format!(
        "- Hovedindhold fokuseret på '{}' med naturlig keyword-integration",
        keywords
    ));
    if req.include_keywords {
        parts.push("- Naturlig variation af keywords gennem teksten".into());
    }
    parts.push("- Relevant call-to-action".into());
    parts.push("\nFormater med markdown for overskrifter og formatering.".into());
    parts.push("\nSkriv teksten med professionel struktur og god læsbarhed.".into());
    parts.push("VIGTIGT: Brug markdown-format med overskrifter (# for H1, ## for H2, ### for H3) og fed tekst (**tekst**).".into());
    parts.push(format!(
        "HUSK: Alt indhold skal være relevant for '{}' - undgå off-topic information.",
        keywords
    ));

    let blocked = profile.map(|p| p.blocked_terms()).unwrap_or_default();
    if !blocked.is_empty() {
        parts.push(format!(
            "\nKRITISK VIGTIG: Du må ALDRIG bruge disse ord i teksten: {}",
            blocked.join(", ")
        ));
        parts.push("Find alternative formuleringer for disse ord.".into());
    }

    parts.join("\n")
}

fn enhanced_prompt(req: &GenerationRequest, profile: Option<&Profile>) -> String {
    let keywords = req.keywords.trim();
    let words = req.text_length;
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!(
        "Du er en ekspert SEO-tekstforfatter. PRIMÆRT FOKUS: Alt indhold skal være 100% relevant for keywordet '{}'.",
        keywords
    ));
    parts.push(format!(
        "VIGTIGT: Undgå generelle virksomhedsoplysninger der ikke direkte relaterer til '{}'. Dit output SKAL struktureres PRÆCIS sådan:",
        keywords
    ));

    // line 1: title
    parts.push("1. ALLERFØRSTE linje: KUN den foreslåede H1-titel til teksten, startende med '# '.".into());
    parts.push(format!(
        "   - H1-titlen skal følge reglen om kun stort begyndelsesbogstav i første ord samt i eventuelle egennavne (sentence case). SKAL indeholde det primære keyword '{}' eller en tæt variant.",
        keywords
    ));
    parts.push(format!(
        "   - H1 skal være specifik for '{}' - ikke generel virksomhedsinfo.",
        keywords
    ));
    parts.push("   - Eksempel KORREKT H1: '# Sådan vælger du den rigtige boremaskine' | Eksempel FORKERT H1: '# Sådan Vælger Du Den Rigtige Boremaskine'".into());

    // line 2: meta
    if req.include_meta {
        parts.push("2. ANDEN linje: KUN den foreslåede Meta Beskrivelse (max 155 tegn), startende med 'META: '. INGEN andre markeringer.".into());
        parts.push("   - Meta Beskrivelsen må ALDRIG inkluderes i brødteksten nedenfor.".into());
        parts.push("   - Meta beskrivelsen er KUN til søgemaskiner - ikke synlig tekst for læseren.".into());
    }

    // remaining lines: body
    let body_start = if req.include_meta { "3. TREDJE" } else { "2. ANDEN" };
    parts.push(format!(
        "{} linje og FREMEFTER: KUN selve brødteksten (body content) til SEO-teksten på PRÆCIS {} ord.",
        body_start, words
    ));
    parts.push(format!(
        "   - VIGTIGT: Teksten SKAL være mindst {} ord lang. Hvis du er i tvivl, skriv længere frem for kortere.",
        words
    ));
    parts.push("   - Brødteksten må IKKE indeholde H1-titlen eller Meta Beskrivelsen igen.".into());
    parts.push(format!(
        "   - Start ALTID brødteksten med en kort, engagerende indledning (2-3 sætninger) om '{}', der fanger læserens interesse.",
        keywords
    ));
    parts.push(format!(
        "   - HELE teksten skal handle om '{}' - undgå generelle virksomhedsoplysninger der ikke relaterer til emnet.",
        keywords
    ));
    parts.push(format!(
        "   - Brug H2, H3, H4 underoverskrifter i brødteksten der alle relaterer til '{}'.",
        keywords
    ));
    parts.push(format!(
        "   - Hvis virksomhedsinfo nævnes, skal det være direkte relevant for '{}' - ikke generelle beskrivelser.",
        keywords
    ));
    parts.push("\n".into());

    if let Some(p) = profile {
        parts.push(format!("Virksomhed: {}", p.name));
        if !p.description.is_empty() {
            parts.push(format!(
                "Kort virksomhedskontext (brug kun hvis relevant for keywordet): {}",
                company_context(&p.description)
            ));
        }
        if !p.tone.is_empty() {
            parts.push(format!("Tone of Voice: {}", p.tone));
        }
        parts.push("\n".into());
    }

    parts.push(format!(
        "PRIMÆRT FOKUS: Skriv {} der er 100% optimeret for søgeordet '{}' målrettet {} med formål: {}",
        req.content_type, keywords, req.target_audience, req.content_purpose
    ));
    parts.push(format!(
        "VIGTIGT: Hele teksten skal være relevant for '{}' - undgå generelle virksomhedsoplysninger der ikke relaterer til dette keyword.",
        keywords
    ));
    if !req.secondary_keywords.trim().is_empty() {
        parts.push(format!(
            "Sekundære keywords til naturlig integration: {}",
            req.secondary_keywords.trim()
        ));
    }
    if !req.lsi_keywords.trim().is_empty() {
        parts.push(format!(
            "LSI keywords til semantisk relevans: {}",
            req.lsi_keywords.trim()
        ));
    }
    if !req.custom_instructions.trim().is_empty() {
        parts.push(format!(
            "\nFølg disse generelle instruktioner nøje:\n{}\n",
            req.custom_instructions.trim()
        ));
    }

    let mut features: Vec<&str> = Vec::new();
    if req.include_faq {
        features.push("FAQ sektion");
    }
    if req.include_cta {
        features.push("Call-to-action");
    }
    if req.include_schema {
        features.push("Schema markup (som tekst)");
    }
    if req.include_internal_links {
        features.push("Interne Links");
    }
    if !features.is_empty() {
        parts.push(format!("\nInkluder i brødteksten: {}", features.join(", ")));
    }

    parts.push("\n\nVIGTIGT (Brødtekst): Korrekt dansk retskrivning og grammatik er essentielt.".into());
    parts.push("DANSKE OVERSKRIFTER (H2/H3/H4): Følg danske regler - KUN stort begyndelsesbogstav i det første ord. Almindelige substantiver, adjektiver og verber skal være små.".into());
    parts.push("Eksempel KORREKT dansk: '## Møbeldesign team', '## Historie om virksomheden', '## Kvalitet og håndværk'".into());
    parts.push("Eksempel FORKERT engelsk stil: '## Møbeldesign Team', '## Historie Om Virksomheden', '## Kvalitet Og Håndværk'".into());
    parts.push("UNDTAGELSER: Kun egennavne (firmanavne, personnavne, stednavne) får stort begyndelsesbogstav: '## Noyer virksomhed', '## København som base'".into());

    // blocked words stay out of this mode; the output is filtered afterwards

    if let Some(p) = profile {
        if !req.selected_products.is_empty() {
            let infos: Vec<String> = req
                .selected_products
                .iter()
                .filter_map(|wanted| p.products.iter().find(|prod| &prod.name == wanted))
                .map(|prod| {
                    let mut info = format!("Produktnavn: {}", prod.name);
                    if !prod.description.is_empty() {
                        info.push_str(&format!("\nBeskrivelse: {}", prod.description));
                    }
                    if !prod.url.is_empty() {
                        info.push_str(&format!("\nURL: {}", prod.url));
                    }
                    info
                })
                .collect();
            if !infos.is_empty() {
                parts.push(format!(
                    "\n\nHØJ PRIORITET - Fokuser primært på disse produkter i relation til '{}':\n---\n{}\n---\nSkriv teksten så den naturligt integrerer disse produkter med keywordet '{}'. Produktinformation har højere prioritet end generel virksomhedsinfo.",
                    keywords,
                    infos.join("\n---\n"),
                    keywords
                ));
            }
        }

        if req.include_internal_links {
            let links = p.internal_link_list();
            if !links.is_empty() {
                let details: Vec<String> = links
                    .iter()
                    .take(MAX_INTERNAL_LINKS)
                    .map(|l| format!("  - {}", l))
                    .collect();
                parts.push(format!(
                    "\n\n**Interne Links:**\nHvis det er relevant og naturligt, flet da op til 3 af følgende interne links ind i teksten. Brug linkets navn som ankertekst.\n{}\nPrioriter links i en eventuel Call-to-Action sektion, hvis en sådan genereres.",
                    details.join("\n")
                ));
            }
        }
    }

    parts.join("\n")
}

fn variation_prompt(keywords: &str, style: VariationStyle, profile: Option<&Profile>) -> String {
    let keywords = keywords.trim();
    let mut parts: Vec<String> = vec![
        format!(
            "Du er en ekspert SEO-tekstforfatter. Skriv SEO-optimeret indhold for keywordet: '{}'",
            keywords
        ),
        format!("\nTILGANG: {}", style.approach()),
        format!("STIL: {}", style.style()),
        "\nSTRUKTUR:".into(),
        format!(
            "1. ALLERFØRSTE linje: H1-titel startende med '# ' og indeholder '{}'",
            keywords
        ),
        "2. TREDJE linje og fremefter: Brødtekst på mindst 400 ord".into(),
        format!(
            "3. Brug H2/H3 underoverskrifter der relaterer til '{}'",
            keywords
        ),
    ];

    if let Some(p) = profile {
        if !p.description.is_empty() {
            let cut: String = p.description.chars().take(COMPANY_CONTEXT_CHARS).collect();
            parts.push(format!(
                "\nVirksomhedskontext (brug kun hvis relevant): {}",
                cut
            ));
        }
        let blocked = p.blocked_terms();
        if !blocked.is_empty() {
            parts.push("\nVIGTIGT - BLOKEREDE ORD:".into());
            parts.push(format!(
                "- Du må ALDRIG bruge disse ord i teksten: {}",
                blocked.join(", ")
            ));
            parts.push("- Find alternative formuleringer for disse ord".into());
            parts.push("- Dette er kritisk vigtigt - disse ord må ikke forekomme".into());
        }
    }

    parts.push("\nVIGTIGT:".into());
    parts.push(format!("- Hele teksten skal handle om '{}'", keywords));
    parts.push("- Dansk retskrivning og grammatik".into());
    parts.push("- Formater med markdown".into());
    parts.push("- Gør teksten unik og forskellig fra standard tilgange".into());

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{test_profile, Product};

    fn shop() -> Profile {
        let mut p = test_profile("Noyer");
        p.description = "Vi laver møbler i massivt træ. Alt produceres i Danmark af erfarne snedkere, og vi har gjort det siden 1962 med et vedvarende fokus på kvalitet, holdbarhed og ærligt håndværk.".into();
        p.tone = "Varm".into();
        p.blocked_words = vec!["billig, spam".into()];
        p.internal_links = "https://noyer.dk/a\nhttps://noyer.dk/b\nhttps://noyer.dk/c\nhttps://noyer.dk/d".into();
        p.products = vec![
            Product {
                id: "1".into(),
                name: "Spisebord".into(),
                url: "https://noyer.dk/spisebord".into(),
                description: "Massivt egetræ".into(),
            },
            Product {
                id: "2".into(),
                name: "Stol".into(),
                url: String::new(),
                description: String::new(),
            },
        ];
        p
    }

    #[test]
    fn test_basic_injects_blocked_words_and_products() {
        let req = GenerationRequest::for_keywords("spiseborde");
        let ai = compose(&PromptMode::Basic(&req), Some(&shop()));
        assert!(ai.system.starts_with("Du er en ekspert SEO-tekstforfatter"));
        assert!(ai.prompt.contains("KRITISK VIGTIG: Du må ALDRIG bruge disse ord i teksten: billig, spam"));
        assert!(ai.prompt.contains("- Spisebord: Massivt egetræ"));
        // products without a description are left out
        assert!(!ai.prompt.contains("- Stol:"));
        assert!(ai.prompt.contains("- Tone: Professionel"));
        assert_eq!(ai.max_tokens, Some(BASIC_MAX_TOKENS));
    }

    #[test]
    fn test_basic_without_profile() {
        let mut req = GenerationRequest::for_keywords("vinterjakker");
        req.include_meta = false;
        let ai = compose(&PromptMode::Basic(&req), None);
        assert!(!ai.prompt.contains("Meta beskrivelse"));
        assert!(!ai.prompt.contains("KRITISK"));
        assert!(ai.prompt.contains("- Målgruppe: Alle"));
    }

    #[test]
    fn test_enhanced_line_contract() {
        let mut req = GenerationRequest::for_keywords("spiseborde");
        req.text_length = 800;
        let ai = compose(&PromptMode::Enhanced(&req), Some(&shop()));
        assert!(ai.prompt.contains("1. ALLERFØRSTE linje"));
        assert!(ai.prompt.contains("startende med 'META: '"));
        assert!(ai.prompt.contains("3. TREDJE linje og FREMEFTER"));
        assert!(ai.prompt.contains("PRÆCIS 800 ord"));
        assert!(ai.prompt.contains("Eksempel FORKERT engelsk stil"));
        assert!(ai.system.ends_with("skriver engagerende indhold."));
        assert_eq!(ai.max_tokens, Some(3000));
    }

    #[test]
    fn test_enhanced_without_meta_moves_body_up() {
        let mut req = GenerationRequest::for_keywords("spiseborde");
        req.include_meta = false;
        let ai = compose(&PromptMode::Enhanced(&req), Some(&shop()));
        assert!(!ai.prompt.contains("META: "));
        assert!(ai.prompt.contains("2. ANDEN linje og FREMEFTER"));
    }

    #[test]
    fn test_enhanced_never_injects_blocked_words() {
        let req = GenerationRequest::for_keywords("spiseborde");
        let ai = compose(&PromptMode::Enhanced(&req), Some(&shop()));
        assert!(!ai.prompt.contains("billig"));
        assert!(!ai.prompt.contains("ALDRIG bruge disse ord"));
    }

    #[test]
    fn test_enhanced_products_and_links() {
        let mut req = GenerationRequest::for_keywords("spiseborde");
        req.selected_products = vec!["Spisebord".into(), "Findes ikke".into()];
        req.include_internal_links = true;
        let ai = compose(&PromptMode::Enhanced(&req), Some(&shop()));
        assert!(ai.prompt.contains("Produktnavn: Spisebord\nBeskrivelse: Massivt egetræ\nURL: https://noyer.dk/spisebord"));
        assert!(!ai.prompt.contains("Findes ikke"));
        assert!(ai.prompt.contains("  - https://noyer.dk/c"));
        assert!(!ai.prompt.contains("https://noyer.dk/d"));
        assert!(ai.prompt.contains("Inkluder i brødteksten: Interne Links"));
        // products come before links
        let products_at = ai.prompt.find("HØJ PRIORITET").unwrap();
        let links_at = ai.prompt.find("**Interne Links:**").unwrap();
        assert!(products_at < links_at);
    }

    #[test]
    fn test_enhanced_token_budget() {
        assert_eq!(enhanced_max_tokens(500), 3000);
        assert_eq!(enhanced_max_tokens(2000), 3500);
    }

    #[test]
    fn test_company_context_cap() {
        assert_eq!(company_context("Kort tekst."), "Kort tekst.");
        let long = shop().description;
        assert_eq!(company_context(&long), "Vi laver møbler i massivt træ.");
        let no_stop = "x".repeat(200);
        let capped = company_context(&no_stop);
        assert_eq!(capped.chars().count(), 150);
        assert!(capped.ends_with("..."));
    }

    #[test]
    fn test_variation_styles() {
        assert_eq!(VariationStyle::first(9).len(), 5);
        assert_eq!(VariationStyle::first(1).len(), 2);
        assert_eq!(VariationStyle::first(3)[2], VariationStyle::Expert);

        let ai = compose(
            &PromptMode::Variation { keywords: "spiseborde", style: VariationStyle::Creative },
            Some(&shop()),
        );
        assert_eq!(ai.temperature, Some(0.9));
        assert_eq!(ai.max_tokens, Some(VARIATION_MAX_TOKENS));
        assert!(ai.system.ends_with(VariationStyle::Creative.style()));
        assert!(ai.prompt.contains("VIGTIGT - BLOKEREDE ORD:"));
        assert!(ai.prompt.contains("- Du må ALDRIG bruge disse ord i teksten: billig, spam"));
    }

    #[test]
    fn test_revision_instruction_parse() {
        assert_eq!(RevisionInstruction::parse(" Forkort "), RevisionInstruction::Shorten);
        assert_eq!(RevisionInstruction::parse("FORLÆNG"), RevisionInstruction::Lengthen);
        assert_eq!(RevisionInstruction::parse("gør mere sælgende"), RevisionInstruction::MorePersuasive);
        assert_eq!(RevisionInstruction::parse("Ny vinkel"), RevisionInstruction::FreshAngle);
        assert_eq!(RevisionInstruction::parse("mere simpel"), RevisionInstruction::Simplify);
        assert_eq!(
            RevisionInstruction::parse("Skriv i du-form"),
            RevisionInstruction::Custom("Skriv i du-form".into())
        );
    }

    #[test]
    fn test_revision_carries_blocked_words() {
        let instruction = RevisionInstruction::Shorten;
        let ai = compose(
            &PromptMode::Revision { text: "Lang tekst", instruction: &instruction },
            Some(&shop()),
        );
        assert_eq!(ai.system, REVISION_SYSTEM);
        assert!(ai.prompt.starts_with("Forkort KUN"));
        assert!(ai.prompt.contains("Ingen forklaringer"));
        assert!(ai.prompt.contains("- Reducer længden med mindst 30-50%"));
        assert!(ai.prompt.ends_with("- KRITISK: Du må ALDRIG bruge disse ord: billig, spam"));
    }

    #[test]
    fn test_selection_edit_skips_blocked_words() {
        let instruction = RevisionInstruction::Custom("Gør det sjovere".into());
        let ai = compose(
            &PromptMode::SelectionEdit { selection: "Et afsnit", instruction: &instruction },
            Some(&shop()),
        );
        assert_eq!(ai.system, EDIT_SYSTEM);
        assert!(ai.prompt.contains("instruktion: \"Gør det sjovere\""));
        assert!(ai.prompt.contains("Tekst der skal omskrives:\nEt afsnit"));
        assert!(ai.prompt.contains("af det valgte afsnit"));
        assert!(!ai.prompt.contains("KRITISK"));
    }

    #[test]
    fn test_translation_prompt() {
        let ai = compose(
            &PromptMode::Translation { text: "<p>Hej</p>", language: "tysk", max_tokens: TRANSLATE_ROW_MAX_TOKENS },
            None,
        );
        assert!(ai.system.contains("fra dansk til tysk"));
        assert!(ai.system.contains("Bevar alle HTML-tags"));
        assert_eq!(ai.prompt, "<p>Hej</p>");
        assert_eq!(ai.temperature, Some(TRANSLATE_TEMPERATURE));
        assert_eq!(ai.max_tokens, Some(4000));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let req = GenerationRequest::for_keywords("spiseborde");
        let profile = shop();
        let a = compose(&PromptMode::Enhanced(&req), Some(&profile));
        let b = compose(&PromptMode::Enhanced(&req), Some(&profile));
        assert_eq!(a.prompt, b.prompt);
        assert_eq!(a.system, b.system);
    }
}
