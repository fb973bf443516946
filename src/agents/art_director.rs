//! Art Director Agent: palette, font and visual archetype.
//!
//! Brand colors are decided by rule, not by the model:
//! 1. hex codes written in the brief,
//! 2. named colors written in the brief,
//! 3. a lookup table keyed by the detected industry.
//!
//! The archetype comes from the brief's tone. The model only picks the font
//! and the background/text colors; anything it returns that does not
//! validate is replaced with the neutral defaults.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::llm::LlmProvider;

use super::error::{AgentError, AgentResult};
use super::step::{complete, lenient_text, parse_json_response, pick, PipelineStep, StepOutcome};
use super::types::{Archetype, Brief, ColorPalette, PipelineState, VisualAssets};

const ART_SYSTEM_PROMPT: &str = r#"You are an art director for short product marketing videos.

The brand colors are already fixed. Choose a typeface and the background and text colors
that make the brand colors read well on screen.

Output Format:
You MUST respond with ONLY a JSON object in this exact format:
{
  "font": "<Google Fonts family name>",
  "background": "<#RRGGBB>",
  "text": "<#RRGGBB>"
}

Do not include any text outside the JSON object."#;

const ART_USER_TEMPLATE: &str = r#"Product: {product}
Tone: {tone}
Visual archetype: {archetype}
Primary brand color: {primary}
Accent color: {accent}

Script:
{script}"#;

/// Coarse industry categories used for the palette lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Industry {
    Technology,
    Finance,
    Health,
    Food,
    Fashion,
    Education,
    Travel,
    General,
}

impl Industry {
    /// Default `(primary, accent)` pair for the industry.
    pub fn palette(self) -> (&'static str, &'static str) {
        match self {
            Industry::Technology => ("#6366F1", "#22D3EE"),
            Industry::Finance => ("#1E3A8A", "#10B981"),
            Industry::Health => ("#0EA5E9", "#34D399"),
            Industry::Food => ("#EA580C", "#FACC15"),
            Industry::Fashion => ("#111827", "#EC4899"),
            Industry::Education => ("#2563EB", "#F59E0B"),
            Industry::Travel => ("#0891B2", "#F97316"),
            Industry::General => ("#3B82F6", "#F59E0B"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Industry::Technology => "technology",
            Industry::Finance => "finance",
            Industry::Health => "health",
            Industry::Food => "food",
            Industry::Fashion => "fashion",
            Industry::Education => "education",
            Industry::Travel => "travel",
            Industry::General => "general",
        }
    }

    /// First industry whose keyword pattern matches `text`.
    pub fn detect(text: &str) -> Self {
        industry_patterns()
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(industry, _)| *industry)
            .unwrap_or(Industry::General)
    }
}

fn industry_patterns() -> &'static [(Industry, Regex)] {
    static PATTERNS: OnceLock<Vec<(Industry, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                Industry::Finance,
                r"(?i)\b(bank\w*|financ\w*|fintech|invest\w*|payments?|budget\w*|crypto\w*|insurance|loans?|tax(es)?)\b",
            ),
            (
                Industry::Health,
                r"(?i)\b(health\w*|medic\w*|clinic\w*|wellness|fitness|therap\w*|doctors?|patients?|mental|workouts?)\b",
            ),
            (
                Industry::Food,
                r"(?i)\b(food|restaurants?|recipes?|meals?|cook\w*|coffee|snacks?|grocer\w*|kitchen|delivery)\b",
            ),
            (
                Industry::Fashion,
                r"(?i)\b(fashion|apparel|cloth\w*|wear|shoes?|sneakers?|jewel\w*|beauty|cosmetics?|skincare)\b",
            ),
            (
                Industry::Education,
                r"(?i)\b(learn\w*|educat\w*|course\w*|students?|teach\w*|school\w*|tutor\w*|classes?)\b",
            ),
            (
                Industry::Travel,
                r"(?i)\b(travel\w*|trips?|hotels?|flights?|vacation\w*|booking|destinations?|tour\w*)\b",
            ),
            (
                Industry::Technology,
                r"(?i)\b(apps?|software|saas|platform|cloud|ai|api|developers?|devices?|automation|dashboard|project management)\b",
            ),
        ]
        .into_iter()
        .filter_map(|(industry, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((industry, re)),
            Err(e) => {
                tracing::error!(
                    industry = industry.as_str(),
                    error = %e,
                    "Invalid industry pattern"
                );
                None
            }
        })
        .collect()
    })
}

/// Named colors recognized in brief text.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("navy", "#1E3A8A"),
    ("teal", "#0D9488"),
    ("turquoise", "#06B6D4"),
    ("blue", "#2563EB"),
    ("green", "#16A34A"),
    ("emerald", "#10B981"),
    ("red", "#DC2626"),
    ("crimson", "#B91C1C"),
    ("orange", "#EA580C"),
    ("yellow", "#FACC15"),
    ("gold", "#D4A017"),
    ("purple", "#7C3AED"),
    ("violet", "#8B5CF6"),
    ("pink", "#EC4899"),
    ("magenta", "#D946EF"),
    ("black", "#111111"),
    ("white", "#FFFFFF"),
    ("gray", "#6B7280"),
    ("grey", "#6B7280"),
    ("silver", "#C0C0C0"),
];

fn hex_pattern() -> Option<&'static Regex> {
    static HEX: OnceLock<Option<Regex>> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").ok())
        .as_ref()
}

fn named_color_pattern() -> Option<&'static Regex> {
    static NAMED: OnceLock<Option<Regex>> = OnceLock::new();
    NAMED
        .get_or_init(|| {
            let names: Vec<&str> = NAMED_COLORS.iter().map(|(name, _)| *name).collect();
            Regex::new(&format!(r"(?i)\b({})\b", names.join("|"))).ok()
        })
        .as_ref()
}

/// Normalizes `#abc` / `#aabbcc` to uppercase `#AABBCC`.
pub fn normalize_hex(value: &str) -> Option<String> {
    let digits = value.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        6 => Some(format!("#{}", digits.to_ascii_uppercase())),
        3 => Some(format!(
            "#{}",
            digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_uppercase()
        )),
        _ => None,
    }
}

/// Colors written in `text`: hex codes first, then named colors, deduplicated.
pub fn explicit_colors(text: &str) -> Vec<String> {
    let mut colors: Vec<String> = Vec::new();
    let mut push = |color: String| {
        if !colors.contains(&color) {
            colors.push(color);
        }
    };

    if let Some(re) = hex_pattern() {
        for m in re.find_iter(text) {
            if let Some(hex) = normalize_hex(m.as_str()) {
                push(hex);
            }
        }
    }

    if let Some(re) = named_color_pattern() {
        for m in re.find_iter(text) {
            let name = m.as_str().to_ascii_lowercase();
            if let Some((_, hex)) = NAMED_COLORS.iter().find(|(n, _)| *n == name) {
                push((*hex).to_string());
            }
        }
    }

    colors
}

/// Rule-derived `(primary, accent)` brand colors for a brief.
pub fn brand_colors(brief: &Brief) -> (String, String) {
    let text = brief.searchable_text();
    let (industry_primary, industry_accent) = Industry::detect(&text).palette();
    let mut explicit = explicit_colors(&text).into_iter();

    match (explicit.next(), explicit.next()) {
        (Some(primary), Some(accent)) => (primary, accent),
        (Some(primary), None) => {
            let accent = if primary == industry_accent {
                industry_primary
            } else {
                industry_accent
            };
            (primary, accent.to_string())
        }
        _ => (industry_primary.to_string(), industry_accent.to_string()),
    }
}

/// Assets used when the model cannot be consulted.
pub fn fallback_visual_assets(brief: &Brief) -> VisualAssets {
    let (primary, accent) = brand_colors(brief);
    VisualAssets {
        palette: ColorPalette::with_brand_colors(primary, accent),
        font: VisualAssets::DEFAULT_FONT.to_string(),
        archetype: Archetype::from_tone(&brief.tone),
    }
}

/// Configuration for the Art Director Agent.
#[derive(Debug, Clone)]
pub struct ArtDirectorConfig {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ArtDirectorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            max_tokens: 400,
        }
    }
}

impl ArtDirectorConfig {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Art Director Agent that produces `visual_assets`.
pub struct ArtDirectorAgent {
    llm: Arc<dyn LlmProvider>,
    config: ArtDirectorConfig,
}

impl std::fmt::Debug for ArtDirectorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtDirectorAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ArtDirectorAgent {
    pub const AGENT_NAME: &'static str = "art_director";

    pub fn new(llm: Arc<dyn LlmProvider>, config: ArtDirectorConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, ArtDirectorConfig::default())
    }

    /// Combines rule-derived brand colors with the model's style choices.
    pub async fn design(&self, state: &PipelineState) -> AgentResult<VisualAssets> {
        let brief = state.brief();
        let mut assets = fallback_visual_assets(brief);
        let tone = match brief.tone.trim() {
            "" => "neutral",
            tone => tone,
        };

        let prompt = ART_USER_TEMPLATE
            .replace("{product}", &brief.product_name)
            .replace("{tone}", tone)
            .replace("{archetype}", assets.archetype.as_str())
            .replace("{primary}", &assets.palette.primary)
            .replace("{accent}", &assets.palette.accent)
            .replace("{script}", state.script.as_deref().unwrap_or("(not written yet)"));

        let content = complete(
            self.llm.as_ref(),
            ART_SYSTEM_PROMPT,
            prompt,
            self.config.temperature,
            self.config.max_tokens,
        )
        .await?;
        let reply: Value = parse_json_response(&content)?;
        let style = reply.as_object().ok_or_else(|| {
            AgentError::InvalidResponse("Style reply is not a JSON object".to_string())
        })?;

        // Each field falls back on its own; a bad color never costs the font.
        let font = pick(style, &["font", "fontFamily"])
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty());
        if let Some(font) = font {
            assets.font = font.to_string();
        }
        let color = |names: &[&str]| {
            lenient_text(pick(style, names)).and_then(|c| normalize_hex(&c))
        };
        if let Some(background) = color(&["background", "backgroundColor"]) {
            assets.palette.background = background;
        }
        if let Some(text) = color(&["text", "textColor"]) {
            assets.palette.text = text;
        }

        Ok(assets)
    }
}

#[async_trait]
impl PipelineStep for ArtDirectorAgent {
    fn name(&self) -> &'static str {
        Self::AGENT_NAME
    }

    async fn run(&self, state: &PipelineState) -> StepOutcome {
        match self.design(state).await {
            Ok(assets) => {
                tracing::info!(
                    primary = %assets.palette.primary,
                    accent = %assets.palette.accent,
                    archetype = %assets.archetype,
                    font = %assets.font,
                    "Visual assets designed"
                );
                let mut next = state.clone();
                next.visual_assets = Some(assets);
                StepOutcome::Completed(next)
            }
            Err(e) => self.recover(state, &e.to_string()),
        }
    }

    fn recover(&self, state: &PipelineState, reason: &str) -> StepOutcome {
        let mut next = state.clone();
        next.visual_assets = Some(fallback_visual_assets(state.brief()));
        StepOutcome::recovered(
            next,
            Self::AGENT_NAME,
            format!("palette fallback used ({})", reason),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{sample_state, ScriptedProvider};
    use crate::agents::types::TemplateMode;

    #[test]
    fn test_industry_detection() {
        assert_eq!(Industry::detect("A budgeting app for freelancers"), Industry::Finance);
        assert_eq!(Industry::detect("Meal kits delivered weekly"), Industry::Food);
        assert_eq!(Industry::detect("Cloud dashboard for ops teams"), Industry::Technology);
        assert_eq!(Industry::detect("Handmade candles"), Industry::General);
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("#ff5500"), Some("#FF5500".to_string()));
        assert_eq!(normalize_hex("#f50"), Some("#FF5500".to_string()));
        assert_eq!(normalize_hex("ff5500"), None);
        assert_eq!(normalize_hex("#ff55"), None);
        assert_eq!(normalize_hex("#gg5500"), None);
    }

    #[test]
    fn test_hex_codes_take_precedence_over_names() {
        let colors = explicit_colors("Our brand is red with a #00ff88 highlight");
        assert_eq!(colors, vec!["#00FF88".to_string(), "#DC2626".to_string()]);
    }

    #[test]
    fn test_explicit_colors_override_industry() {
        let brief = Brief::new("Vault", "A banking app in navy and gold");
        assert_eq!(brand_colors(&brief), ("#1E3A8A".to_string(), "#D4A017".to_string()));
    }

    #[test]
    fn test_single_explicit_color_takes_industry_accent() {
        let brief = Brief::new("Vault", "A banking app with a #112233 logo");
        let (_, finance_accent) = Industry::Finance.palette();
        assert_eq!(
            brand_colors(&brief),
            ("#112233".to_string(), finance_accent.to_string())
        );
    }

    #[test]
    fn test_industry_palette_without_explicit_colors() {
        let brief = Brief::new("Vault", "A banking app for teenagers");
        let (primary, accent) = Industry::Finance.palette();
        assert_eq!(brand_colors(&brief), (primary.to_string(), accent.to_string()));
    }

    #[tokio::test]
    async fn test_run_uses_model_style() {
        let provider = Arc::new(ScriptedProvider::always(
            r##"{"font": "Poppins", "background": "#fafafa", "text": "#111"}"##,
        ));
        let agent = ArtDirectorAgent::with_defaults(provider);
        let state = sample_state(TemplateMode::Freeform);

        let outcome = agent.run(&state).await;

        assert!(!outcome.is_recovered());
        let assets = outcome.into_state().visual_assets.expect("assets set");
        assert_eq!(assets.font, "Poppins");
        assert_eq!(assets.palette.background, "#FAFAFA");
        assert_eq!(assets.palette.text, "#111111");
        assert_eq!(assets.archetype, Archetype::Playful);
        assert_eq!(
            (assets.palette.primary.as_str(), assets.palette.accent.as_str()),
            Industry::Technology.palette()
        );
    }

    #[tokio::test]
    async fn test_invalid_style_values_use_defaults() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"font": "  ", "background": "dark blue", "text": 42}"#,
        ));
        let agent = ArtDirectorAgent::with_defaults(provider);

        let outcome = agent.run(&sample_state(TemplateMode::Freeform)).await;

        assert!(!outcome.is_recovered());
        let assets = outcome.into_state().visual_assets.expect("assets set");
        assert_eq!(assets.font, VisualAssets::DEFAULT_FONT);
        assert_eq!(assets.palette.background, ColorPalette::NEUTRAL_BACKGROUND);
        assert_eq!(assets.palette.text, ColorPalette::NEUTRAL_TEXT);
    }

    #[tokio::test]
    async fn test_wrongly_typed_color_keeps_font() {
        let provider = Arc::new(ScriptedProvider::always(
            r##"{"fontFamily": "Sora", "text": 42, "backgroundColor": "#0b1020"}"##,
        ));
        let agent = ArtDirectorAgent::with_defaults(provider);

        let outcome = agent.run(&sample_state(TemplateMode::Freeform)).await;

        assert!(!outcome.is_recovered());
        let assets = outcome.into_state().visual_assets.expect("assets set");
        assert_eq!(assets.font, "Sora");
        assert_eq!(assets.palette.background, "#0B1020");
        assert_eq!(assets.palette.text, ColorPalette::NEUTRAL_TEXT);
    }

    #[tokio::test]
    async fn test_non_object_style_reply_is_recovered() {
        let provider = Arc::new(ScriptedProvider::always(r##"["Sora", "#000000"]"##));
        let agent = ArtDirectorAgent::with_defaults(provider);
        let state = sample_state(TemplateMode::Freeform);

        let outcome = agent.run(&state).await;

        assert!(outcome.is_recovered());
        assert_eq!(
            outcome.into_state().visual_assets,
            Some(fallback_visual_assets(state.brief()))
        );
    }

    #[tokio::test]
    async fn test_unparseable_colors_are_ignored() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"font": "", "background": "dark blue"}"#,
        ));
        let agent = ArtDirectorAgent::with_defaults(provider);

        let outcome = agent.run(&sample_state(TemplateMode::Freeform)).await;

        assert!(!outcome.is_recovered());
        let assets = outcome.into_state().visual_assets.expect("assets set");
        assert_eq!(assets.font, VisualAssets::DEFAULT_FONT);
        assert_eq!(assets.palette.background, ColorPalette::NEUTRAL_BACKGROUND);
        assert_eq!(assets.palette.text, ColorPalette::NEUTRAL_TEXT);
    }

    #[tokio::test]
    async fn test_provider_failure_yields_fallback_palette() {
        let provider = Arc::new(ScriptedProvider::failing("503 upstream unavailable"));
        let agent = ArtDirectorAgent::with_defaults(provider);
        let state = sample_state(TemplateMode::Freeform);

        let next = agent.run(&state).await.into_state();

        assert_eq!(next.visual_assets, Some(fallback_visual_assets(state.brief())));
        assert_eq!(next.errors().len(), 1);
        assert!(next.errors()[0].starts_with("art_director: "));
    }
}
