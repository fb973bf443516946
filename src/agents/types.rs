//! Core types for the video-plan generation pipeline.
//!
//! A [`PipelineState`] is created from a [`Brief`] at the start of a run and
//! threaded through every agent. Agents never mutate the state they are
//! handed; each one returns a new value that extends its input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Brief
// ============================================================================

/// A reference asset attached to a brief (screenshot, mood board, prior ad).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMedia {
    /// Location of the asset.
    pub url: String,
    /// What the asset shows.
    #[serde(default)]
    pub description: String,
}

impl ReferenceMedia {
    pub fn new(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
        }
    }
}

/// The product brief a run is generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    /// Product or brand name.
    pub product_name: String,
    /// Free-text product description.
    #[serde(default)]
    pub description: String,
    /// Who the video speaks to.
    #[serde(default)]
    pub target_audience: String,
    /// Requested tone, e.g. "playful", "premium", "technical".
    #[serde(default)]
    pub tone: String,
    /// Closing call-to-action line.
    #[serde(default)]
    pub call_to_action: String,
    /// Optional reference media.
    #[serde(default)]
    pub reference_media: Vec<ReferenceMedia>,
}

impl Brief {
    /// Call-to-action used when the brief leaves it blank.
    pub const DEFAULT_CALL_TO_ACTION: &'static str = "Get started today.";

    /// Creates a brief with the two fields every run needs.
    pub fn new(product_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            description: description.into(),
            target_audience: String::new(),
            tone: String::new(),
            call_to_action: String::new(),
            reference_media: Vec::new(),
        }
    }

    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_call_to_action(mut self, cta: impl Into<String>) -> Self {
        self.call_to_action = cta.into();
        self
    }

    pub fn with_reference_media(mut self, media: ReferenceMedia) -> Self {
        self.reference_media.push(media);
        self
    }

    /// The call-to-action, or [`Self::DEFAULT_CALL_TO_ACTION`] when blank.
    pub fn call_to_action_or_default(&self) -> &str {
        let cta = self.call_to_action.trim();
        if cta.is_empty() {
            Self::DEFAULT_CALL_TO_ACTION
        } else {
            cta
        }
    }

    /// All free text in the brief, used for keyword and color detection.
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![
            self.product_name.as_str(),
            self.description.as_str(),
            self.target_audience.as_str(),
            self.tone.as_str(),
        ];
        parts.extend(self.reference_media.iter().map(|m| m.description.as_str()));
        parts.join(" ")
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Output branch selected at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    /// Open storyboard of director-chosen scenes.
    #[default]
    Freeform,
    /// Fixed six-scene "viable" template filled with generated copy.
    Viable,
}

impl TemplateMode {
    /// Identifier emitted in the plan's `template` field.
    pub fn template_id(self) -> &'static str {
        match self {
            TemplateMode::Freeform => "freeform",
            TemplateMode::Viable => "viable",
        }
    }

    /// Whether the fixed-schema template branch is active.
    pub fn is_template(self) -> bool {
        matches!(self, TemplateMode::Viable)
    }

    /// Number of narrative beats the scriptwriter produces.
    pub fn beat_count(self) -> usize {
        match self {
            TemplateMode::Freeform => 8,
            TemplateMode::Viable => 6,
        }
    }
}

impl fmt::Display for TemplateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_id())
    }
}

impl FromStr for TemplateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freeform" | "free" | "" => Ok(TemplateMode::Freeform),
            "viable" | "template" => Ok(TemplateMode::Viable),
            other => Err(format!(
                "unknown template mode '{}': expected 'freeform' or 'viable'",
                other
            )),
        }
    }
}

/// Storytelling structure the script follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeFramework {
    /// Attention, interest, desire, action.
    #[default]
    Aida,
    /// Problem, agitate, solution.
    Pas,
    /// Before, after, bridge.
    Bab,
    /// Customer-as-hero story arc.
    Story,
}

impl NarrativeFramework {
    /// Lenient parse of a model-supplied label.
    pub fn parse(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "aida" | "attentioninterestdesireaction" => Some(NarrativeFramework::Aida),
            "pas" | "problemagitatesolution" | "problemagitatesolve" => {
                Some(NarrativeFramework::Pas)
            }
            "bab" | "beforeafterbridge" => Some(NarrativeFramework::Bab),
            "story" | "storytelling" | "herosjourney" | "herojourney" | "storybrand" => {
                Some(NarrativeFramework::Story)
            }
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NarrativeFramework::Aida => "aida",
            NarrativeFramework::Pas => "pas",
            NarrativeFramework::Bab => "bab",
            NarrativeFramework::Story => "story",
        }
    }
}

impl fmt::Display for NarrativeFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scene categories a storyboard may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    Hook,
    Problem,
    Solution,
    Feature,
    Demo,
    Testimonial,
    Stats,
    CallToAction,
}

impl SceneType {
    /// Storyboard order used when the director has to invent scenes.
    pub const CANONICAL_SEQUENCE: [SceneType; 8] = [
        SceneType::Hook,
        SceneType::Problem,
        SceneType::Solution,
        SceneType::Feature,
        SceneType::Demo,
        SceneType::Stats,
        SceneType::Testimonial,
        SceneType::CallToAction,
    ];

    /// Lenient parse of a model-supplied scene type.
    pub fn parse(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "hook" | "intro" | "opening" => Some(SceneType::Hook),
            "problem" | "pain" | "painpoint" => Some(SceneType::Problem),
            "solution" | "reveal" => Some(SceneType::Solution),
            "feature" | "features" | "benefit" | "benefits" => Some(SceneType::Feature),
            "demo" | "showcase" | "productdemo" => Some(SceneType::Demo),
            "testimonial" | "testimonials" | "socialproof" | "review" => {
                Some(SceneType::Testimonial)
            }
            "stats" | "stat" | "statistics" | "numbers" => Some(SceneType::Stats),
            "cta" | "calltoaction" | "outro" | "closing" => Some(SceneType::CallToAction),
            _ => None,
        }
    }

    /// Duration in seconds given to a scene of this type when none is supplied.
    pub fn default_duration(self) -> f64 {
        match self {
            SceneType::Hook => 3.0,
            SceneType::Problem => 4.0,
            SceneType::Solution => 4.0,
            SceneType::Feature => 4.0,
            SceneType::Demo => 5.0,
            SceneType::Testimonial => 4.0,
            SceneType::Stats => 3.5,
            SceneType::CallToAction => 4.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SceneType::Hook => "hook",
            SceneType::Problem => "problem",
            SceneType::Solution => "solution",
            SceneType::Feature => "feature",
            SceneType::Demo => "demo",
            SceneType::Testimonial => "testimonial",
            SceneType::Stats => "stats",
            SceneType::CallToAction => "call_to_action",
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual treatment chosen from the brief's tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[default]
    Minimal,
    Bold,
    Playful,
    Luxury,
    Technical,
}

impl Archetype {
    /// Picks an archetype from a free-text tone label.
    ///
    /// Unrecognized or empty tones map to [`Archetype::Minimal`].
    pub fn from_tone(tone: &str) -> Self {
        let tone = tone.to_ascii_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| tone.contains(w));

        if has(&["luxur", "premium", "elegant", "sophisticat", "exclusive"]) {
            Archetype::Luxury
        } else if has(&["playful", "fun", "friendly", "quirky", "casual", "whimsical"]) {
            Archetype::Playful
        } else if has(&["bold", "energetic", "urgent", "exciting", "edgy", "loud"]) {
            Archetype::Bold
        } else if has(&["technical", "professional", "corporate", "expert", "data"]) {
            Archetype::Technical
        } else {
            Archetype::Minimal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::Minimal => "minimal",
            Archetype::Bold => "bold",
            Archetype::Playful => "playful",
            Archetype::Luxury => "luxury",
            Archetype::Technical => "technical",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Scenes
// ============================================================================

/// Layout of on-screen text within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneLayout {
    #[default]
    Centered,
    Split,
    FullBleed,
    Grid,
}

impl SceneLayout {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_").as_str() {
            "centered" | "center" => Some(SceneLayout::Centered),
            "split" | "side_by_side" => Some(SceneLayout::Split),
            "full_bleed" | "fullbleed" | "fullscreen" => Some(SceneLayout::FullBleed),
            "grid" => Some(SceneLayout::Grid),
            _ => None,
        }
    }
}

/// On-screen content of a scene.
///
/// Defaults: empty headline, no subtext, [`SceneLayout::Centered`], no
/// background override (the palette background is used).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneVisual {
    #[serde(default)]
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtext: Option<String>,
    #[serde(default)]
    pub layout: SceneLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

/// Camera motion over the course of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMovement {
    #[default]
    Static,
    PushIn,
    PullOut,
    Pan,
    Orbit,
}

impl CameraMovement {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_").as_str() {
            "static" | "still" | "none" => Some(CameraMovement::Static),
            "push_in" | "pushin" | "zoom_in" | "dolly_in" => Some(CameraMovement::PushIn),
            "pull_out" | "pullout" | "zoom_out" | "dolly_out" => Some(CameraMovement::PullOut),
            "pan" | "pan_left" | "pan_right" | "truck" => Some(CameraMovement::Pan),
            "orbit" | "rotate" | "arc" => Some(CameraMovement::Orbit),
            _ => None,
        }
    }
}

/// Camera treatment of a scene.
///
/// Defaults: [`CameraMovement::Static`] at intensity `0.5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraMove {
    #[serde(default)]
    pub movement: CameraMovement,
    /// Strength of the motion in `[0, 1]`.
    #[serde(default = "CameraMove::default_intensity")]
    pub intensity: f64,
}

impl CameraMove {
    pub fn default_intensity() -> f64 {
        0.5
    }

    pub fn new(movement: CameraMovement, intensity: f64) -> Self {
        Self {
            movement,
            intensity: if intensity.is_finite() {
                intensity.clamp(0.0, 1.0)
            } else {
                Self::default_intensity()
            },
        }
    }
}

impl Default for CameraMove {
    fn default() -> Self {
        Self {
            movement: CameraMovement::Static,
            intensity: Self::default_intensity(),
        }
    }
}

/// One scene of the storyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    /// `None` when the director produced a type outside the enumeration.
    #[serde(rename = "type", default)]
    pub scene_type: Option<SceneType>,
    #[serde(default)]
    pub title: String,
    /// Length in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<SceneVisual>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraMove>,
}

impl Scene {
    pub fn new(
        id: impl Into<String>,
        scene_type: Option<SceneType>,
        title: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            scene_type,
            title: title.into(),
            duration,
            narration: None,
            visual: None,
            camera: None,
        }
    }

    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }

    pub fn with_visual(mut self, visual: SceneVisual) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn with_camera(mut self, camera: CameraMove) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn has_positive_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

// ============================================================================
// Visual and audio assets
// ============================================================================

/// Brand palette as `#RRGGBB` hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl ColorPalette {
    pub const NEUTRAL_BACKGROUND: &'static str = "#0F172A";
    pub const NEUTRAL_TEXT: &'static str = "#F8FAFC";

    /// A palette with neutral background and text colors.
    pub fn with_brand_colors(primary: impl Into<String>, accent: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            accent: accent.into(),
            background: Self::NEUTRAL_BACKGROUND.to_string(),
            text: Self::NEUTRAL_TEXT.to_string(),
        }
    }
}

/// Art direction produced for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualAssets {
    pub palette: ColorPalette,
    pub font: String,
    pub archetype: Archetype,
}

impl VisualAssets {
    pub const DEFAULT_FONT: &'static str = "Inter";

    pub fn brand_color(&self) -> &str {
        &self.palette.primary
    }

    pub fn accent_color(&self) -> &str {
        &self.palette.accent
    }
}

/// Kinds of sound cue the renderer knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueType {
    Transition,
    Impact,
    Tension,
    Reveal,
    Click,
    Chime,
    Pop,
    Success,
}

impl CueType {
    /// Sound file the cue resolves to.
    pub fn file(self) -> &'static str {
        match self {
            CueType::Transition => "sfx/whoosh.mp3",
            CueType::Impact => "sfx/impact.mp3",
            CueType::Tension => "sfx/tension.mp3",
            CueType::Reveal => "sfx/reveal.mp3",
            CueType::Click => "sfx/click.mp3",
            CueType::Chime => "sfx/chime.mp3",
            CueType::Pop => "sfx/pop.mp3",
            CueType::Success => "sfx/success.mp3",
        }
    }

    pub fn default_volume(self) -> f32 {
        match self {
            CueType::Transition => 0.4,
            CueType::Impact | CueType::Success => 0.7,
            CueType::Tension => 0.5,
            CueType::Reveal => 0.6,
            CueType::Click | CueType::Pop => 0.5,
            CueType::Chime => 0.45,
        }
    }
}

/// A sound cue placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
    /// Seconds from the start of the video.
    pub offset: f64,
    pub cue: CueType,
    pub file: String,
    pub volume: f32,
}

impl AudioEvent {
    pub fn new(offset: f64, cue: CueType) -> Self {
        Self {
            offset,
            cue,
            file: cue.file().to_string(),
            volume: cue.default_volume(),
        }
    }
}

// ============================================================================
// Template data
// ============================================================================

/// Copy block of the viable template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCopy {
    #[serde(default)]
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub cta: String,
}

/// Fixed-schema data consumed by the viable template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<TemplateCopy>,
    #[serde(default)]
    pub trust_logos: Vec<String>,
}

// ============================================================================
// Pipeline state
// ============================================================================

/// State threaded through every step of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    run_id: Uuid,
    brief: Brief,
    template_mode: TemplateMode,

    /// Full narration.
    #[serde(default)]
    pub script: Option<String>,
    /// Narration split into beats.
    #[serde(default)]
    pub beat_scripts: Vec<String>,
    #[serde(default)]
    pub narrative_framework: Option<NarrativeFramework>,

    #[serde(default)]
    pub visual_assets: Option<VisualAssets>,

    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub template_data: Option<TemplateData>,

    #[serde(default)]
    pub audio_events: Vec<AudioEvent>,

    /// Normalized critic score in `[0, 1]`.
    #[serde(default)]
    pub quality_score: f64,
    #[serde(default)]
    pub needs_refinement: bool,
    #[serde(default)]
    pub refinement_count: u32,

    #[serde(default)]
    errors: Vec<String>,
}

impl PipelineState {
    /// Creates the initial state for a run.
    pub fn new(brief: Brief, template_mode: TemplateMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            brief,
            template_mode,
            script: None,
            beat_scripts: Vec::new(),
            narrative_framework: None,
            visual_assets: None,
            scenes: Vec::new(),
            template_data: None,
            audio_events: Vec::new(),
            quality_score: 0.0,
            needs_refinement: false,
            refinement_count: 0,
            errors: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn brief(&self) -> &Brief {
        &self.brief
    }

    pub fn template_mode(&self) -> TemplateMode {
        self.template_mode
    }

    /// Diagnostics recorded so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Appends a diagnostic. Entries are never removed.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Replaces the script with the given beats.
    pub fn set_script(&mut self, beats: Vec<String>, framework: NarrativeFramework) {
        self.script = Some(beats.join(" "));
        self.beat_scripts = beats;
        self.narrative_framework = Some(framework);
    }

    pub fn has_script(&self) -> bool {
        self.script
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    /// Sum of all scene durations, ignoring non-positive values.
    pub fn total_duration(&self) -> f64 {
        self.scenes
            .iter()
            .filter(|s| s.has_positive_duration())
            .map(|s| s.duration)
            .sum()
    }
}
