//! Summary normalisation: deterministic cleanup of raw summariser output.
//!
//! Abstractive summarisers echo their instructions, open with boilerplate
//! ("The text discusses …"), stutter punctuation (`!!`, `...`) and sprinkle
//! filler ("in conclusion", "overall"). The cleaned text is both shown to the
//! user and read aloud, so every one of those artefacts is audible.
//!
//! This module applies a fixed, ordered list of [`Step`]s. Each step is a pure
//! `&str → String` transform; [`SummaryNormalizer::trace`] exposes the
//! intermediate string after every step so order-dependent behaviour can be
//! tested in isolation.
//!
//! ## Rule Order
//!
//! Filler removal runs before whitespace collapsing, and deleting a filler
//! word never inserts a space. `"good overall."` therefore becomes
//! `"good ."`, and `"Overall, cats"` keeps its comma. Keep it that way:
//! callers compare against summaries produced by this exact sequence.

use crate::error::ReaderError;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};
use tracing::trace;

/// Phrase the default rule set strips from the summary (to end of line).
pub const DEFAULT_ARTIFACT: &str = "Change and/or cancel your housing preference or lease";

/// Clean a raw summary with the default rule set.
///
/// Empty input is returned unchanged. Otherwise the 9 passes documented on
/// [`SummaryNormalizer`] run in order.
pub fn normalize(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

/// [`normalize`] for values that may be absent. `None` stays `None`.
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.map(normalize)
}

static DEFAULT_NORMALIZER: Lazy<SummaryNormalizer> = Lazy::new(SummaryNormalizer::default);

// ── Patterns ─────────────────────────────────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:summarize the following text|the text discusses|this text|the following text|the document|this document|the passage|this passage).*",
    )
    .unwrap()
});

static RE_FILLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:in summary|to summarize|in conclusion|overall|basically|essentially|simply put|put simply|in brief|briefly)\b",
    )
    .unwrap()
});

static RE_SENTENCE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]{2,}").unwrap());
static RE_COMMA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r",{2,}").unwrap());
static RE_COLON_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r":{2,}").unwrap());
static RE_DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static RE_ECHO_INSTRUCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Summarize the following text.*").unwrap());
static RE_ECHO_REQUIREMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Requirements?:.*?Text to summarize:").unwrap());
static RE_ECHO_TEXT_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Text to summarize:.*").unwrap());
static RE_ECHO_FOLLOWING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Following text:.*").unwrap());

/// Compiled-size cap for one artifact pattern.
const ARTIFACT_SIZE_LIMIT: usize = 1 << 20;

static RE_DEFAULT_ARTIFACT: Lazy<Regex> = Lazy::new(|| artifact_pattern(DEFAULT_ARTIFACT).unwrap());

/// Compile an artifact phrase into a case-insensitive "phrase to end of line" pattern.
///
/// Fails only when the phrase is too long to compile within
/// [`ARTIFACT_SIZE_LIMIT`].
fn artifact_pattern(phrase: &str) -> Result<Regex, ReaderError> {
    RegexBuilder::new(&format!("{}.*", regex::escape(phrase)))
        .case_insensitive(true)
        .size_limit(ARTIFACT_SIZE_LIMIT)
        .build()
        .map_err(|e| {
            ReaderError::InvalidConfig(format!(
                "Artifact phrase ({} chars) cannot be compiled: {}",
                phrase.chars().count(),
                e
            ))
        })
}

// ── Steps ────────────────────────────────────────────────────────────────────

/// One pass of the normalisation pipeline.
#[derive(Debug, Clone)]
pub enum Step {
    /// Regex substitution.
    Replace {
        name: &'static str,
        pattern: Regex,
        replacement: &'static str,
        /// Replace only the leftmost match.
        first_only: bool,
    },
    /// Strip leading/trailing whitespace.
    Trim,
    /// Uppercase a lowercase first character.
    Capitalize,
    /// Append `.` unless the text already ends in `.`, `!` or `?`.
    TerminalPunctuation,
}

impl Step {
    fn replace_all(name: &'static str, pattern: &Regex, replacement: &'static str) -> Self {
        Step::Replace {
            name,
            pattern: pattern.clone(),
            replacement,
            first_only: false,
        }
    }

    /// Short identifier used in traces and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Replace { name, .. } => name,
            Step::Trim => "trim",
            Step::Capitalize => "capitalize",
            Step::TerminalPunctuation => "terminal_punctuation",
        }
    }

    /// Run this step over `input`.
    pub fn apply(&self, input: &str) -> String {
        match self {
            Step::Replace {
                pattern,
                replacement,
                first_only,
                ..
            } => {
                if *first_only {
                    pattern.replace(input, NoExpand(replacement)).into_owned()
                } else {
                    pattern.replace_all(input, NoExpand(replacement)).into_owned()
                }
            }
            Step::Trim => input.trim().to_string(),
            Step::Capitalize => capitalize_first(input),
            Step::TerminalPunctuation => ensure_terminal_punctuation(input),
        }
    }
}

fn capitalize_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => input.to_string(),
    }
}

fn ensure_terminal_punctuation(input: &str) -> String {
    match input.chars().last() {
        None | Some('.' | '!' | '?') => input.to_string(),
        Some(_) => format!("{input}."),
    }
}

// ── Normalizer ───────────────────────────────────────────────────────────────

/// An ordered summary-cleanup pipeline.
///
/// Passes (applied in order):
/// 1. Strip a leading preamble line ("The text discusses …", "This document …")
/// 2. Remove known artifact phrases up to the end of their line
/// 3. Delete filler phrases ("in summary", "overall", …) without inserting a space
/// 4. Collapse punctuation runs: `[.!?]{2,}` → `.`, `,,` → `,`, `::` → `:`, `--` → `-`
/// 5. Collapse whitespace runs to a single space
/// 6. Strip echoed instructions ("Summarize the following text", "Requirements: …
///    Text to summarize:", "Text to summarize:", "Following text:")
/// 7. Trim
/// 8. Capitalise the first letter
/// 9. Ensure terminal punctuation
#[derive(Debug, Clone)]
pub struct SummaryNormalizer {
    steps: Vec<Step>,
}

impl Default for SummaryNormalizer {
    fn default() -> Self {
        Self::with_artifacts(vec![RE_DEFAULT_ARTIFACT.clone()])
    }
}

impl SummaryNormalizer {
    /// Create a builder seeded with [`DEFAULT_ARTIFACT`].
    pub fn builder() -> SummaryNormalizerBuilder {
        SummaryNormalizerBuilder {
            artifacts: vec![DEFAULT_ARTIFACT.to_string()],
        }
    }

    /// The pipeline, in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Clean `raw`. Empty input is returned as-is.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        self.steps.iter().fold(raw.to_string(), |acc, step| {
            let next = step.apply(&acc);
            trace!("normalize[{}]: {} → {} chars", step.name(), acc.len(), next.len());
            next
        })
    }

    /// Run the pipeline and return the string produced after every step.
    ///
    /// Empty input yields an empty trace.
    pub fn trace(&self, raw: &str) -> Vec<(&'static str, String)> {
        if raw.is_empty() {
            return Vec::new();
        }
        let mut current = raw.to_string();
        let mut out = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            current = step.apply(&current);
            out.push((step.name(), current.clone()));
        }
        out
    }
}

/// Builder for [`SummaryNormalizer`].
///
/// Only the artifact list is configurable; the remaining passes are fixed.
#[derive(Debug, Clone)]
pub struct SummaryNormalizerBuilder {
    artifacts: Vec<String>,
}

impl SummaryNormalizerBuilder {
    /// Also remove `phrase` (case-insensitive) through the end of its line.
    pub fn artifact(mut self, phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        if !phrase.trim().is_empty() && !self.artifacts.contains(&phrase) {
            self.artifacts.push(phrase);
        }
        self
    }

    /// Drop every artifact, including [`DEFAULT_ARTIFACT`].
    pub fn clear_artifacts(mut self) -> Self {
        self.artifacts.clear();
        self
    }

    /// Compile the artifact patterns and assemble the pipeline.
    ///
    /// A phrase too long to compile yields [`ReaderError::InvalidConfig`].
    pub fn build(self) -> Result<SummaryNormalizer, ReaderError> {
        let patterns = self
            .artifacts
            .iter()
            .map(|phrase| {
                if phrase == DEFAULT_ARTIFACT {
                    Ok(RE_DEFAULT_ARTIFACT.clone())
                } else {
                    artifact_pattern(phrase)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SummaryNormalizer::with_artifacts(patterns))
    }
}

impl SummaryNormalizer {
    fn with_artifacts(artifacts: Vec<Regex>) -> Self {
        let mut steps = Vec::with_capacity(16 + artifacts.len());

        steps.push(Step::Replace {
            name: "preamble",
            pattern: RE_PREAMBLE.clone(),
            replacement: "",
            first_only: true,
        });

        for pattern in artifacts {
            steps.push(Step::Replace {
                name: "artifact",
                pattern,
                replacement: "",
                first_only: false,
            });
        }

        steps.push(Step::replace_all("filler", &RE_FILLER, ""));

        steps.push(Step::replace_all("sentence_run", &RE_SENTENCE_RUN, "."));
        steps.push(Step::replace_all("comma_run", &RE_COMMA_RUN, ","));
        steps.push(Step::replace_all("colon_run", &RE_COLON_RUN, ":"));
        steps.push(Step::replace_all("dash_run", &RE_DASH_RUN, "-"));

        steps.push(Step::replace_all("whitespace", &RE_WHITESPACE, " "));

        steps.push(Step::replace_all("echo_instruction", &RE_ECHO_INSTRUCTION, ""));
        steps.push(Step::replace_all("echo_requirements", &RE_ECHO_REQUIREMENTS, ""));
        steps.push(Step::replace_all("echo_text_label", &RE_ECHO_TEXT_LABEL, ""));
        steps.push(Step::replace_all("echo_following", &RE_ECHO_FOLLOWING, ""));

        steps.push(Step::Trim);
        steps.push(Step::Capitalize);
        steps.push(Step::TerminalPunctuation);

        SummaryNormalizer { steps }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
