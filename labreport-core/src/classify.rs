//! Reference-range parsing and result status classification.
//!
//! Reference ranges are free text written by lab staff. A [`Classifier`]
//! tries an ordered list of [`RangeMatcher`] strategies; the first one that
//! recognizes the range decides the status. Unrecognized ranges come out as
//! [`Status::Normal`].
//!
//! Sex-specific compound ranges such as `"M: 3.5–7.2; F: 2.6–6.0"` are not
//! recognized by any matcher and therefore classify as Normal.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ReportConfig;

static BRACKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)-([0-9]+(?:\.[0-9]+)?)$").expect("bracket pattern is valid")
});

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
        .expect("leading number pattern is valid")
});

static ANY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number pattern is valid"));

static STANDARD: LazyLock<Classifier> = LazyLock::new(Classifier::standard);

/// Qualitative interpretation of one result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Normal,
    High,
    Low,
    Positive,
    Negative,
    /// Qualitative range, but the value was neither "positive" nor
    /// "negative". Carries the raw value.
    Unclassified(String),
}

impl Status {
    pub fn label(&self) -> &str {
        match self {
            Status::Normal => "Normal",
            Status::High => "High",
            Status::Low => "Low",
            Status::Positive => "Positive",
            Status::Negative => "Negative",
            Status::Unclassified(raw) => raw,
        }
    }

    /// Inverse of [`Status::label`]. Unknown labels are kept as raw text.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Normal" => Status::Normal,
            "High" => Status::High,
            "Low" => Status::Low,
            "Positive" => Status::Positive,
            "Negative" => Status::Negative,
            other => Status::Unclassified(other.to_string()),
        }
    }

    /// High or Low.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Status::High | Status::Low)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Status::from_label(&label))
    }
}

/// A reference range in the two shapes the matchers look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRange<'a> {
    /// Input with surrounding whitespace removed.
    pub trimmed: &'a str,
    /// En-dashes turned into hyphens and all spaces removed.
    pub normalized: String,
}

impl<'a> ReferenceRange<'a> {
    pub fn new(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        let normalized = trimmed
            .chars()
            .filter(|c| *c != ' ')
            .map(|c| if c == '–' { '-' } else { c })
            .collect();
        Self {
            trimmed,
            normalized,
        }
    }
}

/// One strategy in the classifier chain.
pub trait RangeMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy owns the range. Once a matcher claims a range
    /// no later matcher is consulted.
    fn applies(&self, range: &ReferenceRange<'_>) -> bool;

    fn interpret(&self, value: &str, range: &ReferenceRange<'_>) -> Status;
}

/// Ranges mentioning "negative" or "positive" anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualitativeMatcher;

impl RangeMatcher for QualitativeMatcher {
    fn name(&self) -> &'static str {
        "qualitative"
    }

    fn applies(&self, range: &ReferenceRange<'_>) -> bool {
        let lower = range.trimmed.to_lowercase();
        lower.contains("negative") || lower.contains("positive")
    }

    fn interpret(&self, value: &str, _range: &ReferenceRange<'_>) -> Status {
        match value.to_lowercase().as_str() {
            "negative" => Status::Negative,
            "positive" => Status::Positive,
            _ => Status::Unclassified(value.to_string()),
        }
    }
}

/// `LOW-HIGH`, decimals allowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BracketMatcher;

impl RangeMatcher for BracketMatcher {
    fn name(&self) -> &'static str {
        "bracket"
    }

    fn applies(&self, range: &ReferenceRange<'_>) -> bool {
        BRACKET.is_match(&range.normalized)
    }

    fn interpret(&self, value: &str, range: &ReferenceRange<'_>) -> Status {
        let Some(caps) = BRACKET.captures(&range.normalized) else {
            return Status::Normal;
        };
        let (Ok(low), Ok(high)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
            return Status::Normal;
        };
        match parse_number(value) {
            Some(v) if v < low => Status::Low,
            Some(v) if v > high => Status::High,
            _ => Status::Normal,
        }
    }
}

/// `<N`: values at or above N are High.
#[derive(Debug, Default, Clone, Copy)]
pub struct BelowMatcher;

impl RangeMatcher for BelowMatcher {
    fn name(&self) -> &'static str {
        "less-than"
    }

    fn applies(&self, range: &ReferenceRange<'_>) -> bool {
        range.normalized.starts_with('<')
    }

    fn interpret(&self, value: &str, range: &ReferenceRange<'_>) -> Status {
        match (parse_number(value), parse_number(&range.normalized[1..])) {
            (Some(v), Some(threshold)) if v >= threshold => Status::High,
            _ => Status::Normal,
        }
    }
}

/// `>N`: values at or below N are Low.
#[derive(Debug, Default, Clone, Copy)]
pub struct AboveMatcher;

impl RangeMatcher for AboveMatcher {
    fn name(&self) -> &'static str {
        "greater-than"
    }

    fn applies(&self, range: &ReferenceRange<'_>) -> bool {
        range.normalized.starts_with('>')
    }

    fn interpret(&self, value: &str, range: &ReferenceRange<'_>) -> Status {
        match (parse_number(value), parse_number(&range.normalized[1..])) {
            (Some(v), Some(threshold)) if v <= threshold => Status::Low,
            _ => Status::Normal,
        }
    }
}

/// `Up to N`: values above N are High. Not part of the standard chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpToMatcher;

impl RangeMatcher for UpToMatcher {
    fn name(&self) -> &'static str {
        "up-to"
    }

    fn applies(&self, range: &ReferenceRange<'_>) -> bool {
        range.normalized.to_lowercase().starts_with("upto")
    }

    fn interpret(&self, value: &str, range: &ReferenceRange<'_>) -> Status {
        let threshold = ANY_NUMBER
            .find(&range.normalized)
            .and_then(|m| m.as_str().parse::<f64>().ok());
        match (parse_number(value), threshold) {
            (Some(v), Some(high)) if v > high => Status::High,
            _ => Status::Normal,
        }
    }
}

/// Ordered chain of matchers with a Normal fallback.
pub struct Classifier {
    matchers: Vec<Box<dyn RangeMatcher>>,
}

impl Classifier {
    /// qualitative, bracket, less-than, greater-than.
    pub fn standard() -> Self {
        Self {
            matchers: vec![
                Box::new(QualitativeMatcher),
                Box::new(BracketMatcher),
                Box::new(BelowMatcher),
                Box::new(AboveMatcher),
            ],
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        let mut classifier = Self::standard();
        if config.recognize_up_to {
            classifier.push(UpToMatcher);
        }
        classifier
    }

    /// Append a matcher; it runs after every matcher already present.
    pub fn push(&mut self, matcher: impl RangeMatcher + 'static) {
        self.matchers.push(Box::new(matcher));
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    pub fn classify(&self, value: &str, reference_range: &str) -> Status {
        let range = ReferenceRange::new(reference_range);
        self.matchers
            .iter()
            .find(|matcher| matcher.applies(&range))
            .map(|matcher| matcher.interpret(value, &range))
            .unwrap_or(Status::Normal)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("matchers", &self.matcher_names())
            .finish()
    }
}

/// Classify with the standard matcher chain.
pub fn classify(value: &str, reference_range: &str) -> Status {
    STANDARD.classify(value, reference_range)
}

/// Leading decimal prefix of `text`, ignoring anything after it
/// (`"5 mg"` reads as 5). Only ASCII digits count; `Infinity` is accepted.
fn parse_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
