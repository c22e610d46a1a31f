//! Word-level alignment events and their explanation labels.
//!
//! Events are produced server-side by comparing the reference text against
//! the speech-recognition hypothesis. This crate consumes them as immutable
//! facts: reconstruction only reorders and classifies, it never mutates or
//! rejects a record.

use serde::{Deserialize, Serialize};

/// Classification of one alignment event.
///
/// Deserialization is total: a tag this enum does not know maps to
/// [`EventKind::Unknown`] instead of failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum EventKind {
    /// The reference word was read as written.
    Correct,
    /// The reference word was skipped entirely.
    Missing,
    /// A word was read that has no reference counterpart.
    Extra,
    /// The reference word was read as a different word.
    Substitution,
    /// A previously read word was repeated.
    Repetition,
    /// Unrecognized classification from the producer; rendered without
    /// special styling.
    Unknown,
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "correct" => EventKind::Correct,
            "missing" => EventKind::Missing,
            "extra" => EventKind::Extra,
            "substitution" => EventKind::Substitution,
            "repetition" => EventKind::Repetition,
            _ => EventKind::Unknown,
        }
    }
}

impl EventKind {
    /// Generic explanation shown when no recognized sub-kind refines it.
    pub fn generic_label(&self) -> &'static str {
        match self {
            EventKind::Correct => "Doğru okudu",
            EventKind::Missing => "Okumadı",
            EventKind::Extra => "Fazladan okudu",
            EventKind::Substitution => "Farklı okudu",
            EventKind::Repetition => "Tekrar etti",
            EventKind::Unknown => "Sınıflandırılamadı",
        }
    }
}

/// Refinement of a substitution or repetition, using the producer's wire
/// tags.
///
/// Like [`EventKind`], deserialization is total: unrecognized tags map to
/// [`SubKind::Other`], which falls back to the generic per-kind label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum SubKind {
    /// A letter was added to the word.
    #[serde(rename = "harf_ekleme")]
    LetterAdded,
    /// A letter was dropped from the word.
    #[serde(rename = "harf_eksik")]
    LetterMissing,
    /// A whole syllable was added.
    #[serde(rename = "hece_ekleme")]
    SyllableAdded,
    /// The spoken word has nothing in common with the reference word.
    #[serde(rename = "tamamen_farkli")]
    WholeWordDifferent,
    /// The word was repeated verbatim.
    #[serde(rename = "birebir_tekrar")]
    ExactRepeat,
    /// A close variant of the word was repeated.
    #[serde(rename = "benzer_tekrar")]
    SimilarRepeat,
    /// Part of the phrase was repeated as a pattern.
    #[serde(rename = "kalip_tekrar")]
    PatternRepeat,
    /// Unrecognized refinement tag.
    #[serde(rename = "diger")]
    Other,
}

impl From<String> for SubKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "harf_ekleme" => SubKind::LetterAdded,
            "harf_eksik" => SubKind::LetterMissing,
            "hece_ekleme" => SubKind::SyllableAdded,
            "tamamen_farkli" => SubKind::WholeWordDifferent,
            "birebir_tekrar" => SubKind::ExactRepeat,
            "benzer_tekrar" => SubKind::SimilarRepeat,
            "kalip_tekrar" => SubKind::PatternRepeat,
            _ => SubKind::Other,
        }
    }
}

impl SubKind {
    /// Explanation text for this refinement. `None` for unrecognized tags.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            SubKind::LetterAdded => Some("Harf ekledi"),
            SubKind::LetterMissing => Some("Harf eksik okudu"),
            SubKind::SyllableAdded => Some("Hece ekledi"),
            SubKind::WholeWordDifferent => Some("Tamamen farklı okudu"),
            SubKind::ExactRepeat => Some("Kelimeyi aynen tekrar etti"),
            SubKind::SimilarRepeat => Some("Benzer şekilde tekrar etti"),
            SubKind::PatternRepeat => Some("Kalıp halinde tekrar etti"),
            SubKind::Other => None,
        }
    }
}

/// Explanation for an event: the sub-kind label when recognized, otherwise
/// the generic label for the kind. Total; never an error.
pub fn explanation_for(kind: EventKind, sub_kind: Option<SubKind>) -> &'static str {
    sub_kind
        .and_then(|s| s.label())
        .unwrap_or_else(|| kind.generic_label())
}

/// Offsets of one hypothesis word in the source audio, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTiming {
    pub start_ms: u64,
    pub end_ms: u64,
}

/// One unit of alignment output.
///
/// Index invariants (as produced): `missing` events carry `ref_idx` and no
/// `hyp_idx`; `extra` and `repetition` events carry `hyp_idx` and no
/// `ref_idx`; `correct` and `substitution` events carry both. A record that
/// breaks these is still rendered on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEvent {
    /// Ordinal position assigned by the producer.
    pub position: u32,
    /// Reference-side token, if the event touches a reference word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_token: Option<String>,
    /// Hypothesis-side token, if the event touches a spoken word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyp_token: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "sub_type", default, skip_serializing_if = "Option::is_none")]
    pub sub_kind: Option<SubKind>,
    /// 0-based position in the tokenized reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_idx: Option<u32>,
    /// 0-based position in the hypothesis stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyp_idx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<WordTiming>,
}

impl WordEvent {
    /// A correctly read word (same token on both sides).
    pub fn correct(position: u32, ref_idx: u32, hyp_idx: u32, token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            position,
            ref_token: Some(token.clone()),
            hyp_token: Some(token),
            kind: EventKind::Correct,
            sub_kind: None,
            ref_idx: Some(ref_idx),
            hyp_idx: Some(hyp_idx),
            timing: None,
        }
    }

    /// A reference word that was never spoken.
    pub fn missing(position: u32, ref_idx: u32, ref_token: impl Into<String>) -> Self {
        Self {
            position,
            ref_token: Some(ref_token.into()),
            hyp_token: None,
            kind: EventKind::Missing,
            sub_kind: None,
            ref_idx: Some(ref_idx),
            hyp_idx: None,
            timing: None,
        }
    }

    /// A spoken word with no reference counterpart.
    pub fn extra(position: u32, hyp_idx: u32, hyp_token: impl Into<String>) -> Self {
        Self {
            position,
            ref_token: None,
            hyp_token: Some(hyp_token.into()),
            kind: EventKind::Extra,
            sub_kind: None,
            ref_idx: None,
            hyp_idx: Some(hyp_idx),
            timing: None,
        }
    }

    /// A reference word read as a different word.
    pub fn substitution(
        position: u32,
        ref_idx: u32,
        hyp_idx: u32,
        ref_token: impl Into<String>,
        hyp_token: impl Into<String>,
    ) -> Self {
        Self {
            position,
            ref_token: Some(ref_token.into()),
            hyp_token: Some(hyp_token.into()),
            kind: EventKind::Substitution,
            sub_kind: None,
            ref_idx: Some(ref_idx),
            hyp_idx: Some(hyp_idx),
            timing: None,
        }
    }

    /// A repeated word in the hypothesis stream.
    pub fn repetition(position: u32, hyp_idx: u32, hyp_token: impl Into<String>) -> Self {
        Self {
            position,
            ref_token: None,
            hyp_token: Some(hyp_token.into()),
            kind: EventKind::Repetition,
            sub_kind: None,
            ref_idx: None,
            hyp_idx: Some(hyp_idx),
            timing: None,
        }
    }

    pub fn with_sub_kind(mut self, sub_kind: SubKind) -> Self {
        self.sub_kind = Some(sub_kind);
        self
    }

    pub fn with_timing(mut self, start_ms: u64, end_ms: u64) -> Self {
        self.timing = Some(WordTiming { start_ms, end_ms });
        self
    }

    /// Whether the record satisfies the per-kind index invariants.
    ///
    /// Diagnostic only; reconstruction renders malformed records anyway.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            EventKind::Missing => self.ref_idx.is_some() && self.hyp_idx.is_none(),
            EventKind::Extra | EventKind::Repetition => {
                self.hyp_idx.is_some() && self.ref_idx.is_none()
            }
            EventKind::Correct | EventKind::Substitution => {
                self.ref_idx.is_some() && self.hyp_idx.is_some()
            }
            // No invariant is defined for unrecognized kinds.
            EventKind::Unknown => true,
        }
    }
}

/// A detected silence following one hypothesis word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseEvent {
    /// Hypothesis index of the word the pause follows.
    pub after_hyp_idx: u32,
    pub duration_ms: u64,
}
