//! Reconstruction of renderable views from alignment events.
//!
//! Two passes over the same immutable inputs:
//!
//! - **Reference annotation** ([`reconstruct_reference`]): the original text
//!   in reading order, each word marked with its alignment outcome.
//! - **Transcript** ([`reconstruct_transcript`]): a single ordered sequence
//!   approximating what was actually read, merging hypothesis-side and
//!   reference-only events.
//!
//! Both are pure functions of their inputs; no counter or cache survives
//! across calls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::{explanation_for, EventKind, PauseEvent, WordEvent};
use crate::token::{tokenize_reference, RefSegment};

/// Sort offset for events that carry only a reference index (`missing`).
/// Places them after every hypothesis index below 1000, approximating "right
/// after the nearest preceding hypothesis word".
const REF_ONLY_SORT_OFFSET: u32 = 1_000;

/// Pauses shorter than this are not worth marking in the transcript.
pub const DEFAULT_MIN_PAUSE_MS: u64 = 2_000;

/// Alignment outcome attached to one reference word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mark")]
pub enum WordMark {
    /// Read as written (explicit `correct` event, or no event at all).
    Correct,
    /// Skipped while reading; rendered struck through.
    Omitted { explanation: String },
    /// Read as a different word.
    Substituted {
        hyp_token: String,
        explanation: String,
    },
}

/// One segment of the annotated reference view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "segment")]
pub enum AnnotatedSegment {
    /// Verbatim whitespace/punctuation between words.
    Separator { text: String },
    /// A reference word and its alignment outcome.
    Word {
        text: String,
        ref_idx: u32,
        mark: WordMark,
    },
}

/// A word in the hypothesis-ordered transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedWord {
    pub text: String,
    /// Classification, for styling by the rendering layer.
    pub kind: EventKind,
    /// Human-readable explanation from the label tables.
    pub explanation: String,
    /// Seek anchor into the source audio. The seek itself is the caller's
    /// side effect, not this crate's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seek_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyp_idx: Option<u32>,
}

/// One unit of the rendered transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "unit")]
pub enum TranscriptUnit {
    Word(RenderedWord),
    /// A single space between consecutive words.
    Separator,
    /// A marked silence (emitted only by the pause-aware variant).
    Pause { duration_ms: u64 },
}

/// Annotate the reference text with the alignment outcome of every word.
///
/// Walks the tokenized reference in order, assigning reference indices with
/// a strictly incrementing counter over word segments only (separators are
/// passed through verbatim and consume no index). A word with no event, or
/// with an explicit `correct` event, is unmarked; `missing` marks it
/// omitted; `substitution` marks it replaced by the hypothesis token.
/// `extra` and `repetition` events never attach to reference positions and
/// surface only in the transcript view.
pub fn reconstruct_reference(text: &str, events: &[WordEvent]) -> Vec<AnnotatedSegment> {
    // First event per reference index wins; later claims are ignored.
    let mut by_ref_idx: HashMap<u32, &WordEvent> = HashMap::new();
    for event in events {
        if !matches!(
            event.kind,
            EventKind::Correct | EventKind::Missing | EventKind::Substitution
        ) {
            continue;
        }
        if let Some(ref_idx) = event.ref_idx {
            by_ref_idx.entry(ref_idx).or_insert(event);
        }
    }

    let mut segments = Vec::new();
    let mut next_ref_idx: u32 = 0;

    for segment in tokenize_reference(text) {
        match segment {
            RefSegment::Separator(text) => {
                segments.push(AnnotatedSegment::Separator { text });
            }
            RefSegment::Word(text) => {
                let ref_idx = next_ref_idx;
                next_ref_idx += 1;
                let mark = mark_for(by_ref_idx.get(&ref_idx).copied(), &text);
                segments.push(AnnotatedSegment::Word {
                    text,
                    ref_idx,
                    mark,
                });
            }
        }
    }
    segments
}

fn mark_for(event: Option<&WordEvent>, word: &str) -> WordMark {
    let Some(event) = event else {
        // The event stream only carries non-trivial outcomes; an untouched
        // word reads the same as an explicit `correct`.
        return WordMark::Correct;
    };
    match event.kind {
        EventKind::Missing => WordMark::Omitted {
            explanation: explanation_for(event.kind, event.sub_kind).to_string(),
        },
        EventKind::Substitution => match event.hyp_token.as_deref() {
            Some(hyp_token) => {
                let reference = event.ref_token.as_deref().unwrap_or(word);
                WordMark::Substituted {
                    hyp_token: hyp_token.to_string(),
                    explanation: format!(
                        "\"{}\" yerine \"{}\" okudu ({})",
                        reference,
                        hyp_token,
                        explanation_for(event.kind, event.sub_kind)
                    ),
                }
            }
            // A substitution with no replacement token has nothing to show.
            None => WordMark::Correct,
        },
        _ => WordMark::Correct,
    }
}

/// Render the hypothesis-ordered transcript.
///
/// Events are stably sorted by `hyp_idx` when present, otherwise by
/// `ref_idx` plus a fixed offset that places reference-only (`missing`)
/// events after every hypothesis index in the typical range. One word unit
/// is emitted per event (`missing` shows the reference token as an
/// omission, every other kind shows the hypothesis token), with a single
/// separator between consecutive words and none after the last. Events
/// carrying no token at all are dropped.
pub fn reconstruct_transcript(events: &[WordEvent]) -> Vec<TranscriptUnit> {
    let mut ordered: Vec<(&WordEvent, &str)> = events
        .iter()
        .filter_map(|event| display_token(event).map(|token| (event, token)))
        .collect();
    ordered.sort_by_key(|&(event, _)| sort_key(event));

    let mut units = Vec::with_capacity(ordered.len().saturating_mul(2));
    for (event, token) in ordered {
        if !units.is_empty() {
            units.push(TranscriptUnit::Separator);
        }
        units.push(TranscriptUnit::Word(RenderedWord {
            text: token.to_string(),
            kind: event.kind,
            explanation: explanation_for(event.kind, event.sub_kind).to_string(),
            seek_ms: event.timing.map(|t| t.start_ms),
            hyp_idx: event.hyp_idx,
        }));
    }
    units
}

/// [`reconstruct_transcript`] with pause markers interleaved.
///
/// A pause at or above `min_pause_ms` is rendered immediately after the
/// word whose `hyp_idx` matches its anchor; pauses anchored to an index
/// that never renders are dropped.
pub fn reconstruct_transcript_with_pauses(
    events: &[WordEvent],
    pauses: &[PauseEvent],
    min_pause_ms: u64,
) -> Vec<TranscriptUnit> {
    let transcript = reconstruct_transcript(events);

    // First pause per anchor wins, mirroring the per-index rule of the
    // reference pass.
    let mut by_anchor: HashMap<u32, u64> = HashMap::new();
    for pause in pauses {
        if pause.duration_ms >= min_pause_ms {
            by_anchor.entry(pause.after_hyp_idx).or_insert(pause.duration_ms);
        }
    }
    if by_anchor.is_empty() {
        return transcript;
    }

    let mut units = Vec::with_capacity(transcript.len() + by_anchor.len());
    for unit in transcript {
        let pause_after = match &unit {
            TranscriptUnit::Word(word) => {
                word.hyp_idx.and_then(|idx| by_anchor.get(&idx).copied())
            }
            _ => None,
        };
        units.push(unit);
        if let Some(duration_ms) = pause_after {
            units.push(TranscriptUnit::Pause { duration_ms });
        }
    }
    units
}

fn display_token(event: &WordEvent) -> Option<&str> {
    match event.kind {
        // An omission has no spoken token; show what should have been read.
        EventKind::Missing => event.ref_token.as_deref().or(event.hyp_token.as_deref()),
        _ => event.hyp_token.as_deref().or(event.ref_token.as_deref()),
    }
}

fn sort_key(event: &WordEvent) -> u32 {
    match (event.hyp_idx, event.ref_idx) {
        (Some(hyp_idx), _) => hyp_idx,
        (None, Some(ref_idx)) => ref_idx.saturating_add(REF_ONLY_SORT_OFFSET),
        // Index-less records cannot be placed; they sort last, in input
        // order.
        (None, None) => u32::MAX,
    }
}
