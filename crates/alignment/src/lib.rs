//! `lectio-alignment` — alignment reconstruction.
//!
//! Turns the unordered word-level alignment events produced by the remote
//! reference-vs-hypothesis comparison into two deterministic, renderable
//! views: a reference-indexed annotation of the original text, and a single
//! hypothesis-ordered transcript. Pure computation: no shared state, no I/O,
//! and identical inputs always produce identical outputs.

pub mod event;
pub mod reconstruct;
pub mod token;

pub use event::{explanation_for, EventKind, PauseEvent, SubKind, WordEvent, WordTiming};
pub use reconstruct::{
    reconstruct_reference, reconstruct_transcript, reconstruct_transcript_with_pauses,
    AnnotatedSegment, RenderedWord, TranscriptUnit, WordMark, DEFAULT_MIN_PAUSE_MS,
};
pub use token::{tokenize_reference, RefSegment};
