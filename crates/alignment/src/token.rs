//! Reference text tokenization.

use serde::{Deserialize, Serialize};

/// One segment of the tokenized reference text.
///
/// Word segments are implicitly numbered 0..N-1 in reading order; separator
/// segments are carried verbatim and consume no reference index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "segment", content = "text")]
pub enum RefSegment {
    Word(String),
    Separator(String),
}

impl RefSegment {
    pub fn text(&self) -> &str {
        match self {
            RefSegment::Word(text) | RefSegment::Separator(text) => text,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, RefSegment::Word(_))
    }
}

/// Split the reference text into word and separator segments.
///
/// A word is a maximal run of alphanumeric characters; everything between
/// two words (whitespace, punctuation) accumulates into one verbatim
/// separator segment. Concatenating all segment texts reproduces the input
/// exactly.
pub fn tokenize_reference(text: &str) -> Vec<RefSegment> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut buf_is_word = false;

    for ch in text.chars() {
        let is_word = ch.is_alphanumeric();
        if !buf.is_empty() && is_word != buf_is_word {
            segments.push(seal(std::mem::take(&mut buf), buf_is_word));
        }
        buf.push(ch);
        buf_is_word = is_word;
    }
    if !buf.is_empty() {
        segments.push(seal(buf, buf_is_word));
    }
    segments
}

fn seal(text: String, is_word: bool) -> RefSegment {
    if is_word {
        RefSegment::Word(text)
    } else {
        RefSegment::Separator(text)
    }
}
