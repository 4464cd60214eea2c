//! Capitalization-based mention detection.
//!
//! Reports maximal runs of capitalized words as untyped mentions. Runs do not
//! cross punctuation; a lowercase connector ("of", "de", "van", ...) may sit
//! inside a run when a capitalized word follows it. Function words that are
//! capitalized only because they open a sentence are trimmed from the front.

use async_trait::async_trait;

use super::{EntityTagger, Mention};
use crate::error::BackendError;

/// Label given to every mention found by [`CapitalizedSpanTagger`]
pub const UNTYPED_LABEL: &str = "ENTITY";

const CONNECTORS: &[&str] = &[
    "of", "de", "del", "della", "der", "di", "du", "da", "van", "von", "la", "le", "y",
];

const LEADING_STOPWORDS: &[&str] = &[
    "A", "An", "And", "As", "At", "But", "By", "For", "From", "He", "Her", "His", "I", "If", "In",
    "It", "Its", "Mr", "Mrs", "Ms", "My", "No", "Of", "On", "Or", "Our", "She", "So", "That",
    "The", "Their", "There", "These", "They", "This", "Those", "To", "We", "What", "When",
    "Where", "Which", "While", "Who", "With", "You", "Your",
];

#[derive(Debug)]
struct Word<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    /// Only whitespace separates this word from the previous one
    joined: bool,
}

impl Word<'_> {
    fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }

    fn is_connector(&self) -> bool {
        CONNECTORS.contains(&self.text)
    }
}

/// Deterministic tagger used when no tagging service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct CapitalizedSpanTagger;

impl CapitalizedSpanTagger {
    /// Find mentions in `text` (synchronous core of [`EntityTagger::tag`])
    pub fn find_mentions(&self, text: &str) -> Vec<Mention> {
        let words = split_words(text);
        let mut mentions = Vec::new();
        let mut i = 0;

        while i < words.len() {
            if !words[i].is_capitalized() {
                i += 1;
                continue;
            }

            let mut run = vec![i];
            let mut j = i + 1;
            while j < words.len() && words[j].joined {
                if words[j].is_capitalized() {
                    run.push(j);
                    j += 1;
                } else if words[j].is_connector()
                    && j + 1 < words.len()
                    && words[j + 1].joined
                    && words[j + 1].is_capitalized()
                {
                    run.push(j);
                    run.push(j + 1);
                    j += 2;
                } else {
                    break;
                }
            }

            // Trim function words and dangling connectors from the front
            let mut first = 0;
            while first < run.len() {
                let word = &words[run[first]];
                if LEADING_STOPWORDS.contains(&word.text) || word.is_connector() {
                    first += 1;
                } else {
                    break;
                }
            }

            if first < run.len() {
                let start = words[run[first]].start;
                let end = words[run[run.len() - 1]].end;
                mentions.push(
                    Mention::new(&text[start..end], UNTYPED_LABEL).with_span(start, end),
                );
            }
            i = j;
        }

        mentions
    }
}

#[async_trait]
impl EntityTagger for CapitalizedSpanTagger {
    async fn tag(&self, text: &str) -> Result<Vec<Mention>, BackendError> {
        Ok(self.find_mentions(text))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '\'' || c == '\u{2019}'
}

/// Words with byte positions; `joined` is false after any non-space gap
fn split_words(s: &str) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut gap_is_space = true;

    for (i, c) in s.char_indices() {
        if is_word_char(c) {
            if word_start.is_none() {
                word_start = Some(i);
            }
        } else {
            if let Some(start) = word_start.take() {
                // A lone dash or apostrophe is punctuation, not a word
                gap_is_space = push_word(&mut words, s, start, i, gap_is_space);
            }
            if !c.is_whitespace() {
                gap_is_space = false;
            }
        }
    }
    if let Some(start) = word_start {
        push_word(&mut words, s, start, s.len(), gap_is_space);
    }

    if let Some(first) = words.first_mut() {
        first.joined = false;
    }
    words
}

fn push_word<'a>(
    words: &mut Vec<Word<'a>>,
    s: &'a str,
    start: usize,
    end: usize,
    joined: bool,
) -> bool {
    const EDGE: [char; 3] = ['-', '\'', '\u{2019}'];
    let raw = &s[start..end];
    let leading = raw.len() - raw.trim_start_matches(EDGE).len();
    let text = raw[leading..].trim_end_matches(EDGE);
    if !text.is_empty() {
        words.push(Word {
            start: start + leading,
            end: start + leading + text.len(),
            text,
            joined,
        });
        true
    } else {
        false
    }
}
