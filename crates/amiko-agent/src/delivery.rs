// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-paced message delivery.
//!
//! One model reply becomes a burst of short messages the way a person
//! actually texts: split at sentence or clause boundaries, sent one at a
//! time with a typing signal and a pause scaled to the fragment's length.
//! [`fragment_message`] is pure and does all the splitting; the
//! [`DeliveryEngine`] owns the channel side effects.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use tracing::{debug, warn};

use amiko_config::DeliveryConfig;
use amiko_core::types::OutboundMessage;
use amiko_core::ChannelAdapter;

/// Texts at or under this length split at sentence boundaries.
const SENTENCE_SPLIT_MAX_CHARS: usize = 120;

/// Texts at or under this length (and over the sentence bound) split at
/// clause boundaries with a medium fragment budget.
const CLAUSE_SPLIT_MAX_CHARS: usize = 200;

/// Clause pieces shorter than this merge into the following piece.
const MIN_CLAUSE_CHARS: usize = 4;

static PARAGRAPH_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// Terminal punctuation, optional closing quotes, then whitespace. The
/// whitespace requirement keeps decimals and abbreviations intact.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]+["'”’)\]]*\s+"#).expect("valid regex"));

/// Clause separators: commas, semicolons, terminal punctuation, dashes.
static CLAUSE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;.!?]+\s+|\s*[—–]\s*|\s+-\s+").expect("valid regex"));

/// Split one reply into the fragments to send, in order.
///
/// Granularity follows total length: short texts split per sentence (at
/// most 4 fragments), medium texts per clause (at most 6), long texts per
/// clause with a larger budget (at most 7). Blank-line paragraph breaks
/// are always respected. Fragments longer than `max_fragment_chars` are
/// word-wrapped; an overflowing count is regrouped evenly; every non-final
/// fragment that does not end in terminal punctuation gets an ellipsis so
/// the burst reads as one thought.
pub fn fragment_message(text: &str, max_fragment_chars: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let total = trimmed.chars().count();
    let (per_sentence, max_fragments) = if total <= SENTENCE_SPLIT_MAX_CHARS {
        (true, 4)
    } else if total <= CLAUSE_SPLIT_MAX_CHARS {
        (false, 6)
    } else {
        (false, 7)
    };

    let paragraphs: Vec<&str> = PARAGRAPH_BOUNDARY
        .split(trimmed)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut fragments: Vec<String> = Vec::new();
    for paragraph in &paragraphs {
        if per_sentence {
            fragments.extend(split_sentences(paragraph));
        } else {
            fragments.extend(split_clauses(paragraph));
        }
    }

    // A short text that is all one sentence still deserves the multi-message
    // feel when its clauses allow it.
    if per_sentence && fragments.len() < 2 {
        let clauses: Vec<String> = paragraphs.iter().flat_map(|p| split_clauses(p)).collect();
        if clauses.len() > fragments.len() {
            fragments = clauses;
        }
    }

    fragments = fragments
        .into_iter()
        .flat_map(|f| wrap_at_words(&f, max_fragment_chars))
        .collect();

    if fragments.len() > max_fragments {
        fragments = group_evenly(fragments, max_fragments);
    }

    let last = fragments.len().saturating_sub(1);
    for (i, fragment) in fragments.iter_mut().enumerate() {
        if i < last && !ends_terminal(fragment) {
            while fragment.ends_with([',', ';']) {
                fragment.pop();
            }
            fragment.push_str("...");
        }
    }

    fragments
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        let piece = text[start..boundary.end()].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = boundary.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        pieces.push(tail.to_string());
    }
    pieces
}

fn split_clauses(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for boundary in CLAUSE_BOUNDARY.find_iter(text) {
        let piece = clean_clause(&text[start..boundary.end()]);
        if !piece.is_empty() {
            pieces.push(piece);
        }
        start = boundary.end();
    }
    let tail = clean_clause(&text[start..]);
    if !tail.is_empty() {
        pieces.push(tail);
    }
    merge_short(pieces)
}

fn clean_clause(piece: &str) -> String {
    piece.trim().trim_end_matches(['—', '–']).trim_end().to_string()
}

/// Merge any piece shorter than [`MIN_CLAUSE_CHARS`] into the following
/// piece; a short trailing piece joins the one before it instead.
fn merge_short(pieces: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut carry = String::new();
    for piece in pieces {
        let candidate = if carry.is_empty() {
            piece
        } else {
            format!("{carry} {piece}")
        };
        if candidate.chars().count() < MIN_CLAUSE_CHARS {
            carry = candidate;
        } else {
            merged.push(candidate);
            carry.clear();
        }
    }
    if !carry.is_empty() {
        match merged.last_mut() {
            Some(last) => {
                last.push(' ');
                last.push_str(&carry);
            }
            None => merged.push(carry),
        }
    }
    merged
}

/// Word-wrap a fragment to at most `max` characters per piece. A single
/// token longer than `max` is hard-split.
fn wrap_at_words(fragment: &str, max: usize) -> Vec<String> {
    if max == 0 || fragment.chars().count() <= max {
        return vec![fragment.to_string()];
    }

    let mut pieces = Vec::new();
    let mut line = String::new();
    let mut line_chars = 0usize;
    for word in fragment.split_whitespace() {
        let word_chars = word.chars().count();
        if line_chars > 0 && line_chars + 1 + word_chars > max {
            pieces.push(std::mem::take(&mut line));
            line_chars = 0;
        }
        if word_chars > max {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max) {
                if line_chars > 0 {
                    pieces.push(std::mem::take(&mut line));
                    line_chars = 0;
                }
                line = chunk.iter().collect();
                line_chars = chunk.len();
                if line_chars == max {
                    pieces.push(std::mem::take(&mut line));
                    line_chars = 0;
                }
            }
            continue;
        }
        if line_chars > 0 {
            line.push(' ');
            line_chars += 1;
        }
        line.push_str(word);
        line_chars += word_chars;
    }
    if !line.is_empty() {
        pieces.push(line);
    }
    pieces
}

/// Rejoin fragments into at most `max_groups` messages, distributing the
/// pieces evenly by count.
fn group_evenly(fragments: Vec<String>, max_groups: usize) -> Vec<String> {
    let total = fragments.len();
    let base = total / max_groups;
    let extra = total % max_groups;
    let mut grouped = Vec::with_capacity(max_groups);
    let mut iter = fragments.into_iter();
    for g in 0..max_groups {
        let take = base + usize::from(g < extra);
        let group: Vec<String> = iter.by_ref().take(take).collect();
        if !group.is_empty() {
            grouped.push(group.join(" "));
        }
    }
    grouped
}

fn ends_terminal(fragment: &str) -> bool {
    fragment
        .trim_end_matches(['"', '\'', '”', '’', ')', ']'])
        .ends_with(['.', '!', '?', '…'])
}

/// Sends fragmented replies through a channel with human typing rhythm.
pub struct DeliveryEngine {
    channel: Arc<dyn ChannelAdapter>,
    config: DeliveryConfig,
}

impl DeliveryEngine {
    pub fn new(channel: Arc<dyn ChannelAdapter>, config: DeliveryConfig) -> Self {
        Self { channel, config }
    }

    /// Fragment `text` and send the pieces in order, pausing before each.
    ///
    /// A failed fragment is logged and skipped; later fragments still go
    /// out. Returns how many fragments were actually sent.
    pub async fn deliver(&self, chat_id: &str, text: &str) -> usize {
        let fragments = fragment_message(text, self.config.max_fragment_chars);
        let mut sent = 0;
        for fragment in &fragments {
            if let Err(e) = self.channel.send_typing(chat_id).await {
                debug!(chat_id, error = %e, "typing signal failed");
            }
            let pause = self.pause_before(fragment);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            let msg = OutboundMessage {
                channel: self.channel.name().to_string(),
                chat_id: chat_id.to_string(),
                text: fragment.clone(),
            };
            match self.channel.send(msg).await {
                Ok(_) => sent += 1,
                Err(e) => warn!(chat_id, error = %e, "fragment send failed"),
            }
        }
        sent
    }

    /// Typing pause for one fragment: the word count at the configured
    /// per-word rate, capped by a random draw from the configured band.
    fn pause_before(&self, fragment: &str) -> Duration {
        let words = fragment.split_whitespace().count() as u64;
        let typed_ms = words.saturating_mul(self.config.per_word_delay_ms);
        let band_ms = if self.config.max_delay_ms > self.config.min_delay_ms {
            rand::thread_rng().gen_range(self.config.min_delay_ms..=self.config.max_delay_ms)
        } else {
            self.config.min_delay_ms
        };
        Duration::from_millis(typed_ms.min(band_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use amiko_test_utils::MockChannel;

    const MAX: usize = 140;

    #[test]
    fn empty_input_yields_no_fragments() {
        assert!(fragment_message("", MAX).is_empty());
        assert!(fragment_message("   \n\n  ", MAX).is_empty());
    }

    #[test]
    fn short_greeting_stays_single() {
        let fragments = fragment_message("Hi.", MAX);
        assert_eq!(fragments, vec!["Hi."]);
    }

    #[test]
    fn short_text_splits_per_sentence() {
        let fragments = fragment_message("I saw the movie. It was great. You'd love it.", MAX);
        assert_eq!(
            fragments,
            vec!["I saw the movie.", "It was great.", "You'd love it."]
        );
    }

    #[test]
    fn single_sentence_falls_back_to_clauses() {
        let fragments = fragment_message("ok, here is the thing, we should talk", MAX);
        assert!(fragments.len() >= 2, "got {fragments:?}");
        // Short leading clause merged forward, ellipsis on the non-final
        // piece, trailing comma dropped first.
        assert_eq!(fragments[0], "ok, here is the thing...");
        assert_eq!(fragments.last().unwrap(), "we should talk");
    }

    #[test]
    fn paragraph_breaks_always_split() {
        let fragments = fragment_message("First thought here.\n\nSecond thought there.", MAX);
        assert_eq!(
            fragments,
            vec!["First thought here.", "Second thought there."]
        );
    }

    #[test]
    fn medium_text_splits_per_clause() {
        // 121..=200 chars: clause granularity, 3 to 6 fragments.
        let text = "The workshop ran long today, mostly because the glaze mixer jammed, \
                    then the kiln threw a vent error, and we still got every single piece loaded before six.";
        let count = text.chars().count();
        assert!((121..=200).contains(&count), "fixture length {count}");

        let fragments = fragment_message(text, MAX);
        assert!(
            (2..=6).contains(&fragments.len()),
            "got {} fragments",
            fragments.len()
        );
        for fragment in &fragments {
            assert!(fragment.chars().count() <= MAX);
        }
    }

    #[test]
    fn long_text_caps_fragment_count() {
        let text = "One clause here, another clause there, a third for flavor, \
                    a fourth because the day was long, a fifth about the weather, \
                    a sixth about dinner plans, a seventh on the bus ride home, \
                    an eighth about the playlist, a ninth about the neighbor's dog, \
                    and a tenth to wrap the story up properly.";
        assert!(text.chars().count() > 200);

        let fragments = fragment_message(text, MAX);
        assert!(
            fragments.len() <= 7,
            "got {} fragments",
            fragments.len()
        );
        assert!(fragments.len() >= 2);
    }

    #[test]
    fn overlong_run_on_is_word_wrapped() {
        let text = "word ".repeat(60); // 300 chars, no punctuation at all
        let fragments = fragment_message(&text, MAX);
        assert!(fragments.len() >= 2);
        for fragment in &fragments {
            // "..." may push a wrapped piece slightly past the cap.
            assert!(fragment.chars().count() <= MAX + 3, "{fragment:?}");
        }
        for fragment in &fragments[..fragments.len() - 1] {
            assert!(fragment.ends_with("..."), "{fragment:?}");
        }
    }

    #[test]
    fn oversized_single_token_is_hard_split() {
        let token = "x".repeat(310);
        let fragments = fragment_message(&token, 140);
        assert!(fragments.len() >= 3);
        assert!(fragments.iter().all(|f| f.chars().count() <= 143));
    }

    #[test]
    fn grouping_rejoins_evenly() {
        // Ten clauses in the medium band must regroup down to six messages.
        let text = "aaaa bbbb cc, dddd eee ff, gggg hhh ii, jjjj kkk ll, \
                    mmmm nnn oo, pppp qqq rr, ssss ttt uu, vvvv www xx, \
                    yyyy zzz aa, bbbb ccc dd";
        let count = text.chars().count();
        assert!((121..=200).contains(&count), "fixture length {count}");

        let fragments = fragment_message(text, MAX);
        assert_eq!(fragments.len(), 6);
    }

    #[test]
    fn non_final_fragments_signal_continuation() {
        let fragments = fragment_message(
            "so I was at the market earlier, they had those mangoes you like, I grabbed a whole box",
            MAX,
        );
        assert!(fragments.len() >= 2);
        for fragment in &fragments[..fragments.len() - 1] {
            assert!(
                ends_terminal(fragment) || fragment.ends_with("..."),
                "{fragment:?}"
            );
        }
    }

    #[test]
    fn pause_is_word_scaled_and_capped() {
        let channel: Arc<dyn ChannelAdapter> = Arc::new(MockChannel::new());
        let engine = DeliveryEngine::new(
            channel,
            DeliveryConfig {
                max_fragment_chars: 140,
                per_word_delay_ms: 100,
                min_delay_ms: 5000,
                max_delay_ms: 5000,
            },
        );

        // 3 words at 100ms each stays under the band.
        assert_eq!(
            engine.pause_before("three short words"),
            Duration::from_millis(300)
        );
        // 100 words would take 10s typed; the band caps it at 5s.
        let long = "word ".repeat(100);
        assert_eq!(engine.pause_before(&long), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn deliver_sends_each_fragment_with_typing() {
        let channel = Arc::new(MockChannel::new());
        let engine = DeliveryEngine::new(
            channel.clone(),
            DeliveryConfig {
                max_fragment_chars: 140,
                per_word_delay_ms: 0,
                min_delay_ms: 0,
                max_delay_ms: 0,
            },
        );

        let sent = engine
            .deliver("chat-9", "I saw the movie. It was great. You'd love it.")
            .await;
        assert_eq!(sent, 3);

        let messages = channel.sent_messages().await;
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.chat_id == "chat-9"));
        assert_eq!(messages[0].text, "I saw the movie.");
        assert_eq!(channel.typing_signals().await.len(), 3);
    }
}
