//! Word statistics for plain-text puzzle files.
//!
//! Besides counting distinct words, the extractor looks for the "container
//! word": the word that has the most other vocabulary words as (not
//! necessarily contiguous) subsequences.

use crate::checksum;
use crate::error::ExtractError;
use crate::manifest::TextRecord;

use std::collections::HashMap;
use std::path::Path;

/// Reported when no word contains any other.
pub const NO_CONTAINER: &str = "empty";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Containment {
    pub word: String,
    pub count: usize,
}

impl Containment {
    fn none() -> Self {
        Self {
            word: NO_CONTAINER.to_string(),
            count: 0,
        }
    }
}

pub fn extract(path: &Path) -> Result<TextRecord, ExtractError> {
    // One read feeds both the checksum and the word stats.
    let bytes = std::fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let digest = checksum::digest_bytes(&bytes);
    let content = String::from_utf8_lossy(&bytes);

    let freq = word_frequencies(&content);
    let containment = container_word(&freq.order);

    Ok(TextRecord {
        header: digest.into(),
        unique_words: freq.counts.len(),
        container_word: containment.word,
        container_count: containment.count,
    })
}

#[derive(Debug, Default)]
pub struct WordFrequencies {
    /// Distinct tokens in first-seen order.
    pub order: Vec<String>,
    pub counts: HashMap<String, usize>,
}

/// Split every trimmed line on single spaces, dropping empty tokens.
/// `\n`, `\r\n` and a lone `\r` all end a line. Tokens are taken literally:
/// no case folding, punctuation kept.
pub fn word_frequencies(content: &str) -> WordFrequencies {
    let mut freq = WordFrequencies::default();
    for line in content.split(['\n', '\r']) {
        for token in line.trim().split(' ').filter(|t| !t.is_empty()) {
            match freq.counts.get_mut(token) {
                Some(n) => *n += 1,
                None => {
                    freq.counts.insert(token.to_string(), 1);
                    freq.order.push(token.to_string());
                }
            }
        }
    }
    freq
}

/// True when the chars of `short` appear in `long` in order.
pub fn is_subsequence(short: &[char], long: &[char]) -> bool {
    let mut want = short.iter().peekable();
    for c in long {
        match want.peek() {
            Some(w) if *w == c => {
                want.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    want.peek().is_none()
}

/// Find the word containing the most other words as subsequences.
///
/// `words` must be distinct, in first-seen order. They are ranked by char
/// length, longest first, keeping first-seen order among equal lengths.
/// Each ranked word in turn scans the live list for shorter words it
/// contains. A contained word is removed from the list as soon as it is
/// found, so it is never credited to a second container and never becomes a
/// container itself. The scan does not revisit the slot the removal shifted
/// into, which means a word directly following a consumed one is passed over
/// for that container. Results therefore depend on the ranking; they match
/// the manifests already produced by earlier versions of this tool.
///
/// Ties in the final count go to the earlier ranked word.
pub fn container_word(words: &[String]) -> Containment {
    let mut ranked: Vec<Vec<char>> = words.iter().map(|w| w.chars().collect()).collect();
    ranked.sort_by(|a, b| b.len().cmp(&a.len()));

    // (container, hits) in order of first hit.
    let mut hits: Vec<(Vec<char>, usize)> = vec![];

    let mut outer = 0usize;
    while outer < ranked.len() {
        let long = ranked[outer].clone();
        let mut inner = 0usize;
        while inner < ranked.len() {
            let short = &ranked[inner];
            if short.len() <= long.len() && *short != long && is_subsequence(short, &long) {
                match hits.iter_mut().find(|(w, _)| *w == long) {
                    Some((_, n)) => *n += 1,
                    None => hits.push((long.clone(), 1)),
                }
                ranked.remove(inner);
            }
            inner += 1;
        }
        outer += 1;
    }

    let mut best: Option<&(Vec<char>, usize)> = None;
    for entry in &hits {
        if best.map_or(true, |b| entry.1 > b.1) {
            best = Some(entry);
        }
    }

    match best {
        Some((word, count)) => Containment {
            word: word.iter().collect(),
            count: *count,
        },
        None => Containment::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn subsequence_is_ordered_but_not_contiguous() {
        assert!(is_subsequence(&chars("cat"), &chars("concatenate")));
        assert!(is_subsequence(&chars("cnt"), &chars("concatenate")));
        assert!(!is_subsequence(&chars("dog"), &chars("concatenate")));
        assert!(!is_subsequence(&chars("tac"), &chars("cat")));
        assert!(is_subsequence(&chars(""), &chars("x")));
    }

    #[test]
    fn frequencies_split_on_single_spaces() {
        let freq = word_frequencies("  the cat  the, hat\nThe cat\n\n");
        assert_eq!(freq.order, words(&["the", "cat", "the,", "hat", "The"]));
        assert_eq!(freq.counts["the"], 1);
        assert_eq!(freq.counts["cat"], 2);
        assert_eq!(freq.counts.len(), 5);
    }

    #[test]
    fn carriage_returns_end_lines() {
        let freq = word_frequencies("a\rb\r\nc d\n");
        assert_eq!(freq.order, words(&["a", "b", "c", "d"]));
    }

    #[test]
    fn tabs_stay_inside_tokens() {
        let freq = word_frequencies("a\tb c");
        assert_eq!(freq.order, words(&["a\tb", "c"]));
    }

    #[test]
    fn concatenate_contains_cat_but_not_dog() {
        let c = container_word(&words(&["cat", "dog", "concatenate"]));
        assert_eq!(c.word, "concatenate");
        assert_eq!(c.count, 1);
    }

    #[test]
    fn counts_every_contained_word() {
        // ranked: planets, plan, ant, net. "ant" slides into the slot "plan"
        // vacated and is passed over, so only "plan" and "net" are credited.
        let c = container_word(&words(&["plan", "planets", "ant", "net"]));
        assert_eq!(c.word, "planets");
        assert_eq!(c.count, 2);
    }

    #[test]
    fn consumed_word_shifts_next_candidate_out_of_reach() {
        // "ab" is consumed by "abcd"; "cd" slides into its slot and is skipped.
        let c = container_word(&words(&["abcd", "ab", "cd"]));
        assert_eq!(c, Containment { word: "abcd".into(), count: 1 });
    }

    #[test]
    fn contained_word_cannot_be_container() {
        // "abc" is consumed by "abcde" before it gets to scan for "ab".
        let c = container_word(&words(&["abcde", "abc", "xy", "ab"]));
        assert_eq!(c.word, "abcde");
        assert_eq!(c.count, 2);
    }

    #[test]
    fn ties_go_to_the_earlier_ranked_word() {
        let c = container_word(&words(&["xyz", "xy", "abc", "ab"]));
        // ranked: xyz, abc, xy, ab
        assert_eq!(c, Containment { word: "xyz".into(), count: 1 });
    }

    #[test]
    fn no_containment_yields_sentinel() {
        assert_eq!(container_word(&words(&["dog", "cat"])), Containment::none());
        assert_eq!(container_word(&[]), Containment::none());
    }

    #[test]
    fn multibyte_words_compare_by_char() {
        let c = container_word(&words(&["ñandú", "ñú"]));
        assert_eq!(c, Containment { word: "ñandú".into(), count: 1 });
        let c = container_word(&words(&["ñandú", "un"]));
        assert_eq!(c.word, NO_CONTAINER);
    }

    #[test]
    fn extract_reports_words_and_container() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("story.txt");
        fs::write(&path, "the cat sat\nconcatenate the cat\n").expect("write");

        let rec = extract(&path).expect("extract");
        assert_eq!(rec.header.size, 32);
        assert_eq!(rec.header.checksum.len(), 32);
        assert_eq!(rec.unique_words, 4);
        assert_eq!(rec.container_word, "concatenate");
        assert_eq!(rec.container_count, 1);
    }

    #[test]
    fn empty_file_has_no_words() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("empty.txt");
        fs::write(&path, "").expect("write");

        let rec = extract(&path).expect("extract");
        assert_eq!(rec.header.size, 0);
        assert_eq!(rec.unique_words, 0);
        assert_eq!(rec.container_word, NO_CONTAINER);
        assert_eq!(rec.container_count, 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().expect("tempdir");
        let err = extract(&tmp.path().join("gone.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
