//! Heading slugs.
//!
//! Matches the slug scheme markdown editors use for heading anchors:
//! lowercase, whitespace collapsed to dashes, most punctuation stripped,
//! duplicates disambiguated with a numeric suffix.

use std::collections::HashMap;

const STRIPPED: &str = "][!'#$%&()*+,./:;<=>?@\\^_{|}~`\u{3002}\u{ff0c}\u{3001}\u{ff1b}\u{ff1a}\u{ff1f}\u{ff01}\u{2026}\u{2014}\u{00b7}\u{02c9}\u{00a8}\u{2018}\u{2019}\u{201c}\u{201d}\u{3005}\u{ff5e}\u{2016}\u{2236}\u{ff02}\u{ff07}\u{ff40}\u{ff5c}\u{3003}\u{3014}\u{3015}\u{3008}\u{3009}\u{300a}\u{300b}\u{300c}\u{300d}\u{300e}\u{300f}\u{ff0e}\u{3016}\u{3017}\u{3008}\u{3009}\u{3010}\u{3011}\u{ff08}\u{ff09}\u{ff3b}\u{ff3d}\u{ff5b}\u{ff5d}";

/// Slugify a heading's plain text.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_dash = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_dash {
                slug.push('-');
                last_was_dash = true;
            }
            continue;
        }
        if STRIPPED.contains(ch) {
            continue;
        }
        for lower in ch.to_lowercase() {
            slug.push(lower);
        }
        last_was_dash = false;
    }
    slug
}

/// Hands out unique slugs across one document.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base.clone()
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_dashes() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  Trim   Me  "), "trim-me");
    }

    #[test]
    fn strips_punctuation() {
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("v1.2.3 (beta)"), "v123-beta");
    }

    #[test]
    fn keeps_unicode_letters() {
        assert_eq!(slugify("日本語の見出し"), "日本語の見出し");
    }

    #[test]
    fn duplicates_get_suffixes() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.slug("Setup"), "setup");
        assert_eq!(slugger.slug("Setup"), "setup-1");
        assert_eq!(slugger.slug("Setup"), "setup-2");
        assert_eq!(slugger.slug("Other"), "other");
    }
}
