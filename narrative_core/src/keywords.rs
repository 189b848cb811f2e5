//! Ordered keyword rules for cheap intent classification.
//!
//! A rule table is plain data: rules are tested top to bottom and the first
//! rule with any keyword occurring in the lower-cased text wins. Precedence
//! is therefore the declaration order of the table.

/// One row of a rule table.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<C> {
    pub category: C,
    pub keywords: &'static [&'static str],
}

impl<C: Copy> KeywordRule<C> {
    pub const fn new(category: C, keywords: &'static [&'static str]) -> Self {
        Self { category, keywords }
    }

    /// `lowered` must already be lower-case.
    fn matches(&self, lowered: &str) -> bool {
        contains_any(lowered, self.keywords)
    }
}

/// First category whose keywords occur in `text` (case-insensitive).
pub fn classify<C: Copy>(rules: &[KeywordRule<C>], text: &str) -> Option<C> {
    let lowered = text.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.category)
}

/// Substring test against an already lower-cased haystack.
pub fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mood {
        Angry,
        Happy,
    }

    const RULES: &[KeywordRule<Mood>] = &[
        KeywordRule::new(Mood::Angry, &["furious", "mad"]),
        KeywordRule::new(Mood::Happy, &["glad", "happy"]),
    ];

    #[test]
    fn test_first_matching_rule_wins() {
        assert_eq!(classify(RULES, "I am GLAD but also Mad"), Some(Mood::Angry));
        assert_eq!(classify(RULES, "so happy"), Some(Mood::Happy));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(classify(RULES, "indifferent"), None);
        assert_eq!(classify(RULES, ""), None);
    }

    #[test]
    fn test_substring_semantics() {
        // "made" contains "mad"
        assert_eq!(classify(RULES, "she made tea"), Some(Mood::Angry));
    }
}
