use crate::error::BuildError;
use regex::Regex;

/// How a candidate is compared with the expected value.
#[derive(Debug, Clone)]
pub enum Compare {
    /// string equality
    Exact,
    /// the candidate must match the compiled regex
    Regex(Regex),
    /// the expected value is a `|` separated list, the candidate must be one of its entries
    List,
}

/// The comparison shared by every concrete matcher.
#[derive(Debug, Clone)]
pub struct MatcherItem {
    expected: String,
    compare: Compare,
}

impl MatcherItem {
    pub fn exact(expected: impl Into<String>) -> Self {
        Self { expected: expected.into(), compare: Compare::Exact }
    }

    pub fn list(expected: impl Into<String>) -> Self {
        Self { expected: expected.into(), compare: Compare::List }
    }

    /// Compiles `expected` once, failing right away when it is not a valid regex
    pub fn regex(expected: impl Into<String>) -> Result<Self, BuildError> {
        let expected = expected.into();
        let regex = Regex::new(&expected).map_err(|e| BuildError::invalid_matcher(&expected, e))?;
        Ok(Self { expected, compare: Compare::Regex(regex) })
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn compare(&self) -> &Compare {
        &self.compare
    }

    pub(crate) fn set_expected(&mut self, expected: impl Into<String>) {
        self.expected = expected.into();
    }

    /// Checks a candidate value.
    ///
    /// Missing data never satisfies a constraint, and an empty expectation accepts everything
    /// else.
    pub fn is_valid(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        if self.expected.is_empty() {
            return true;
        }
        match &self.compare {
            Compare::Exact => candidate == self.expected,
            Compare::Regex(regex) => regex.is_match(candidate),
            Compare::List => self.expected.split('|').any(|entry| entry == candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_candidate_never_matches() {
        assert!(!MatcherItem::exact("").is_valid(""));
        assert!(!MatcherItem::list("GET|POST").is_valid(""));
    }

    #[test]
    fn test_empty_expected_is_a_no_op() {
        assert!(MatcherItem::exact("").is_valid("anything"));
        assert!(MatcherItem::list("").is_valid("PUT"));
    }

    #[test]
    fn test_compare_modes() {
        assert!(MatcherItem::exact("json").is_valid("json"));
        assert!(!MatcherItem::exact("json").is_valid("jsonp"));

        let item = MatcherItem::regex("^v[0-9]+$").unwrap();
        assert!(item.is_valid("v2"));
        assert!(!item.is_valid("beta"));

        let item = MatcherItem::list("GET|HEAD");
        assert!(item.is_valid("HEAD"));
        assert!(!item.is_valid("GE"));
    }

    #[test]
    fn test_invalid_regex_fails_at_construction() {
        let result = MatcherItem::regex("(unclosed");
        assert!(matches!(result, Err(BuildError::InvalidMatcher { .. })));
    }
}
