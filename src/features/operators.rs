use regex::Regex;

/// One vocabulary entry, compiled once per extractor.
#[derive(Debug, Clone)]
pub enum OperatorMatcher {
    /// Alphabetic token, counted at `\b` word boundaries.
    Word(Regex),
    /// Any other token, counted as a literal substring.
    Literal(String),
}

impl OperatorMatcher {
    pub fn new(op: &str) -> Option<Self> {
        if op.is_empty() {
            return None;
        }
        if op.chars().all(char::is_alphabetic) {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(op))).ok()?;
            Some(OperatorMatcher::Word(re))
        } else {
            Some(OperatorMatcher::Literal(op.to_string()))
        }
    }

    pub fn count(&self, text: &str) -> usize {
        match self {
            OperatorMatcher::Word(re) => re.find_iter(text).count(),
            OperatorMatcher::Literal(op) => text.matches(op.as_str()).count(),
        }
    }
}

pub fn compile(vocabulary: &[String]) -> Vec<OperatorMatcher> {
    vocabulary
        .iter()
        .filter_map(|op| OperatorMatcher::new(op))
        .collect()
}

/// Occurrences of every vocabulary entry, summed. Overlapping entries
/// (`/` and `//`) are each counted on their own.
pub fn count_operations(text: &str, matchers: &[OperatorMatcher]) -> usize {
    matchers.iter().map(|m| m.count(text)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureConfig;

    fn vocab(ops: &[&str]) -> Vec<OperatorMatcher> {
        compile(&ops.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn named_operators_are_whole_words() {
        let m = vocab(&["xor", "mod"]);
        assert_eq!(count_operations("a xor b mod c", &m), 2);
        assert_eq!(count_operations("modulo xored", &m), 0);
    }

    #[test]
    fn symbols_match_anywhere() {
        let m = vocab(&["+"]);
        assert_eq!(count_operations("a+b", &m), 1);
        assert_eq!(count_operations("10^9+7 and +5", &m), 2);
    }

    #[test]
    fn overlapping_symbols_count_separately() {
        let m = vocab(&["/", "//"]);
        assert_eq!(count_operations("a // b", &m), 3);
        let m = vocab(&["<", "<<"]);
        assert_eq!(count_operations("1 << 3", &m), 3);
    }

    #[test]
    fn empty_entries_are_dropped() {
        assert!(vocab(&[""]).is_empty());
    }

    #[test]
    fn default_vocabulary() {
        let m = compile(&FeatureConfig::default().operators);
        assert_eq!(m.len(), 14);
        // '+' once, '·' once, "mod" once
        assert_eq!(count_operations("print (a+b) mod 2·k", &m), 3);
    }
}
