pub mod html;
pub mod latex;
pub mod words;

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub use html::statement_html;
pub use latex::{LatexConverter, LatexText};

static DOLLAR_MATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\$\$(.*?)\$\$\$").unwrap());
// non-greedy and unbalanced: `\texttt{a{b}c}` leaves `a{bc}`
static FORMAT_MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(texttt|mathrm|underline|textsuperscript)\{(.*?)\}").unwrap()
});

const MACRO_SYMBOLS: &[(&str, &str)] = &[
    (r"\le", "≤"),
    (r"\ge", "≥"),
    (r"\cdot", "·"),
    (r"\times", "×"),
    (r"\to", "→"),
    (r"\rightarrow", "→"),
    (r"\ldots", "..."),
    (r"\dots", "..."),
];

/// Rendered statement markup → canonical plain text.
///
/// Never fails: empty or malformed markup yields empty or partial text.
pub fn normalize(raw: &str, latex: &dyn LatexConverter) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let markup = html::rewrite_markup(raw, latex);
    let markup = DOLLAR_MATH_RE.replace_all(&markup, |caps: &Captures| {
        latex
            .to_text(&caps[1])
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    });
    let mut markup = FORMAT_MACRO_RE.replace_all(&markup, "${2}").into_owned();
    for (macro_name, symbol) in MACRO_SYMBOLS {
        markup = markup.replace(macro_name, symbol);
    }

    let text = html::flatten_text(&markup);
    let text = words::collapse_repeated_words(&text);
    words::normalize_ws(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ignores its input.
    struct Fixed(&'static str);

    impl LatexConverter for Fixed {
        fn to_text(&self, _latex: &str) -> String {
            self.0.to_string()
        }
    }

    fn norm(raw: &str) -> String {
        normalize(raw, &LatexText)
    }

    #[test]
    fn empty_markup() {
        assert_eq!(norm(""), "");
        assert_eq!(norm("  \n "), "");
    }

    #[test]
    fn mathjax_rendered_statement() {
        let raw = r#"<div class="input-specification"><div class="section-title">Input</div>
            <p>The first line contains <span class="MathJax_Preview"></span>
            <script type="math/tex">n</script> (<script type="math/tex">1 \le n \le 2 \cdot 10^5</script>).</p></div>"#;
        assert_eq!(norm(raw), "Input The first line contains n (1 ≤ n ≤ 2 · 10^5).");
    }

    #[test]
    fn triple_dollar_math() {
        assert_eq!(norm("<p>Given $$$1 \\le a_i \\le 10^9$$$.</p>"), "Given 1 ≤ a_i ≤ 10^9.");
    }

    #[test]
    fn leftover_macros_are_replaced_literally() {
        assert_eq!(
            norm(r"<p>a \le b \ge c \times d \to e \rightarrow f \ldots \dots</p>"),
            "a ≤ b ≥ c × d → e → f ... ..."
        );
        // literal replacement also hits longer macro names
        assert_eq!(norm(r"<p>x \leq y</p>"), "x ≤q y");
    }

    #[test]
    fn formatting_macros_keep_argument() {
        assert_eq!(norm(r"<p>print \texttt{YES} or \mathrm{NO}</p>"), "print YES or NO");
        assert_eq!(norm(r"<p>\underline{a{b}c}</p>"), "a{bc}");
    }

    #[test]
    fn repeated_words_from_rendering_are_dropped() {
        assert_eq!(norm("<span>n</span> <span>n</span> integers"), "n integers");
    }

    #[test]
    fn converter_failure_does_not_abort() {
        let raw = r#"<p>before <script type="math/tex">\weird</script> after $$$x$$$</p>"#;
        assert_eq!(normalize(raw, &Fixed("")), "before after");
    }

    #[test]
    fn idempotent_on_canonical_text() {
        let raw = r#"<p>A. Sum time limit per test 1 second</p>
            <p>Given <script type="math/tex">n</script> integers a<sub>1</sub>, ..., a<sub>n</sub>
            (<script type="math/tex">-10^9 \le a_i \le 10^9</script>), print their sum mod 2.</p>"#;
        let once = norm(raw);
        assert_eq!(norm(&once), once);
        assert_eq!(
            once,
            "A. Sum time limit per test 1 second Given n integers a_1, ..., a_n (-10^9 ≤ a_i ≤ 10^9), print their sum mod 2."
        );
    }
}
