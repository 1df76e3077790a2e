/// LaTeX fragment → plain text.
///
/// Implementations must not fail: unsupported input yields best-effort text,
/// possibly empty.
pub trait LatexConverter: Send + Sync {
    fn to_text(&self, latex: &str) -> String;
}

/// Small built-in converter covering the math found in contest statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatexText;

impl LatexConverter for LatexText {
    fn to_text(&self, latex: &str) -> String {
        if latex.trim().is_empty() {
            return String::new();
        }
        let chars: Vec<char> = latex.chars().collect();
        let mut cursor = Cursor {
            chars: &chars,
            pos: 0,
            depth: 0,
            flat_braces: 0,
        };
        let mut out = String::with_capacity(latex.len());
        cursor.render_until(None, &mut out);
        out.trim().to_string()
    }
}

const SYMBOLS: &[(&str, &str)] = &[
    ("le", "≤"),
    ("leq", "≤"),
    ("leqslant", "≤"),
    ("ge", "≥"),
    ("geq", "≥"),
    ("geqslant", "≥"),
    ("ne", "≠"),
    ("neq", "≠"),
    ("lt", "<"),
    ("gt", ">"),
    ("cdot", "·"),
    ("times", "×"),
    ("div", "÷"),
    ("pm", "±"),
    ("mp", "∓"),
    ("to", "→"),
    ("rightarrow", "→"),
    ("leftarrow", "←"),
    ("gets", "←"),
    ("Rightarrow", "⇒"),
    ("implies", "⇒"),
    ("Leftrightarrow", "⇔"),
    ("iff", "⇔"),
    ("ldots", "..."),
    ("dots", "..."),
    ("cdots", "..."),
    ("vdots", "..."),
    ("infty", "∞"),
    ("sum", "∑"),
    ("prod", "∏"),
    ("oplus", "⊕"),
    ("otimes", "⊗"),
    ("land", "∧"),
    ("wedge", "∧"),
    ("lor", "∨"),
    ("vee", "∨"),
    ("neg", "¬"),
    ("lnot", "¬"),
    ("in", "∈"),
    ("notin", "∉"),
    ("subset", "⊂"),
    ("subseteq", "⊆"),
    ("cup", "∪"),
    ("cap", "∩"),
    ("emptyset", "∅"),
    ("forall", "∀"),
    ("exists", "∃"),
    ("approx", "≈"),
    ("equiv", "≡"),
    ("circ", "∘"),
    ("prime", "′"),
    ("lfloor", "⌊"),
    ("rfloor", "⌋"),
    ("lceil", "⌈"),
    ("rceil", "⌉"),
    ("langle", "⟨"),
    ("rangle", "⟩"),
    ("mid", "|"),
    ("vert", "|"),
    ("lvert", "|"),
    ("rvert", "|"),
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("epsilon", "ε"),
    ("varepsilon", "ε"),
    ("lambda", "λ"),
    ("mu", "μ"),
    ("pi", "π"),
    ("sigma", "σ"),
    ("phi", "φ"),
    ("omega", "ω"),
    ("Delta", "Δ"),
    ("Sigma", "Σ"),
    ("quad", " "),
    ("qquad", " "),
];

// rendered as their own name
const NAMED_OPERATORS: &[&str] = &[
    "bmod", "mod", "log", "ln", "lg", "max", "min", "gcd", "lcm", "sin", "cos", "tan", "exp",
    "det", "deg", "lim", "sup", "inf", "arg",
];

// keep the argument, drop the macro
const TEXT_MACROS: &[&str] = &[
    "text",
    "textbf",
    "textit",
    "textrm",
    "texttt",
    "textsuperscript",
    "mathrm",
    "mathbf",
    "mathit",
    "mathsf",
    "mathtt",
    "mathcal",
    "mathbb",
    "operatorname",
    "emph",
    "underline",
    "overline",
    "boldsymbol",
    "mbox",
    "hbox",
];

// groups and arguments nested deeper than this are rendered flat
const MAX_DEPTH: usize = 64;

struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
    depth: usize,
    /// Braces opened past `MAX_DEPTH` that are still waiting for their `}`.
    flat_braces: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn render_until(&mut self, close: Option<char>, out: &mut String) {
        while let Some(c) = self.peek() {
            if c == '}' && self.flat_braces > 0 {
                self.flat_braces -= 1;
                self.pos += 1;
                continue;
            }
            if Some(c) == close {
                self.pos += 1;
                return;
            }
            match c {
                '\\' => self.render_macro(out),
                '{' if self.depth >= MAX_DEPTH => {
                    self.flat_braces += 1;
                    self.pos += 1;
                }
                '{' => {
                    self.pos += 1;
                    self.depth += 1;
                    self.render_until(Some('}'), out);
                    self.depth -= 1;
                }
                '%' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '}' | '$' => self.pos += 1,
                '~' => {
                    out.push(' ');
                    self.pos += 1;
                }
                _ => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// One macro argument: a braced group, a nested macro or a single char.
    /// Empty past `MAX_DEPTH`; the caller then renders what follows as
    /// plain content.
    fn read_arg(&mut self) -> String {
        let mut arg = String::new();
        if self.depth >= MAX_DEPTH {
            return arg;
        }
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.depth += 1;
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.render_until(Some('}'), &mut arg);
            }
            Some('\\') => self.render_macro(&mut arg),
            Some(c) => {
                arg.push(c);
                self.pos += 1;
            }
            None => {}
        }
        self.depth -= 1;
        arg
    }

    fn skip_optional_arg(&mut self) {
        if self.peek() == Some('[') {
            while let Some(c) = self.peek() {
                self.pos += 1;
                if c == ']' {
                    break;
                }
            }
        }
    }

    fn render_macro(&mut self, out: &mut String) {
        self.pos += 1;
        let Some(first) = self.peek() else {
            return;
        };
        if !first.is_ascii_alphabetic() {
            self.pos += 1;
            match first {
                ',' | ';' | ':' | ' ' | '\\' => out.push(' '),
                '!' => {}
                '|' => out.push('‖'),
                c => out.push(c),
            }
            return;
        }

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        if let Some((_, symbol)) = SYMBOLS.iter().find(|(n, _)| *n == name) {
            out.push_str(symbol);
            return;
        }
        if NAMED_OPERATORS.contains(&name.as_str()) {
            out.push_str(if name == "bmod" { "mod" } else { name.as_str() });
            return;
        }
        if TEXT_MACROS.contains(&name.as_str()) {
            let arg = self.read_arg();
            out.push_str(&arg);
            return;
        }
        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.read_arg();
                let den = self.read_arg();
                out.push_str(&format!("{num}/{den}"));
            }
            "sqrt" => {
                self.skip_optional_arg();
                let arg = self.read_arg();
                out.push_str(&format!("√({arg})"));
            }
            "pmod" => {
                let arg = self.read_arg();
                out.push_str(&format!("(mod {arg})"));
            }
            "left" | "right" | "bigl" | "bigr" | "Bigl" | "Bigr" => {
                // \left. and \right. are invisible delimiters
                if self.peek() == Some('.') {
                    self.pos += 1;
                }
            }
            "begin" | "end" => {
                self.read_arg();
            }
            // sizing and spacing switches, and anything unknown, vanish
            _ => {}
        }
    }
}
