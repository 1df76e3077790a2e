fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn at_boundary(chars: &[char], i: usize) -> bool {
    let before = i > 0 && is_word(chars[i - 1]);
    let after = i < chars.len() && is_word(chars[i]);
    before != after
}

/// Drop an immediately repeated token: `n n` → `n`, `2 2,` → `2,`.
///
/// Single left-to-right pass, no rescanning of the output, so `a a a` becomes
/// `a a`. The repeated run starts at a word boundary and extends to the end of
/// its whitespace-delimited token; the copy must be followed by a word
/// boundary.
pub fn collapse_repeated_words(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < n {
        if chars[i].is_whitespace() || !at_boundary(&chars, i) {
            i += 1;
            continue;
        }
        let mut end = i;
        while end < n && !chars[end].is_whitespace() {
            end += 1;
        }
        let mut next = end;
        while next < n && chars[next].is_whitespace() {
            next += 1;
        }
        let len = end - i;
        let repeated = next > end
            && next + len <= n
            && chars[i..end] == chars[next..next + len]
            && at_boundary(&chars, next + len);
        if repeated {
            out.extend(&chars[copied..end]);
            copied = next + len;
            i = copied;
        } else {
            i += 1;
        }
    }
    out.extend(&chars[copied..]);
    out
}

/// Collapse whitespace runs to one space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
