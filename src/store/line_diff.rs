//! Line-based diff producing ndiff-style tokens.
//!
//! Tokens carry a two-character tag followed by the line text:
//! `"  "` for an unchanged line, `"+ "` for an inserted one and `"- "` for a
//! deleted one. The edit script is a shortest one (Myers), computed after the
//! common prefix and suffix are stripped.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit<'a> {
    Equal(&'a str),
    Insert(&'a str),
    Delete(&'a str),
}

impl LineEdit<'_> {
    pub fn to_token(&self) -> String {
        match self {
            LineEdit::Equal(line) => format!("  {line}"),
            LineEdit::Insert(line) => format!("+ {line}"),
            LineEdit::Delete(line) => format!("- {line}"),
        }
    }
}

/// Parses a token back into an edit. Unknown tags yield `None`.
pub fn parse_token(token: &str) -> Option<LineEdit<'_>> {
    if let Some(line) = token.strip_prefix("  ") {
        Some(LineEdit::Equal(line))
    } else if let Some(line) = token.strip_prefix("+ ") {
        Some(LineEdit::Insert(line))
    } else {
        token.strip_prefix("- ").map(LineEdit::Delete)
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits `text` into lines on every Unicode line boundary, `\r\n` counting
/// as one. A trailing break does not start an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Diffs `old` against `new` line by line.
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> Vec<LineEdit<'a>> {
    let a = split_lines(old);
    let b = split_lines(new);

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut edits: Vec<LineEdit<'a>> = a[..prefix].iter().map(|&l| LineEdit::Equal(l)).collect();
    edits.extend(myers(&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]));
    edits.extend(a[a.len() - suffix..].iter().map(|&l| LineEdit::Equal(l)));
    edits
}

/// Convenience wrapper returning serialized tokens.
pub fn diff_tokens(old: &str, new: &str) -> Vec<String> {
    diff_lines(old, new).iter().map(LineEdit::to_token).collect()
}

/// Rebuilds the new text's lines from a token sequence (unchanged + inserted).
pub fn reconstruct_new(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .filter_map(|t| match parse_token(t)? {
            LineEdit::Equal(line) | LineEdit::Insert(line) => Some(line),
            LineEdit::Delete(_) => None,
        })
        .collect()
}

/// Rebuilds the old text's lines from a token sequence (unchanged + deleted).
pub fn reconstruct_old(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .filter_map(|t| match parse_token(t)? {
            LineEdit::Equal(line) | LineEdit::Delete(line) => Some(line),
            LineEdit::Insert(_) => None,
        })
        .collect()
}

fn myers<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<LineEdit<'a>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }
    let offset = max;
    let mut v = vec![0isize; 2 * max as usize + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut edits = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(LineEdit::Equal(a[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(LineEdit::Insert(b[(y - 1) as usize]));
            } else {
                edits.push(LineEdit::Delete(a[(x - 1) as usize]));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    edits.reverse();
    edits
}
