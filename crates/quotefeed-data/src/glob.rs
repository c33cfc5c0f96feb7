//! Glob matching for cache invalidation patterns.
//!
//! Supports `*` (any run), `?` (one char) and `[...]` classes with ranges
//! and `!`/`^` negation. An unterminated `[` matches itself literally.

pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(&pattern, p, text[t]) {
                        if matched {
                            p = next;
                            t += 1;
                            continue;
                        }
                    } else if text[t] == '[' {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
                c if c == text[t] => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }
        }

        match backtrack {
            Some((star, absorbed)) => {
                p = star + 1;
                t = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match `c` against the class starting at `pattern[start] == '['`.
///
/// Returns `(matched, index after ']')`, or `None` if the class is not
/// terminated.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = matches!(pattern.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    loop {
        let current = *pattern.get(i)?;
        if current == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;

        if pattern.get(i + 1) == Some(&'-') && pattern.get(i + 2).is_some_and(|&e| e != ']') {
            let end = pattern[i + 2];
            if current <= c && c <= end {
                matched = true;
            }
            i += 3;
        } else {
            if current == c {
                matched = true;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_wildcards() {
        assert!(glob_match("quote:AAPL", "quote:AAPL"));
        assert!(!glob_match("quote:AAPL", "quote:AAP"));
        assert!(glob_match("quote:*", "quote:AAPL"));
        assert!(glob_match("*", ""));
        assert!(glob_match("quote:A?PL", "quote:AAPL"));
        assert!(!glob_match("quote:A?PL", "quote:APL"));
        assert!(glob_match("candles:*:1d:*", "candles:MSFT:1d:0:100"));
        assert!(!glob_match("candles:*:1d:*", "candles:MSFT:1h:0:100"));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(glob_match("*a*b", "xxaxxab"));
        assert!(glob_match("a*b*c", "abbbc"));
        assert!(!glob_match("a*b*c", "abbb"));
    }

    #[test]
    fn test_classes() {
        assert!(glob_match("quote:[AM]*", "quote:AAPL"));
        assert!(glob_match("quote:[AM]*", "quote:MSFT"));
        assert!(!glob_match("quote:[AM]*", "quote:TSLA"));
        assert!(glob_match("quote:[A-C]*", "quote:BRK"));
        assert!(glob_match("quote:[!A-C]*", "quote:TSLA"));
        assert!(!glob_match("quote:[!A-C]*", "quote:AAPL"));
        assert!(glob_match("x[]]", "x]"));
    }

    #[test]
    fn test_escaped_metacharacters() {
        assert!(glob_match("a[*]b", "a*b"));
        assert!(!glob_match("a[*]b", "axb"));
        assert!(glob_match("a[", "a["));
    }
}
