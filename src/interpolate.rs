//! Interpolation scanner for `${…}` (escaped) and `#{…}` (raw) spans.

use indexmap::IndexMap;

use crate::sequence::Sequence;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    pub placeholder: String,
    pub expression: String,
    /// `${…}` output is HTML-escaped at render, `#{…}` is not.
    pub is_safe: bool,
    /// The rewritten text is exactly this one placeholder.
    pub is_full_content: bool,
}

/// Result of scanning one text or attribute value.
#[derive(Debug, Clone)]
pub struct Scan {
    pub text: String,
    pub interpolations: Option<IndexMap<String, Interpolation>>,
}

impl Scan {
    /// Splits the rewritten text into literal fragments and interpolations.
    pub fn parts(&self) -> Vec<Part<'_>> {
        let Some(interpolations) = &self.interpolations else {
            return vec![Part::Literal(&self.text)];
        };
        let mut parts = Vec::new();
        let mut rest = self.text.as_str();
        for interpolation in interpolations.values() {
            if let Some(at) = rest.find(interpolation.placeholder.as_str()) {
                if at > 0 {
                    parts.push(Part::Literal(&rest[..at]));
                }
                parts.push(Part::Expression(interpolation));
                rest = &rest[at + interpolation.placeholder.len()..];
            }
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest));
        }
        parts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part<'s> {
    Literal(&'s str),
    Expression(&'s Interpolation),
}

pub fn has_markers(text: &str) -> bool {
    text.contains("${") || text.contains("#{")
}

/// Replace every interpolation in `text` with a placeholder from `sequence`.
pub fn scan(text: &str, sequence: &mut Sequence) -> Scan {
    if !has_markers(text) {
        return Scan {
            text: text.to_string(),
            interpolations: None,
        };
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut found: IndexMap<String, Interpolation> = IndexMap::new();
    let mut i = 0;

    while i < chars.len() {
        let opens = (chars[i] == '$' || chars[i] == '#') && chars.get(i + 1) == Some(&'{');
        if !opens {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let is_safe = chars[i] == '$';
        i += 2;
        let mut expression = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        while i < chars.len() {
            let c = chars[i];
            i += 1;
            if let Some(q) = quote {
                expression.push(c);
                if c == '\\' {
                    if let Some(next) = chars.get(i) {
                        expression.push(*next);
                        i += 1;
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' | '`' => {
                    quote = Some(c);
                    expression.push(c);
                }
                '{' => {
                    if !expression.is_empty() {
                        depth += 1;
                    }
                    expression.push(c);
                }
                '}' if depth == 0 => break,
                '}' => {
                    depth -= 1;
                    expression.push(c);
                }
                _ => expression.push(c),
            }
        }

        let placeholder = sequence.placeholder();
        out.push_str(&placeholder);
        tracing::trace!(%placeholder, %expression, "interpolation");
        found.insert(
            placeholder.clone(),
            Interpolation {
                placeholder,
                expression,
                is_safe,
                is_full_content: false,
            },
        );
    }

    if found.len() == 1 {
        let trimmed = out.trim();
        for interpolation in found.values_mut() {
            interpolation.is_full_content = trimmed == interpolation.placeholder;
        }
    }

    Scan {
        text: out,
        interpolations: Some(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq() -> Sequence {
        Sequence::new("test")
    }

    #[test]
    fn test_literal_text_is_unchanged() {
        let scan = scan("  plain $ text # {x} ", &mut seq());
        assert!(scan.interpolations.is_none());
        assert_eq!(scan.text, "  plain $ text # {x} ");
    }

    #[test]
    fn test_single_placeholder_is_full_content() {
        let scan = scan(" ${count} ", &mut seq());
        let found = scan.interpolations.unwrap();
        assert_eq!(found.len(), 1);
        let interpolation = found.values().next().unwrap();
        assert_eq!(interpolation.expression, "count");
        assert!(interpolation.is_safe);
        assert!(interpolation.is_full_content);
        assert_eq!(scan.text.trim(), interpolation.placeholder);
    }

    #[test]
    fn test_partial_and_unsafe() {
        let scan = scan("a ${x} b #{y}", &mut seq());
        let found: Vec<_> = scan.interpolations.clone().unwrap().into_values().collect();
        assert_eq!(found.len(), 2);
        assert!(found[0].is_safe);
        assert!(!found[1].is_safe);
        assert!(!found[0].is_full_content);
        assert_eq!(found[1].expression, "y");

        let parts = scan.parts();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], Part::Literal("a "));
        assert_eq!(parts[2], Part::Literal(" b "));
    }

    #[test]
    fn test_nested_braces_and_strings() {
        let scan = scan("${ {a: 1}.a + '}' }", &mut seq());
        let found = scan.interpolations.unwrap();
        let interpolation = found.values().next().unwrap();
        assert_eq!(interpolation.expression, " {a: 1}.a + '}' ");
    }

    #[test]
    fn test_unterminated_expression_is_kept() {
        let scan = scan("x ${ a + ", &mut seq());
        let found = scan.interpolations.unwrap();
        assert_eq!(found.values().next().unwrap().expression, " a + ");
    }

    #[test]
    fn test_same_sequence_same_placeholders() {
        let a = scan("${x}", &mut seq());
        let b = scan("${x}", &mut seq());
        assert_eq!(a.text, b.text);
    }
}
