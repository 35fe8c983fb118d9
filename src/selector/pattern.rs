//! Textual rewriting of CSS selectors
//!
//! Selectors are tokenized into compounds (`tag.class#id[attr]:pseudo`) and
//! the combinators between them, rewritten, and rendered back. The tokenizer
//! only understands as much CSS as the rewrites need; anything it cannot
//! classify is carried through verbatim.

use crate::selector::generated::is_likely_generated;

/// Tags that wrap content without saying anything about it
const GENERIC_TAGS: &[&str] = &["div", "span"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

impl Combinator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Descendant => " ",
            Self::Child => " > ",
            Self::Adjacent => " + ",
            Self::Sibling => " ~ ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimplePart {
    Class(String),
    Id(String),
    /// Attribute selectors and pseudo-classes, kept verbatim
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    parts: Vec<SimplePart>,
}

impl Compound {
    fn parse(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        let mut tag = String::new();
        while i < chars.len() && !matches!(chars[i], '.' | '#' | '[' | ':') {
            tag.push(chars[i]);
            i += 1;
        }

        let mut parts = Vec::new();
        while i < chars.len() {
            let start = i;
            match chars[i] {
                '.' | '#' => {
                    i += 1;
                    while i < chars.len() && !matches!(chars[i], '.' | '#' | '[' | ':') {
                        i += 1;
                    }
                    let name: String = chars[start + 1..i].iter().collect();
                    parts.push(if chars[start] == '.' {
                        SimplePart::Class(name)
                    } else {
                        SimplePart::Id(name)
                    });
                }
                '[' => {
                    i = skip_balanced(&chars, i, '[', ']');
                    parts.push(SimplePart::Other(chars[start..i].iter().collect()));
                }
                _ => {
                    // pseudo-class or pseudo-element, with optional argument
                    i += 1;
                    if i < chars.len() && chars[i] == ':' {
                        i += 1;
                    }
                    while i < chars.len() && !matches!(chars[i], '.' | '#' | '[' | ':' | '(') {
                        i += 1;
                    }
                    if i < chars.len() && chars[i] == '(' {
                        i = skip_balanced(&chars, i, '(', ')');
                    }
                    parts.push(SimplePart::Other(chars[start..i].iter().collect()));
                }
            }
        }

        Self {
            tag: if tag.is_empty() { None } else { Some(tag) },
            parts,
        }
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.parts.is_empty()
    }

    fn is_bare_generic(&self) -> bool {
        self.parts.is_empty()
            && self
                .tag
                .as_deref()
                .map(|t| GENERIC_TAGS.contains(&t.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
    }

    fn render(&self) -> String {
        let mut out = self.tag.clone().unwrap_or_default();
        for part in &self.parts {
            match part {
                SimplePart::Class(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                SimplePart::Id(name) => {
                    out.push('#');
                    out.push_str(name);
                }
                SimplePart::Other(raw) => out.push_str(raw),
            }
        }
        out
    }
}

/// Returns the index just past the bracket that closes the one at `open_at`
fn skip_balanced(chars: &[char], open_at: usize, open: char, close: char) -> usize {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut i = open_at;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == open => depth += 1,
            None if c == close => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            None => {}
        }
        i += 1;
    }
    chars.len()
}

/// One comma-free selector: compounds joined by combinators
///
/// `steps[0].0` is always `None`.
#[derive(Debug, Clone, Default)]
struct ComplexSelector {
    steps: Vec<(Option<Combinator>, Compound)>,
}

impl ComplexSelector {
    fn parse(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut steps: Vec<(Option<Combinator>, Compound)> = Vec::new();
        let mut current = String::new();
        let mut pending: Option<Combinator> = None;
        let mut i = 0;

        type Steps = Vec<(Option<Combinator>, Compound)>;
        let flush = |current: &mut String, pending: &mut Option<Combinator>, steps: &mut Steps| {
            if !current.is_empty() {
                let combinator = if steps.is_empty() {
                    None
                } else {
                    Some(pending.unwrap_or(Combinator::Descendant))
                };
                steps.push((combinator, Compound::parse(current)));
                current.clear();
                *pending = None;
            }
        };

        while i < chars.len() {
            let c = chars[i];
            match c {
                '[' | '(' => {
                    let close = if c == '[' { ']' } else { ')' };
                    let end = skip_balanced(&chars, i, c, close);
                    current.extend(&chars[i..end]);
                    i = end;
                    continue;
                }
                '>' | '+' | '~' => {
                    flush(&mut current, &mut pending, &mut steps);
                    pending = Some(match c {
                        '>' => Combinator::Child,
                        '+' => Combinator::Adjacent,
                        _ => Combinator::Sibling,
                    });
                }
                c if c.is_whitespace() => {
                    flush(&mut current, &mut pending, &mut steps);
                }
                _ => current.push(c),
            }
            i += 1;
        }
        flush(&mut current, &mut pending, &mut steps);

        Self { steps }
    }

    /// Applies `rewrite` to every compound, dropping the ones it empties
    ///
    /// When a compound disappears the link between its neighbours can no
    /// longer be exact, so it becomes a descendant combinator.
    fn rewrite<F>(&self, mut rewrite: F) -> Self
    where
        F: FnMut(&Compound) -> Compound,
    {
        let mut steps: Vec<(Option<Combinator>, Compound)> = Vec::new();
        let mut loosen = false;

        for (combinator, compound) in &self.steps {
            let rewritten = rewrite(compound);
            if rewritten.is_empty() {
                loosen = true;
                continue;
            }
            let combinator = if steps.is_empty() {
                None
            } else if loosen {
                Some(Combinator::Descendant)
            } else {
                *combinator
            };
            loosen = false;
            steps.push((combinator, rewritten));
        }

        Self { steps }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (combinator, compound) in &self.steps {
            if let Some(c) = combinator {
                out.push_str(c.as_str());
            }
            out.push_str(&compound.render());
        }
        out
    }
}

/// Splits a selector list on top-level commas
fn split_groups(selector: &str) -> Vec<String> {
    let chars: Vec<char> = selector.chars().collect();
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c @ ('[' | '(') => {
                let close = if c == '[' { ']' } else { ')' };
                let end = skip_balanced(&chars, i, c, close);
                current.extend(&chars[i..end]);
                i = end;
                continue;
            }
            ',' => groups.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
        i += 1;
    }
    groups.push(current);
    groups
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}

fn map_groups<F>(selector: &str, mut f: F) -> String
where
    F: FnMut(&ComplexSelector) -> ComplexSelector,
{
    split_groups(selector)
        .iter()
        .map(|group| f(&ComplexSelector::parse(group)).render())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shortens a selector by dropping structure that rarely matters
///
/// Child combinators become descendant combinators, bare `div`/`span`
/// wrappers are removed, and `div.x` becomes `.x`. The last compound (the
/// element actually targeted) is never removed.
///
/// # Examples
///
/// ```
/// use gleaner::selector::simplify_selector;
///
/// assert_eq!(simplify_selector("div.container > div > div > a"), ".container a");
/// assert_eq!(simplify_selector("article.post h2.title"), "article.post h2.title");
/// ```
pub fn simplify_selector(selector: &str) -> String {
    map_groups(selector, |complex| {
        let last = complex.steps.len().saturating_sub(1);
        let steps = complex
            .steps
            .iter()
            .enumerate()
            .filter_map(|(idx, (_, compound))| {
                if compound.is_bare_generic() && idx != last {
                    return None;
                }
                let mut compound = compound.clone();
                let tag_is_generic = compound
                    .tag
                    .as_deref()
                    .map(|t| GENERIC_TAGS.contains(&t.to_ascii_lowercase().as_str()))
                    .unwrap_or(false);
                if tag_is_generic && !compound.parts.is_empty() {
                    compound.tag = None;
                }
                Some(compound)
            })
            .enumerate()
            .map(|(idx, compound)| {
                let combinator = if idx == 0 {
                    None
                } else {
                    Some(Combinator::Descendant)
                };
                (combinator, compound)
            })
            .collect();
        ComplexSelector { steps }
    })
}

/// Strips build-generated class and id tokens from a selector
///
/// Compounds left empty are dropped; combinators and stable tokens survive.
///
/// # Examples
///
/// ```
/// use gleaner::selector::extract_structural_pattern;
///
/// assert_eq!(extract_structural_pattern("h3.css-17p10p8 a"), "h3 a");
/// assert_eq!(extract_structural_pattern("div.emotion-abc > span"), "div > span");
/// ```
pub fn extract_structural_pattern(selector: &str) -> String {
    map_groups(selector, |complex| {
        complex.rewrite(|compound| Compound {
            tag: compound.tag.clone(),
            parts: compound
                .parts
                .iter()
                .filter(|part| match part {
                    SimplePart::Class(name) | SimplePart::Id(name) => !is_likely_generated(name),
                    SimplePart::Other(_) => true,
                })
                .cloned()
                .collect(),
        })
    })
}

/// Reduces a selector to its tag names, e.g. `article.post h2.title` to `article h2`
pub fn tag_only_pattern(selector: &str) -> String {
    map_groups(selector, |complex| {
        complex.rewrite(|compound| Compound {
            tag: compound.tag.clone().filter(|t| t != "*"),
            parts: Vec::new(),
        })
    })
}

/// Class and id tokens appearing anywhere in a selector
pub(crate) fn selector_tokens(selector: &str) -> Vec<String> {
    split_groups(selector)
        .iter()
        .flat_map(|group| ComplexSelector::parse(group).steps)
        .flat_map(|(_, compound)| compound.parts)
        .filter_map(|part| match part {
            SimplePart::Class(name) | SimplePart::Id(name) => Some(name),
            SimplePart::Other(_) => None,
        })
        .collect()
}
