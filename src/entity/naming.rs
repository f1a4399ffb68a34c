//! Entity naming: PascalCase plus a best-effort singularization.
//!
//! The suffix rules are deliberately simple. A short table of irregular and
//! uncountable words is consulted first so the most common false positives
//! ("Status" → "Statu", "People" → "People") come out right.

use itertools::Itertools;

const IRREGULAR_SINGULARS: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("statuses", "status"),
    ("status", "status"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("analyses", "analysis"),
    ("data", "data"),
    ("media", "media"),
    ("news", "news"),
    ("series", "series"),
    ("species", "species"),
    ("settings", "settings"),
];

/// `line-items` → `LineItems`, `user_profile` → `UserProfile`.
/// Existing inner capitals are kept, so `lineItems` → `LineItems`.
pub fn pascal_case(segment: &str) -> String {
    segment
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Byte index where the last word of a PascalCase identifier starts.
fn last_word_start(word: &str) -> usize {
    word.char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_uppercase())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Singularizes a PascalCase word by its last component.
pub fn singularize(word: &str) -> String {
    let split = last_word_start(word);
    let (head, tail) = word.split_at(split);
    let lower_tail = tail.to_ascii_lowercase();

    if let Some((_, singular)) = IRREGULAR_SINGULARS
        .iter()
        .find(|(plural, _)| *plural == lower_tail)
    {
        let mut restored = String::with_capacity(head.len() + singular.len());
        restored.push_str(head);
        restored.push_str(&match_leading_case(tail, singular));
        return restored;
    }

    let lower = word.to_ascii_lowercase();
    if lower.len() > 3 && lower.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if lower.ends_with("ses") {
        word[..word.len() - 2].to_string()
    } else if lower.ends_with('s') && !lower.ends_with("ss") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn match_leading_case(original: &str, replacement: &str) -> String {
    let upper = original.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if upper => first.to_ascii_uppercase().to_string() + chars.as_str(),
        Some(first) => first.to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Derives an entity name from a resource path segment.
pub fn entity_name(segment: &str) -> String {
    singularize(&pascal_case(segment))
}

/// `WorkItem` → `Work Item`.
pub fn humanize(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for c in name.chars() {
        if c.is_ascii_uppercase() || words.is_empty() {
            words.push(c.to_string());
        } else if let Some(last) = words.last_mut() {
            last.push(c);
        }
    }
    words.iter().join(" ")
}

/// Lower-cased word tokens of an identifier or sentence, splitting on
/// punctuation and camelCase boundaries: `firstName` → `["first", "name"]`.
pub fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in text.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
