/// Minimum token length used when none is configured.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 4;

/// Lowercase `name` and collapse every run of non-alphanumeric characters
/// into a single space.
///
/// `"Intubation – Adult (ETT)"` becomes `"intubation adult ett"`.
#[must_use]
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalized words of `name` with at least `min_len` characters.
#[must_use]
pub fn tokens(name: &str, min_len: usize) -> Vec<String> {
    normalize(name)
        .split(' ')
        .filter(|w| w.chars().count() >= min_len)
        .map(str::to_owned)
        .collect()
}

/// Loose token equality: one contains the other, or both share their first
/// four characters.
#[must_use]
pub fn tokens_similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    match (prefix4(a), prefix4(b)) {
        (Some(pa), Some(pb)) => pa == pb,
        _ => false,
    }
}

fn prefix4(s: &str) -> Option<&str> {
    let (idx, _) = s.char_indices().nth(3)?;
    let end = idx + s[idx..].chars().next()?.len_utf8();
    Some(&s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation() {
        assert_eq!(normalize("Intubation – Adult"), "intubation adult");
        assert_eq!(
            normalize("  Adult Endotracheal Intubation (ETT) "),
            "adult endotracheal intubation ett"
        );
        assert_eq!(normalize("12-Lead ECG"), "12 lead ecg");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn tokens_respect_min_len() {
        assert_eq!(
            tokens("Administration of Drug", 4),
            vec!["administration", "drug"]
        );
        assert_eq!(tokens("BVM use", 4), Vec::<String>::new());
        assert_eq!(tokens("BVM use", 3), vec!["bvm", "use"]);
    }

    #[test]
    fn similarity_by_containment() {
        assert!(tokens_similar("intubation", "intubat"));
        assert!(tokens_similar("splint", "splinting"));
    }

    #[test]
    fn similarity_by_shared_prefix() {
        assert!(tokens_similar("administration", "administer"));
        assert!(tokens_similar("ventilation", "ventricular"));
        assert!(!tokens_similar("cardiac", "carotid"));
    }

    #[test]
    fn short_tokens_need_containment() {
        assert!(!tokens_similar("abc", "abd"));
        assert!(!tokens_similar("", "abc"));
    }

    #[test]
    fn prefix_is_char_based() {
        assert!(tokens_similar("pédiatrique", "pédiatrie"));
        assert_eq!(prefix4("pédi-x"), Some("pédi"));
        assert_eq!(prefix4("abc"), None);
    }
}
