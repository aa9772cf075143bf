use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Fold a display name into its comparison key.
///
/// Lower-cases, strips accents, turns every run of whitespace, brackets,
/// parentheses and underscores into a single `_`, and drops any other
/// non-alphanumeric character. `normalize_name(normalize_name(s)) == normalize_name(s)`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if is_separator(ch) {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '_' | '(' | ')' | '[' | ']')
}

/// A field and its normalized form, compared against header cells.
#[derive(Debug, Clone)]
pub(crate) struct NameKey {
    raw: String,
    normalized: String,
}

impl NameKey {
    pub(crate) fn new(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            normalized: normalize_name(raw),
        }
    }

    /// Raw or normalized field name equals raw or normalized header text, ignoring case.
    pub(crate) fn matches(&self, header: &NameKey) -> bool {
        [&self.raw, &self.normalized].into_iter().any(|field| {
            [&header.raw, &header.normalized]
                .into_iter()
                .any(|h| !h.is_empty() && field.to_lowercase() == h.to_lowercase())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn folds_hungarian_accents() {
        assert_eq!(normalize_name("Gyártási év"), "gyartasi_ev");
        assert_eq!(normalize_name("Őrző ÜGYFÉL"), "orzo_ugyfel");
        assert_eq!(normalize_name("Időpont (óra)"), "idopont_ora_");
    }

    #[test]
    fn collapses_separator_runs_and_drops_punctuation() {
        assert_eq!(normalize_name("first  name"), "first_name");
        assert_eq!(normalize_name("[key]_(id)"), "_key_id_");
        assert_eq!(normalize_name("e-mail!"), "email");
        assert_eq!(normalize_name("a _-_ b"), "a_b");
    }

    #[test]
    fn headers_differing_by_accent_case_and_punctuation_match() {
        let field = NameKey::new("gyartasi_ev");
        assert!(field.matches(&NameKey::new("Gyártási év")));
        assert!(field.matches(&NameKey::new("GYÁRTÁSI  ÉV")));
        assert!(!field.matches(&NameKey::new("gyartasi")));
        assert!(!field.matches(&NameKey::new("")));
    }

    #[test]
    fn raw_names_match_case_insensitively() {
        assert!(NameKey::new("Name").matches(&NameKey::new("NAME")));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(s in "[a-zA-Z0-9 _()\\[\\].,!éáíöőóüűúÉÁÍÖŐÓÜŰÚ-]{0,24}") {
            let once = normalize_name(&s);
            prop_assert_eq!(normalize_name(&once), once);
        }
    }
}
