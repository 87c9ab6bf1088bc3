//! Turning directory names into catalog search queries

/// Rewrites a show directory name into the query sent to the catalog.
///
/// Some libraries tag regional remakes in the directory name (for example
/// `"Shameless (US)"`) in a way the catalog search does not understand. The
/// configured suffixes are stripped before searching; the first one that
/// matches wins.
#[derive(Debug, Clone, Default)]
pub struct QueryNormalizer {
    suffixes: Vec<String>,
}

impl QueryNormalizer {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn normalize(&self, directory_name: &str) -> String {
        let stripped = self
            .suffixes
            .iter()
            .find_map(|suffix| directory_name.strip_suffix(suffix.as_str()))
            .unwrap_or(directory_name);

        stripped.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_configured_suffix() {
        let normalizer = QueryNormalizer::new([" (US)"]);
        assert_eq!(normalizer.normalize("The Returned (US)"), "The Returned");
        assert_eq!(normalizer.normalize("The Returned"), "The Returned");
        // only a trailing occurrence is a suffix
        assert_eq!(normalizer.normalize("Shameless (US) Extras"), "Shameless (US) Extras");
    }

    #[test]
    fn test_first_matching_suffix_wins() {
        let normalizer = QueryNormalizer::new([" (UK)", " (US)", ""]);
        assert_eq!(normalizer.normalize("The Office (UK)"), "The Office");
        assert_eq!(normalizer.normalize("The Office (US)"), "The Office");
    }

    #[test]
    fn test_without_suffixes_only_trims() {
        let normalizer = QueryNormalizer::default();
        assert_eq!(normalizer.normalize("  Mr. Robot "), "Mr. Robot");
        assert_eq!(normalizer.normalize("Fargo (US)"), "Fargo (US)");
    }
}
