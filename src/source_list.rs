//! Input list handling: one source reference per line, blank lines and `#`
//! comments skipped, consumed in file order.

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::info;

use crate::error::ConfigurationError;

/// Read the newline-delimited input list, preserving file order.
pub fn read_references(path: &Path) -> Result<Vec<String>, ConfigurationError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let references: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect();
    info!(
        path = %path.display(),
        count = references.len(),
        "read input list"
    );
    Ok(references)
}

/// Extract the source identifier from a reference line.
///
/// A reference is either a bare identifier ("2412.14689") or a URL whose last
/// path segment carries the identifier; a trailing `.pdf` is stripped. The
/// result is opaque from here on.
pub fn source_id(reference: &str) -> String {
    let trimmed = reference.trim();
    let tail = if trimmed.contains("://") {
        trimmed
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(trimmed)
    } else {
        trimmed
    };
    tail.strip_suffix(".pdf").unwrap_or(tail).to_owned()
}

/// Filesystem/URL-safe slug for object keys: lowercase, punctuation dropped,
/// whitespace and underscores collapsed to single hyphens, bounded length.
pub fn slugify(s: &str, max_len: usize) -> String {
    let drop_punct = Regex::new(r"[^\w\s-]").unwrap();
    let collapse = Regex::new(r"[\s_-]+").unwrap();

    let lowered = s.trim().to_lowercase();
    let cleaned = drop_punct.replace_all(&lowered, "");
    let mut slug = collapse.replace_all(&cleaned, "-").trim_matches('-').to_owned();
    if slug.len() > max_len {
        let cut = (0..=max_len)
            .rev()
            .find(|&i| slug.is_char_boundary(i))
            .unwrap_or(0);
        slug.truncate(cut);
        slug = slug.trim_end_matches('-').to_owned();
    }
    if slug.is_empty() {
        "episode".to_owned()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_references_in_file_order_skipping_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# queue").unwrap();
        writeln!(file, "https://arxiv.org/abs/2412.14689").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  2501.00001  ").unwrap();
        let refs = read_references(file.path()).unwrap();
        assert_eq!(
            refs,
            vec!["https://arxiv.org/abs/2412.14689", "2501.00001"]
        );
    }

    #[test]
    fn missing_input_list_is_a_configuration_error() {
        let err = read_references(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn extracts_id_from_urls_and_bare_lines() {
        assert_eq!(source_id("2412.14689"), "2412.14689");
        assert_eq!(source_id("https://arxiv.org/abs/2412.14689"), "2412.14689");
        assert_eq!(
            source_id("https://arxiv.org/pdf/2412.14689.pdf"),
            "2412.14689"
        );
        assert_eq!(source_id("https://arxiv.org/abs/2412.14689/"), "2412.14689");
    }

    #[test]
    fn slugs_are_safe_and_bounded() {
        assert_eq!(
            slugify("Placing Every Atom in the Right Location!", 120),
            "placing-every-atom-in-the-right-location"
        );
        assert_eq!(slugify("  weird__spacing   here ", 120), "weird-spacing-here");
        assert_eq!(slugify("!!!", 120), "episode");
        let long = slugify("a very long title that keeps going and going", 12);
        assert!(long.len() <= 12);
        assert!(!long.ends_with('-'));
    }
}
