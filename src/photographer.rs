/**
 * Photographer name extraction from file names such as "Ana_Souza_0042.jpg"
 */

use std::path::Path;

const MIN_NAME_LEN: usize = 3;

/// Extract the photographer's name from a file name.
///
/// The name is whatever precedes the last `_` of the stem. Candidates that
/// are empty, start with a digit, are shorter than three characters or
/// contain no ASCII letter are rejected, since those are usually dates or
/// counters.
pub fn parse_photographer_name(filename: &str) -> Option<String> {
    let stem = Path::new(filename).file_stem()?.to_str()?;

    let (candidate, _) = stem.rsplit_once('_')?;
    let candidate = candidate.trim();

    let first = candidate.chars().next()?;
    if first.is_numeric() {
        return None;
    }
    if candidate.chars().count() < MIN_NAME_LEN {
        return None;
    }
    if !candidate.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some(candidate.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_before_last_underscore() {
        assert_eq!(parse_photographer_name("Ana_0042.jpg"), Some("Ana".to_string()));
        assert_eq!(
            parse_photographer_name("Ana_Souza_0042.CR2"),
            Some("Ana Souza".to_string())
        );
        assert_eq!(parse_photographer_name(" Joao _DSC1.raf"), Some("Joao".to_string()));
    }

    #[test]
    fn rejects_names_starting_with_digit() {
        assert_eq!(parse_photographer_name("2024_Jo_oto.jpg"), None);
        assert_eq!(parse_photographer_name("20240101_123000.jpg"), None);
    }

    #[test]
    fn rejects_short_or_letterless_candidates() {
        assert_eq!(parse_photographer_name("Jo_0001.jpg"), None);
        assert_eq!(parse_photographer_name("-_-_0001.jpg"), None);
        assert_eq!(parse_photographer_name("_0001.jpg"), None);
        assert_eq!(parse_photographer_name("   _0001.jpg"), None);
    }

    #[test]
    fn requires_an_underscore() {
        assert_eq!(parse_photographer_name("DSCF5231.RAF"), None);
        assert_eq!(parse_photographer_name("Ana-Souza.jpg"), None);
    }

    #[test]
    fn accepts_accented_names_with_an_ascii_letter() {
        assert_eq!(parse_photographer_name("Zoé_17.jpg"), Some("Zoé".to_string()));
    }

    #[test]
    fn rejects_candidates_without_ascii_letters() {
        assert_eq!(parse_photographer_name("ÉÉÉ_01.jpg"), None);
        assert_eq!(parse_photographer_name("李小龍_01.jpg"), None);
    }

    #[test]
    fn rejects_candidates_starting_with_any_unicode_digit() {
        assert_eq!(parse_photographer_name("٣Ana_01.jpg"), None);
        assert_eq!(parse_photographer_name("²Ana_01.jpg"), None);
    }

    #[test]
    fn extension_is_stripped_before_splitting() {
        assert_eq!(parse_photographer_name("Maria_Clara.jpg"), Some("Maria".to_string()));
        assert_eq!(parse_photographer_name("Maria_Clara"), Some("Maria".to_string()));
    }
}
