use once_cell::sync::Lazy;
use regex::Regex;

pub const CV_SUFFIX: &str = "_CV.pdf";
const FALLBACK_STEM: &str = "profile";

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N} _-]").expect("static regex is valid"));

/// Download name for a profile's CV: `"Jane O'Brien! 2024"` -> `Jane_OBrien_2024_CV.pdf`.
///
/// Letters and digits from any script are kept, so the result may be non-ASCII.
pub fn cv_filename(name: &str) -> String {
    let stripped = DISALLOWED.replace_all(name, "");
    with_suffix(&stripped.trim_end().replace(' ', "_"))
}

/// ASCII-only variant of a `cv_filename` result for the plain `filename=` parameter.
pub fn ascii_fallback(filename: &str) -> String {
    let stem = filename.strip_suffix(CV_SUFFIX).unwrap_or(filename);
    let ascii: String = stem.chars().filter(char::is_ascii).collect();
    with_suffix(ascii.trim_matches('_'))
}

fn with_suffix(stem: &str) -> String {
    if stem.is_empty() {
        format!("{}{}", FALLBACK_STEM, CV_SUFFIX)
    } else {
        format!("{}{}", stem, CV_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_underscores_spaces() {
        assert_eq!(cv_filename("Jane O'Brien! 2024"), "Jane_OBrien_2024_CV.pdf");
    }

    #[test]
    fn keeps_hyphens_and_underscores() {
        assert_eq!(cv_filename("Anne-Marie de_la Cruz"), "Anne-Marie_de_la_Cruz_CV.pdf");
    }

    #[test]
    fn keeps_letters_and_digits_outside_ascii() {
        assert_eq!(cv_filename("José Müller"), "José_Müller_CV.pdf");
        assert_eq!(cv_filename("王伟 ٣"), "王伟_٣_CV.pdf");
        assert_eq!(cv_filename("Zoë (née Smith)"), "Zoë_née_Smith_CV.pdf");
    }

    #[test]
    fn trailing_whitespace_is_trimmed_before_replacement() {
        assert_eq!(cv_filename("John Smith   "), "John_Smith_CV.pdf");
        assert_eq!(cv_filename("John Smith!! "), "John_Smith_CV.pdf");
    }

    #[test]
    fn quotes_and_path_separators_cannot_escape_the_header() {
        let name = cv_filename("\"evil\"/..\\name");
        assert_eq!(name, "evilname_CV.pdf");
    }

    #[test]
    fn empty_result_falls_back_to_generic_stem() {
        assert_eq!(cv_filename("!!!"), "profile_CV.pdf");
        assert_eq!(cv_filename(""), "profile_CV.pdf");
    }

    #[test]
    fn ascii_fallback_drops_non_ascii_characters() {
        assert_eq!(ascii_fallback("José_Müller_CV.pdf"), "Jos_Mller_CV.pdf");
        assert_eq!(ascii_fallback("Jane_Doe_CV.pdf"), "Jane_Doe_CV.pdf");
        assert_eq!(ascii_fallback("王_伟_CV.pdf"), "profile_CV.pdf");
    }
}
