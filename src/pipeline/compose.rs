//! Rendering multi-language results into one clipboard string

/// Line placed between the translations of a multi-language run
pub const SEPARATOR: &str = "\n----------------\n";

/// One successful translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub code: String,
    pub text: String,
}

impl TranslationResult {
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
        }
    }
}

/// Join results in order, each optionally prefixed with `[<code>]: `.
///
/// Returns `None` when there is nothing to join.
pub fn compose(results: &[TranslationResult], include_prefix: bool) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let segments: Vec<String> = results
        .iter()
        .map(|result| {
            if include_prefix {
                format!("[{}]: {}", result.code, result.text)
            } else {
                result.text.clone()
            }
        })
        .collect();

    Some(segments.join(SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_output() {
        let results = [
            TranslationResult::new("EN", "Hello"),
            TranslationResult::new("JP", "こんにちは"),
        ];
        assert_eq!(
            compose(&results, true).unwrap(),
            "[EN]: Hello\n----------------\n[JP]: こんにちは"
        );
    }

    #[test]
    fn test_unprefixed_output() {
        let results = [
            TranslationResult::new("EN", "Hello"),
            TranslationResult::new("VN", "Xin chào"),
        ];
        assert_eq!(
            compose(&results, false).unwrap(),
            "Hello\n----------------\nXin chào"
        );
    }

    #[test]
    fn test_segment_count_matches_results() {
        let results: Vec<_> = ["EN", "VN", "JP"]
            .iter()
            .map(|code| TranslationResult::new(*code, format!("text {code}")))
            .collect();

        let composed = compose(&results, true).unwrap();
        let segments: Vec<&str> = composed.split(SEPARATOR).collect();
        assert_eq!(segments.len(), 3);
        for (segment, result) in segments.iter().zip(&results) {
            assert!(segment.starts_with(&format!("[{}]: ", result.code)));
        }
    }

    #[test]
    fn test_single_result_has_no_separator() {
        let results = [TranslationResult::new("EN", "Hello")];
        assert_eq!(compose(&results, false).unwrap(), "Hello");
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(compose(&[], true), None);
    }
}
