//! Non-empty narrative text.

/// Errors that can occur when creating section text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("section text cannot be empty")]
    Empty,
}

/// The body of one discharge-summary section.
///
/// Guarantees at least one non-whitespace character; input is trimmed on construction.
/// Serialises as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionText(String);

impl SectionText {
    /// Creates section text from the given input, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if nothing remains after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Builds section text from a value the caller knows is non-empty, substituting
    /// `fallback` when it is not.
    pub fn or_default(input: impl AsRef<str>, fallback: &'static str) -> Self {
        Self::new(input).unwrap_or_else(|_| Self(fallback.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Truncates `text` to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Replaces every line break with a single space.
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

impl std::fmt::Display for SectionText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SectionText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for SectionText {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl serde::Serialize for SectionText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SectionText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SectionText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(SectionText::new(""), Err(TextError::Empty));
        assert_eq!(SectionText::new(" \n\t"), Err(TextError::Empty));
        assert_eq!(SectionText::new("  Stable ").unwrap().as_str(), "Stable");
    }

    #[test]
    fn or_default_substitutes_blank_input() {
        assert_eq!(SectionText::or_default("   ", "None").as_str(), "None");
        assert_eq!(SectionText::or_default("Penicillin", "None").as_str(), "Penicillin");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[test]
    fn newlines_become_spaces() {
        assert_eq!(collapse_newlines("a\nb\r\nc"), "a b c");
    }

    #[test]
    fn serialises_as_plain_string() {
        let text = SectionText::new("Low-salt diet.").unwrap();
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"Low-salt diet.\"");
        assert!(serde_json::from_str::<SectionText>("\"  \"").is_err());
    }
}
