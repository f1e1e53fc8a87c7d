//! Positional URL templates such as `posts/{id}/view`.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref DATE_SEGMENT: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("BUG: hardcoded date segment regex is invalid");
}

pub const ID_PLACEHOLDER: &str = "{id}";
pub const DATE_PLACEHOLDER: &str = "{date}";
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateSegment {
    Literal(String),
    /// Both examples were all-digit
    Id,
    /// Both examples were `NNNN-NN-NN`
    Date,
    /// Segments differed in some other way
    Any,
}

impl TemplateSegment {
    fn from_pair(old: &str, new: &str) -> Self {
        if old == new {
            Self::Literal(old.to_string())
        } else if is_id(old) && is_id(new) {
            Self::Id
        } else if DATE_SEGMENT.is_match(old) && DATE_SEGMENT.is_match(new) {
            Self::Date
        } else {
            Self::Any
        }
    }

    fn parse(segment: &str) -> Self {
        match segment {
            ID_PLACEHOLDER => Self::Id,
            DATE_PLACEHOLDER => Self::Date,
            WILDCARD => Self::Any,
            literal => Self::Literal(literal.to_string()),
        }
    }

    /// Placeholders match any segment; literals match only themselves
    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == segment,
            Self::Id | Self::Date | Self::Any => true,
        }
    }
}

impl fmt::Display for TemplateSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::Id => f.write_str(ID_PLACEHOLDER),
            Self::Date => f.write_str(DATE_PLACEHOLDER),
            Self::Any => f.write_str(WILDCARD),
        }
    }
}

fn is_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Path segments of an absolute URL or a bare path.
///
/// Query and fragment are ignored, surrounding slashes trimmed.
pub fn path_segments(input: &str) -> Vec<String> {
    let input = input.trim();
    let path = match Url::parse(input) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => input
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlTemplate {
    segments: Vec<TemplateSegment>,
}

impl UrlTemplate {
    /// Diff two example URLs position by position.
    ///
    /// Returns `None` when the paths have different segment counts.
    pub fn learn(old: &str, new: &str) -> Option<Self> {
        let old_segments = path_segments(old);
        let new_segments = path_segments(new);
        if old_segments.len() != new_segments.len() {
            return None;
        }

        let segments = old_segments
            .iter()
            .zip(&new_segments)
            .map(|(old, new)| TemplateSegment::from_pair(old, new))
            .collect();
        Some(Self { segments })
    }

    /// Parse a registry key back into a template
    pub fn parse(template: &str) -> Self {
        let trimmed = template.trim_matches('/');
        let segments = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').map(TemplateSegment::parse).collect()
        };
        Self { segments }
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// Same segment count and every literal equal
    pub fn matches(&self, url: &str) -> bool {
        let segments = path_segments(url);
        segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&segments)
                .all(|(template, segment)| template.matches(segment))
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learn_id_template() {
        let template = UrlTemplate::learn("/posts/123/view", "/posts/456/view").unwrap();
        assert_eq!(template.to_string(), "posts/{id}/view");
    }

    #[test]
    fn test_learn_date_and_wildcard() {
        let template =
            UrlTemplate::learn("/blog/2023-01-05/hello", "/blog/2024-11-30/hello-world").unwrap();
        assert_eq!(template.to_string(), "blog/{date}/*");
    }

    #[test]
    fn test_mixed_digit_and_text_is_wildcard() {
        let template = UrlTemplate::learn("/u/42", "/u/alice").unwrap();
        assert_eq!(template.to_string(), "u/*");
    }

    #[test]
    fn test_length_mismatch_is_unmatchable() {
        assert!(UrlTemplate::learn("/a/b", "/a/b/c").is_none());
    }

    #[test]
    fn test_absolute_urls_and_queries() {
        let template = UrlTemplate::learn(
            "https://example.com/items/7?ref=home",
            "https://example.com/items/8#reviews",
        )
        .unwrap();
        assert_eq!(template.to_string(), "items/{id}");
        assert!(template.matches("/items/999?x=1"));
        assert!(!template.matches("/things/999"));
        assert!(!template.matches("/items/999/edit"));
    }

    #[test]
    fn test_parse_round_trips_display() {
        let template = UrlTemplate::parse("posts/{id}/{date}/*/view");
        assert_eq!(
            template.segments(),
            &[
                TemplateSegment::Literal("posts".into()),
                TemplateSegment::Id,
                TemplateSegment::Date,
                TemplateSegment::Any,
                TemplateSegment::Literal("view".into()),
            ]
        );
        assert_eq!(template.to_string(), "posts/{id}/{date}/*/view");
    }

    #[test]
    fn test_root_path_has_no_segments() {
        assert!(path_segments("https://example.com/").is_empty());
        assert!(path_segments("/").is_empty());
        let template = UrlTemplate::learn("/", "https://example.com").unwrap();
        assert!(template.matches("/"));
    }
}
