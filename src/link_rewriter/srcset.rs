//! `srcset` candidate handling.
//!
//! A candidate URL runs up to the next whitespace (so `data:` URLs with embedded
//! commas survive), optional descriptors run up to the next comma.

/// One image candidate of a `srcset` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate<'a> {
    pub url: &'a str,
    pub descriptors: &'a str,
}

/// Split a `srcset` attribute value into its candidates
pub fn parse_srcset(value: &str) -> Vec<SrcsetCandidate<'_>> {
    let mut candidates = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        let (url, descriptors) = if raw_url.ends_with(',') {
            (raw_url.trim_end_matches(','), "")
        } else {
            let descriptor_end = rest.find(',').unwrap_or(rest.len());
            let descriptors = rest[..descriptor_end].trim();
            rest = &rest[descriptor_end..];
            (raw_url, descriptors)
        };

        if !url.is_empty() {
            candidates.push(SrcsetCandidate { url, descriptors });
        }
    }

    candidates
}

/// Rewrite each candidate URL with `rewrite`, keeping descriptors.
///
/// Returns the new attribute value and the number of candidates whose URL changed.
pub fn rewrite_srcset<F>(value: &str, mut rewrite: F) -> (String, usize)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut changed = 0;
    let parts: Vec<String> = parse_srcset(value)
        .into_iter()
        .map(|candidate| {
            let url = match rewrite(candidate.url) {
                Some(new_url) if new_url != candidate.url => {
                    changed += 1;
                    new_url
                }
                _ => candidate.url.to_string(),
            };
            if candidate.descriptors.is_empty() {
                url
            } else {
                format!("{url} {}", candidate.descriptors)
            }
        })
        .collect();

    if changed == 0 {
        return (value.to_string(), 0);
    }
    (parts.join(", "), changed)
}
