//! `url(...)` references inside inline `style` attributes and `<style>` blocks.
//!
//! Only root-relative values (`/x`, not `//x`) are touched. Absolute URLs,
//! protocol-relative URLs and page-relative values are left as written.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref CSS_URL: Regex =
        Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#)
            .expect("BUG: hardcoded CSS url() regex is invalid");
}

fn captured_value<'h>(caps: &Captures<'h>) -> (&'h str, &'static str) {
    if let Some(m) = caps.get(1) {
        (m.as_str(), "\"")
    } else if let Some(m) = caps.get(2) {
        (m.as_str(), "'")
    } else {
        (caps.get(3).map_or("", |m| m.as_str()), "")
    }
}

#[inline]
fn is_root_relative(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//")
}

/// Every root-relative `url()` value in `css`, in order of appearance
pub fn root_relative_urls(css: &str) -> Vec<String> {
    CSS_URL
        .captures_iter(css)
        .map(|caps| captured_value(&caps).0.to_string())
        .filter(|value| is_root_relative(value))
        .collect()
}

/// Rewrite root-relative `url()` values, preserving the original quoting.
///
/// Returns the rewritten text and the number of values that changed.
pub fn rewrite_style_urls<F>(css: &str, mut rewrite: F) -> (String, usize)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut changed = 0;
    let output = CSS_URL.replace_all(css, |caps: &Captures<'_>| {
        let (value, quote) = captured_value(caps);
        if is_root_relative(value)
            && let Some(new_value) = rewrite(value)
            && new_value != value
        {
            changed += 1;
            return format!("url({quote}{new_value}{quote})");
        }
        caps[0].to_string()
    });
    (output.into_owned(), changed)
}
