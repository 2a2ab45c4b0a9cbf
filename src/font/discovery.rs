//! Font discovery via fontconfig
//!
//! Enumerates installed fonts as `(label, file)` pairs for the fuzzy-finder

use anyhow::{Context, Result};
use fontconfig::{Fontconfig, Pattern};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::info;

use super::FontSelection;

/// Style that is implied and left out of labels
const IMPLIED_STYLE: &str = "Regular";

/// List every installed font face, sorted version-aware ascending and deduplicated
pub fn list_fonts() -> Result<Vec<FontSelection>> {
    info!("Loading available fonts from fontconfig...");
    let fc = Fontconfig::new().context("Failed to initialize fontconfig")?;

    // Empty pattern matches every font
    let pattern = Pattern::new(&fc);
    let font_set = fontconfig::list_fonts(&pattern, None);

    let mut fonts = Vec::new();
    for font_pattern in font_set.iter() {
        // Primary family name (index 0) avoids weight-specific aliases
        let family = font_pattern
            .get_string(fontconfig::FC_FAMILY)
            .unwrap_or("Unknown");
        let style = font_pattern.get_string(fontconfig::FC_STYLE);
        let path = font_pattern.filename().map(PathBuf::from);

        fonts.push(FontSelection::new(face_label(family, style), path));
    }

    sort_fonts(&mut fonts);

    info!(count = fonts.len(), "Discovered fonts via fontconfig");
    Ok(fonts)
}

fn face_label(family: &str, style: Option<&str>) -> String {
    match style {
        Some(style) if style != IMPLIED_STYLE && !style.is_empty() => format!("{family} {style}"),
        _ => family.to_string(),
    }
}

/// Sort by candidate line using [`version_cmp`], dropping exact duplicates
pub fn sort_fonts(fonts: &mut Vec<FontSelection>) {
    fonts.sort_by(|a, b| version_cmp(&a.to_line(), &b.to_line()));
    fonts.dedup();
}

/// Version ordering in the style of `sort -V`.
///
/// Digit runs compare by numeric value, so `Font 2` sorts before `Font 10`.
/// Between digit runs, letters sort before every other character and `~`
/// sorts before everything, even the end of the string. Names that only differ
/// in leading zeros fall back to a plain byte comparison.
pub fn version_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ordering = char_order(a.get(i).copied()).cmp(&char_order(b.get(j).copied()));
            if ordering != Ordering::Equal {
                return ordering;
            }
            i += 1;
            j += 1;
        }

        let (start_a, start_b) = (i, j);
        while i < a.len() && a[i].is_ascii_digit() {
            i += 1;
        }
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        let ordering = cmp_digits(&a[start_a..i], &b[start_b..j]);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.cmp(b)
}

/// Weight of one byte outside a digit run; `None` is the end of the string
fn char_order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -1,
        Some(c) => i32::from(c) + 256,
    }
}

fn cmp_digits(x: &[u8], y: &[u8]) -> Ordering {
    let strip = |d: &[u8]| -> usize { d.iter().take_while(|&&c| c == b'0').count() };
    let (x, y) = (&x[strip(x)..], &y[strip(y)..]);
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}
