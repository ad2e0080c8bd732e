//! Title derivation from filenames
//!
//! The upload pipeline names a track after its file: extension stripped,
//! `_`, `-` and `.` turned into spaces, then title-cased. The verifier
//! compares stored titles against the same derivation.

/// Title the pipeline would have given a file with this name
pub fn expected_title(filename: &str) -> String {
    let stem = strip_extension(filename);
    let spaced: String = stem
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
        .collect();
    title_case(spaced.trim())
}

/// Remove the final `.ext`, leaving leading-dot names alone
fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if !filename[..idx].trim_start_matches('.').is_empty() => &filename[..idx],
        _ => filename,
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
