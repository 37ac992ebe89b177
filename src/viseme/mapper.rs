//! Phoneme table and heuristic fallback for viseme resolution.
//!
//! The avatar assets expose four mouth-shape morph targets; their names are
//! fixed here as channel constants.  The phoneme table covers the ARPAbet
//! codes the aligner actually emits; purely alphabetic tokens outside the
//! table (typically whole words, when the aligner could not produce phoneme
//! granularity) go through a first-character heuristic; anything else is
//! unrecognized and lands on the default open channel.

// ---------------------------------------------------------------------------
// Channel name constants
// ---------------------------------------------------------------------------

/// Open mouth (vowels) — also the default channel for unrecognized tokens.
pub const VISEME_A: &str = "viseme_A";
/// Spread mouth (front vowels, longer words).
pub const VISEME_E: &str = "viseme_E";
/// Rounded mouth (back vowels, short tokens).
pub const VISEME_O: &str = "viseme_O";
/// Closed mouth (bilabial consonants).
pub const VISEME_M: &str = "viseme_M";

/// Every viseme channel, for bulk resets and render-side iteration.
pub const VISEME_CHANNELS: [&str; 4] = [VISEME_A, VISEME_E, VISEME_O, VISEME_M];

// ---------------------------------------------------------------------------
// map_to_channel
// ---------------------------------------------------------------------------

/// Resolve a fragment token to a viseme channel name.
///
/// Resolution order, first match wins:
///
/// 1. Exact phoneme-code match, case-insensitive.
/// 2. For purely alphabetic tokens, a first-character heuristic:
///    `m`/`b`/`p` → [`VISEME_M`], vowel → [`VISEME_A`], token of ≤ 3
///    characters → [`VISEME_O`], longer → [`VISEME_E`].
/// 3. Empty or unrecognized input → [`VISEME_A`].
///
/// Pure and total: same input always yields the same channel and no input
/// ever fails.
///
/// # Examples
///
/// ```
/// use avatar_lipsync::viseme::{map_to_channel, VISEME_A, VISEME_M};
///
/// assert_eq!(map_to_channel("AA"), VISEME_A);
/// assert_eq!(map_to_channel("maybe"), VISEME_M);
/// assert_eq!(map_to_channel("xyz123"), VISEME_A); // unrecognized → default
/// ```
pub fn map_to_channel(token: &str) -> &'static str {
    let token = token.trim();
    if token.is_empty() {
        return VISEME_A;
    }

    if let Some(channel) = phoneme_table(token) {
        return channel;
    }

    if !token.chars().all(|c| c.is_ascii_alphabetic()) {
        return VISEME_A;
    }

    // Word-level heuristic on the first character.
    let first = token
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or('a');

    match first {
        'm' | 'b' | 'p' => VISEME_M,
        'a' | 'e' | 'i' | 'o' | 'u' => VISEME_A,
        _ if token.len() <= 3 => VISEME_O,
        _ => VISEME_E,
    }
}

/// Fixed phoneme→channel table, case-insensitive.
///
/// Covers the ARPAbet vowel codes plus the bilabial consonants; the table is
/// the authoritative mapping, the heuristic only fills its gaps.
fn phoneme_table(token: &str) -> Option<&'static str> {
    let code = token.to_ascii_uppercase();
    let channel = match code.as_str() {
        // Open vowels
        "AA" | "AE" | "AH" | "AW" | "AY" => VISEME_A,
        // Rounded vowels
        "AO" | "OW" | "OY" | "UH" | "UW" => VISEME_O,
        // Spread vowels
        "EE" | "EH" | "EY" | "IH" | "IY" => VISEME_E,
        // Closed mouth
        "M" | "B" | "P" => VISEME_M,
        _ => return None,
    };
    Some(channel)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
