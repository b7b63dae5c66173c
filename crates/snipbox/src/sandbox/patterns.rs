//! Cost guard for Lua string patterns
//!
//! The pattern matcher in the string library runs in C and never reaches
//! the instruction hook, so one call can outlive any deadline. Backtracking
//! work grows with the subject length raised to the number of repeated
//! items, and `find`, `match`, `gmatch` and `gsub` refuse calls whose
//! estimate exceeds [`MAX_PATTERN_STEPS`].

/// Largest estimated number of matcher steps accepted for one call
pub const MAX_PATTERN_STEPS: f64 = 1e9;

/// Check one pattern call before it reaches the matcher
pub fn check(subject_len: usize, pattern: &[u8]) -> Result<(), String> {
    let steps = estimate(subject_len, pattern);
    if steps > MAX_PATTERN_STEPS {
        return Err(format!(
            "pattern '{}' is too expensive to match against {subject_len} bytes",
            String::from_utf8_lossy(pattern)
        ));
    }
    Ok(())
}

/// Worst-case matcher steps: one scan of the subject per start position,
/// times one more factor of the subject length per repeated item
pub fn estimate(subject_len: usize, pattern: &[u8]) -> f64 {
    let n = subject_len.max(1) as f64;
    let anchored = pattern.first() == Some(&b'^');
    let exponent = repeated_items(pattern) + u32::from(!anchored);
    n.powi(exponent as i32)
}

/// Count single-class items followed by `*`, `+` or `-`, plus `%b` items
fn repeated_items(pattern: &[u8]) -> u32 {
    let mut count = 0;
    let mut i = 0;

    while i < pattern.len() {
        let item_end = match pattern[i] {
            b'(' | b')' | b'^' | b'$' => {
                i += 1;
                continue;
            }
            b'%' => match pattern.get(i + 1) {
                Some(b'b') => {
                    count += 1;
                    i += 4;
                    continue;
                }
                Some(b'f') => {
                    i = set_end(pattern, i + 2);
                    continue;
                }
                Some(_) => i + 2,
                None => break,
            },
            b'[' => set_end(pattern, i),
            _ => i + 1,
        };

        if matches!(pattern.get(item_end), Some(b'*' | b'+' | b'-')) {
            count += 1;
            i = item_end + 1;
        } else {
            i = item_end;
        }
    }

    count
}

/// Index just past the set starting at `start` (which points at `[`)
fn set_end(pattern: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if pattern.get(i) == Some(&b'^') {
        i += 1;
    }
    // A `]` right after the opening bracket is a literal
    if pattern.get(i) == Some(&b']') {
        i += 1;
    }
    while i < pattern.len() {
        match pattern[i] {
            b'%' => i += 2,
            b']' => return i + 1,
            _ => i += 1,
        }
    }
    pattern.len()
}
