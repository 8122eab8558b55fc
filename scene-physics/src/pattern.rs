// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Wildcard pattern matching for interface lookups
//!
//! Supports the two glob metacharacters used by interface queries:
//! `*` matches any run of characters (including none) and `?` matches exactly
//! one character. Everything else is literal. Matching is case sensitive.

/// Test whether `text` matches the wildcard `pattern`
///
/// # Examples
///
/// ```
/// use scene_physics::pattern::matches;
///
/// assert!(matches("rot*", "rotationSpeed"));
/// assert!(matches("f?oat", "float"));
/// assert!(!matches("force", "float"));
/// ```
pub fn matches(pattern: &str, text: &str) -> bool {
    if is_literal(pattern) {
        return pattern == text;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, absorbed)) = backtrack {
            p = star + 1;
            t = absorbed + 1;
            backtrack = Some((star, absorbed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// True when the pattern contains no wildcard characters
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(matches("float", "float"));
        assert!(!matches("float", "floats"));
        assert!(!matches("floats", "float"));
    }

    #[test]
    fn test_star_matches_any_run() {
        assert!(matches("*", ""));
        assert!(matches("*", "anything"));
        assert!(matches("rot*", "rot"));
        assert!(matches("*Speed", "rotationSpeed"));
        assert!(matches("a*b*c", "axxbyyc"));
        assert!(!matches("a*b*c", "axxbyy"));
    }

    #[test]
    fn test_question_mark_matches_one() {
        assert!(matches("?", "x"));
        assert!(!matches("?", ""));
        assert!(!matches("??", "x"));
        assert!(matches("v?lue", "value"));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(matches("*ab", "aaab"));
        assert!(matches("*a*a*", "banana"));
        assert!(!matches("*x*", "banana"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!matches("Float", "float"));
    }

    #[test]
    fn test_is_literal() {
        assert!(is_literal("force"));
        assert!(!is_literal("f*"));
        assert!(!is_literal("f?"));
    }
}
