//! Exact byte pattern search over project containers.
//!
//! Containers are binary, so nothing here assumes a terminator or a text
//! encoding. Searches run over the caller's buffer without copying it.

use memchr::memmem;

/// A compiled search pattern that can be reused across buffers.
pub struct Locator<'p> {
    finder: memmem::Finder<'p>,
}

impl<'p> Locator<'p> {
    /// Compile a pattern. An empty pattern never matches.
    pub fn new(pattern: &'p [u8]) -> Self {
        Self {
            finder: memmem::Finder::new(pattern),
        }
    }

    /// Length of the pattern in bytes.
    pub fn pattern_len(&self) -> usize {
        self.finder.needle().len()
    }

    /// Every non-overlapping offset where the pattern occurs, ascending.
    pub fn find_all(&self, buffer: &[u8]) -> Vec<usize> {
        if self.pattern_len() == 0 {
            return Vec::new();
        }
        self.finder.find_iter(buffer).collect()
    }

    /// First occurrence at or after `from`, if any.
    pub fn find_from(&self, buffer: &[u8], from: usize) -> Option<usize> {
        if self.pattern_len() == 0 || from >= buffer.len() {
            return None;
        }
        self.finder.find(&buffer[from..]).map(|pos| pos + from)
    }
}

/// Find all non-overlapping occurrences of `pattern` in `buffer`.
///
/// Returns an empty vector when nothing matches or the pattern is empty.
pub fn find_all(buffer: &[u8], pattern: &[u8]) -> Vec<usize> {
    Locator::new(pattern).find_all(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_every_occurrence() {
        let buf = b"xxNamexxxNameNamex";
        assert_eq!(find_all(buf, b"Name"), vec![2, 9, 13]);
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(find_all(b"abcdef", b"xyz").is_empty());
        assert!(find_all(b"", b"a").is_empty());
        assert!(find_all(b"abc", b"").is_empty());
    }

    #[test]
    fn test_matches_are_non_overlapping() {
        assert_eq!(find_all(b"aaaa", b"aa"), vec![0, 2]);
    }

    #[test]
    fn test_match_at_buffer_end() {
        assert_eq!(find_all(b"\x00\x01\x02tail", b"tail"), vec![3]);
    }

    #[test]
    fn test_binary_pattern_with_nulls() {
        let buf = [0u8, 1, 0, 0, 0, 7, 1, 0, 0, 0];
        assert_eq!(find_all(&buf, &[1, 0, 0, 0]), vec![1, 6]);
    }

    #[test]
    fn test_find_from() {
        let locator = Locator::new(b"ab");
        let buf = b"ab--ab--ab";
        assert_eq!(locator.find_from(buf, 0), Some(0));
        assert_eq!(locator.find_from(buf, 1), Some(4));
        assert_eq!(locator.find_from(buf, 9), None);
        assert_eq!(locator.find_from(buf, 100), None);
    }
}
