//! Small string helpers shared by formatters and progress output.

/// Longest prefix of `s` that fits in `max_bytes` and ends on a char boundary.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max_bytes)
        .last()
        .unwrap_or(0);
    &s[..end]
}

/// Like [`truncate_str`], appending `...` when anything was cut.
pub fn truncate_with_ellipsis(s: &str, max_bytes: usize) -> String {
    let cut = truncate_str(s, max_bytes);
    if cut.len() < s.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_step_summary_is_kept() {
        assert_eq!(truncate_str("scan done", 32), "scan done");
        assert_eq!(truncate_with_ellipsis("scan done", 32), "scan done");
    }

    #[test]
    fn test_cut_backs_off_to_char_boundary() {
        // "é" is two bytes; byte 2 falls inside it
        assert_eq!(truncate_str("aéb", 2), "a");
        assert_eq!(truncate_str("aéb", 3), "aé");
        assert_eq!(truncate_str("日本", 1), "");
    }

    #[test]
    fn test_ellipsis_only_when_cut() {
        assert_eq!(truncate_with_ellipsis("timeout after 300s", 7), "timeout...");
        assert_eq!(truncate_with_ellipsis("", 4), "");
    }
}
