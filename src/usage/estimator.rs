/// Approximate token count: one token per four characters, rounded up.
///
/// This is a heuristic for usage accounting, not a tokenizer. Length is
/// counted in Unicode scalar values.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn rounds_up_partial_tokens() {
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("Hello, how are you today?"), 7);
    }

    #[test]
    fn matches_ceil_of_quarter_length() {
        for len in 0..64 {
            let text = "x".repeat(len);
            let expected = (len as f64 / 4.0).ceil() as u64;
            assert_eq!(estimate_tokens(&text), expected, "len={}", len);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 4 个字符，12 个字节
        assert_eq!(estimate_tokens("你好世界"), 1);
    }
}
