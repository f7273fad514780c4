mod path_ext;

pub use path_ext::*;

/// Returns `true` if `input` is likely to contain a template.
pub fn is_template(input: &str) -> bool {
    memchr::memmem::find_iter(input.as_bytes(), b"{")
        .any(|i| matches!(input.as_bytes().get(i + 1), Some(b'{') | Some(b'%')))
}

/// The 1-based line number of byte `offset` in `text`.
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    memchr::memchr_iter(b'\n', &text.as_bytes()[..end]).count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_detection() {
        assert!(is_template("{{ page.title }}"));
        assert!(is_template("text {% filter snippet(\"a\") %}"));
        assert!(!is_template("fn main() { let x = {}; }"));
        assert!(!is_template("trailing {"));
    }

    #[test]
    fn line_numbers() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 99), 3);
    }
}
