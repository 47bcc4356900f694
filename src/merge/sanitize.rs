/// Makes a value safe to use as part of a file name.
///
/// Keeps ASCII letters, ASCII digits and `-_.() `, then turns spaces into `_`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}
