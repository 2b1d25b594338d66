/// Writes each value with `f`, placing `separator` between the ones that produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Splits off the longest prefix of `input` whose characters satisfy `predicate`.
pub fn consume_while<'s>(input: &mut &'s str, mut predicate: impl FnMut(&char) -> bool) -> &'s str {
    let len = input
        .char_indices()
        .find(|(_, c)| !predicate(c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    let result = &input[..len];
    *input = &input[len..];
    result
}

/// Owned version of [`truncate_long!`], cuts on a character boundary.
pub fn truncated(query: &str) -> String {
    match query.char_indices().nth(497) {
        Some((i, _)) => format!("{}...", query[..i].trim_end()),
        None => query.trim_end().to_owned(),
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!("{}", $crate::truncated(&$query))
    };
}
