/// Expand `${VAR}` and `${VAR:-fallback}` placeholders in raw config text.
///
/// With a fallback, an unset or empty variable takes the fallback, so
/// `proxy = "${HTTPS_PROXY:-}"` yields an empty proxy when none is exported.
/// Without one, an unset variable leaves the placeholder untouched.
/// Unterminated and nameless placeholders are copied through.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let placeholder = &tail[..=close];
        let (name, fallback) = match placeholder[2..close].split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (&placeholder[2..close], None),
        };

        let value = if name.is_empty() {
            None
        } else {
            match (lookup(name), fallback) {
                (Some(v), Some(fallback)) if v.is_empty() => Some(fallback.to_owned()),
                (Some(v), _) => Some(v),
                (None, fallback) => fallback.map(str::to_owned),
            }
        };
        out.push_str(value.as_deref().unwrap_or(placeholder));
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}
