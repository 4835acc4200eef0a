//! `key:value` label helpers.

/// Format one label.
pub fn tag(key: &str, value: impl std::fmt::Display) -> String {
    format!("{key}:{value}")
}

/// `base` followed by `extra`, without touching `base`.
pub fn extend(base: &[String], extra: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out = base.to_vec();
    out.extend(extra);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_keeps_base_order() {
        let base = vec!["env:prod".to_string(), "team:core".to_string()];
        let out = extend(&base, [tag("size", 16)]);
        assert_eq!(out, vec!["env:prod", "team:core", "size:16"]);
        assert_eq!(base.len(), 2);
    }
}
