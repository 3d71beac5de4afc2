use std::collections::HashMap;

use crate::path::FieldPath;

/// Environment variable name for the field at `path`.
///
/// The app name and every segment are joined with `_`, uppercased, and
/// every character outside `[A-Za-z0-9]` is folded to `_`:
/// `my-app` + `top.sub-field` is `MY_APP_TOP_SUB_FIELD`.
pub fn env_var_name(app_name: &str, path: &FieldPath) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(path.len() + 1);
    if !app_name.is_empty() {
        parts.push(app_name);
    }
    parts.extend(path.segments().iter().map(String::as_str));
    fold(&parts.join("_"))
}

fn fold(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Snapshot of the process environment. Variables whose name or value is
/// not valid unicode are left out.
pub fn snapshot() -> HashMap<String, String> {
    collect(std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))))
}

/// Takes an iterator so tests can pass synthetic data instead of the
/// process environment.
pub fn collect(vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_and_segments_are_joined() {
        let name = env_var_name("my-app", &FieldPath::parse("sub.value"));
        assert_eq!(name, "MY_APP_SUB_VALUE");
    }

    #[test]
    fn punctuation_is_folded() {
        let name = env_var_name("app", &FieldPath::parse("top.sub-field"));
        assert_eq!(name, "APP_TOP_SUB_FIELD");
    }

    #[test]
    fn empty_app_name_has_no_prefix() {
        assert_eq!(env_var_name("", &FieldPath::parse("port")), "PORT");
    }

    #[test]
    fn single_underscore_preserved() {
        assert_eq!(
            env_var_name("myapp", &FieldPath::parse("pool_size")),
            "MYAPP_POOL_SIZE"
        );
    }

    #[test]
    fn collection_indices_are_segments() {
        assert_eq!(
            env_var_name("app", &FieldPath::parse("servers.0.host")),
            "APP_SERVERS_0_HOST"
        );
    }

    #[test]
    fn collect_keeps_last_duplicate() {
        let vars = collect(vec![
            ("A".to_string(), "1".to_string()),
            ("A".to_string(), "2".to_string()),
        ]);
        assert_eq!(vars["A"], "2");
    }
}
