use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// Split a free-form migration name into words.
///
/// Words break on any non-alphanumeric character and on a lower-to-upper
/// case transition, so `add_users`, `add users` and `AddUsers` all yield
/// `["add", "users"]` modulo case.
pub fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();

    for chunk in SEPARATORS.split(name).filter(|c| !c.is_empty()) {
        let mut current = String::new();
        let mut prev_lower = false;

        for c in chunk.chars() {
            if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

/// `add_users` -> `AddUsers`
pub fn camel_name(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `AddUsers` -> `add_users`
pub fn snake_name(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("add_users"), vec!["add", "users"]);
        assert_eq!(split_words("AddUsers"), vec!["Add", "Users"]);
        assert_eq!(split_words("  create  table "), vec!["create", "table"]);
        assert!(split_words("__").is_empty());
    }

    #[test]
    fn test_camel_name() {
        assert_eq!(camel_name("foo"), "Foo");
        assert_eq!(camel_name("add_users"), "AddUsers");
        assert_eq!(camel_name("add-user-indices"), "AddUserIndices");
        assert_eq!(camel_name("AddUsers"), "AddUsers");
        assert_eq!(camel_name("v2 schema"), "V2Schema");
    }

    #[test]
    fn test_snake_name() {
        assert_eq!(snake_name("foo"), "foo");
        assert_eq!(snake_name("AddUsers"), "add_users");
        assert_eq!(snake_name("create table"), "create_table");
        assert_eq!(snake_name("update--users"), "update_users");
    }
}
