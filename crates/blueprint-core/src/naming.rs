//! Identifier case conversion and filesystem-safe names
//!
//! Entity and field names arrive in whatever casing the provider felt like
//! (`blog post`, `blog_post`, `BlogPost`, `HTTPServer`). Everything the
//! resolver derives from a name goes through these helpers so a given entity
//! always maps to the same identifiers and paths.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SAFE_NAME: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").unwrap();
}

/// Split an identifier into lowercase words.
///
/// Boundaries are non-alphanumeric characters, lower-to-upper transitions
/// and the end of an uppercase run followed by a lowercase letter
/// (`HTTPServer` -> `http`, `server`).
pub fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `blog post` -> `BlogPost`
pub fn to_pascal_case(input: &str) -> String {
    split_words(input).iter().map(|w| capitalize(w)).collect()
}

/// `Blog Post` -> `blogPost`
pub fn to_camel_case(input: &str) -> String {
    let words = split_words(input);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// `BlogPost` -> `blog-post`
pub fn to_kebab_case(input: &str) -> String {
    split_words(input).join("-")
}

/// `BlogPost` -> `blog_post`
pub fn to_snake_case(input: &str) -> String {
    split_words(input).join("_")
}

/// Naive English plural, good enough for route segments and collection names.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.map_or(false, |c| !"aeiouAEIOU".contains(c)) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

/// Whether `name` can be used verbatim as a single path component.
pub fn is_filesystem_safe(name: &str) -> bool {
    SAFE_NAME.is_match(name) && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("BlogPost"), vec!["blog", "post"]);
        assert_eq!(split_words("blog_post"), vec!["blog", "post"]);
        assert_eq!(split_words("  blog   post "), vec!["blog", "post"]);
        assert_eq!(split_words("HTTPServer"), vec!["http", "server"]);
        assert_eq!(split_words("v2Api"), vec!["v2", "api"]);
        assert!(split_words(" -_ ").is_empty());
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_pascal_case("blog post"), "BlogPost");
        assert_eq!(to_pascal_case("BOOK"), "Book");
        assert_eq!(to_camel_case("Published At"), "publishedAt");
        assert_eq!(to_camel_case("title"), "title");
        assert_eq!(to_kebab_case("BlogPost"), "blog-post");
        assert_eq!(to_kebab_case("CRUD service"), "crud-service");
        assert_eq!(to_snake_case("BlogPost"), "blog_post");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("book"), "books");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("blog-post"), "blog-posts");
    }

    #[test]
    fn test_filesystem_safe() {
        assert!(is_filesystem_safe("book-api"));
        assert!(is_filesystem_safe("api-1700000000000"));
        assert!(is_filesystem_safe("my_project.v2"));
        assert!(!is_filesystem_safe("../escape"));
        assert!(!is_filesystem_safe("with space"));
        assert!(!is_filesystem_safe(".hidden"));
        assert!(!is_filesystem_safe(""));
        assert!(!is_filesystem_safe(&"a".repeat(65)));
    }
}
