/// Splits a comma separated tag string into lowercase, deduplicated,
/// sorted tag names. Surrounding double quotes are dropped.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = input
        .to_lowercase()
        .split(',')
        .map(|t| t.trim().trim_matches('"').trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// URL slug: ASCII alphanumerics, `_` and `-`; whitespace and dash runs
/// collapse into a single `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_dash = true;
        }
    }
    slug
}

/// Slug candidate for the `attempt`-th clash: `c`, `c_1`, `c_2`, ...
pub fn suffixed_slug(slug: &str, attempt: u32) -> String {
    match attempt {
        0 => slug.to_string(),
        n => format!("{}_{}", slug, n),
    }
}

/// Joins tag names the way the tag form displays them
pub fn join_tags<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_tags() {
        assert_eq!(parse_tags("Python, web,,python,"), vec!["python", "web"]);
        assert_eq!(parse_tags("\"c++\", rust"), vec!["c++", "rust"]);
        assert!(parse_tags(",").is_empty());
    }

    #[test]
    fn keeps_spaces_inside_tags() {
        assert_eq!(parse_tags("web development,"), vec!["web development"]);
    }

    #[test]
    fn slugifies() {
        assert_eq!(slugify("web development"), "web-development");
        assert_eq!(slugify("  C++ -- tools "), "c-tools");
        assert_eq!(slugify("snake_case"), "snake_case");
        assert_eq!(slugify("++"), "");
    }

    #[test]
    fn clashing_slugs_get_a_suffix() {
        assert_eq!(suffixed_slug("c", 0), "c");
        assert_eq!(suffixed_slug("c", 2), "c_2");
    }

    #[test]
    fn joins_for_display() {
        assert_eq!(join_tags(["python", "web"]), "python, web");
    }
}
