/// Package names are lowercase ASCII, start with a letter, may contain
/// digits, `-` and `_`, and must not end with `-` or `_`.
pub fn is_valid_package_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some((first, rest)) = bytes.split_first() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }
    if let Some(last) = rest.last() {
        if !(last.is_ascii_lowercase() || last.is_ascii_digit()) {
            return false;
        }
    }
    rest.iter()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-' || *c == b'_')
}
