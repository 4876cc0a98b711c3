//! Identifier case conversion.
//!
//! Action types are `UPPER_SNAKE_CASE`, action creator names and service
//! method names are `camelCase`, and service names are `PascalCase`. All of
//! them are derived from the same word split, so converting between them is
//! lossless for identifiers made of letters and digits, Unicode included.
//!
//! Word boundaries are:
//! - any character that is not a letter or digit (dropped)
//! - a lowercase letter followed by an uppercase letter (`fetchTest`)
//! - the last capital of an acronym followed by a lowercase letter (`HTTPServer`)
//! - a letter next to a digit, in either direction (`v2` → `v`, `2`)

/// Split an identifier into words.
///
/// ```
/// use composable_lifecycle_core::case::words;
///
/// assert_eq!(words("fetchAuthRecoveryLink"), ["fetch", "Auth", "Recovery", "Link"]);
/// assert_eq!(words("AUTH_RECOVERY_LINK"), ["AUTH", "RECOVERY", "LINK"]);
/// assert_eq!(words("loadHTTPServer2"), ["load", "HTTP", "Server", "2"]);
/// ```
#[must_use]
pub fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut words);
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase))
                || (prev.is_numeric() != c.is_numeric());

            if boundary {
                flush(&mut current, &mut words);
            }
        }

        current.push(c);
    }

    flush(&mut current, &mut words);
    words
}

fn flush(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect()
    })
}

/// `fetchAuthRecoveryLink` style.
///
/// ```
/// use composable_lifecycle_core::case::camel_case;
///
/// assert_eq!(camel_case("FETCH"), "fetch");
/// assert_eq!(camel_case("SOMETHING_ELSE"), "somethingElse");
/// ```
#[must_use]
pub fn camel_case(input: &str) -> String {
    words(input)
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i == 0 {
                word.to_lowercase()
            } else {
                capitalize(word)
            }
        })
        .collect()
}

/// `AuthRecoveryLink` style.
///
/// ```
/// use composable_lifecycle_core::case::pascal_case;
///
/// assert_eq!(pascal_case("AUTH_RECOVERY_LINK"), "AuthRecoveryLink");
/// ```
#[must_use]
pub fn pascal_case(input: &str) -> String {
    words(input).iter().map(|word| capitalize(word)).collect()
}

/// `FETCH_AUTH_RECOVERY_LINK` style.
///
/// ```
/// use composable_lifecycle_core::case::upper_snake_case;
///
/// assert_eq!(upper_snake_case("fetchSomethingElse"), "FETCH_SOMETHING_ELSE");
/// ```
#[must_use]
pub fn upper_snake_case(input: &str) -> String {
    words(input)
        .iter()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_words_splits_on_delimiters() {
        assert_eq!(words("fetch_auth"), ["fetch", "auth"]);
        assert_eq!(words("fetch-auth recovery"), ["fetch", "auth", "recovery"]);
        assert_eq!(words("__fetch__"), ["fetch"]);
        assert!(words("").is_empty());
        assert!(words("___").is_empty());
    }

    #[test]
    fn test_words_splits_acronyms() {
        assert_eq!(words("HTTPServer"), ["HTTP", "Server"]);
        assert_eq!(words("fetchURL"), ["fetch", "URL"]);
    }

    #[test]
    fn test_words_splits_digits() {
        assert_eq!(words("fetchV2Items"), ["fetch", "V", "2", "Items"]);
        assert_eq!(words("ITEMS_V2"), ["ITEMS", "V", "2"]);
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("FETCH"), "fetch");
        assert_eq!(camel_case("fetch_test"), "fetchTest");
        assert_eq!(camel_case("HTTPServer"), "httpServer");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("TEST"), "Test");
        assert_eq!(pascal_case("SOMETHING_ELSE"), "SomethingElse");
        assert_eq!(pascal_case("ITEMS_V2"), "ItemsV2");
    }

    #[test]
    fn test_upper_snake_case() {
        assert_eq!(upper_snake_case("fetchAuth"), "FETCH_AUTH");
        assert_eq!(upper_snake_case("createAuth"), "CREATE_AUTH");
        assert_eq!(upper_snake_case("fetchV2Items"), "FETCH_V_2_ITEMS");
        assert_eq!(upper_snake_case("FETCH_AUTH"), "FETCH_AUTH");
    }

    #[test]
    fn test_non_ascii_letters_are_kept() {
        assert_eq!(words("fetchÜber"), ["fetch", "Über"]);
        assert_eq!(upper_snake_case("fetchÜber"), "FETCH_ÜBER");
        assert_eq!(upper_snake_case("fetchCafé"), "FETCH_CAFÉ");
        assert_eq!(pascal_case("ÜBER"), "Über");
        assert_eq!(camel_case("FETCH_CAFÉ"), "fetchCafé");
    }

    proptest! {
        #[test]
        fn prop_snake_then_camel_is_stable(name in "[a-z]{1,8}([A-Z][a-z]{1,8}){0,4}") {
            prop_assert_eq!(camel_case(&upper_snake_case(&name)), name);
        }

        #[test]
        fn prop_upper_snake_has_no_lowercase(name in "[a-zA-Z0-9_]{0,24}") {
            let snake = upper_snake_case(&name);
            prop_assert!(!snake.chars().any(char::is_lowercase));
            prop_assert!(!snake.starts_with('_') && !snake.ends_with('_'));
            prop_assert!(!snake.contains("__"));
        }
    }
}
