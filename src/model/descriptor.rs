use std::sync::LazyLock;

use regex::Regex;

use super::query::Verb;
use crate::error::SqlModelError;

// lowercase verb, then one or more segments: an uppercase letter followed by word
// characters that are not uppercase
static CALL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\p{Ll}+)((?:\p{Lu}[^\p{Lu}\W]+)+)$").expect("call pattern compiles")
});

static SEGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Lu}[^\p{Lu}\W]+").expect("segment pattern compiles"));

/// A call name split into its verb and capitalized segments.
///
/// `getAssocUsersLikeEmail` becomes verb `get` and segments
/// `["Assoc", "Users", "Like", "Email"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    name: String,
    verb: Verb,
    segments: Vec<String>,
}

impl CallDescriptor {
    /// Split `name` into verb and segments.
    ///
    /// # Errors
    /// Returns `SqlModelError::MalformedDescriptor` if `name` is not a lowercase verb
    /// followed by at least one capitalized segment, and `SqlModelError::UnknownOperation`
    /// if the verb is not one of `get`, `getall`, `set`, `update`, `delete`, `count`.
    pub fn parse(name: &str) -> Result<Self, SqlModelError> {
        let caps = CALL_PATTERN
            .captures(name)
            .ok_or_else(|| SqlModelError::MalformedDescriptor(name.to_string()))?;

        let verb_token = &caps[1];
        let verb = Verb::from_token(verb_token).ok_or_else(|| {
            SqlModelError::UnknownOperation(format!("{verb_token} (in {name})"))
        })?;

        let segments = SEGMENT_PATTERN
            .find_iter(&caps[2])
            .map(|m| m.as_str().to_string())
            .collect();

        Ok(Self {
            name: name.to_string(),
            verb,
            segments,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Segments after the verb, in call order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(name: &str) -> Vec<String> {
        CallDescriptor::parse(name).unwrap().segments().to_vec()
    }

    #[test]
    fn splits_on_uppercase_boundaries() {
        let d = CallDescriptor::parse("getAssocUsersLikeEmail").unwrap();
        assert_eq!(d.verb(), Verb::Get);
        assert_eq!(d.segments(), ["Assoc", "Users", "Like", "Email"]);
    }

    #[test]
    fn column_suffix_appends_operator_and_column() {
        let base = segments("getGroupedUsers");
        let with_suffix = segments("getGroupedUsersByEmail");
        assert_eq!(with_suffix[..base.len()], base[..]);
        assert_eq!(with_suffix[base.len()..], ["By", "Email"]);
    }

    #[test]
    fn keeps_underscores_digits_and_non_ascii() {
        assert_eq!(segments("setUser_profiles2"), ["User_profiles2"]);
        assert_eq!(segments("countÉlèves"), ["Élèves"]);
    }

    #[test]
    fn getall_is_its_own_verb() {
        let d = CallDescriptor::parse("getallUsers").unwrap();
        assert_eq!(d.verb(), Verb::GetAll);
        assert_eq!(d.segments(), ["Users"]);
    }

    #[test]
    fn rejects_names_outside_the_grammar() {
        for name in ["getusers", "GetUsers", "get", "", "getUsers By", "getUSERS", "getUsersX"] {
            let err = CallDescriptor::parse(name).unwrap_err();
            assert!(
                matches!(err, SqlModelError::MalformedDescriptor(_)),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_verbs() {
        let err = CallDescriptor::parse("fetchUsers").unwrap_err();
        assert!(matches!(err, SqlModelError::UnknownOperation(_)));
    }
}
