//! Naming conventions: how folder names and action names turn into routes.
//!
//! | Action name                         | Verb     | Sub-path          |
//! |-------------------------------------|----------|-------------------|
//! | `list`                              | `GET`    | *(none)*          |
//! | `create`                            | `POST`   | *(none)*          |
//! | `show`                              | `GET`    | `/:id`            |
//! | `update`                            | `PUT`    | `/:id`            |
//! | `destroy`                           | `DELETE` | `/:id`            |
//! | `get_active_users`, `getActiveUsers`| `GET`    | `/active-users`   |
//! | `post_reset_password`               | `POST`   | `/reset-password` |
//!
//! Folder names become URL segments verbatim apart from case conversion to kebab-case;
//! nothing is pluralized or singularized.

use crate::error::ConventionError;
use crate::http::Method;

/// Where a single action is mounted, relative to its controller prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub method: Method,
    /// Empty for the controller root, otherwise starts with `/`.
    pub path: String,
}

// (action name, verb, takes the id parameter)
const PREDEFINED: &[(&str, Method, bool)] = &[
    ("list", Method::Get, false),
    ("create", Method::Post, false),
    ("show", Method::Get, true),
    ("update", Method::Put, true),
    ("destroy", Method::Delete, true),
];

const VERBS: &[(&str, Method)] = &[
    ("get", Method::Get),
    ("post", Method::Post),
    ("put", Method::Put),
    ("patch", Method::Patch),
    ("delete", Method::Delete),
    ("head", Method::Head),
    ("options", Method::Options),
];

/// Returns `true` for the five resource actions with a fixed verb.
pub fn is_predefined(name: &str) -> bool {
    predefined(name).is_some()
}

fn predefined(name: &str) -> Option<&'static (&'static str, Method, bool)> {
    match split_words(name).as_slice() {
        [word] => PREDEFINED.iter().find(|(n, _, _)| *n == word.as_str()),
        _ => None,
    }
}

/// Parses an HTTP verb word (`get`, `Post`, `DELETE`, ...).
pub fn verb(word: &str) -> Option<Method> {
    VERBS
        .iter()
        .find(|(w, _)| w.eq_ignore_ascii_case(word))
        .map(|(_, m)| m.clone())
}

/// Resolves an action name to its verb and sub-path.
///
/// `id_param` names the parameter used by `show`, `update` and `destroy`.
///
/// # Errors
///
/// - [`ConventionError::EmptyName`] — the name has no words.
/// - [`ConventionError::UnknownVerb`] — a custom name whose first word is not a verb.
///
/// # Examples
///
/// ```
/// use conroute::convention::resolve_action;
/// use conroute::Method;
///
/// let target = resolve_action("getActiveUsers", "id").unwrap();
/// assert_eq!(target.method, Method::Get);
/// assert_eq!(target.path, "/active-users");
///
/// let show = resolve_action("show", "id").unwrap();
/// assert_eq!(show.path, "/:id");
/// ```
pub fn resolve_action(name: &str, id_param: &str) -> Result<RouteTarget, ConventionError> {
    if let Some((_, method, with_id)) = predefined(name) {
        let path = if *with_id {
            format!("/:{id_param}")
        } else {
            String::new()
        };
        return Ok(RouteTarget {
            method: method.clone(),
            path,
        });
    }

    let words = split_words(name);
    let (first, rest) = words.split_first().ok_or(ConventionError::EmptyName)?;
    let method = verb(first).ok_or_else(|| ConventionError::UnknownVerb {
        name: name.to_owned(),
        word: first.clone(),
    })?;

    let path = if rest.is_empty() {
        String::new()
    } else {
        format!("/{}", rest.join("-"))
    };

    Ok(RouteTarget { method, path })
}

/// Splits an identifier in any common case style into lowercase words.
///
/// Separators are `_`, `-`, `.` and whitespace. Case transitions start a new word;
/// runs of capitals stay together (`HTTPServer` → `http`, `server`) and digits stay
/// attached to the word before them.
///
/// ```
/// use conroute::convention::split_words;
///
/// assert_eq!(split_words("getActiveUsers"), ["get", "active", "users"]);
/// assert_eq!(split_words("user_profiles"), ["user", "profiles"]);
/// assert_eq!(split_words("HTTPServer"), ["http", "server"]);
/// ```
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
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
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
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

/// `UserProfiles`, `user_profiles`, `userProfiles` → `user-profiles`.
pub fn to_kebab_case(name: &str) -> String {
    split_words(name).join("-")
}

/// `user-profiles`, `user_profiles`, `userProfiles` → `UserProfiles`.
pub fn to_pascal_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// URL segment for a controller folder.
pub fn url_segment(folder: &str) -> String {
    to_kebab_case(folder)
}

/// Controller name expected for a folder: `user-profiles` → `UserProfilesController`.
pub fn controller_name(folder: &str) -> String {
    let mut words = split_words(folder);
    if words.last().is_some_and(|w| w == "controller") {
        words.pop();
    }
    format!("{}Controller", to_pascal_case(&words.join("_")))
}

/// URL segment for a controller mounted without a folder:
/// `UserProfilesController` → `user-profiles`.
pub fn resource_segment(controller: &str) -> String {
    let mut words = split_words(controller);
    if words.len() > 1 && words.last().is_some_and(|w| w == "controller") {
        words.pop();
    }
    words.join("-")
}

/// Joins URL parts with single slashes. The result always starts with `/` and has no
/// trailing slash unless it is the root.
///
/// ```
/// use conroute::convention::join_path;
///
/// assert_eq!(join_path(&["/api/", "users", "/:id"]), "/api/users/:id");
/// assert_eq!(join_path(&["", ""]), "/");
/// ```
pub fn join_path(parts: &[&str]) -> String {
    let segments: Vec<&str> = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
