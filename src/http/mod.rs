//! HTTP/1.1 types used by the router: [`Method`], [`StatusCode`], [`Headers`],
//! [`Request`] and [`Response`].

use std::fmt;
use std::str::FromStr;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::Response;

macro_rules! status_codes {
    ($($variant:ident = $code:literal, $reason:literal;)+) => {
        /// Response status codes a JSON API answers with.
        ///
        /// ```
        /// use conroute::StatusCode;
        ///
        /// assert_eq!(StatusCode::UnprocessableEntity.as_u16(), 422);
        /// assert_eq!(StatusCode::from_u16(405), Some(StatusCode::MethodNotAllowed));
        /// assert_eq!(StatusCode::Created.to_string(), "201 Created");
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum StatusCode {
            $($variant = $code,)+
        }

        impl StatusCode {
            pub fn as_u16(self) -> u16 {
                self as u16
            }

            /// The status for a numeric code, if it is one of the known ones.
            pub fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Reason phrase written on the status line.
            pub fn canonical_reason(self) -> &'static str {
                match self {
                    $(Self::$variant => $reason,)+
                }
            }
        }
    };
}

status_codes! {
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NoContent = 204, "No Content";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    Conflict = 409, "Conflict";
    PayloadTooLarge = 413, "Payload Too Large";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    UnprocessableEntity = 422, "Unprocessable Entity";
    TooManyRequests = 429, "Too Many Requests";
    InternalServerError = 500, "Internal Server Error";
    ServiceUnavailable = 503, "Service Unavailable";
}

impl StatusCode {
    pub fn is_server_error(self) -> bool {
        self.as_u16() >= 500
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// Request method. Anything outside the verbs the routing convention knows is kept
/// verbatim in [`Method::Other`].
///
/// ```
/// use conroute::Method;
///
/// assert_eq!("PATCH".parse::<Method>(), Ok(Method::Patch));
/// assert_eq!("PROPFIND".parse::<Method>(), Ok(Method::Other("PROPFIND".into())));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert!(!StatusCode::NotFound.is_server_error());
        assert!(StatusCode::ServiceUnavailable.is_server_error());
        assert_eq!(StatusCode::from_u16(418), None);
    }

    #[test]
    fn method_names_are_case_sensitive() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Other("get".into())));
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
