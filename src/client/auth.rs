use base64::Engine;

/// Credentials for the HBase REST gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// Use username and password authentication via Basic Auth headers
    Basic(String, String),
    /// Don't use any authentication
    None,
}

impl Auth {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        match (username, password) {
            (Some(username), Some(password)) => Self::Basic(username, password),
            _ => Self::None,
        }
    }

    /// Value for the `Authorization` header, if any
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Basic(username, password) => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                Some(format!("Basic {}", credentials))
            }
            Self::None => None,
        }
    }
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic(_, _) => write!(f, "Basic"),
            Self::None => write!(f, "None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header() {
        let auth = Auth::new(Some("hbase".to_string()), Some("secret".to_string()));
        assert_eq!(auth.to_string(), "Basic");
        assert_eq!(auth.header_value().unwrap(), "Basic aGJhc2U6c2VjcmV0");
    }

    #[test]
    fn test_partial_credentials_mean_no_auth() {
        let auth = Auth::new(Some("hbase".to_string()), None);
        assert_eq!(auth, Auth::None);
        assert!(auth.header_value().is_none());
    }
}
