use crate::utils::error::{NodeError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(NodeError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Domains go into the Host header and the share link verbatim, so reject
/// anything carrying a scheme, path or whitespace.
pub fn validate_domain(field_name: &str, domain: &str) -> Result<()> {
    validate_non_empty_string(field_name, domain)?;

    let bad = domain
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'));
    if let Some(c) = bad {
        return Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: domain.to_string(),
            reason: format!("Unexpected character '{}' in domain", c),
        });
    }
    Ok(())
}

pub fn validate_uuid(field_name: &str, value: &str) -> Result<()> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|e| NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Invalid UUID: {}", e),
        })
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(NodeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("xray.release_base_url", "https://github.com").is_ok());
        assert!(validate_url("xray.release_base_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("xray.release_base_url", "").is_err());
        assert!(validate_url("xray.release_base_url", "invalid-url").is_err());
        assert!(validate_url("xray.release_base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("node.domain", "cdn.example.com").is_ok());
        assert!(validate_domain("node.domain", "").is_err());
        assert!(validate_domain("node.domain", "https://cdn.example.com").is_err());
        assert!(validate_domain("node.domain", "cdn example.com").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("node.uuid", "6f1e0c2a-3b4d-4e5f-8a9b-0c1d2e3f4a5b").is_ok());
        assert!(validate_uuid("node.uuid", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("node.port", 443u32, 1, 65535).is_ok());
        assert!(validate_range("node.port", 0u32, 1, 65535).is_err());
        assert!(validate_range("node.port", 70000u32, 1, 65535).is_err());
    }
}
