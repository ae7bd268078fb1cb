use crate::utils::error::{Result, TubularError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(TubularError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(TubularError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(TubularError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(TubularError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(TubularError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| TubularError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TubularError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Exactly one of the mutually exclusive inputs must be present.
pub fn validate_exactly_one(field_names: &[&str], present: &[bool]) -> Result<()> {
    let count = present.iter().filter(|p| **p).count();
    if count != 1 {
        return Err(TubularError::config(format!(
            "Exactly one of {} should be specified ({} given)",
            field_names.join(", "),
            count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_base", "https://example.com").is_ok());
        assert!(validate_url("api_base", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("api_base", "").is_err());
        assert!(validate_url("api_base", "invalid-url").is_err());
        assert!(validate_url("api_base", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_exactly_one() {
        let names = ["input_file", "pr_number", "commit_hash"];
        assert!(validate_exactly_one(&names, &[false, true, false]).is_ok());
        assert!(validate_exactly_one(&names, &[false, false, false]).is_err());
        assert!(validate_exactly_one(&names, &[true, true, false]).is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_positive_number("timeout", 300, 1).is_ok());
        assert!(validate_positive_number("timeout", 0, 1).is_err());
        assert!(validate_range("min_checks", 0usize, 0, 100).is_ok());
        assert!(matches!(
            validate_range("min_checks", 101usize, 0, 100),
            Err(TubularError::InvalidConfigValueError { field, .. }) if field == "min_checks"
        ));
    }

    #[test]
    fn test_validate_required_field() {
        let missing: Option<String> = None;
        assert!(matches!(
            validate_required_field("token", &missing),
            Err(TubularError::MissingConfigError { .. })
        ));
        let present = Some("abc".to_string());
        assert_eq!(validate_required_field("token", &present).unwrap(), "abc");
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("responder", "Some Team").is_ok());
        assert!(validate_non_empty_string("responder", "   ").is_err());
    }
}
