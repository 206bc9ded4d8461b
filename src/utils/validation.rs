use crate::core::consumer::Budget;
use crate::utils::error::{Result, StreamError};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> StreamError {
    StreamError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// API 根網址：http(s) 且不能帶查詢字串，端點路徑會直接接在後面
pub fn validate_api_base_url(field_name: &str, url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(
            field_name,
            url_str,
            "Base URL cannot carry a query or fragment",
        ));
    }
    Ok(())
}

/// Both limits must allow at least one record and one second of streaming.
pub fn validate_budget(budget: &Budget) -> Result<()> {
    if budget.record_limit == 0 {
        return Err(invalid(
            "limits.record_budget",
            budget.record_limit,
            "Record budget must be at least 1",
        ));
    }
    if budget.time_limit.as_secs() == 0 {
        return Err(invalid(
            "limits.time_budget_secs",
            format!("{:?}", budget.time_limit),
            "Time budget must be at least one second",
        ));
    }
    Ok(())
}

/// Entries are joined with commas into a query parameter, so each one must
/// be a single non-empty token.
pub fn validate_field_list(field_name: &str, values: &[String]) -> Result<()> {
    for value in values {
        if value.trim().is_empty() {
            return Err(invalid(field_name, value, "Entries cannot be empty"));
        }
        if value.contains(',') || value.chars().any(char::is_whitespace) {
            return Err(invalid(
                field_name,
                value,
                "Entries cannot contain commas or whitespace",
            ));
        }
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| StreamError::MissingConfigError {
        field: field_name.to_string(),
    })
}

/// 語言代碼只接受 ASCII 小寫字母，例如 `en`、`ja`
pub fn validate_language_code(field_name: &str, value: &str) -> Result<()> {
    let valid = (2..=3).contains(&value.len()) && value.chars().all(|c| c.is_ascii_lowercase());
    if !valid {
        return Err(invalid(
            field_name,
            value,
            "Expected a lowercase ISO 639 language code",
        ));
    }
    Ok(())
}

/// The gzip output must name a file; an existing directory is rejected.
pub fn validate_output_path(field_name: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(invalid(
            field_name,
            path.display(),
            "Output path must name a file",
        ));
    }
    if path.is_dir() {
        return Err(invalid(
            field_name,
            path.display(),
            "Output path is a directory",
        ));
    }
    Ok(())
}
