use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OmniError, Result};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid");
}

/// Languages accepted at registration.
pub const REGISTRATION_LANGUAGES: &[&str] = &["en", "ko", "ja", "zh", "es", "fr"];

/// Languages accepted when a member changes their preference later.
pub const PROFILE_LANGUAGES: &[&str] = &["en", "ko", "ja", "zh", "es", "fr", "id", "vi", "th", "ru"];

pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(OmniError::validation("email must be a valid email address"));
    }
    Ok(email)
}

pub fn ensure_language(language: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&language) {
        Ok(())
    } else {
        Err(OmniError::validation(format!(
            "preferred_language must be one of: {}",
            allowed.join(", ")
        )))
    }
}

/// Checks a trimmed string's character count against an inclusive range.
pub fn ensure_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min {
        if min == 1 {
            return Err(OmniError::validation(format!("{field} must not be blank")));
        }
        return Err(OmniError::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(OmniError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    pub page_size: Option<u32>,
}

pub fn default_page() -> u32 {
    1
}

impl PageParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: Some(page_size),
        }
    }

    /// Resolves the page size and checks both bounds.
    pub fn resolve(&self, default_size: u32, max_size: u32) -> Result<Page> {
        if self.page < 1 {
            return Err(OmniError::validation("page must be at least 1"));
        }
        let size = self.page_size.unwrap_or(default_size);
        if size < 1 || size > max_size {
            return Err(OmniError::validation(format!(
                "page_size must be between 1 and {max_size}"
            )));
        }
        Ok(Page {
            page: self.page,
            page_size: size,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }

    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size as usize)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
