use crate::server::response::ApiError;

const MAX_DISPLAY_NAME_LEN: usize = 50;
const MAX_LIST_ENTRIES: usize = 10;
const MAX_LIST_ENTRY_LEN: usize = 100;
const MAX_POST_LEN: usize = 2000;
const MAX_COMMENT_LEN: usize = 1000;
const MAX_COACH_MESSAGE_LEN: usize = 2000;

fn validate_text(value: &str, field: &str, max_len: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(format!("{field} cannot exceed {max_len} characters"));
    }
    Ok(trimmed.to_string())
}

/// Trims and checks a display name, returning the normalized value.
pub fn validate_display_name(name: &str) -> Result<String, String> {
    let name = validate_text(name, "Display name", MAX_DISPLAY_NAME_LEN)?;
    if name.chars().any(char::is_control) {
        return Err("Display name cannot contain control characters".to_string());
    }
    Ok(name)
}

/// Normalizes a goals/triggers list: trims entries, drops duplicates.
pub fn validate_string_list(items: &[String], field: &str) -> Result<Vec<String>, ApiError> {
    if items.len() > MAX_LIST_ENTRIES {
        return Err(ApiError::bad_request(format!(
            "{field} cannot have more than {MAX_LIST_ENTRIES} entries"
        )));
    }

    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = validate_text(item, field, MAX_LIST_ENTRY_LEN).map_err(ApiError::bad_request)?;
        if !out.contains(&item) {
            out.push(item);
        }
    }
    Ok(out)
}

pub fn validate_post_body(body: &str) -> Result<String, ApiError> {
    validate_text(body, "Post", MAX_POST_LEN).map_err(ApiError::bad_request)
}

pub fn validate_comment_body(body: &str) -> Result<String, ApiError> {
    validate_text(body, "Comment", MAX_COMMENT_LEN).map_err(ApiError::bad_request)
}

pub fn validate_coach_message(message: &str) -> Result<String, ApiError> {
    validate_text(message, "Message", MAX_COACH_MESSAGE_LEN).map_err(ApiError::bad_request)
}
