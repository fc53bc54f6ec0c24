//! Share-link codes.
//!
//! A course is shared as the base64url encoding (no padding) of its JSON
//! document, so the code can sit in a URL path or query without escaping.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use log::debug;

use crate::error::{CourseError, Result};
use crate::CourseData;

/// Encode a course into a URL-safe share code.
///
/// # Example
/// ```
/// use swim_course::{decode_course, encode_course, CourseData};
///
/// let course = CourseData { name: "Sprint".to_string(), laps: 2, ..CourseData::default() };
/// let code = encode_course(&course).unwrap();
/// assert!(!code.contains('='));
/// assert_eq!(decode_course(&code).unwrap(), course);
/// ```
pub fn encode_course(course: &CourseData) -> Result<String> {
    let json = course.to_json()?;
    let code = URL_SAFE_NO_PAD.encode(json.as_bytes());
    debug!("[Share] Encoded '{}' into {} chars", course.name, code.len());
    Ok(code)
}

/// Decode a share code back into a course.
///
/// Surrounding whitespace and trailing `=` padding are tolerated.
pub fn decode_course(code: &str) -> Result<CourseData> {
    let trimmed = code.trim().trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| CourseError::ShareDecode {
            message: e.to_string(),
        })?;
    let json = String::from_utf8(bytes).map_err(|e| CourseError::ShareDecode {
        message: e.to_string(),
    })?;
    serde_json::from_str(&json).map_err(|e| CourseError::ShareDecode {
        message: e.to_string(),
    })
}
