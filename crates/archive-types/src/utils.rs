//! Small helpers shared across crates.

/// Current UNIX timestamp in seconds, or 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Current UNIX timestamp in milliseconds.
pub fn current_timestamp_millis() -> i64 {
	chrono::Utc::now().timestamp_millis()
}

/// Case-insensitive email comparison, ignoring surrounding whitespace.
pub fn emails_match(a: &str, b: &str) -> bool {
	a.trim().eq_ignore_ascii_case(b.trim())
}

/// Shortens an identifier for log output.
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 8 {
		id.to_string()
	} else {
		format!("{}..", id.chars().take(8).collect::<String>())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_emails_match() {
		assert!(emails_match("A@Example.com", " a@example.com "));
		assert!(!emails_match("a@example.com", "b@example.com"));
	}

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("#D1001"), "#D1001");
		assert_eq!(truncate_id("0123456789abcdef"), "01234567..");
	}
}
