use crate::{Error, Result};

pub const MAX_LABEL_CHARS: usize = 100;

/// Trims and lower-cases a tag label. Labels are unique per owner in this form.
pub fn normalize_label(raw: &str) -> Result<String> {
	let label = raw.trim().to_lowercase();

	if label.is_empty() {
		return Err(Error::InvalidLabel { message: "label must be non-empty.".to_string() });
	}
	if label.chars().count() > MAX_LABEL_CHARS {
		return Err(Error::InvalidLabel {
			message: format!("label must be at most {MAX_LABEL_CHARS} characters."),
		});
	}

	Ok(label)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels_are_trimmed_and_lowercased() {
		assert_eq!(normalize_label("  Rust Lang "), Ok("rust lang".to_string()));
		assert!(normalize_label(" \t").is_err());
		assert!(normalize_label(&"x".repeat(MAX_LABEL_CHARS + 1)).is_err());
	}
}
