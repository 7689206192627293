use regex::Regex;

use crate::{Error, Result};

const USERNAME_PATTERN: &str = r"^[a-zA-Z][0-9a-zA-Z]{3,}$";

pub const MIN_PASSWORD_CHARS: usize = 8;

pub fn validate_username(username: &str) -> Result<()> {
	if !Regex::new(USERNAME_PATTERN).map(|re| re.is_match(username)).unwrap_or(false) {
		return Err(Error::InvalidInput {
			message: "username must start with a letter and contain at least 4 letters or digits."
				.to_string(),
		});
	}

	Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
	if password.chars().count() < MIN_PASSWORD_CHARS {
		return Err(Error::InvalidInput {
			message: format!("password must be at least {MIN_PASSWORD_CHARS} characters."),
		});
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn usernames_follow_the_pattern() {
		assert!(validate_username("alice").is_ok());
		assert!(validate_username("b0b1").is_ok());
		assert!(validate_username("1bob").is_err());
		assert!(validate_username("bob").is_err());
		assert!(validate_username("bob_smith").is_err());
	}

	#[test]
	fn short_passwords_are_rejected() {
		assert!(validate_password("1234567").is_err());
		assert!(validate_password("12345678").is_ok());
	}
}
