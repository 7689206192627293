use serde_json::Value;

use crate::{Error, Result};

pub const MAX_TITLE_CHARS: usize = 128;

/// A single whitelisted card mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardPatch {
	Title(String),
	Query(String),
	Answer(String),
	Active(bool),
}

/// Editable card fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardText {
	pub title: String,
	pub query: String,
	pub answer: String,
	pub active: bool,
}
impl CardText {
	pub fn apply(&mut self, patch: CardPatch) {
		match patch {
			CardPatch::Title(title) => self.title = title,
			CardPatch::Query(query) => self.query = query,
			CardPatch::Answer(answer) => self.answer = answer,
			CardPatch::Active(active) => self.active = active,
		}
	}
}

/// Parses a JSON patch document into typed setters.
///
/// Only `replace` operations on `/title`, `/query`, `/answer` and `/active` are accepted. A
/// single bad operation rejects the whole document.
pub fn parse_patch(doc: &Value) -> Result<Vec<CardPatch>> {
	let ops = doc.as_array().ok_or_else(|| Error::InvalidPatch {
		message: "Invalid patch format. Root must be a list.".to_string(),
	})?;

	ops.iter().enumerate().map(|(index, op)| parse_op(index, op)).collect()
}

pub fn validate_title(title: &str) -> Result<()> {
	if title.chars().count() > MAX_TITLE_CHARS {
		return Err(Error::InvalidInput {
			message: format!("title must be at most {MAX_TITLE_CHARS} characters."),
		});
	}

	Ok(())
}

fn parse_op(index: usize, op: &Value) -> Result<CardPatch> {
	let invalid =
		|message: &str| Error::InvalidPatch { message: format!("op {index}: {message}") };
	let op = op.as_object().ok_or_else(|| invalid("must be an object."))?;
	let kind = op.get("op").and_then(Value::as_str).ok_or_else(|| invalid("missing op."))?;
	let path = op.get("path").and_then(Value::as_str).ok_or_else(|| invalid("missing path."))?;
	let value = op.get("value").ok_or_else(|| invalid("missing value."))?;

	if kind != "replace" {
		return Err(invalid(&format!("unsupported op {kind:?}; only replace is allowed.")));
	}

	let text = |value: &Value| {
		value
			.as_str()
			.map(str::to_string)
			.ok_or_else(|| invalid(&format!("{path} must be a string.")))
	};

	match path {
		"/title" => {
			let title = text(value)?;

			validate_title(&title).map_err(|_| {
				invalid(&format!("/title must be at most {MAX_TITLE_CHARS} characters."))
			})?;

			Ok(CardPatch::Title(title))
		},
		"/query" => Ok(CardPatch::Query(text(value)?)),
		"/answer" => Ok(CardPatch::Answer(text(value)?)),
		"/active" => value
			.as_bool()
			.map(CardPatch::Active)
			.ok_or_else(|| invalid("/active must be a boolean.")),
		_ => Err(invalid(&format!("path {path:?} is not editable."))),
	}
}
