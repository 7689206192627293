pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_users.sql")),
				"tables/002_sessions.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_sessions.sql")),
				"tables/003_cards.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_cards.sql")),
				"tables/004_tags.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_tags.sql")),
				"tables/005_card_tags.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_card_tags.sql")),
				"tables/006_retrieval_attempts.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_retrieval_attempts.sql")),
				"tables/007_file_attachments.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_file_attachments.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
