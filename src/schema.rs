//! Index schema: the table and column layout loaded documents land in.
//!
//! `Books` holds one keyless row per document. `Terms` is the bigram lexicon
//! the store derives from the indexed columns: it is created here but never
//! loaded directly; the store maintains it from `Books` content. Setup is
//! unguarded, so re-running it against a configured store surfaces the
//! store's "already exists" rejections.

use crate::store::Command;

pub const BOOKS_TABLE: &str = "Books";
pub const TERMS_TABLE: &str = "Terms";

/// `Books` columns carrying short scalar text.
const SHORT_TEXT_COLUMNS: [&str; 4] = ["author", "file_path", "title", "unique_identifier"];

/// `Books` columns mirrored into the lexicon's inverted indexes.
const INDEXED_COLUMNS: [&str; 3] = ["author", "main_text", "title"];

/// The full schema-creation command sequence, in execution order.
pub fn setup_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::new("table_create")
            .param("name", BOOKS_TABLE)
            .param("flags", "TABLE_NO_KEY"),
    ];
    for column in SHORT_TEXT_COLUMNS {
        commands.push(scalar_column(column, "ShortText"));
    }
    commands.push(scalar_column("main_text", "LongText"));
    commands.push(scalar_column("modified", "Time"));

    // Bigram segmentation plus automatic script/width/case normalization:
    // substring matches across mixed Latin/CJK text without language-aware
    // word segmentation.
    commands.push(
        Command::new("table_create")
            .param("name", TERMS_TABLE)
            .param("flags", "TABLE_PAT_KEY")
            .param("key_type", "ShortText")
            .param("default_tokenizer", "TokenBigram")
            .param("normalizer", "NormalizerAuto"),
    );
    for column in INDEXED_COLUMNS {
        commands.push(
            Command::new("column_create")
                .param("table", TERMS_TABLE)
                .param("name", format!("entries_{column}_index"))
                .param("flags", "COLUMN_INDEX|WITH_POSITION")
                .param("type", BOOKS_TABLE)
                .param("source", column),
        );
    }
    commands
}

fn scalar_column(name: &str, column_type: &str) -> Command {
    Command::new("column_create")
        .param("table", BOOKS_TABLE)
        .param("name", name)
        .param("flags", "COLUMN_SCALAR")
        .param("type", column_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(command: &'a Command, key: &str) -> Option<&'a str> {
        command
            .params()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn setup_creates_both_tables_and_all_columns() {
        let commands = setup_commands();
        assert_eq!(commands.len(), 11);

        assert_eq!(commands[0].name(), "table_create");
        assert_eq!(param(&commands[0], "name"), Some("Books"));
        assert_eq!(param(&commands[0], "flags"), Some("TABLE_NO_KEY"));

        let scalar_types: Vec<_> = commands[1..7]
            .iter()
            .map(|c| (param(c, "name").unwrap(), param(c, "type").unwrap()))
            .collect();
        assert_eq!(
            scalar_types,
            vec![
                ("author", "ShortText"),
                ("file_path", "ShortText"),
                ("title", "ShortText"),
                ("unique_identifier", "ShortText"),
                ("main_text", "LongText"),
                ("modified", "Time"),
            ]
        );

        assert_eq!(param(&commands[7], "name"), Some("Terms"));
        assert_eq!(param(&commands[7], "default_tokenizer"), Some("TokenBigram"));
        assert_eq!(param(&commands[7], "normalizer"), Some("NormalizerAuto"));

        let index_columns: Vec<_> = commands[8..]
            .iter()
            .map(|c| (param(c, "name").unwrap(), param(c, "source").unwrap()))
            .collect();
        assert_eq!(
            index_columns,
            vec![
                ("entries_author_index", "author"),
                ("entries_main_text_index", "main_text"),
                ("entries_title_index", "title"),
            ]
        );
        for command in &commands[8..] {
            assert_eq!(param(command, "flags"), Some("COLUMN_INDEX|WITH_POSITION"));
            assert_eq!(param(command, "type"), Some("Books"));
        }
    }
}
