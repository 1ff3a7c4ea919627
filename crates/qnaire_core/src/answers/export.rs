//! Flat question/answer rows for spreadsheet export.
//!
//! # Responsibility
//! - Flatten an answers tree into `(question text, answers)` rows.
//! - Write rows as delimiter-separated text with RFC 4180 quoting.
//!
//! # Invariants
//! - Cells are trimmed and whitespace runs collapse to one space.
//! - Multiple answers join with `"; "`.
//! - Rows of repeatable sets carry the set label as `text [label]`.

use crate::answers::tree::{AnswersTree, QuestionAnswers, QuestionSetContent};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, Write};
use std::str::FromStr;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Field separator of the exported file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CsvDelimiter {
    #[default]
    Comma,
    Semicolon,
}

impl CsvDelimiter {
    pub fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Semicolon => ';',
        }
    }
}

impl FromStr for CsvDelimiter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "," | "comma" | "csvcomma" => Ok(Self::Comma),
            ";" | "semicolon" | "csvsemicolon" => Ok(Self::Semicolon),
            other => Err(format!("unsupported csv delimiter `{other}`")),
        }
    }
}

/// One exported line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub text: String,
    pub answers: String,
}

/// Flattens the tree in walk order.
pub fn flatten_rows(tree: &AnswersTree) -> Vec<ExportRow> {
    let mut rows = Vec::new();
    for section in &tree.sections {
        for questionset in &section.questionsets {
            match &questionset.content {
                QuestionSetContent::Questions { questions } => {
                    rows.extend(questions.iter().map(|question| row(question, None)));
                }
                QuestionSetContent::Sets { sets } => {
                    for set in sets {
                        rows.extend(
                            set.questions
                                .iter()
                                .map(|question| row(question, Some(set.id.as_str()))),
                        );
                    }
                }
            }
        }
    }
    rows
}

/// Writes rows as CSV, one CRLF-terminated record per row.
pub fn write_csv<W: Write>(
    rows: &[ExportRow],
    delimiter: CsvDelimiter,
    writer: &mut W,
) -> io::Result<()> {
    let separator = delimiter.as_char();
    for row in rows {
        let line = format!(
            "{}{}{}\r\n",
            quote_field(&row.text, separator),
            separator,
            quote_field(&row.answers, separator)
        );
        writer.write_all(line.as_bytes())?;
    }
    writer.flush()
}

fn row(question: &QuestionAnswers, set_label: Option<&str>) -> ExportRow {
    let text = match set_label {
        Some(label) => format!("{} [{}]", question.text, label),
        None => question.text.clone(),
    };
    ExportRow {
        text: stringify(&text),
        answers: question
            .answers
            .iter()
            .map(|answer| stringify(answer))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn stringify(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

/// Quotes a stringified cell; line breaks are already gone at this point.
fn quote_field(value: &str, separator: char) -> String {
    let needs_quotes = value.contains(separator)
        || value.contains('"')
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
