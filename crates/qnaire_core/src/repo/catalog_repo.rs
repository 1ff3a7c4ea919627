//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist a whole catalog tree atomically.
//! - Load a catalog eagerly into a pre-sorted in-memory tree.
//! - Expose every stored option for value rendering across catalogs.
//!
//! # Invariants
//! - Every level loads ordered by `sort_order ASC, id ASC`.
//! - A question set repeats exactly when its bound attribute is a collection.
//! - Questions stored with a `section_id` load as `QuestionEntity::Leaf`.

use crate::model::catalog::{
    AnswerOption, Catalog, CatalogId, Question, QuestionEntity, QuestionId, QuestionSet,
    QuestionSetId, Section, SectionId, WidgetType,
};
use crate::model::locale::LocalizedText;
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_optional_uuid, parse_uuid, RepoError,
    RepoResult,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::time::Instant;

pub trait CatalogRepository {
    /// Inserts the catalog with all sections, sets, questions and options.
    fn create_catalog(&self, catalog: &Catalog) -> RepoResult<CatalogId>;
    /// Loads one catalog tree, or `None` when it does not exist.
    fn load_catalog(&self, id: CatalogId) -> RepoResult<Option<Catalog>>;
    /// Loads the options of all catalogs, ordered by id.
    fn load_options(&self) -> RepoResult<Vec<AnswerOption>>;
}

pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_catalog(&self, catalog: &Catalog) -> RepoResult<CatalogId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO catalogs (id, key, title_en, title_de) VALUES (?1, ?2, ?3, ?4);",
            params![
                catalog.id.to_string(),
                catalog.key.as_str(),
                catalog.title.en.as_str(),
                catalog.title.de.as_str(),
            ],
        )?;

        for section in &catalog.sections {
            tx.execute(
                "INSERT INTO sections (id, catalog_id, sort_order, title_en, title_de)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    section.id.to_string(),
                    catalog.id.to_string(),
                    section.order,
                    section.title.en.as_str(),
                    section.title.de.as_str(),
                ],
            )?;

            for entity in &section.entities {
                match entity {
                    QuestionEntity::Set(set) => {
                        tx.execute(
                            "INSERT INTO question_sets (
                                id, section_id, sort_order, title_en, title_de, attribute_id
                             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                            params![
                                set.id.to_string(),
                                section.id.to_string(),
                                set.order,
                                set.title.en.as_str(),
                                set.title.de.as_str(),
                                set.attribute_id.map(|id| id.to_string()),
                            ],
                        )?;
                        for question in &set.questions {
                            insert_question(&tx, question, QuestionParent::Set(set.id))?;
                        }
                    }
                    QuestionEntity::Leaf(question) => {
                        insert_question(&tx, question, QuestionParent::Section(section.id))?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(catalog.id)
    }

    fn load_catalog(&self, id: CatalogId) -> RepoResult<Option<Catalog>> {
        let started_at = Instant::now();
        let header = self
            .conn
            .query_row(
                "SELECT key, title_en, title_de FROM catalogs WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        LocalizedText::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                    ))
                },
            )
            .optional()?;
        let Some((key, title)) = header else {
            return Ok(None);
        };

        let mut options = load_catalog_options(self.conn, id)?;
        let mut set_questions: HashMap<QuestionSetId, Vec<Question>> = HashMap::new();
        let mut leaf_questions: HashMap<SectionId, Vec<Question>> = HashMap::new();
        for (parent, mut question) in load_questions(self.conn, id)? {
            question.options = options.remove(&question.id).unwrap_or_default();
            match parent {
                QuestionParent::Set(set_id) => set_questions.entry(set_id).or_default().push(question),
                QuestionParent::Section(section_id) => {
                    leaf_questions.entry(section_id).or_default().push(question)
                }
            }
        }

        let mut section_sets: HashMap<SectionId, Vec<QuestionSet>> = HashMap::new();
        for (section_id, mut set) in load_question_sets(self.conn, id)? {
            set.questions = set_questions.remove(&set.id).unwrap_or_default();
            section_sets.entry(section_id).or_default().push(set);
        }

        let mut sections = load_sections(self.conn, id)?;
        for section in &mut sections {
            let sets = section_sets.remove(&section.id).unwrap_or_default();
            let leaves = leaf_questions.remove(&section.id).unwrap_or_default();
            section.entities = sets
                .into_iter()
                .map(QuestionEntity::Set)
                .chain(leaves.into_iter().map(QuestionEntity::Leaf))
                .collect();
        }

        let mut catalog = Catalog {
            id,
            key,
            title,
            sections,
        };
        catalog.sort_in_place();

        info!(
            "event=catalog_load module=repo status=ok sections={} questions={} duration_ms={}",
            catalog.sections.len(),
            catalog.questions().count(),
            started_at.elapsed().as_millis()
        );
        Ok(Some(catalog))
    }

    fn load_options(&self) -> RepoResult<Vec<AnswerOption>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question_id, sort_order, key, text_en, text_de, additional_input
             FROM options
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut options = Vec::new();
        while let Some(row) = rows.next()? {
            options.push(parse_option_row(row)?.1);
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, Copy)]
enum QuestionParent {
    Set(QuestionSetId),
    Section(SectionId),
}

fn insert_question(
    conn: &Connection,
    question: &Question,
    parent: QuestionParent,
) -> RepoResult<()> {
    let (section_id, question_set_id) = match parent {
        QuestionParent::Set(id) => (None, Some(id.to_string())),
        QuestionParent::Section(id) => (Some(id.to_string()), None),
    };
    conn.execute(
        "INSERT INTO questions (
            id,
            section_id,
            question_set_id,
            sort_order,
            text_en,
            text_de,
            attribute_id,
            widget_type,
            is_collection
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            question.id.to_string(),
            section_id,
            question_set_id,
            question.order,
            question.text.en.as_str(),
            question.text.de.as_str(),
            question.attribute_id.to_string(),
            question.widget_type.as_str(),
            bool_to_int(question.is_collection),
        ],
    )?;

    for option in &question.options {
        conn.execute(
            "INSERT INTO options (
                id, question_id, sort_order, key, text_en, text_de, additional_input
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                option.id.to_string(),
                question.id.to_string(),
                option.order,
                option.key.as_str(),
                option.text.en.as_str(),
                option.text.de.as_str(),
                bool_to_int(option.additional_input),
            ],
        )?;
    }
    Ok(())
}

fn load_sections(conn: &Connection, catalog_id: CatalogId) -> RepoResult<Vec<Section>> {
    let mut stmt = conn.prepare(
        "SELECT id, sort_order, title_en, title_de
         FROM sections
         WHERE catalog_id = ?1
         ORDER BY sort_order ASC, id ASC;",
    )?;
    let mut rows = stmt.query([catalog_id.to_string()])?;
    let mut sections = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        sections.push(Section {
            id: parse_uuid(&id_text, "sections.id")?,
            order: row.get("sort_order")?,
            title: LocalizedText::new(
                row.get::<_, String>("title_en")?,
                row.get::<_, String>("title_de")?,
            ),
            entities: Vec::new(),
        });
    }
    Ok(sections)
}

fn load_question_sets(
    conn: &Connection,
    catalog_id: CatalogId,
) -> RepoResult<Vec<(SectionId, QuestionSet)>> {
    let mut stmt = conn.prepare(
        "SELECT
            qs.id AS id,
            qs.section_id AS section_id,
            qs.sort_order AS sort_order,
            qs.title_en AS title_en,
            qs.title_de AS title_de,
            qs.attribute_id AS attribute_id,
            COALESCE(a.is_collection, 0) AS is_collection
         FROM question_sets qs
         INNER JOIN sections s ON s.id = qs.section_id
         LEFT JOIN attributes a ON a.id = qs.attribute_id
         WHERE s.catalog_id = ?1
         ORDER BY qs.sort_order ASC, qs.id ASC;",
    )?;
    let mut rows = stmt.query([catalog_id.to_string()])?;
    let mut sets = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let section_text: String = row.get("section_id")?;
        sets.push((
            parse_uuid(&section_text, "question_sets.section_id")?,
            QuestionSet {
                id: parse_uuid(&id_text, "question_sets.id")?,
                order: row.get("sort_order")?,
                title: LocalizedText::new(
                    row.get::<_, String>("title_en")?,
                    row.get::<_, String>("title_de")?,
                ),
                attribute_id: parse_optional_uuid(
                    row.get("attribute_id")?,
                    "question_sets.attribute_id",
                )?,
                is_collection: parse_bool(row.get("is_collection")?, "attributes.is_collection")?,
                questions: Vec::new(),
            },
        ));
    }
    Ok(sets)
}

fn load_questions(
    conn: &Connection,
    catalog_id: CatalogId,
) -> RepoResult<Vec<(QuestionParent, Question)>> {
    let mut stmt = conn.prepare(
        "SELECT
            q.id AS id,
            q.section_id AS section_id,
            q.question_set_id AS question_set_id,
            q.sort_order AS sort_order,
            q.text_en AS text_en,
            q.text_de AS text_de,
            q.attribute_id AS attribute_id,
            q.widget_type AS widget_type,
            q.is_collection AS is_collection
         FROM questions q
         LEFT JOIN question_sets qs ON qs.id = q.question_set_id
         INNER JOIN sections s ON s.id = COALESCE(q.section_id, qs.section_id)
         WHERE s.catalog_id = ?1
         ORDER BY q.sort_order ASC, q.id ASC;",
    )?;
    let mut rows = stmt.query([catalog_id.to_string()])?;
    let mut questions = Vec::new();
    while let Some(row) = rows.next()? {
        questions.push(parse_question_row(row)?);
    }
    Ok(questions)
}

fn parse_question_row(row: &Row<'_>) -> RepoResult<(QuestionParent, Question)> {
    let id_text: String = row.get("id")?;
    let attribute_text: String = row.get("attribute_id")?;
    let widget_text: String = row.get("widget_type")?;
    let widget_type = WidgetType::parse(&widget_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid widget type `{widget_text}` in questions.widget_type"
        ))
    })?;

    let section_id = parse_optional_uuid(row.get("section_id")?, "questions.section_id")?;
    let set_id = parse_optional_uuid(row.get("question_set_id")?, "questions.question_set_id")?;
    let parent = match (set_id, section_id) {
        (Some(set_id), None) => QuestionParent::Set(set_id),
        (None, Some(section_id)) => QuestionParent::Section(section_id),
        _ => {
            return Err(RepoError::InvalidData(format!(
                "question {id_text} must belong to exactly one section or question set"
            )))
        }
    };

    Ok((
        parent,
        Question {
            id: parse_uuid(&id_text, "questions.id")?,
            order: row.get("sort_order")?,
            text: LocalizedText::new(
                row.get::<_, String>("text_en")?,
                row.get::<_, String>("text_de")?,
            ),
            attribute_id: parse_uuid(&attribute_text, "questions.attribute_id")?,
            widget_type,
            is_collection: parse_bool(row.get("is_collection")?, "questions.is_collection")?,
            options: Vec::new(),
        },
    ))
}

fn load_catalog_options(
    conn: &Connection,
    catalog_id: CatalogId,
) -> RepoResult<HashMap<QuestionId, Vec<AnswerOption>>> {
    let mut stmt = conn.prepare(
        "SELECT
            o.id AS id,
            o.question_id AS question_id,
            o.sort_order AS sort_order,
            o.key AS key,
            o.text_en AS text_en,
            o.text_de AS text_de,
            o.additional_input AS additional_input
         FROM options o
         INNER JOIN questions q ON q.id = o.question_id
         LEFT JOIN question_sets qs ON qs.id = q.question_set_id
         INNER JOIN sections s ON s.id = COALESCE(q.section_id, qs.section_id)
         WHERE s.catalog_id = ?1
         ORDER BY o.sort_order ASC, o.id ASC;",
    )?;
    let mut rows = stmt.query([catalog_id.to_string()])?;
    let mut options: HashMap<QuestionId, Vec<AnswerOption>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let (question_id, option) = parse_option_row(row)?;
        options.entry(question_id).or_default().push(option);
    }
    Ok(options)
}

fn parse_option_row(row: &Row<'_>) -> RepoResult<(QuestionId, AnswerOption)> {
    let id_text: String = row.get("id")?;
    let question_text: String = row.get("question_id")?;
    Ok((
        parse_uuid(&question_text, "options.question_id")?,
        AnswerOption {
            id: parse_uuid(&id_text, "options.id")?,
            order: row.get("sort_order")?,
            key: row.get("key")?,
            text: LocalizedText::new(
                row.get::<_, String>("text_en")?,
                row.get::<_, String>("text_de")?,
            ),
            additional_input: parse_bool(row.get("additional_input")?, "options.additional_input")?,
        },
    ))
}
