use qnaire_core::answers::{
    get_answers_tree, AnswerError, AnswersTree, QuestionAnswers, QuestionSetContent,
};
use qnaire_core::model::catalog::{
    AnswerOption, Catalog, Question, QuestionEntity, QuestionSet, Section, WidgetType,
};
use qnaire_core::model::domain::{Attribute, AttributeId, DomainTree, ValueType};
use qnaire_core::model::locale::{Locale, LocalizedText};
use qnaire_core::model::value::{Value, ValuePayload};
use uuid::Uuid;

struct Fixture {
    project: Attribute,
    title: Attribute,
    keywords: Attribute,
    open: Attribute,
    started: Attribute,
    license: Attribute,
    dataset: Attribute,
    dataset_id: Attribute,
    dataset_size: Attribute,
    funding: Attribute,
    funding_name: Attribute,
    other_license: AnswerOption,
    cc_license: AnswerOption,
}

impl Fixture {
    fn new() -> Self {
        let project = Attribute::new(None, "project", ValueType::Text);
        let mut dataset = Attribute::new(Some(project.id), "dataset", ValueType::Text);
        dataset.is_collection = true;
        let mut dataset_size = Attribute::new(Some(dataset.id), "size", ValueType::Float);
        dataset_size.unit = Some("GB".to_string());
        let mut funding = Attribute::new(Some(project.id), "funding", ValueType::Text);
        funding.is_collection = true;

        Self {
            title: Attribute::new(Some(project.id), "title", ValueType::Text),
            keywords: Attribute::new(Some(project.id), "keywords", ValueType::Text),
            open: Attribute::new(Some(project.id), "open", ValueType::Boolean),
            started: Attribute::new(Some(project.id), "started", ValueType::Datetime),
            license: Attribute::new(Some(project.id), "license", ValueType::Option),
            dataset_id: Attribute::new(Some(dataset.id), "id", ValueType::Text),
            dataset_size,
            funding_name: Attribute::new(Some(funding.id), "name", ValueType::Text),
            funding,
            dataset,
            project,
            other_license: option(1, "other", "Other", "Andere", true),
            cc_license: option(0, "cc-by", "CC BY 4.0", "", false),
        }
    }

    fn domain(&self) -> DomainTree {
        DomainTree::from_attributes(vec![
            self.project.clone(),
            self.title.clone(),
            self.keywords.clone(),
            self.open.clone(),
            self.started.clone(),
            self.license.clone(),
            self.dataset.clone(),
            self.dataset_id.clone(),
            self.dataset_size.clone(),
            self.funding.clone(),
            self.funding_name.clone(),
        ])
    }

    /// Every level is declared out of order and handed over unsorted.
    fn catalog(&self) -> Catalog {
        let mut license = question(3, "License", self.license.id, WidgetType::Radio);
        license.options = vec![self.other_license.clone(), self.cc_license.clone()];

        let general = Section {
            id: Uuid::new_v4(),
            order: 0,
            title: LocalizedText::new("General", "Allgemein"),
            entities: vec![
                QuestionEntity::Leaf(question(5, "Open access?", self.open.id, WidgetType::YesNo)),
                QuestionEntity::Set(question_set(
                    1,
                    "Basics",
                    None,
                    false,
                    vec![
                        question(2, "Title", self.title.id, WidgetType::Text),
                        question(1, "Keywords", self.keywords.id, WidgetType::Checkbox),
                        question(4, "Start", self.started.id, WidgetType::Date),
                        license,
                    ],
                )),
            ],
        };
        let data = Section {
            id: Uuid::new_v4(),
            order: 1,
            title: LocalizedText::new("Data", "Daten"),
            entities: vec![QuestionEntity::Set(question_set(
                0,
                "Datasets",
                Some(self.dataset.id),
                true,
                vec![question(0, "Size", self.dataset_size.id, WidgetType::Range)],
            ))],
        };
        let funding = Section {
            id: Uuid::new_v4(),
            order: 2,
            title: LocalizedText::uniform("Funding"),
            entities: vec![QuestionEntity::Set(question_set(
                0,
                "Funders",
                Some(self.funding.id),
                true,
                vec![question(0, "Funder", self.funding_name.id, WidgetType::Text)],
            ))],
        };
        let empty = Section {
            id: Uuid::new_v4(),
            order: 3,
            title: LocalizedText::uniform("Ethics"),
            entities: vec![QuestionEntity::Set(question_set(
                0,
                "Review",
                None,
                false,
                vec![question(0, "Board", Uuid::new_v4(), WidgetType::Text)],
            ))],
        };

        Catalog {
            id: Uuid::new_v4(),
            key: "default".to_string(),
            title: LocalizedText::uniform("Default"),
            sections: vec![empty, funding, data, general],
        }
    }
}

fn option(order: i64, key: &str, en: &str, de: &str, additional_input: bool) -> AnswerOption {
    AnswerOption {
        id: Uuid::new_v4(),
        order,
        key: key.to_string(),
        text: LocalizedText::new(en, de),
        additional_input,
    }
}

fn question(order: i64, text: &str, attribute_id: AttributeId, widget_type: WidgetType) -> Question {
    Question {
        id: Uuid::new_v4(),
        order,
        text: LocalizedText::new(text, format!("{text} (de)")),
        attribute_id,
        widget_type,
        is_collection: false,
        options: Vec::new(),
    }
}

fn question_set(
    order: i64,
    title: &str,
    attribute_id: Option<AttributeId>,
    is_collection: bool,
    questions: Vec<Question>,
) -> QuestionSet {
    QuestionSet {
        id: Uuid::new_v4(),
        order,
        title: LocalizedText::uniform(title),
        attribute_id,
        is_collection,
        questions,
    }
}

fn plain_questions(content: &QuestionSetContent) -> &[QuestionAnswers] {
    match content {
        QuestionSetContent::Questions { questions } => questions,
        QuestionSetContent::Sets { .. } => panic!("expected plain questions"),
    }
}

fn texts(questions: &[QuestionAnswers]) -> Vec<&str> {
    questions.iter().map(|question| question.text.as_str()).collect()
}

#[test]
fn missing_catalog_yields_empty_tree() {
    let fixture = Fixture::new();
    let project_id = Uuid::new_v4();
    let values = vec![Value::text(project_id, fixture.title.id, 0, 0, "Atlas")];

    let tree = get_answers_tree(None, &fixture.domain(), &values, Locale::En).unwrap();

    assert!(tree.is_empty());
    assert_eq!(serde_json::to_value(&tree).unwrap(), serde_json::json!({ "sections": [] }));
}

#[test]
fn no_values_yield_empty_tree() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &[], Locale::En).unwrap();

    assert_eq!(tree, AnswersTree::default());
}

#[test]
fn report_follows_catalog_order_and_omits_unanswered_entries() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.title.id, 0, 0, "Atlas"),
        Value::text(project_id, fixture.open.id, 0, 0, "1"),
        Value::text(project_id, fixture.funding_name.id, 0, 0, "DFG"),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let titles: Vec<_> = tree.sections.iter().map(|section| section.title.as_str()).collect();
    assert_eq!(titles, vec!["General", "Funding"]);

    let general = &tree.sections[0];
    assert_eq!(general.questionsets.len(), 2);
    let basics = &general.questionsets[0];
    assert_eq!(basics.title.as_deref(), Some("Basics"));
    assert_eq!(basics.attribute, None);
    assert!(!basics.is_collection);
    assert_eq!(texts(plain_questions(&basics.content)), vec!["Title"]);

    let leaf = &general.questionsets[1];
    assert_eq!(leaf.title, None);
    assert_eq!(leaf.attribute.as_deref(), Some("project/open"));
    let open = &plain_questions(&leaf.content)[0];
    assert_eq!(open.answers, vec!["yes"]);
    assert_eq!(open.attribute.as_deref(), Some("project/open"));
}

#[test]
fn checkbox_questions_render_as_collections_in_collection_order() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.keywords.id, 0, 2, "ontology"),
        Value::text(project_id, fixture.title.id, 0, 0, "Atlas"),
        Value::text(project_id, fixture.keywords.id, 0, 0, "graphs"),
        Value::text(project_id, fixture.keywords.id, 0, 1, "   "),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let questions = plain_questions(&tree.sections[0].questionsets[0].content);
    assert_eq!(texts(questions), vec!["Keywords", "Title"]);
    assert!(questions[0].is_collection);
    assert_eq!(questions[0].answers, vec!["graphs", "ontology"]);
    assert!(!questions[1].is_collection);
}

#[test]
fn labelled_sets_follow_label_discovery_order() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.dataset_id.id, 1, 0, "Raw images"),
        Value::text(project_id, fixture.dataset_id.id, 0, 0, "Processed"),
        Value::text(project_id, fixture.dataset_id.id, 2, 0, "Never filled"),
        Value::new(
            project_id,
            fixture.dataset_size.id,
            0,
            0,
            ValuePayload::Quantity {
                amount: 2.5,
                unit: None,
            },
        ),
        Value::new(
            project_id,
            fixture.dataset_size.id,
            1,
            0,
            ValuePayload::Quantity {
                amount: 40.0,
                unit: Some("TB".to_string()),
            },
        ),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let data = &tree.sections[0];
    assert_eq!(data.title, "Data");
    let datasets = &data.questionsets[0];
    assert!(datasets.is_collection);
    assert_eq!(datasets.attribute.as_deref(), Some("project/dataset"));
    let QuestionSetContent::Sets { sets } = &datasets.content else {
        panic!("expected repeated sets");
    };
    let ids: Vec<_> = sets.iter().map(|set| set.id.as_str()).collect();
    assert_eq!(ids, vec!["Raw images", "Processed"]);
    assert_eq!(sets[0].questions[0].answers, vec!["40 TB"]);
    assert_eq!(sets[1].questions[0].answers, vec!["2.5 GB"]);
}

#[test]
fn unlabelled_sets_stop_at_first_gap() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.funding_name.id, 0, 0, "DFG"),
        Value::text(project_id, fixture.funding_name.id, 1, 0, "ERC"),
        Value::text(project_id, fixture.funding_name.id, 3, 0, "BMBF"),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let QuestionSetContent::Sets { sets } = &tree.sections[0].questionsets[0].content else {
        panic!("expected repeated sets");
    };
    let ids: Vec<_> = sets.iter().map(|set| set.id.as_str()).collect();
    assert_eq!(ids, vec!["#0", "#1"]);
    assert_eq!(sets[1].questions[0].answers, vec!["ERC"]);
}

#[test]
fn sparse_unlabelled_sets_surface_only_the_leading_run() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.funding_name.id, 2, 0, "ERC"),
        Value::text(project_id, fixture.funding_name.id, 0, 0, "DFG"),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let QuestionSetContent::Sets { sets } = &tree.sections[0].questionsets[0].content else {
        panic!("expected repeated sets");
    };
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].id, "#0");
    assert_eq!(sets[0].questions[0].answers, vec!["DFG"]);
}

#[test]
fn german_locale_translates_texts_dates_and_yes_no() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.started.id, 0, 0, "2024-03-07"),
        Value::text(project_id, fixture.open.id, 0, 0, "false"),
        Value::new(
            project_id,
            fixture.license.id,
            0,
            0,
            ValuePayload::Option {
                option_id: fixture.cc_license.id,
                text: None,
            },
        ),
        Value::new(
            project_id,
            fixture.license.id,
            0,
            1,
            ValuePayload::Option {
                option_id: fixture.other_license.id,
                text: Some("WTFPL".to_string()),
            },
        ),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::De).unwrap();

    let general = &tree.sections[0];
    assert_eq!(general.title, "Allgemein");
    let questions = plain_questions(&general.questionsets[0].content);
    assert_eq!(texts(questions), vec!["License (de)", "Start (de)"]);
    assert_eq!(questions[0].answers, vec!["CC BY 4.0", "Andere: WTFPL"]);
    assert_eq!(questions[1].answers, vec!["07.03.2024"]);
    assert_eq!(
        plain_questions(&general.questionsets[1].content)[0].answers,
        vec!["nein"]
    );

    let english = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();
    let questions = plain_questions(&english.sections[0].questionsets[0].content);
    assert_eq!(questions[1].answers, vec!["2024-03-07"]);
}

#[test]
fn malformed_yes_no_value_is_an_error() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let broken = Value::text(project_id, fixture.open.id, 0, 0, "maybe");
    let broken_id = broken.id;

    let err = get_answers_tree(Some(&catalog), &fixture.domain(), &[broken], Locale::En)
        .unwrap_err();

    assert_eq!(
        err,
        AnswerError::InvalidBooleanValue {
            value_id: broken_id,
            text: "maybe".to_string(),
        }
    );
}

#[test]
fn values_without_attribute_are_ignored() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let mut orphan = Value::text(Uuid::new_v4(), fixture.title.id, 0, 0, "lost");
    orphan.attribute_id = None;

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &[orphan], Locale::En).unwrap();

    assert!(tree.is_empty());
}

#[test]
fn serialized_tree_distinguishes_plain_and_repeated_sets() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.open.id, 0, 0, "1"),
        Value::text(project_id, fixture.funding_name.id, 0, 0, "DFG"),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();
    let json = serde_json::to_value(&tree).unwrap();

    let leaf = &json["sections"][0]["questionsets"][0];
    assert!(leaf.get("title").is_none());
    assert_eq!(leaf["questions"][0]["answers"], serde_json::json!(["yes"]));
    assert_eq!(leaf["is_collection"], serde_json::json!(false));

    let funders = &json["sections"][1]["questionsets"][0];
    assert_eq!(funders["title"], serde_json::json!("Funders"));
    assert_eq!(funders["attribute"], serde_json::json!("project/funding"));
    assert_eq!(funders["sets"][0]["id"], serde_json::json!("#0"));
    assert!(funders.get("questions").is_none());
}

#[test]
fn unsorted_sections_are_walked_by_order() {
    let fixture = Fixture::new();
    let section = |order: i64, title: &str, attribute_id: AttributeId| Section {
        id: Uuid::new_v4(),
        order,
        title: LocalizedText::uniform(title),
        entities: vec![QuestionEntity::Leaf(question(
            0,
            title,
            attribute_id,
            WidgetType::Text,
        ))],
    };
    let catalog = Catalog {
        id: Uuid::new_v4(),
        key: "unsorted".to_string(),
        title: LocalizedText::uniform("Unsorted"),
        sections: vec![
            section(2, "second", fixture.keywords.id),
            section(1, "first", fixture.title.id),
        ],
    };
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::text(project_id, fixture.keywords.id, 0, 0, "maps"),
        Value::text(project_id, fixture.title.id, 0, 0, "Atlas"),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let titles: Vec<_> = tree.sections.iter().map(|section| section.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second"]);
}

#[test]
fn unresolvable_option_drops_only_that_answer() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    let project_id = Uuid::new_v4();
    let values = vec![
        Value::new(
            project_id,
            fixture.license.id,
            0,
            0,
            ValuePayload::Option {
                option_id: Uuid::new_v4(),
                text: None,
            },
        ),
        Value::text(project_id, fixture.title.id, 0, 0, "kept answer"),
    ];

    let tree = get_answers_tree(Some(&catalog), &fixture.domain(), &values, Locale::En).unwrap();

    let basics = plain_questions(&tree.sections[0].questionsets[0].content);
    assert_eq!(texts(basics), vec!["Title"]);
    assert_eq!(basics[0].answers, vec!["kept answer"]);
}
