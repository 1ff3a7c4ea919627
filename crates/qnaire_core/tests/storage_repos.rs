use qnaire_core::db::open_db_in_memory;
use qnaire_core::model::catalog::{
    AnswerOption, Catalog, Question, QuestionEntity, QuestionSet, Section, WidgetType,
};
use qnaire_core::model::domain::{Attribute, AttributeValidationError, ValueType};
use qnaire_core::model::locale::LocalizedText;
use qnaire_core::model::value::{Project, Value, ValuePayload};
use qnaire_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use qnaire_core::repo::domain_repo::{DomainRepository, SqliteDomainRepository};
use qnaire_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use qnaire_core::repo::value_repo::{SqliteValueRepository, ValueRepository};
use qnaire_core::RepoError;
use uuid::Uuid;

fn question(order: i64, text: &str, attribute: &Attribute, widget_type: WidgetType) -> Question {
    Question {
        id: Uuid::new_v4(),
        order,
        text: LocalizedText::new(text, ""),
        attribute_id: attribute.id,
        widget_type,
        is_collection: false,
        options: Vec::new(),
    }
}

#[test]
fn domain_roundtrip_and_validation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDomainRepository::try_new(&conn).unwrap();

    let project = Attribute::new(None, "project", ValueType::Text);
    let mut dataset = Attribute::new(Some(project.id), "dataset", ValueType::Text);
    dataset.is_collection = true;
    let mut size = Attribute::new(Some(dataset.id), "size", ValueType::Float);
    size.unit = Some("GB".to_string());
    for attribute in [&project, &dataset, &size] {
        repo.create_attribute(attribute).unwrap();
    }

    let domain = repo.load_domain().unwrap();
    assert_eq!(domain.len(), 3);
    assert_eq!(domain.path(size.id).as_deref(), Some("project/dataset/size"));
    assert_eq!(domain.get(size.id).unwrap().unit.as_deref(), Some("GB"));
    assert!(domain.get(dataset.id).unwrap().is_collection);
    assert_eq!(
        domain.find_by_path("project/dataset").map(|attribute| attribute.id),
        Some(dataset.id)
    );

    let invalid = Attribute::new(None, "a/b", ValueType::Text);
    match repo.create_attribute(&invalid).unwrap_err() {
        RepoError::Validation(AttributeValidationError::KeyContainsSlash(key)) => {
            assert_eq!(key, "a/b")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn catalog_loads_sorted_with_derived_set_flags() {
    let conn = open_db_in_memory().unwrap();
    let domain_repo = SqliteDomainRepository::try_new(&conn).unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let project = Attribute::new(None, "project", ValueType::Text);
    let title = Attribute::new(Some(project.id), "title", ValueType::Text);
    let license = Attribute::new(Some(project.id), "license", ValueType::Option);
    let mut dataset = Attribute::new(Some(project.id), "dataset", ValueType::Text);
    dataset.is_collection = true;
    let name = Attribute::new(Some(dataset.id), "name", ValueType::Text);
    for attribute in [&project, &title, &license, &dataset, &name] {
        domain_repo.create_attribute(attribute).unwrap();
    }

    let mut license_question = question(0, "License", &license, WidgetType::Select);
    license_question.options = vec![
        AnswerOption {
            id: Uuid::new_v4(),
            order: 2,
            key: "other".to_string(),
            text: LocalizedText::new("Other", "Andere"),
            additional_input: true,
        },
        AnswerOption {
            id: Uuid::new_v4(),
            order: 1,
            key: "cc0".to_string(),
            text: LocalizedText::uniform("CC0"),
            additional_input: false,
        },
    ];

    let catalog = Catalog {
        id: Uuid::new_v4(),
        key: "rdmo".to_string(),
        title: LocalizedText::new("RDMO", "RDMO"),
        sections: vec![
            Section {
                id: Uuid::new_v4(),
                order: 2,
                title: LocalizedText::uniform("Data"),
                entities: vec![QuestionEntity::Set(QuestionSet {
                    id: Uuid::new_v4(),
                    order: 0,
                    title: LocalizedText::uniform("Datasets"),
                    attribute_id: Some(dataset.id),
                    // Derived from the attribute on load.
                    is_collection: false,
                    questions: vec![question(0, "Name", &name, WidgetType::Text)],
                })],
            },
            Section {
                id: Uuid::new_v4(),
                order: 1,
                title: LocalizedText::new("General", "Allgemein"),
                entities: vec![
                    QuestionEntity::Leaf(license_question),
                    QuestionEntity::Set(QuestionSet {
                        id: Uuid::new_v4(),
                        order: -1,
                        title: LocalizedText::uniform("Basics"),
                        attribute_id: None,
                        is_collection: false,
                        questions: vec![question(0, "Title", &title, WidgetType::Textarea)],
                    }),
                ],
            },
        ],
    };
    catalog_repo.create_catalog(&catalog).unwrap();

    let loaded = catalog_repo.load_catalog(catalog.id).unwrap().unwrap();
    assert_eq!(loaded.key, "rdmo");
    let titles: Vec<_> = loaded
        .sections
        .iter()
        .map(|section| section.title.en.as_str())
        .collect();
    assert_eq!(titles, vec!["General", "Data"]);
    assert_eq!(loaded.sections[0].title.de, "Allgemein");

    let general = &loaded.sections[0].entities;
    match (&general[0], &general[1]) {
        (QuestionEntity::Set(basics), QuestionEntity::Leaf(leaf)) => {
            assert_eq!(basics.title.en, "Basics");
            assert_eq!(basics.questions[0].widget_type, WidgetType::Textarea);
            let keys: Vec<_> = leaf.options.iter().map(|option| option.key.as_str()).collect();
            assert_eq!(keys, vec!["cc0", "other"]);
            assert!(leaf.options[1].additional_input);
        }
        other => panic!("unexpected entities: {other:?}"),
    }

    match &loaded.sections[1].entities[0] {
        QuestionEntity::Set(datasets) => {
            assert!(datasets.is_collection);
            assert_eq!(datasets.repeat_attribute(), Some(dataset.id));
        }
        other => panic!("unexpected entity: {other:?}"),
    }

    assert!(catalog_repo.load_catalog(Uuid::new_v4()).unwrap().is_none());

    let all_options = catalog_repo.load_options().unwrap();
    let mut option_keys: Vec<_> = all_options.iter().map(|option| option.key.as_str()).collect();
    option_keys.sort_unstable();
    assert_eq!(option_keys, vec!["cc0", "other"]);
    assert!(all_options.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[test]
fn save_value_replaces_the_same_slot_and_keeps_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let domain_repo = SqliteDomainRepository::try_new(&conn).unwrap();
    let project_repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let value_repo = SqliteValueRepository::try_new(&conn).unwrap();

    let title = Attribute::new(None, "title", ValueType::Text);
    let size = Attribute::new(None, "size", ValueType::Float);
    let upload = Attribute::new(None, "upload", ValueType::File);
    for attribute in [&title, &size, &upload] {
        domain_repo.create_attribute(attribute).unwrap();
    }
    let project = Project::new("Atlas", None);
    project_repo.create_project(&project).unwrap();

    let first = Value::text(project.id, title.id, 0, 0, "draft");
    let first_id = value_repo.save_value(&first).unwrap();
    value_repo
        .save_value(&Value::new(
            project.id,
            size.id,
            0,
            0,
            ValuePayload::Quantity {
                amount: 1.5,
                unit: Some("TB".to_string()),
            },
        ))
        .unwrap();
    value_repo
        .save_value(&Value::new(
            project.id,
            upload.id,
            0,
            0,
            ValuePayload::File {
                name: "plan.pdf".to_string(),
            },
        ))
        .unwrap();

    let replaced_id = value_repo
        .save_value(&Value::text(project.id, title.id, 0, 0, "final"))
        .unwrap();
    assert_eq!(replaced_id, first_id);

    let values = value_repo.list_values(project.id, None).unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].id, first_id);
    assert_eq!(values[0].payload, ValuePayload::text("final"));
    assert_eq!(
        values[1].payload,
        ValuePayload::Quantity {
            amount: 1.5,
            unit: Some("TB".to_string()),
        }
    );
    assert_eq!(
        values[2].payload,
        ValuePayload::File {
            name: "plan.pdf".to_string()
        }
    );
    assert!(values.iter().all(|value| value.snapshot_id.is_none()));

    value_repo.delete_value(values[2].id).unwrap();
    assert_eq!(value_repo.list_values(project.id, None).unwrap().len(), 2);
    assert!(matches!(
        value_repo.delete_value(Uuid::new_v4()).unwrap_err(),
        RepoError::NotFound { entity: "value", .. }
    ));
}

#[test]
fn option_values_keep_selected_option_and_extra_text() {
    let conn = open_db_in_memory().unwrap();
    let domain_repo = SqliteDomainRepository::try_new(&conn).unwrap();
    let project_repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let value_repo = SqliteValueRepository::try_new(&conn).unwrap();

    let license = Attribute::new(None, "license", ValueType::Option);
    domain_repo.create_attribute(&license).unwrap();
    let project = Project::new("Atlas", None);
    project_repo.create_project(&project).unwrap();

    let option_id = Uuid::new_v4();
    let payload = ValuePayload::Option {
        option_id,
        text: Some("custom".to_string()),
    };
    value_repo
        .save_value(&Value::new(project.id, license.id, 0, 0, payload.clone()))
        .unwrap();

    let values = value_repo.list_values(project.id, None).unwrap();
    assert_eq!(values[0].payload, payload);
    assert_eq!(values[0].attribute_id, Some(license.id));
}

#[test]
fn snapshots_freeze_live_values() {
    let conn = open_db_in_memory().unwrap();
    let domain_repo = SqliteDomainRepository::try_new(&conn).unwrap();
    let project_repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let value_repo = SqliteValueRepository::try_new(&conn).unwrap();

    let title = Attribute::new(None, "title", ValueType::Text);
    domain_repo.create_attribute(&title).unwrap();
    let project = Project::new("Atlas", None);
    project_repo.create_project(&project).unwrap();
    value_repo
        .save_value(&Value::text(project.id, title.id, 0, 0, "v1"))
        .unwrap();

    let snapshot = project_repo.create_snapshot(project.id, "submitted").unwrap();
    assert_eq!(snapshot.project_id, project.id);
    assert_eq!(snapshot.title, "submitted");

    value_repo
        .save_value(&Value::text(project.id, title.id, 0, 0, "v2"))
        .unwrap();

    let frozen = value_repo.list_values(project.id, Some(snapshot.id)).unwrap();
    assert_eq!(frozen.len(), 1);
    assert_eq!(frozen[0].payload, ValuePayload::text("v1"));
    assert_eq!(frozen[0].snapshot_id, Some(snapshot.id));

    let live = value_repo.list_values(project.id, None).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].payload, ValuePayload::text("v2"));
    assert_ne!(live[0].id, frozen[0].id);

    let mut snapshot_write = frozen[0].clone();
    snapshot_write.payload = ValuePayload::text("tampered");
    assert!(matches!(
        value_repo.save_value(&snapshot_write).unwrap_err(),
        RepoError::SnapshotReadOnly(id) if id == snapshot.id
    ));

    let listed = project_repo.list_snapshots(project.id).unwrap();
    assert_eq!(listed, vec![snapshot.clone()]);
    assert_eq!(project_repo.get_snapshot(snapshot.id).unwrap(), Some(snapshot));
}

#[test]
fn project_catalog_assignment_and_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let project_repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let catalog = Catalog {
        id: Uuid::new_v4(),
        key: "empty".to_string(),
        title: LocalizedText::uniform("Empty"),
        sections: Vec::new(),
    };
    catalog_repo.create_catalog(&catalog).unwrap();

    let project = Project::new("Atlas", None);
    project_repo.create_project(&project).unwrap();
    project_repo.set_catalog(project.id, Some(catalog.id)).unwrap();
    assert_eq!(
        project_repo.get_project(project.id).unwrap().unwrap().catalog_id,
        Some(catalog.id)
    );

    assert!(project_repo.get_project(Uuid::new_v4()).unwrap().is_none());
    assert!(matches!(
        project_repo.set_catalog(Uuid::new_v4(), None).unwrap_err(),
        RepoError::NotFound {
            entity: "project",
            ..
        }
    ));
    assert!(matches!(
        project_repo.create_snapshot(Uuid::new_v4(), "x").unwrap_err(),
        RepoError::NotFound {
            entity: "project",
            ..
        }
    ));
}
