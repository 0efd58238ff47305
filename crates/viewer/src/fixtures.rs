//! Catalog and entity builders shared by the unit tests, plus a local
//! server for axum mock backends.

use catalog::{CatalogIndex, Category, EnumOption, Family, Field, FieldKind, Form, Tag};
use foundation::Id;
use protocol::{FetchedEntity, PublicEntity};

pub fn family(id: &str, sort_order: i32, fields: Vec<Field>) -> Family {
    Family {
        id: Id::from(id),
        title: id.to_uppercase(),
        icon_hash: None,
        sort_order,
        entity_form: Form {
            title: String::new(),
            fields,
        },
        comment_form: Form {
            title: String::new(),
            fields: vec![],
        },
        version: 1,
    }
}

pub fn category(id: &str, family_id: &str, default_status: bool) -> Category {
    Category {
        id: Id::from(id),
        title: id.to_string(),
        family_id: Id::from(family_id),
        default_status,
        icon_hash: None,
        fill_color: "#aabbcc".to_string(),
        border_color: "#112233".to_string(),
        version: 1,
    }
}

pub fn tag(id: &str, is_filter: bool, default_filter_status: bool) -> Tag {
    Tag {
        id: Id::from(id),
        title: id.to_string(),
        is_filter,
        default_filter_status,
        filter_description: None,
        fill_color: "#aabbcc".to_string(),
        border_color: "#112233".to_string(),
        version: 1,
    }
}

pub fn enum_field(key: &str, multiple: bool, indexed: bool, privately_indexed: bool) -> Field {
    let options = vec![
        EnumOption {
            value: "a".into(),
            label: "A".into(),
            hidden: false,
        },
        EnumOption {
            value: "b".into(),
            label: "B".into(),
            hidden: false,
        },
    ];
    Field {
        key: key.to_string(),
        display_name: key.to_string(),
        help: None,
        mandatory: false,
        user_facing: true,
        indexed,
        privately_indexed,
        form_page: 1,
        form_weight: 0,
        display_weight: 0,
        kind: if multiple {
            FieldKind::EnumMultiOption { options }
        } else {
            FieldKind::EnumSingleOption { options }
        },
    }
}

/// Families A and B; A has `a1` (on) and `a2` (off), B has `b1` (on) and
/// the disallowed `b2`. Tags `t1` defaults to indifferent, `t2` to hidden,
/// `t3` is not a filter and `t4` is not allowed.
pub fn catalog() -> CatalogIndex {
    CatalogIndex::new(
        vec![
            family("b", 2, vec![enum_field("kind", false, true, false)]),
            family(
                "a",
                1,
                vec![
                    enum_field("services", true, true, false),
                    enum_field("secret", true, true, true),
                    enum_field("unindexed", true, false, false),
                ],
            ),
        ],
        vec![
            category("a1", "a", true),
            category("a2", "a", false),
            category("b1", "b", true),
            category("b2", "b", true),
        ],
        vec![
            tag("t1", true, true),
            tag("t2", true, false),
            tag("t3", false, true),
            tag("t4", true, true),
        ],
        ["a1", "a2", "b1"].map(Id::from),
        ["t1", "t2", "t3"].map(Id::from),
    )
}

pub fn fetched(id: &str, category_id: &str, tags: &[&str]) -> FetchedEntity {
    FetchedEntity {
        entity: PublicEntity {
            id: Id::from(id),
            family_id: Id::from("a"),
            category_id: Id::from(category_id),
            display_name: id.to_string(),
            tags: tags.iter().map(|t| Id::from(*t)).collect(),
            locations: vec![],
            data: serde_json::json!({}),
            created_at: None,
            updated_at: None,
        },
        comments: vec![],
        parents: vec![],
        children: vec![],
    }
}

/// Serves `app` on an ephemeral localhost port and returns its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
