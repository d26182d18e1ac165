//! The code-review schema: users, pull requests and comments.

use serde_json::json;

use super::catalog::SchemaCatalog;
use super::types::{
    Cardinality, ComputedDef, DefaultValue, EntityDef, EnumDef, FieldDef, RelationDef, TraitDef,
};

pub const USER: &str = "User";
pub const PULL_REQUEST: &str = "PullRequest";
pub const COMMENT: &str = "Comment";

pub const AUTHORED: &str = "Authored";
pub const TEXT: &str = "Text";
pub const TIMESTAMPED: &str = "Timestamped";
/// Abstract link shape carrying `weight`
pub const TODO: &str = "todo";
pub const PR_STATUS: &str = "pr_status";

pub const AUTHOR: &str = "author";
pub const FOLLOWEES: &str = "followees";
pub const ASSIGNEES: &str = "assignees";
pub const COMMENTS: &str = "comments";

pub const STATUS_OPEN: &str = "Open";
pub const STATUS_MERGED: &str = "Merged";

/// Builds the catalog for the code-review object graph.
pub fn review_schema() -> SchemaCatalog {
    let traits = vec![
        TraitDef::new(AUTHORED).relation(AUTHOR, RelationDef::new(USER, Cardinality::One)),
        TraitDef::new(TEXT).field("body", FieldDef::required_string().non_empty()),
        TraitDef::new(TIMESTAMPED).field(
            "created_on",
            FieldDef::required_timestamp()
                .with_default(DefaultValue::Now)
                .write_once(),
        ),
        TraitDef::link(TODO).field("weight", FieldDef::optional_int16()),
    ];

    let enums = vec![EnumDef::new(PR_STATUS, &[STATUS_OPEN, STATUS_MERGED])];

    let entities = vec![
        EntityDef::new(USER)
            .field("login", FieldDef::required_string().unique())
            .field("firstname", FieldDef::required_string())
            .field("lastname", FieldDef::required_string())
            .computed(
                "fullname",
                ComputedDef::Concat {
                    sources: vec!["firstname".into(), "lastname".into()],
                    separator: " ".into(),
                },
            )
            .relation(FOLLOWEES, RelationDef::new(USER, Cardinality::Many))
            .relation(TODO, RelationDef::new(PULL_REQUEST, Cardinality::Many).via(TODO)),
        EntityDef::new(PULL_REQUEST)
            .with_trait(AUTHORED)
            .with_trait(TEXT)
            .with_trait(TIMESTAMPED)
            .field("title", FieldDef::required_string())
            .field(
                "status",
                FieldDef::required_enum(PR_STATUS)
                    .with_default(DefaultValue::Value(json!(STATUS_OPEN))),
            )
            .relation(ASSIGNEES, RelationDef::new(USER, Cardinality::Many))
            .relation(
                COMMENTS,
                RelationDef::new(COMMENT, Cardinality::AtLeastOne)
                    .exclusive()
                    .cascade_delete(),
            ),
        EntityDef::new(COMMENT)
            .with_trait(AUTHORED)
            .with_trait(TEXT)
            .with_trait(TIMESTAMPED),
    ];

    SchemaCatalog::from_definitions(traits, enums, entities)
}
