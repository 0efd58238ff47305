use foundation::Id;
use serde::{Deserialize, Serialize};

/// Anything stored in a [`crate::Collection`].
pub trait Identified {
    fn id(&self) -> &Id;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub value: String,
    pub label: String,
    pub color: String,
}

/// Field type with its metadata.
///
/// On the wire the tag lives in `field_type` and the metadata in the sibling
/// `field_type_metadata` key; a metadata payload that does not match the tag is
/// rejected when the family is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field_type", content = "field_type_metadata")]
pub enum FieldKind {
    SingleLineText { format: String },
    MultiLineText,
    RichText,
    Number,
    Boolean,
    Date,
    DiscreteScore,
    EnumSingleOption { options: Vec<EnumOption> },
    EnumMultiOption { options: Vec<EnumOption> },
    EventList { event_types: Vec<EventType> },
}

impl FieldKind {
    pub fn is_enum(&self) -> bool {
        matches!(
            self,
            FieldKind::EnumSingleOption { .. } | FieldKind::EnumMultiOption { .. }
        )
    }

    pub fn enum_options(&self) -> Option<&[EnumOption]> {
        match self {
            FieldKind::EnumSingleOption { options } | FieldKind::EnumMultiOption { options } => {
                Some(options)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default = "default_true")]
    pub user_facing: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub privately_indexed: bool,
    #[serde(default)]
    pub form_page: u8,
    #[serde(default)]
    pub form_weight: u8,
    #[serde(default)]
    pub display_weight: u8,
    #[serde(flatten)]
    pub kind: FieldKind,
}

fn default_true() -> bool {
    true
}

impl Field {
    /// Enum fields the public map may be filtered on.
    pub fn is_public_enum_filter(&self) -> bool {
        self.kind.is_enum() && self.indexed && !self.privately_indexed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(default)]
    pub title: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: Id,
    pub title: String,
    #[serde(default)]
    pub icon_hash: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    pub entity_form: Form,
    pub comment_form: Form,
    #[serde(default)]
    pub version: i32,
}

impl Family {
    pub fn enum_filter_fields(&self) -> impl Iterator<Item = &Field> {
        self.entity_form
            .fields
            .iter()
            .filter(|f| f.is_public_enum_filter())
    }
}

impl Identified for Family {
    fn id(&self) -> &Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub title: String,
    pub family_id: Id,
    pub default_status: bool,
    #[serde(default)]
    pub icon_hash: Option<String>,
    pub fill_color: String,
    pub border_color: String,
    #[serde(default)]
    pub version: i32,
}

impl Identified for Category {
    fn id(&self) -> &Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub title: String,
    pub is_filter: bool,
    pub default_filter_status: bool,
    #[serde(default)]
    pub filter_description: Option<String>,
    pub fill_color: String,
    pub border_color: String,
    #[serde(default)]
    pub version: i32,
}

impl Identified for Tag {
    fn id(&self) -> &Id {
        &self.id
    }
}
