//! Entity descriptors: the persisted shape of each resource, the rules its fields obey,
//! and which callers may run which operations on it.

mod item;
mod user;

pub use item::ITEM;
pub use user::USER;

/// Primary key column shared by every entity.
pub const PK: &str = "id";

/// Storage type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Storage-assigned BIGSERIAL identifier.
    Id,
    Text,
    Bool,
}

/// Extra shape checks applied to text values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Username,
}

/// Value stored when a create request leaves a field out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldDefault {
    None,
    Bool(bool),
    Text(&'static str),
}

#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Output only: ignored when present in a request body.
    pub read_only: bool,
    pub required: bool,
    pub allow_blank: bool,
    pub max_length: Option<usize>,
    pub format: Option<Format>,
    pub unique: bool,
    pub default: FieldDefault,
}

impl FieldDef {
    pub const fn id() -> Self {
        FieldDef {
            name: PK,
            kind: FieldKind::Id,
            read_only: true,
            required: false,
            allow_blank: false,
            max_length: None,
            format: None,
            unique: true,
            default: FieldDefault::None,
        }
    }

    /// Required, non-blank text.
    pub const fn text(name: &'static str) -> Self {
        FieldDef {
            name,
            kind: FieldKind::Text,
            read_only: false,
            required: true,
            allow_blank: false,
            max_length: None,
            format: None,
            unique: false,
            default: FieldDefault::None,
        }
    }

    pub const fn flag(name: &'static str, default: bool) -> Self {
        FieldDef {
            name,
            kind: FieldKind::Bool,
            read_only: false,
            required: false,
            allow_blank: false,
            max_length: None,
            format: None,
            unique: false,
            default: FieldDefault::Bool(default),
        }
    }

    /// Optional text that may be blank; stored as `''` when never supplied.
    pub const fn optional(self) -> Self {
        FieldDef {
            required: false,
            allow_blank: true,
            default: FieldDefault::Text(""),
            ..self
        }
    }

    pub const fn max_length(self, n: usize) -> Self {
        FieldDef {
            max_length: Some(n),
            ..self
        }
    }

    pub const fn format(self, format: Format) -> Self {
        FieldDef {
            format: Some(format),
            ..self
        }
    }

    pub const fn unique(self) -> Self {
        FieldDef { unique: true, ..self }
    }

    pub const fn read_only(self) -> Self {
        FieldDef {
            read_only: true,
            ..self
        }
    }
}

/// CRUD operations exposed for every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Retrieve => "retrieve",
            Operation::Update => "update",
            Operation::PartialUpdate => "partial_update",
            Operation::Destroy => "destroy",
        }
    }
}

/// Who may run an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Any,
    Admin,
}

#[derive(Clone, Copy, Debug)]
pub struct Policy {
    pub list: Access,
    pub create: Access,
    pub retrieve: Access,
    pub update: Access,
    pub partial_update: Access,
    pub destroy: Access,
}

impl Policy {
    pub const OPEN: Policy = Policy {
        list: Access::Any,
        create: Access::Any,
        retrieve: Access::Any,
        update: Access::Any,
        partial_update: Access::Any,
        destroy: Access::Any,
    };

    pub fn access(&self, op: Operation) -> Access {
        match op {
            Operation::List => self.list,
            Operation::Create => self.create,
            Operation::Retrieve => self.retrieve,
            Operation::Update => self.update,
            Operation::PartialUpdate => self.partial_update,
            Operation::Destroy => self.destroy,
        }
    }
}

#[derive(Debug)]
pub struct EntityDef {
    pub name: &'static str,
    pub table: &'static str,
    pub path_segment: &'static str,
    pub fields: &'static [FieldDef],
    pub policy: Policy,
}

impl EntityDef {
    /// Fields a request body may set.
    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.read_only)
    }
}

/// Every entity served by the router, in API-root order.
pub static ENTITIES: &[&EntityDef] = &[&ITEM, &USER];

pub fn entity_by_path(path_segment: &str) -> Option<&'static EntityDef> {
    ENTITIES.iter().copied().find(|e| e.path_segment == path_segment)
}
