use super::{Access, EntityDef, FieldDef, Format, Policy};

/// Account record. Anyone may list, read and register; only admins may change or remove.
/// `is_active` is managed outside this API, so it is output only.
pub static USER: EntityDef = EntityDef {
    name: "User",
    table: "users",
    path_segment: "users",
    fields: &[
        FieldDef::id(),
        FieldDef::text("username").max_length(150).format(Format::Username).unique(),
        FieldDef::text("email").max_length(254).format(Format::Email),
        FieldDef::text("first_name").max_length(150).optional(),
        FieldDef::text("last_name").max_length(150).optional(),
        FieldDef::flag("is_active", true).read_only(),
    ],
    policy: Policy {
        list: Access::Any,
        create: Access::Any,
        retrieve: Access::Any,
        update: Access::Admin,
        partial_update: Access::Admin,
        destroy: Access::Admin,
    },
};
