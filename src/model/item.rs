use super::{EntityDef, FieldDef, Policy};

/// Named, described record. Open to every caller.
pub static ITEM: EntityDef = EntityDef {
    name: "Item",
    table: "items",
    path_segment: "items",
    fields: &[
        FieldDef::id(),
        FieldDef::text("name").max_length(100),
        FieldDef::text("description"),
    ],
    policy: Policy::OPEN,
};
