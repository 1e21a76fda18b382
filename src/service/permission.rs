//! Operation gate: entity policy vs. caller privilege.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::model::{Access, EntityDef, Operation};

pub fn authorize(entity: &EntityDef, op: Operation, caller: &Caller) -> Result<(), AppError> {
    match entity.policy.access(op) {
        Access::Any => Ok(()),
        Access::Admin if caller.is_admin() => Ok(()),
        Access::Admin => {
            tracing::warn!(entity = entity.name, operation = op.as_str(), "permission denied");
            Err(AppError::Forbidden(format!("{} {}", op.as_str(), entity.name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ITEM, USER};

    const ALL: [Operation; 6] = [
        Operation::List,
        Operation::Create,
        Operation::Retrieve,
        Operation::Update,
        Operation::PartialUpdate,
        Operation::Destroy,
    ];

    #[test]
    fn items_are_open_to_anonymous_callers() {
        for op in ALL {
            assert!(authorize(&ITEM, op, &Caller::Anonymous).is_ok());
        }
    }

    #[test]
    fn anonymous_user_mutations_are_forbidden() {
        for op in [Operation::Update, Operation::PartialUpdate, Operation::Destroy] {
            assert!(matches!(
                authorize(&USER, op, &Caller::Anonymous),
                Err(AppError::Forbidden(_))
            ));
        }
        for op in [Operation::List, Operation::Create, Operation::Retrieve] {
            assert!(authorize(&USER, op, &Caller::Anonymous).is_ok());
        }
    }

    #[test]
    fn admin_may_do_everything() {
        for op in ALL {
            assert!(authorize(&USER, op, &Caller::Admin).is_ok());
        }
    }
}
