//! Enforcement of "an unshareable mutable value must not cross a fiber
//! boundary" (§3 Invariants, §5). This is a run-time check performed at the
//! two places a value actually crosses a boundary — spawning a fiber with
//! captured arguments, and sending a value over a channel — rather than a
//! compile-time one; see DESIGN.md for why.

use crate::error::{ContextError, ContextResult};
use inox_value::Value;

pub fn ensure_shareable(value: &Value) -> ContextResult<()> {
    if value.is_shareable() {
        Ok(())
    } else {
        Err(ContextError::NotShareable {
            value_kind: value.kind().name(),
        })
    }
}

pub fn ensure_all_shareable<'a>(values: impl IntoIterator<Item = &'a Value>) -> ContextResult<()> {
    for v in values {
        ensure_shareable(v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_value::collections::ObjectData;

    #[test]
    fn unshared_object_is_rejected() {
        let obj = Value::Object(ObjectData::new(vec![]));
        assert!(ensure_shareable(&obj).is_err());
    }

    #[test]
    fn shared_object_is_accepted() {
        let obj = ObjectData::new(vec![]);
        obj.mark_shared();
        assert!(ensure_shareable(&Value::Object(obj)).is_ok());
    }

    #[test]
    fn immutable_scalar_is_always_shareable() {
        assert!(ensure_shareable(&Value::Int(1)).is_ok());
    }
}
