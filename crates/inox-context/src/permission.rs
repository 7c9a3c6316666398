//! Granted/forbidden permissions over host side effects (§3 Context, §4.3
//! "Permissions compose by kind ... and entity").

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Read,
    Write,
    Create,
    Delete,
    Update,
}

/// What a permission applies to. A `Path` entry ending in `...` covers
/// itself and everything under it (§4.3 "read-permission over `/...`
/// implies read on any path").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionEntity {
    Path(String),
    Host(String),
    Command(Vec<String>),
}

impl PermissionEntity {
    fn allows(&self, requested: &PermissionEntity) -> bool {
        match (self, requested) {
            (PermissionEntity::Path(granted), PermissionEntity::Path(wanted)) => {
                match granted.strip_suffix("...") {
                    Some(prefix) => wanted.starts_with(prefix),
                    None => granted == wanted,
                }
            }
            (PermissionEntity::Host(granted), PermissionEntity::Host(wanted)) => granted == wanted,
            (PermissionEntity::Command(granted), PermissionEntity::Command(wanted)) => {
                wanted.starts_with(granted.as_slice())
            }
            _ => false,
        }
    }
}

impl fmt::Display for PermissionEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionEntity::Path(p) => write!(f, "path {p}"),
            PermissionEntity::Host(h) => write!(f, "host {h}"),
            PermissionEntity::Command(c) => write!(f, "command {}", c.join(" ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub kind: PermissionKind,
    pub entity: PermissionEntity,
}

impl Permission {
    pub fn new(kind: PermissionKind, entity: PermissionEntity) -> Self {
        Self { kind, entity }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.kind, self.entity)
    }
}

/// A context's granted and forbidden permission lists. A request is allowed
/// iff some granted entry covers it and no forbidden entry does — checking
/// `forbidden` first means forbidding can never be overridden by a broader
/// grant, regardless of insertion order.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    granted: Vec<Permission>,
    forbidden: Vec<Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, p: Permission) -> Self {
        self.granted.push(p);
        self
    }

    pub fn forbid(mut self, p: Permission) -> Self {
        self.forbidden.push(p);
        self
    }

    pub fn has_permission(&self, requested: &Permission) -> bool {
        let covered_by = |list: &[Permission]| {
            list.iter()
                .any(|p| p.kind == requested.kind && p.entity.allows(&requested.entity))
        };
        !covered_by(&self.forbidden) && covered_by(&self.granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_prefix_grant_covers_nested_paths() {
        let set = PermissionSet::new().grant(Permission::new(
            PermissionKind::Read,
            PermissionEntity::Path("/data/...".to_string()),
        ));
        assert!(set.has_permission(&Permission::new(
            PermissionKind::Read,
            PermissionEntity::Path("/data/users/1".to_string())
        )));
        assert!(!set.has_permission(&Permission::new(
            PermissionKind::Write,
            PermissionEntity::Path("/data/users/1".to_string())
        )));
    }

    #[test]
    fn forbid_wins_over_a_broader_grant() {
        let set = PermissionSet::new()
            .grant(Permission::new(
                PermissionKind::Read,
                PermissionEntity::Path("/...".to_string()),
            ))
            .forbid(Permission::new(
                PermissionKind::Read,
                PermissionEntity::Path("/secrets/...".to_string()),
            ));
        assert!(set.has_permission(&Permission::new(
            PermissionKind::Read,
            PermissionEntity::Path("/data/x".to_string())
        )));
        assert!(!set.has_permission(&Permission::new(
            PermissionKind::Read,
            PermissionEntity::Path("/secrets/key".to_string())
        )));
    }
}
