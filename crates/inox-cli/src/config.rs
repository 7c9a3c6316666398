//! `RunConfig`: the CLI's only on-disk configuration surface. Everything a
//! `Context` needs (`PermissionSet`, `Limits`) is built programmatically in
//! the library (§1 "no on-disk config format is in scope"), but the binary
//! itself accepts an optional TOML file so a `run` invocation doesn't have
//! to hardcode its grants, following the teacher's `compiler::config`
//! module shape (serde structs for the file, converted into the runtime's
//! own types rather than deserialized straight into them).

use inox_context::{Limits, Permission, PermissionEntity, PermissionKind, PermissionSet};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub permissions: Vec<PermissionFile>,
    #[serde(default)]
    pub limits: Vec<LimitFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionFile {
    pub kind: PermissionKindFile,
    pub entity: EntityFile,
    #[serde(default)]
    pub forbid: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKindFile {
    Read,
    Write,
    Create,
    Delete,
    Update,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityFile {
    Path(String),
    Host(String),
    Command(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitFile {
    pub name: String,
    pub capacity: u64,
    pub refill_per_second: u64,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, crate::error::CliError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn permission_set(&self) -> PermissionSet {
        let mut set = PermissionSet::new();
        for entry in &self.permissions {
            let permission = Permission::new(entry.kind.into(), entry.entity.clone().into());
            set = if entry.forbid {
                set.forbid(permission)
            } else {
                set.grant(permission)
            };
        }
        set
    }

    pub fn limits(&self) -> Limits {
        let mut limits = Limits::new();
        for entry in &self.limits {
            limits = limits.with_bucket(entry.name.clone(), entry.capacity, entry.refill_per_second);
        }
        limits
    }
}

impl From<PermissionKindFile> for PermissionKind {
    fn from(kind: PermissionKindFile) -> Self {
        match kind {
            PermissionKindFile::Read => PermissionKind::Read,
            PermissionKindFile::Write => PermissionKind::Write,
            PermissionKindFile::Create => PermissionKind::Create,
            PermissionKindFile::Delete => PermissionKind::Delete,
            PermissionKindFile::Update => PermissionKind::Update,
        }
    }
}

impl From<EntityFile> for PermissionEntity {
    fn from(entity: EntityFile) -> Self {
        match entity {
            EntityFile::Path(p) => PermissionEntity::Path(p),
            EntityFile::Host(h) => PermissionEntity::Host(h),
            EntityFile::Command(c) => PermissionEntity::Command(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_permissions_and_limits_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[permissions]]
            kind = "read"
            entity = {{ path = "/data/..." }}

            [[limits]]
            name = "network"
            capacity = 10
            refill_per_second = 2
            "#
        )
        .unwrap();
        let config = RunConfig::load(file.path()).unwrap();
        let permissions = config.permission_set();
        assert!(permissions.has_permission(&Permission::new(
            PermissionKind::Read,
            PermissionEntity::Path("/data/x".to_string())
        )));
        let limits = config.limits();
        assert_eq!(limits.get("network").unwrap().capacity, 10);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert!(config.permissions.is_empty());
        assert!(config.limits.is_empty());
    }
}
