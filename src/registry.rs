//! Distribution registry.
//!
//! Built once at startup and passed by reference to whoever needs it.
//! Registration order is preserved and is the order every `*-all` command
//! walks.

use crate::distro::{ArchLinuxLike, DebianLike, Distro};
use crate::error::{Error, Result};

/// Registered distributions, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    distros: Vec<Distro>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The distributions shipped with this tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Distro::new("debian:buster", DebianLike));
        registry.register(Distro::new("archlinux", ArchLinuxLike));
        registry
    }

    /// Add a distribution. Re-registering a name replaces the earlier entry
    /// in place.
    pub fn register(&mut self, distro: Distro) {
        match self.distros.iter_mut().find(|d| d.name() == distro.name()) {
            Some(slot) => *slot = distro,
            None => self.distros.push(distro),
        }
    }

    /// Find a distribution by name.
    pub fn lookup(&self, name: &str) -> Result<&Distro> {
        self.distros
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| Error::UnknownDistribution {
                name: name.to_string(),
                known: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.distros.iter().map(Distro::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Distro> {
        self.distros.iter()
    }

    pub fn len(&self) -> usize {
        self.distros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distros.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let registry = Registry::builtin();
        assert_eq!(registry.names(), vec!["debian:buster", "archlinux"]);
    }

    #[test]
    fn test_lookup() {
        let registry = Registry::builtin();
        let distro = registry.lookup("archlinux").unwrap();
        assert_eq!(distro.slug(), "archlinux");
        assert_eq!(distro.host_archs(), &["amd64"]);
    }

    #[test]
    fn test_unknown_lists_every_name() {
        let mut registry = Registry::builtin();
        registry.register(Distro::new("debian:bullseye", DebianLike));

        let err = registry.lookup("gentoo").unwrap_err();
        let msg = err.to_string();
        for name in registry.names() {
            assert!(msg.contains(name), "{msg} missing {name}");
        }
        assert!(matches!(err, Error::UnknownDistribution { .. }));
    }

    #[test]
    fn test_register_last_write_wins_in_place() {
        let mut registry = Registry::builtin();
        registry.register(Distro::new("debian:buster", ArchLinuxLike));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["debian:buster", "archlinux"]);
        let replaced = registry.lookup("debian:buster").unwrap();
        assert_eq!(replaced.family().family_name(), "ArchLinuxLike");
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        let err = registry.lookup("archlinux").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported distro archlinux, choose from ");
    }
}
