//! Template substitution context.
//!
//! A [`BuildContext`] is an ordered placeholder → value map built fresh for
//! every render call. A [`ContextRequest`] carries the caller's inputs; the
//! distro turns one into the other (see [`crate::distro::Distro::template_context`]).

use std::collections::BTreeMap;

/// Tag used when none is given.
pub const DEFAULT_TAG: &str = "devel";

/// Inputs to context building.
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    pub host_arch: Option<String>,
    pub client_arch: Option<String>,
    pub tag: Option<String>,
    /// Arbitrary extra keys, passed through unless a computed field overrides them.
    pub extra: BTreeMap<String, String>,
}

impl ContextRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host_arch(mut self, arch: &str) -> Self {
        self.host_arch = Some(arch.to_string());
        self
    }

    pub fn client_arch(mut self, arch: &str) -> Self {
        self.client_arch = Some(arch.to_string());
        self
    }

    pub fn tag(mut self, tag: Option<&str>) -> Self {
        self.tag = tag.map(str::to_string);
        self
    }

    pub fn extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Tag with the `devel` default applied; an empty tag counts as missing.
    pub fn effective_tag(&self) -> &str {
        match self.tag.as_deref() {
            Some(tag) if !tag.is_empty() => tag,
            _ => DEFAULT_TAG,
        }
    }
}

/// Placeholder values for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildContext {
    values: BTreeMap<String, String>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value; later writes win.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert to a Tera context for rendering.
    pub(crate) fn to_tera(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        for (key, value) in &self.values {
            ctx.insert(key.as_str(), value);
        }
        ctx
    }
}

impl From<BTreeMap<String, String>> for BuildContext {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_tag_defaults() {
        assert_eq!(ContextRequest::new().effective_tag(), "devel");
        assert_eq!(ContextRequest::new().tag(Some("")).effective_tag(), "devel");
        assert_eq!(ContextRequest::new().tag(Some("v1")).effective_tag(), "v1");
    }

    #[test]
    fn test_set_overwrites() {
        let mut ctx = BuildContext::new();
        ctx.set("tag", "a");
        ctx.set("tag", "b");
        assert_eq!(ctx.get("tag"), Some("b"));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_iter_is_key_ordered() {
        let mut ctx = BuildContext::new();
        assert!(ctx.is_empty());

        ctx.set("tag", "devel");
        ctx.set("distro", "archlinux");
        ctx.set("host_arch", "amd64");

        assert!(!ctx.is_empty());
        let pairs: Vec<(&str, &str)> = ctx.iter().collect();
        assert_eq!(
            pairs,
            vec![("distro", "archlinux"), ("host_arch", "amd64"), ("tag", "devel")]
        );
    }

    #[test]
    fn test_to_tera_carries_values() {
        let mut ctx = BuildContext::new();
        ctx.set("distro", "archlinux");
        let tera_ctx = ctx.to_tera();
        assert!(tera_ctx.contains_key("distro"));
        assert!(!tera_ctx.contains_key("tag"));
    }
}
