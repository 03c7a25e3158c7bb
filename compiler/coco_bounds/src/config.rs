//! Naming conventions shared by every pass.

use coco_ir::Function;

/// Conventions the bounds checker relies on.
///
/// The defaults match the runtime library: helpers are prefixed `__coco`,
/// the check primitive is `__coco_check_bounds`, and the program entry
/// point is `main`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundsConfig {
    /// Entry function. Never cloned; its parameters are sized by its
    /// first argument.
    pub entry_name: String,
    /// Functions whose name starts with this prefix are runtime helpers
    /// and are never instrumented.
    pub runtime_prefix: String,
    /// Runtime primitive `(offset: int, size: int) -> void`.
    pub check_fn: String,
    /// Appended to a function's name to name its clone.
    pub clone_suffix: String,
    /// Appended to a pointer parameter's name to name its size parameter.
    pub size_suffix: String,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            entry_name: "main".to_owned(),
            runtime_prefix: "__coco".to_owned(),
            check_fn: "__coco_check_bounds".to_owned(),
            clone_suffix: "_clone".to_owned(),
            size_suffix: "_size".to_owned(),
        }
    }
}

impl BoundsConfig {
    /// Whether `func` should receive bounds checks and size propagation.
    ///
    /// Declarations have no body to instrument, and runtime helpers must
    /// not check their own accesses.
    pub fn should_instrument(&self, func: &Function) -> bool {
        !func.is_declaration() && !func.name.starts_with(&self.runtime_prefix)
    }

    #[inline]
    pub fn is_entry(&self, func: &Function) -> bool {
        func.name == self.entry_name
    }

    pub fn clone_name(&self, original: &str) -> String {
        format!("{original}{}", self.clone_suffix)
    }

    pub fn size_param_name(&self, pointer_param: &str) -> String {
        format!("{pointer_param}{}", self.size_suffix)
    }

    /// Whether `candidate` is a size parameter name for `pointer_param`:
    /// the base name, or the base name with a `.N` disambiguator.
    pub fn is_size_param_name(&self, pointer_param: &str, candidate: &str) -> bool {
        let base = self.size_param_name(pointer_param);
        match candidate.strip_prefix(base.as_str()) {
            Some("") => true,
            Some(rest) => rest
                .strip_prefix('.')
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
            None => false,
        }
    }
}

/// `base`, or the first of `base.1`, `base.2`, ... that is not `taken`.
pub(crate) fn fresh_name(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}.{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
