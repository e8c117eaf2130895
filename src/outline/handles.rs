//! Identity handles for host-owned objects.
//!
//! Every handle names exactly one object instance. Two materials with the same
//! shader and properties still get distinct `MaterialId`s, so comparing handles
//! is identity comparison, never content comparison.

use std::collections::HashSet;

macro_rules! identity_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);
    };
}

identity_handle!(
    /// A scene object that draws with a list of material slots.
    RendererId
);
identity_handle!(
    /// A material instance.
    MaterialId
);
identity_handle!(
    /// A shader program the host can instantiate materials from.
    ShaderId
);
identity_handle!(
    /// A texture or render target.
    TextureId
);
identity_handle!(
    /// A camera object.
    CameraId
);

/// Ordered set of materials that mark a renderer as outlined.
///
/// Keeps the configured order for logging while membership tests go through a
/// hash set keyed by handle identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMaterialSet {
    ordered: Vec<MaterialId>,
    members: HashSet<MaterialId>,
}

impl TargetMaterialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material. Duplicates are ignored.
    pub fn insert(&mut self, material: MaterialId) -> bool {
        if self.members.insert(material) {
            self.ordered.push(material);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, material: MaterialId) -> bool {
        self.members.contains(&material)
    }

    /// True if any slot in `slots` is one of the target materials.
    pub fn matches_any(&self, slots: &[MaterialId]) -> bool {
        slots.iter().any(|slot| self.contains(*slot))
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.ordered.iter().copied()
    }
}

impl FromIterator<MaterialId> for TargetMaterialSet {
    fn from_iter<I: IntoIterator<Item = MaterialId>>(iter: I) -> Self {
        let mut set = Self::new();
        for material in iter {
            set.insert(material);
        }
        set
    }
}
