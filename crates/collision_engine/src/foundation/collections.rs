//! Specialized collection types

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generation-checked handle to a collider owned by the collision manager
    ///
    /// A key stays valid while its collider lives; removing the collider
    /// invalidates the key instead of letting it alias a newer shape.
    pub struct ColliderKey;
}

/// Handle-based map of colliders with stable keys
pub type ColliderMap<T> = SlotMap<ColliderKey, T>;
