//! Three-state field updates for partial "update" actions.
//!
//! Update payloads distinguish "leave the field alone" from "clear it" from
//! "replace it". On the wire an absent field keeps, an explicit `null`
//! clears, and any other value sets. Fields using [`Patch`] must carry
//! `#[serde(default, skip_serializing_if = "Patch::is_keep")]` so the absent
//! case round-trips.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Update descriptor for a nullable field: keep, clear, or set.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Apply the patch to an optional field in place.
    pub fn apply_to(&self, field: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Patch::Keep => {}
            Patch::Clear => *field = None,
            Patch::Set(value) => *field = Some(value.clone()),
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Keep => serializer.serialize_none(),
            Patch::Clear => serializer.serialize_none(),
            Patch::Set(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<T>::deserialize(deserializer)?;
        Ok(match opt {
            None => Patch::Clear,
            Some(value) => Patch::Set(value),
        })
    }
}
