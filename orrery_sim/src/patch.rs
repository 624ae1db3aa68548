// Shallow-merge patch types.
//
// `update*` commands carry a patch: a struct mirroring the target entity with
// every field wrapped in `Option`. Present fields overwrite the target's value
// wholesale; absent fields are left alone. Nested structs are replaced, not
// merged; a patch that sets `position` replaces all three coordinates.
// Unknown keys fail deserialization.
//
// The `patch_struct!` macro generates the patch type plus `apply_to` and
// `is_empty`, so each entity module lists its patchable fields once. Fields
// that encode structure (a body's `parentId` and `children`, a group's
// `parentGroupId` and `children`) are deliberately absent from every patch:
// they are written only by `hierarchy.rs`. `BodyPatch` is written by hand
// because its variant payload is flattened like `Body`'s.
//
// See also: `body.rs`, `group.rs`, `field.rs` for the concrete patches,
// `reducer.rs` which applies them.

/// Generate a patch struct for `$target` with one `Option` per listed field.
macro_rules! patch_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $patch:ident for $target:ty {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase", default, deny_unknown_fields)]
        $vis struct $patch {
            $(
                $(#[$fmeta])*
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $patch {
            /// Overwrite every field present in the patch.
            pub fn apply_to(&self, target: &mut $target) {
                $(
                    if let Some(value) = &self.$field {
                        target.$field = value.clone();
                    }
                )*
            }

            /// True when the patch carries no fields at all.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )*
            }
        }
    };
}

pub(crate) use patch_struct;
