//! Reserved metadata keys.
//!
//! Names under the `qualia.` prefix are written by the built-in processors and
//! read by the qualifier algebra.

use crate::comparator::Comparator;
use crate::key::ExtensionKey;

/// Property name (`self` for bean qualifiers).
pub const NAME: ExtensionKey<String> = ExtensionKey::named("qualia.name");

/// Dotted property path (empty for bean qualifiers).
pub const PATH: ExtensionKey<String> = ExtensionKey::named("qualia.path");

/// Rendered value type.
pub const TYPE: ExtensionKey<String> = ExtensionKey::named("qualia.type");

/// Rendered generic arguments of the value type.
pub const GENERIC_ARGUMENTS: ExtensionKey<Vec<String>> = ExtensionKey::named("qualia.generic_arguments");

/// Human readable description, usually lifted from doc comments.
pub const DESCRIPTION: ExtensionKey<String> = ExtensionKey::named("qualia.description");

/// Name of the getter method.
pub const GETTER: ExtensionKey<String> = ExtensionKey::named("qualia.getter");

/// Name of the setter method.
pub const SETTER: ExtensionKey<String> = ExtensionKey::named("qualia.setter");

/// Name of the mutable accessor method.
pub const NAVIGATOR: ExtensionKey<String> = ExtensionKey::named("qualia.navigator");

/// Name of the comparable-comparator slot.
pub const COMPARATOR_NAME: &str = "qualia.comparator";

/// Name of the property-comparator slot.
pub const PROPERTY_COMPARATOR_NAME: &str = "qualia.property_comparator";

/// Comparator override for values of type `V`.
pub fn comparator<V>() -> ExtensionKey<Comparator<V>> {
	ExtensionKey::named(COMPARATOR_NAME)
}

/// Comparator override for a property, comparing owners of type `T`.
pub fn property_comparator<T>() -> ExtensionKey<Comparator<T>> {
	ExtensionKey::named(PROPERTY_COMPARATOR_NAME)
}
