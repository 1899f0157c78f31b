//! Registry trait for self-registering implementations.

/// Declares the configuration name and factory of a pluggable implementation.
///
/// Every backend module (commerce platform, storage) exposes a `Registry`
/// type implementing this trait, so the service can build its factory map
/// from the names used under `[<section>.implementations.<name>]`.
pub trait ImplementationRegistry {
	/// Key of the implementation in configuration, e.g. `"shopify"`.
	const NAME: &'static str;

	/// Factory function type of the section this implementation belongs to.
	type Factory;

	fn factory() -> Self::Factory;
}
