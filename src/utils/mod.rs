pub(crate) mod serialize;
pub(crate) mod tracing;
