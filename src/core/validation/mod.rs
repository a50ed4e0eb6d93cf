//! Parameter validation
//!
//! Rules live in [`validators`] as small reusable closures. A
//! [`ParamValidator`], obtained from
//! [`Context::validate`](crate::core::context::Context::validate), threads one
//! request parameter through a chain of rules and commits the result back to
//! the context.

pub mod param;
pub mod validators;

pub use param::ParamValidator;
