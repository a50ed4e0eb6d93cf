//! Fluent validator bound to one request parameter

use super::validators;
use crate::core::context::Context;
use crate::core::error::{ServiceResult, ValidationError};
use serde_json::Value;

/// Validation chain for `ctx.params[name]`
///
/// Every failed rule is recorded on the validator and appended to the owning
/// context's validation errors. [`end`](Self::end) writes the (possibly
/// transformed) value back only when this chain recorded no error.
///
/// # Example
///
/// ```rust,ignore
/// ctx.validate("name").trim().not_empty(Some("ProviderNameCannotBeEmpty")).end();
/// ctx.ensure_valid()?;
/// ```
pub struct ParamValidator<'a> {
    ctx: &'a mut Context,
    name: String,
    value: Value,
    errors: Vec<String>,
}

impl<'a> ParamValidator<'a> {
    pub(crate) fn new(ctx: &'a mut Context, name: &str) -> Self {
        let value = ctx.params.get(name).cloned().unwrap_or(Value::Null);
        Self {
            ctx,
            name: name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current, possibly transformed, value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Errors recorded by this chain
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn no_error(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an error on the chain and on the context
    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.ctx.push_validation_error(message.clone());
        self.errors.push(message);
    }

    /// Run an arbitrary rule; `message` replaces the rule's default message
    pub fn check<R>(mut self, rule: R, message: Option<&str>) -> Self
    where
        R: Fn(&str, &Value) -> Result<(), String>,
    {
        if let Err(default) = rule(&self.name, &self.value) {
            self.add_error(message.map(str::to_string).unwrap_or(default));
        }
        self
    }

    /// Fail on null, empty string or empty list
    pub fn not_empty(self, message: Option<&str>) -> Self {
        self.check(validators::not_empty(), message)
    }

    /// Fail when a string value has fewer than `min` or more than `max` characters
    pub fn length(self, min: usize, max: usize, message: Option<&str>) -> Self {
        self.check(validators::string_length(min, max), message)
    }

    /// Fail when the value is present but not a number
    pub fn is_number(self, message: Option<&str>) -> Self {
        self.check(validators::is_number(), message)
    }

    /// Trim string content; no-op once the chain has an error
    pub fn trim(mut self) -> Self {
        if !self.no_error() {
            return self;
        }
        if let Value::String(s) = &mut self.value {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
        self
    }

    /// Commit the value to `ctx.params` if the chain has no error, and return it
    pub fn end(self) -> Value {
        if self.no_error() && !self.value.is_null() {
            self.ctx.params.insert(self.name, self.value.clone());
        }
        self.value
    }

    /// Fail with every message this chain recorded
    pub fn raise(self) -> ServiceResult<Value> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(ValidationError::new(self.errors).into())
        }
    }
}
