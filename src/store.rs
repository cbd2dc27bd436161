//! The parameter store.
//!
//! Holds one typed slot per 1-based position for a single statement.
//! Positions are sparse: the highest position set is the parameter count,
//! and positions below it that were never set report no class and render as
//! a NULL of unspecified type.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::coerce::{self, Binding};
use crate::error::{BindError, BindResult};
use crate::param::Parameter;
use crate::types::{CanonicalType, SqlType, TypedValue, Value};

/// Typed parameter slots for one statement.
#[derive(Debug, Default)]
pub struct ParameterStore {
    slots: BTreeMap<usize, Binding>,
    closed: bool,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `param` at `position`, replacing whatever was there.
    ///
    /// Rejected parameter kinds fail here and leave the slot untouched.
    pub fn set(&mut self, position: usize, param: Parameter) -> BindResult<()> {
        self.check(position)?;
        let binding = coerce::coerce(param)?;
        self.insert(position, binding);
        Ok(())
    }

    /// Bind a value that is already in backend form.
    pub fn set_typed(&mut self, position: usize, ty: CanonicalType, value: Value) -> BindResult<()> {
        self.check(position)?;
        if !value.matches(&ty) {
            return Err(BindError::InvalidValue(format!(
                "value {} is not of type {}",
                value, ty
            )));
        }
        let binding = Binding {
            class_name: Some(ty.class_name()),
            sql_type: Some(ty.sql_type()),
            canonical_type: Some(ty),
            value,
            type_name: None,
        };
        self.insert(position, binding);
        Ok(())
    }

    /// Bind NULL declared as `sql_type`.
    pub fn set_null(&mut self, position: usize, sql_type: SqlType) -> BindResult<()> {
        self.check(position)?;
        self.insert(position, coerce::null_binding(sql_type, None));
        Ok(())
    }

    /// Bind NULL declared as `sql_type` with a backend type name such as `INT64`.
    pub fn set_null_with_type_name(
        &mut self,
        position: usize,
        sql_type: SqlType,
        type_name: &str,
    ) -> BindResult<()> {
        self.check(position)?;
        self.insert(position, coerce::null_binding(sql_type, Some(type_name)));
        Ok(())
    }

    /// Bind `param` converted to the declared `sql_type`.
    pub fn set_object_as(
        &mut self,
        position: usize,
        param: Parameter,
        sql_type: SqlType,
    ) -> BindResult<()> {
        self.check(position)?;
        let binding = coerce::coerce_to(param, sql_type)?;
        self.insert(position, binding);
        Ok(())
    }

    /// Reset every slot to unset.
    ///
    /// Metadata obtained before the call is a snapshot and does not follow.
    pub fn clear(&mut self) -> BindResult<()> {
        if self.closed {
            return Err(BindError::Closed);
        }
        self.slots.clear();
        tracing::debug!("parameters cleared");
        Ok(())
    }

    /// Drop all slots and refuse further use.
    pub fn close(&mut self) {
        self.slots.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The highest position currently set, or 0.
    pub fn parameter_count(&self) -> usize {
        self.slots.keys().next_back().copied().unwrap_or(0)
    }

    /// Snapshot of the per-position metadata.
    pub fn describe(&self) -> BindResult<ParameterMetadata> {
        if self.closed {
            return Err(BindError::Closed);
        }
        let params = self
            .slots
            .iter()
            .map(|(&position, binding)| {
                let info = ParameterInfo {
                    position,
                    class_name: binding.class_name,
                    canonical_type: binding.canonical_type.clone(),
                    sql_type: binding.sql_type,
                    type_name: binding
                        .type_name
                        .clone()
                        .or_else(|| binding.canonical_type.as_ref().map(ToString::to_string)),
                };
                (position, info)
            })
            .collect();
        Ok(ParameterMetadata {
            count: self.parameter_count(),
            params,
        })
    }

    /// The backend parameter map, named `p1` to `p<count>`.
    pub fn render(&self) -> BindResult<NamedParameters> {
        if self.closed {
            return Err(BindError::Closed);
        }
        let params = (1..=self.parameter_count())
            .map(|position| {
                let value = match self.slots.get(&position) {
                    Some(binding) => TypedValue {
                        ty: binding.canonical_type.clone(),
                        value: binding.value.clone(),
                    },
                    None => TypedValue::untyped_null(),
                };
                (NamedParameters::name_for(position), value)
            })
            .collect();
        Ok(NamedParameters(params))
    }

    fn check(&self, position: usize) -> BindResult<()> {
        if self.closed {
            return Err(BindError::Closed);
        }
        if position == 0 {
            return Err(BindError::InvalidPosition(position));
        }
        Ok(())
    }

    fn insert(&mut self, position: usize, binding: Binding) {
        tracing::debug!(position, class = ?binding.class_name, "parameter set");
        self.slots.insert(position, binding);
    }
}

/// Metadata for one set position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub position: usize,
    pub class_name: Option<&'static str>,
    pub canonical_type: Option<CanonicalType>,
    pub sql_type: Option<SqlType>,
    pub type_name: Option<String>,
}

/// A snapshot of a parameter store's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterMetadata {
    count: usize,
    params: BTreeMap<usize, ParameterInfo>,
}

impl ParameterMetadata {
    pub fn parameter_count(&self) -> usize {
        self.count
    }

    pub fn info(&self, position: usize) -> Option<&ParameterInfo> {
        self.params.get(&position)
    }

    /// Reported class at `position`; `None` for unset positions.
    pub fn class_name(&self, position: usize) -> Option<&'static str> {
        self.info(position).and_then(|p| p.class_name)
    }

    pub fn canonical_type(&self, position: usize) -> Option<&CanonicalType> {
        self.info(position).and_then(|p| p.canonical_type.as_ref())
    }

    pub fn parameter_type(&self, position: usize) -> Option<SqlType> {
        self.info(position).and_then(|p| p.sql_type)
    }

    pub fn type_name(&self, position: usize) -> Option<&str> {
        self.info(position).and_then(|p| p.type_name.as_deref())
    }

    /// Every position in `1..=count`, with `None` for gaps.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&ParameterInfo>)> + '_ {
        (1..=self.count).map(move |position| (position, self.params.get(&position)))
    }
}

/// Parameters in backend form, in position order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamedParameters(Vec<(String, TypedValue)>);

impl NamedParameters {
    /// Backend parameter name for a 1-based position.
    pub fn name_for(position: usize) -> String {
        format!("p{}", position)
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
