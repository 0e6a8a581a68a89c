//! Name to operator registry.
//!
//! A registry maps dotted names (`math.add`) to either a single operator
//! implementation or an [`OperatorFamily`], a set of backend overloads
//! dispatched on input qtypes. Entries are never removed.
//!
//! The process-wide instance lives behind [`OperatorRegistry::global`];
//! tests and embedders that want isolation can create their own with
//! [`OperatorRegistry::new`].
use std::collections::HashMap;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{
    error::{Error, Result},
    operator::{ExprOperator, OperatorPtr, is_valid_operator_name},
    qtype::{QType, format_qtypes},
};

/// A group of backend overloads sharing one name.
///
/// Families created implicitly by registering backend operators under the
/// same name stay open for new overloads. Families registered explicitly
/// through [`OperatorRegistry::register_operator_family`] are sealed.
#[derive(Debug, Clone)]
pub struct OperatorFamily {
    pub name: String,
    pub overloads: Vec<OperatorPtr>,
    pub sealed: bool,
}

impl OperatorFamily {
    pub fn new(name: impl Into<String>, overloads: Vec<OperatorPtr>) -> Self {
        Self {
            name: name.into(),
            overloads,
            sealed: true,
        }
    }

    fn input_signature(op: &ExprOperator) -> Option<&[QType]> {
        op.as_backend().map(|b| b.signature.inputs.as_slice())
    }

    fn find_overload(&self, input_types: &[QType]) -> Option<&OperatorPtr> {
        self.overloads
            .iter()
            .find(|op| Self::input_signature(op) == Some(input_types))
    }
}

#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Operator(OperatorPtr),
    Family(OperatorFamily),
}

#[derive(Default)]
struct RegistryState {
    names: Vec<String>,
    entries: HashMap<String, RegistryEntry>,
}

#[derive(Default)]
pub struct OperatorRegistry {
    state: RwLock<RegistryState>,
}

static GLOBAL_REGISTRY: Lazy<OperatorRegistry> = Lazy::new(OperatorRegistry::new);

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static OperatorRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register `op` under `name` and return a [`RegisteredOperator`] reference to it.
    ///
    /// A backend operator registered under a name already held by an open
    /// family (or by another backend operator) becomes a new overload. If an
    /// overload with the same input signature already exists the call is a
    /// no-op. Any other collision fails with `AlreadyExists`.
    ///
    /// [`RegisteredOperator`]: crate::operator::RegisteredOperator
    pub fn register_operator(&self, name: &str, op: OperatorPtr) -> Result<OperatorPtr> {
        if !is_valid_operator_name(name) {
            return Err(Error::InvalidArgument(format!(
                "invalid operator name: {:?}",
                name
            )));
        }
        if op.as_registered().is_some_and(|r| r.name == name) {
            return Err(Error::InvalidArgument(format!(
                "operator {} cannot be registered as a reference to itself",
                name
            )));
        }

        let mut guard = self.state.write();
        let state = &mut *guard;
        match state.entries.get_mut(name) {
            None => {
                debug!("Registering operator {} ({})", name, op.specialization_key());
                state.names.push(name.to_string());
                state
                    .entries
                    .insert(name.to_string(), RegistryEntry::Operator(op));
            }
            Some(entry) => {
                let Some(inputs) = OperatorFamily::input_signature(&op) else {
                    return Err(already_exists(name));
                };
                match entry {
                    RegistryEntry::Operator(existing) if existing.as_backend().is_some() => {
                        if OperatorFamily::input_signature(existing) == Some(inputs) {
                            warn!(
                                "Operator {} with inputs {} is already registered, ignoring",
                                name,
                                format_qtypes(inputs)
                            );
                        } else {
                            info!(
                                "Operator {} now has several overloads, turning it into a family",
                                name
                            );
                            let family = OperatorFamily {
                                name: name.to_string(),
                                overloads: vec![existing.clone(), op],
                                sealed: false,
                            };
                            *entry = RegistryEntry::Family(family);
                        }
                    }
                    RegistryEntry::Family(family) if !family.sealed => {
                        if family.find_overload(inputs).is_some() {
                            warn!(
                                "Operator {} with inputs {} is already registered, ignoring",
                                name,
                                format_qtypes(inputs)
                            );
                        } else {
                            debug!(
                                "Adding overload {} to operator family {}",
                                format_qtypes(inputs),
                                name
                            );
                            family.overloads.push(op);
                        }
                    }
                    _ => return Err(already_exists(name)),
                }
            }
        }

        Ok(ExprOperator::registered(name))
    }

    /// Register a sealed family of overloads under `name`.
    pub fn register_operator_family(&self, family: OperatorFamily) -> Result<OperatorPtr> {
        if !is_valid_operator_name(&family.name) {
            return Err(Error::InvalidArgument(format!(
                "invalid operator name: {:?}",
                family.name
            )));
        }
        if let Some(bad) = family.overloads.iter().find(|op| op.as_backend().is_none()) {
            return Err(Error::InvalidArgument(format!(
                "operator family {} may only contain backend operators, got {}",
                family.name,
                bad.specialization_key()
            )));
        }

        let mut state = self.state.write();
        if state.entries.contains_key(&family.name) {
            return Err(already_exists(&family.name));
        }
        let name = family.name.clone();
        debug!(
            "Registering operator family {} with {} overloads",
            name,
            family.overloads.len()
        );
        state.names.push(name.clone());
        state.entries.insert(
            name.clone(),
            RegistryEntry::Family(OperatorFamily {
                sealed: true,
                ..family
            }),
        );
        Ok(ExprOperator::registered(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().entries.contains_key(name)
    }

    /// Raw registry entry for `name`.
    pub fn lookup(&self, name: &str) -> Option<RegistryEntry> {
        self.state.read().entries.get(name).cloned()
    }

    /// Reference to a registered name; fails with `NotFound` if it is unknown.
    pub fn registered_operator(&self, name: &str) -> Result<OperatorPtr> {
        if self.contains(name) {
            Ok(ExprOperator::registered(name))
        } else {
            Err(not_found(name))
        }
    }

    /// The implementation stored under `name`, if it is a single operator.
    pub fn implementation(&self, name: &str) -> Option<OperatorPtr> {
        match self.state.read().entries.get(name) {
            Some(RegistryEntry::Operator(op)) => Some(op.clone()),
            _ => None,
        }
    }

    /// Resolve `name` for a call with the given input qtypes.
    ///
    /// Families dispatch on an exact input match; `output_type`, when given,
    /// must match the selected overload. Lambdas are checked for arity only.
    pub fn lookup_operator(
        &self,
        name: &str,
        input_types: &[QType],
        output_type: Option<&QType>,
    ) -> Result<OperatorPtr> {
        let state = self.state.read();
        let entry = state.entries.get(name).ok_or_else(|| not_found(name))?;
        let op = match entry {
            RegistryEntry::Operator(op) => {
                check_operator_inputs(name, op, input_types)?;
                op.clone()
            }
            RegistryEntry::Family(family) => match family.find_overload(input_types) {
                Some(op) => op.clone(),
                None => return Err(no_matching_overload(family, input_types)),
            },
        };
        if let (Some(expected), Some(backend)) = (output_type, op.as_backend()) {
            if &backend.signature.output != expected {
                return Err(Error::InvalidArgument(format!(
                    "operator {}{} returns {}, expected {}",
                    name,
                    format_qtypes(input_types),
                    backend.signature.output,
                    expected
                )));
            }
        }
        Ok(op)
    }

    /// Registered names, in registration order.
    pub fn list_registered_operators(&self) -> Vec<String> {
        self.state.read().names.clone()
    }
}

fn check_operator_inputs(name: &str, op: &ExprOperator, input_types: &[QType]) -> Result<()> {
    match op {
        ExprOperator::Backend(backend) if backend.signature.inputs != input_types => {
            Err(Error::InvalidArgument(format!(
                "operator {} expects inputs {}, got {}",
                name,
                format_qtypes(&backend.signature.inputs),
                format_qtypes(input_types)
            )))
        }
        ExprOperator::Lambda(lambda)
            if input_types.len() < lambda.required_arity()
                || input_types.len() > lambda.params.len() =>
        {
            Err(Error::InvalidArgument(format!(
                "operator {} expects between {} and {} inputs, got {}",
                name,
                lambda.required_arity(),
                lambda.params.len(),
                input_types.len()
            )))
        }
        _ => Ok(()),
    }
}

fn no_matching_overload(family: &OperatorFamily, input_types: &[QType]) -> Error {
    let closest = family
        .overloads
        .iter()
        .filter_map(|op| OperatorFamily::input_signature(op))
        .max_by_key(|candidate| {
            let positional = candidate
                .iter()
                .zip(input_types)
                .filter(|(a, b)| a == b)
                .count();
            (positional, candidate.len() == input_types.len())
        });
    let mut msg = format!(
        "no overload of {} accepts inputs {}",
        family.name,
        format_qtypes(input_types)
    );
    if let Some(closest) = closest {
        msg.push_str(&format!("; closest candidate is {}", format_qtypes(closest)));
    }
    Error::InvalidArgument(msg)
}

fn already_exists(name: &str) -> Error {
    Error::AlreadyExists(format!("operator already exists: {}", name))
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("operator not found: {}", name))
}
