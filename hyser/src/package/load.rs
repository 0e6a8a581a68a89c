use std::collections::BTreeSet;

use hyexpr::{
    OperatorRegistry, QType, Value,
    error::{Error, Result, ResultExt},
};
use log::{debug, info};

use crate::{
    codec::CodecRegistry,
    decode::decode,
    magic::OPERATOR_PACKAGE_VERSION,
    package::{OperatorPackage, format_operator_names},
};

/// Register every operator of `package` into `operators`.
///
/// The version, the required dependencies and the name collisions are all
/// checked before anything is decoded; dependency and collision errors list
/// every offending name at once. Operators are then decoded and registered
/// one after the other. If one fails, the ones before it stay registered.
pub fn load_operator_package(
    package: &OperatorPackage,
    codecs: &CodecRegistry,
    operators: &OperatorRegistry,
) -> Result<()> {
    if package.version != OPERATOR_PACKAGE_VERSION {
        return Err(Error::InvalidArgument(format!(
            "expected operator_package.version={}, got {}",
            OPERATOR_PACKAGE_VERSION, package.version
        )));
    }

    let missing: BTreeSet<&str> = package
        .required_registered_operators
        .iter()
        .map(String::as_str)
        .filter(|name| !operators.contains(name))
        .collect();
    if !missing.is_empty() {
        return Err(Error::FailedPrecondition(format!(
            "missing dependencies: {}",
            format_operator_names(missing)
        )));
    }

    let present: BTreeSet<&str> = package
        .operators
        .iter()
        .map(|entry| entry.registration_name.as_str())
        .filter(|name| operators.contains(name))
        .collect();
    if !present.is_empty() {
        return Err(Error::FailedPrecondition(format!(
            "already present in the registry: {}",
            format_operator_names(present)
        )));
    }

    for (i, entry) in package.operators.iter().enumerate() {
        let name = &entry.registration_name;
        let context = || format!("operators[{}].registration_name={}", i, name);

        let decoded = decode(&entry.implementation, codecs, operators).with_context(context)?;
        if decoded.values.len() != 1 || !decoded.exprs.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "expected to get a value, got {} values and {} exprs",
                decoded.values.len(),
                decoded.exprs.len()
            ))
            .with_context(context()));
        }
        let op = match &decoded.values[0] {
            Value::Operator(op) => op.clone(),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "expected to get {}, got {}",
                    QType::ExprOperator,
                    other.qtype()
                ))
                .with_context(context()));
            }
        };

        operators
            .register_operator(name, op)
            .with_context(context)?;
        debug!("Loaded operator {} from package", name);
    }

    info!(
        "Loaded operator package with {} operators ({} dependencies)",
        package.operators.len(),
        package.required_registered_operators.len()
    );
    Ok(())
}
