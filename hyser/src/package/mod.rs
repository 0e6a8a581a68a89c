//! Operator packages.
//!
//! A package is a versioned bundle of named operator implementations, each
//! stored as its own [`Container`], together with the registered operators
//! the bundle expects to find in the target registry.
//!
//! - [`dump_operator_package`] builds a package from operators already in a
//!   registry.
//! - [`load_operator_package`] validates a package against a registry and
//!   registers its operators.
//! - [`embed_operator_package`] / [`parse_embedded_operator_package`] wrap a
//!   package in a compressed byte envelope.
use borsh::{BorshDeserialize, BorshSerialize};
use hyexpr::error::{Error, Result};

use crate::{container::Container, magic::OPERATOR_NAME_PREFIX};

mod dump;
mod envelope;
mod load;

pub use dump::dump_operator_package;
pub use envelope::{
    embed_operator_package, load_embedded_operator_package, parse_embedded_operator_package,
};
pub use load::load_operator_package;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OperatorPackageEntry {
    pub registration_name: String,
    /// A container publishing exactly one `EXPR_OPERATOR` value.
    pub implementation: Container,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OperatorPackage {
    pub version: u32,
    /// Sorted names the target registry must already contain.
    pub required_registered_operators: Vec<String>,
    /// Operators in registration order.
    pub operators: Vec<OperatorPackageEntry>,
}

impl OperatorPackage {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| {
            Error::Internal(format!("unable to serialize an operator package: {}", e))
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes).map_err(|e| {
            Error::InvalidArgument(format!("unable to parse an operator package: {}", e))
        })
    }
}

/// `M.a, M.b` for a sorted list of names.
fn format_operator_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("{}{}", OPERATOR_NAME_PREFIX, name))
        .collect::<Vec<_>>()
        .join(", ")
}
