//! Closed role and record-kind enums
//!
//! Role names arrive as certificate attribute strings and record kinds
//! as the `docType` field; both are parsed once at the edge and matched
//! exhaustively afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChaincodeError;

/// Every kind of record the chaincode stores
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    Hospital,
    HospitalAdmin,
    Patient,
    Doctor,
    Druggist,
    Pathologist,
    Prescription,
    Billing,
    Access,
}

impl DocType {
    pub const ALL: [DocType; 9] = [
        DocType::Hospital,
        DocType::HospitalAdmin,
        DocType::Patient,
        DocType::Doctor,
        DocType::Druggist,
        DocType::Pathologist,
        DocType::Prescription,
        DocType::Billing,
        DocType::Access,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            DocType::Hospital => "HOSPITAL",
            DocType::HospitalAdmin => "HOSPITAL_ADMIN",
            DocType::Patient => "PATIENT",
            DocType::Doctor => "DOCTOR",
            DocType::Druggist => "DRUGGIST",
            DocType::Pathologist => "PATHOLOGIST",
            DocType::Prescription => "PRESCRIPTION",
            DocType::Billing => "BILLING",
            DocType::Access => "ACCESS",
        }
    }

    /// Kinds kept in the entity index under `(id, docType)`
    pub fn is_indexed_entity(&self) -> bool {
        match self {
            DocType::Hospital
            | DocType::HospitalAdmin
            | DocType::Patient
            | DocType::Doctor
            | DocType::Druggist
            | DocType::Pathologist => true,
            DocType::Prescription | DocType::Billing | DocType::Access => false,
        }
    }

    pub fn as_user_role(&self) -> Option<UserRole> {
        match self {
            DocType::Patient => Some(UserRole::Patient),
            DocType::Doctor => Some(UserRole::Doctor),
            DocType::Druggist => Some(UserRole::Druggist),
            DocType::Pathologist => Some(UserRole::Pathologist),
            DocType::Hospital
            | DocType::HospitalAdmin
            | DocType::Prescription
            | DocType::Billing
            | DocType::Access => None,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = ChaincodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocType::ALL
            .iter()
            .copied()
            .find(|doc_type| doc_type.as_str() == s)
            .ok_or_else(|| ChaincodeError::InvalidInput(format!("unknown docType {:?}", s)))
    }
}

/// Roles a caller can hold through the role attribute
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    HospitalAdmin,
    Patient,
    Doctor,
    Druggist,
    Pathologist,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::HospitalAdmin,
        Role::Patient,
        Role::Doctor,
        Role::Druggist,
        Role::Pathologist,
    ];

    /// Parse a role attribute value; unknown names yield `None`
    pub fn from_attribute(value: &str) -> Option<Role> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.doc_type().as_str() == value)
    }

    /// Record kind a caller of this role is registered under
    pub const fn doc_type(&self) -> DocType {
        match self {
            Role::HospitalAdmin => DocType::HospitalAdmin,
            Role::Patient => DocType::Patient,
            Role::Doctor => DocType::Doctor,
            Role::Druggist => DocType::Druggist,
            Role::Pathologist => DocType::Pathologist,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doc_type().as_str())
    }
}

/// Role tag of a User record, doubling as its docType
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Patient,
    Doctor,
    Druggist,
    Pathologist,
}

impl UserRole {
    pub const fn doc_type(&self) -> DocType {
        match self {
            UserRole::Patient => DocType::Patient,
            UserRole::Doctor => DocType::Doctor,
            UserRole::Druggist => DocType::Druggist,
            UserRole::Pathologist => DocType::Pathologist,
        }
    }

    pub const fn role(&self) -> Role {
        match self {
            UserRole::Patient => Role::Patient,
            UserRole::Doctor => Role::Doctor,
            UserRole::Druggist => Role::Druggist,
            UserRole::Pathologist => Role::Pathologist,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doc_type().as_str())
    }
}

impl From<UserRole> for DocType {
    fn from(role: UserRole) -> Self {
        role.doc_type()
    }
}

impl From<Role> for DocType {
    fn from(role: Role) -> Self {
        role.doc_type()
    }
}
