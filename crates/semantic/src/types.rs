// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Type compatibility
//!
//! SQL Server type names are folded into broad [`TypeFamily`]s and compared
//! through a static matrix. The checker never fails: structurally invalid
//! input yields [`Verdict::Error`], unknown type names yield
//! [`Verdict::NoWarning`].
//!
//! | pair | verdict |
//! |---|---|
//! | same family, exact vs approximate numeric, bit vs numeric | no warning |
//! | `sql_variant` vs anything | no warning |
//! | uniqueidentifier vs character or binary, binary vs character | no warning |
//! | XML vs character | no warning |
//! | anything else | `type_mismatch` |

use serde::{Deserialize, Serialize};
use sqlsense_function_registry::FunctionRegistry;

/// Spatial type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialKind {
    Geometry,
    Geography,
}

/// Broad family of a SQL Server type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    ExactNumeric,
    ApproxNumeric,
    Character,
    Binary,
    DateTime,
    Boolean,
    UniqueIdentifier,
    Xml,
    Spatial(SpatialKind),
    SqlVariant,
}

impl TypeFamily {
    /// Family of a type name such as `int`, `VARCHAR(50)`, `[decimal](10, 2)`
    ///
    /// Returns `None` for names outside the builtin types (user-defined
    /// types, `hierarchyid`, typos).
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let base = base_type_name(type_name);
        let family = match base.as_str() {
            "bigint" | "int" | "integer" | "smallint" | "tinyint" | "decimal" | "dec"
            | "numeric" | "money" | "smallmoney" => TypeFamily::ExactNumeric,
            "float" | "real" | "double precision" => TypeFamily::ApproxNumeric,
            "char" | "varchar" | "nchar" | "nvarchar" | "text" | "ntext" | "sysname"
            | "character" | "character varying" | "char varying" | "national character"
            | "national char" | "national character varying" | "national char varying"
            | "national text" => TypeFamily::Character,
            "binary" | "varbinary" | "binary varying" | "image" | "rowversion" | "timestamp" => {
                TypeFamily::Binary
            }
            "date" | "time" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => {
                TypeFamily::DateTime
            }
            "bit" => TypeFamily::Boolean,
            "uniqueidentifier" => TypeFamily::UniqueIdentifier,
            "xml" => TypeFamily::Xml,
            "geometry" => TypeFamily::Spatial(SpatialKind::Geometry),
            "geography" => TypeFamily::Spatial(SpatialKind::Geography),
            "sql_variant" => TypeFamily::SqlVariant,
            _ => return None,
        };
        Some(family)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeFamily::ExactNumeric | TypeFamily::ApproxNumeric)
    }

    /// Check whether two families compare without an implicit-conversion warning
    pub fn is_compatible_with(&self, other: TypeFamily) -> bool {
        use TypeFamily::*;

        if *self == other {
            return true;
        }
        match (*self, other) {
            (SqlVariant, _) | (_, SqlVariant) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Boolean, n) | (n, Boolean) if n.is_numeric() => true,
            (Boolean, Binary) | (Binary, Boolean) => true,
            (Binary, Character) | (Character, Binary) => true,
            (UniqueIdentifier, Character | Binary) | (Character | Binary, UniqueIdentifier) => true,
            (Xml, Character) | (Character, Xml) => true,
            _ => false,
        }
    }
}

/// Lowercased type name without quoting, schema prefix or length suffix
fn base_type_name(type_name: &str) -> String {
    let name = type_name.trim();
    let name = name.split('(').next().unwrap_or(name);
    let name = name.rsplit('.').next().unwrap_or(name);
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '"'))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Kind of type warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The operands need an implicit conversion that may fail or surprise
    TypeMismatch,
    /// `SUM`/`AVG` over a non-numeric argument
    InvalidAggregate,
    /// `CASE` branches of incompatible families
    CaseTypeInconsistency,
}

/// Kind of structurally invalid check input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// `CASE`/`COALESCE`/`IIF`/`NULLIF` without branches
    EmptyBranchList,
    /// `check_aggregate` called with a name that is not an aggregate
    NotAnAggregate,
    /// `IIF` or `NULLIF` with other than two branches
    WrongBranchCount,
}

/// Outcome of a type check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "kind", rename_all = "snake_case")]
pub enum Verdict {
    NoWarning,
    Warning(WarningKind),
    Error(ErrorKind),
}

impl Verdict {
    pub fn is_warning(&self) -> bool {
        matches!(self, Verdict::Warning(_))
    }
}

/// One side of a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    /// Inferred type name, `None` when unknown
    pub type_name: Option<String>,
    /// Wrapped in `CAST`/`CONVERT`
    pub explicit_cast: bool,
    /// The literal `NULL`
    pub is_null: bool,
}

impl Operand {
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// An operand converted with `CAST(... AS type_name)` or `CONVERT`
    pub fn cast(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            explicit_cast: true,
            is_null: false,
        }
    }

    pub fn null() -> Self {
        Self {
            is_null: true,
            ..Self::default()
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    fn family(&self) -> Option<TypeFamily> {
        self.type_name.as_deref().and_then(TypeFamily::from_type_name)
    }
}

/// Conditional expression whose branches must agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    Case,
    Coalesce,
    Iif,
    Nullif,
}

impl BranchKind {
    /// Conditional kind of a builtin function name
    pub fn from_function(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "CASE" => Some(BranchKind::Case),
            "COALESCE" | "ISNULL" => Some(BranchKind::Coalesce),
            "IIF" => Some(BranchKind::Iif),
            "NULLIF" => Some(BranchKind::Nullif),
            _ => None,
        }
    }
}

/// Compare two type names
///
/// # Examples
///
/// ```
/// use sqlsense_semantic::{Verdict, WarningKind, check};
///
/// assert_eq!(check("int", "decimal(10,2)"), Verdict::NoWarning);
/// assert_eq!(check("int", "varchar"), Verdict::Warning(WarningKind::TypeMismatch));
/// ```
pub fn check(type_a: &str, type_b: &str) -> Verdict {
    family_verdict(
        TypeFamily::from_type_name(type_a),
        TypeFamily::from_type_name(type_b),
    )
}

fn family_verdict(a: Option<TypeFamily>, b: Option<TypeFamily>) -> Verdict {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_compatible_with(b) => Verdict::Warning(WarningKind::TypeMismatch),
        _ => Verdict::NoWarning,
    }
}

/// Compare two operands; an explicit conversion on either side never warns
pub fn check_operands(a: &Operand, b: &Operand) -> Verdict {
    if a.explicit_cast || b.explicit_cast || a.is_null || b.is_null {
        return Verdict::NoWarning;
    }
    family_verdict(a.family(), b.family())
}

/// Type checks that need the builtin function catalogue
#[derive(Debug, Clone, Default)]
pub struct TypeChecker {
    functions: FunctionRegistry,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn check(&self, type_a: &str, type_b: &str) -> Verdict {
        check(type_a, type_b)
    }

    pub fn check_operands(&self, a: &Operand, b: &Operand) -> Verdict {
        check_operands(a, b)
    }

    /// Check an aggregate's argument
    ///
    /// `SUM`, `AVG` and the statistical aggregates need a numeric argument;
    /// `COUNT`, `MIN`, `MAX` accept anything.
    pub fn check_aggregate(&self, function: &str, argument: &Operand) -> Verdict {
        if !self.functions.is_aggregate(function) {
            return Verdict::Error(ErrorKind::NotAnAggregate);
        }
        if !self.functions.requires_numeric(function) || argument.explicit_cast {
            return Verdict::NoWarning;
        }
        match argument.family() {
            Some(family) if !(family.is_numeric() || family == TypeFamily::SqlVariant) => {
                Verdict::Warning(WarningKind::InvalidAggregate)
            }
            _ => Verdict::NoWarning,
        }
    }

    /// Check that the non-NULL branches of a conditional share a family
    pub fn check_branches(&self, kind: BranchKind, branches: &[Operand]) -> Verdict {
        if branches.is_empty() {
            return Verdict::Error(ErrorKind::EmptyBranchList);
        }
        if matches!(kind, BranchKind::Iif | BranchKind::Nullif) && branches.len() != 2 {
            return Verdict::Error(ErrorKind::WrongBranchCount);
        }

        let families: Vec<TypeFamily> = branches
            .iter()
            .filter(|b| !b.is_null && !b.explicit_cast)
            .filter_map(Operand::family)
            .collect();
        let consistent = families
            .iter()
            .enumerate()
            .all(|(i, a)| families[i + 1..].iter().all(|b| a.is_compatible_with(*b)));
        if consistent {
            return Verdict::NoWarning;
        }
        match kind {
            BranchKind::Case => Verdict::Warning(WarningKind::CaseTypeInconsistency),
            _ => Verdict::Warning(WarningKind::TypeMismatch),
        }
    }

    /// Declared return type of a builtin function
    pub fn return_type(&self, function: &str) -> Option<&str> {
        self.functions
            .get_function(function)
            .and_then(|f| f.return_type.as_deref())
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }
}
