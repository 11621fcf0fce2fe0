// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use crate::{FunctionMetadata, FunctionType, builtin};
use std::collections::HashMap;

/// Function registry for builtin T-SQL functions
///
/// Lookups are case-insensitive, as function names are in SQL Server.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: Vec<FunctionMetadata>,
    /// Upper-cased name to index in `functions`
    by_name: HashMap<String, usize>,
}

impl FunctionRegistry {
    /// Create a new function registry with all builtin functions loaded
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlsense_function_registry::FunctionRegistry;
    ///
    /// let registry = FunctionRegistry::new();
    /// assert!(registry.is_aggregate("sum"));
    /// ```
    pub fn new() -> Self {
        Self::with_functions(builtin::tsql::all_functions())
    }

    /// Create a registry from an explicit function list
    pub fn with_functions(functions: Vec<FunctionMetadata>) -> Self {
        let by_name = functions
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.to_ascii_uppercase(), idx))
            .collect();
        Self { functions, by_name }
    }

    /// All registered functions
    pub fn functions(&self) -> &[FunctionMetadata] {
        &self.functions
    }

    /// Functions of one type, in registration order
    pub fn functions_of_type(&self, function_type: FunctionType) -> impl Iterator<Item = &FunctionMetadata> {
        self.functions
            .iter()
            .filter(move |f| f.function_type == function_type)
    }

    /// Lookup a single function by name (case-insensitive)
    pub fn get_function(&self, name: &str) -> Option<&FunctionMetadata> {
        self.by_name
            .get(&name.to_ascii_uppercase())
            .map(|&idx| &self.functions[idx])
    }

    /// Check if a function exists
    pub fn has_function(&self, name: &str) -> bool {
        self.get_function(name).is_some()
    }

    fn is_type(&self, name: &str, function_type: FunctionType) -> bool {
        self.get_function(name)
            .is_some_and(|f| f.function_type == function_type)
    }

    pub fn is_aggregate(&self, name: &str) -> bool {
        self.is_type(name, FunctionType::Aggregate)
    }

    pub fn is_conversion(&self, name: &str) -> bool {
        self.is_type(name, FunctionType::Conversion)
    }

    pub fn is_conditional(&self, name: &str) -> bool {
        self.is_type(name, FunctionType::Conditional)
    }

    /// Check if `name` is a builtin table-valued function
    pub fn is_table_valued(&self, name: &str) -> bool {
        self.is_type(name, FunctionType::Table)
    }

    /// Check if the function's argument must be numeric
    pub fn requires_numeric(&self, name: &str) -> bool {
        self.get_function(name).is_some_and(|f| f.requires_numeric)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_function_case_insensitive() {
        let registry = FunctionRegistry::new();
        let upper = registry.get_function("COUNT");
        let lower = registry.get_function("count");
        assert!(upper.is_some());
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_classification() {
        let registry = FunctionRegistry::new();
        assert!(registry.is_aggregate("AVG"));
        assert!(registry.requires_numeric("SUM"));
        assert!(!registry.requires_numeric("COUNT"));
        assert!(registry.is_conversion("try_convert"));
        assert!(registry.is_conditional("IIF"));
        assert!(registry.is_table_valued("STRING_SPLIT"));
        assert!(!registry.has_function("NONEXISTENT"));
    }

    #[test]
    fn test_functions_of_type() {
        let registry = FunctionRegistry::new();
        let conditional: Vec<_> = registry
            .functions_of_type(FunctionType::Conditional)
            .map(|f| f.name.as_str())
            .collect();
        assert!(conditional.contains(&"COALESCE"));
        assert!(conditional.contains(&"NULLIF"));
    }
}
