// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! SQL Server builtin function definitions

use crate::{FunctionMetadata, FunctionType};

fn aggregate(name: &str) -> FunctionMetadata {
    FunctionMetadata::new(name, FunctionType::Aggregate)
}

fn scalar(name: &str, returns: &str) -> FunctionMetadata {
    FunctionMetadata::new(name, FunctionType::Scalar).returns(returns)
}

/// Get all builtin T-SQL functions
pub fn all_functions() -> Vec<FunctionMetadata> {
    vec![
        // Aggregate functions
        aggregate("COUNT")
            .returns("int")
            .with_description("Number of rows or non-NULL values"),
        aggregate("COUNT_BIG")
            .returns("bigint")
            .with_description("Number of rows, as bigint"),
        aggregate("SUM")
            .numeric_argument()
            .with_description("Sum of numeric values"),
        aggregate("AVG")
            .numeric_argument()
            .with_description("Average of numeric values"),
        aggregate("STDEV")
            .numeric_argument()
            .returns("float")
            .with_description("Statistical standard deviation"),
        aggregate("VAR")
            .numeric_argument()
            .returns("float")
            .with_description("Statistical variance"),
        aggregate("MIN").with_description("Minimum value"),
        aggregate("MAX").with_description("Maximum value"),
        aggregate("STRING_AGG")
            .returns("nvarchar(max)")
            .with_description("Concatenate values with a separator"),
        aggregate("CHECKSUM_AGG")
            .returns("int")
            .with_description("Checksum of the values in a group"),
        // Window functions
        FunctionMetadata::new("ROW_NUMBER", FunctionType::Window)
            .returns("bigint")
            .with_description("Sequential row number within a partition"),
        FunctionMetadata::new("RANK", FunctionType::Window).returns("bigint"),
        FunctionMetadata::new("DENSE_RANK", FunctionType::Window).returns("bigint"),
        FunctionMetadata::new("NTILE", FunctionType::Window).returns("bigint"),
        FunctionMetadata::new("LAG", FunctionType::Window),
        FunctionMetadata::new("LEAD", FunctionType::Window),
        // Conversion functions
        FunctionMetadata::new("CAST", FunctionType::Conversion)
            .with_description("Convert an expression to a data type"),
        FunctionMetadata::new("TRY_CAST", FunctionType::Conversion)
            .with_description("CAST returning NULL on failure"),
        FunctionMetadata::new("CONVERT", FunctionType::Conversion)
            .with_description("Convert an expression to a data type with a style"),
        FunctionMetadata::new("TRY_CONVERT", FunctionType::Conversion),
        FunctionMetadata::new("PARSE", FunctionType::Conversion),
        FunctionMetadata::new("TRY_PARSE", FunctionType::Conversion),
        // Conditional functions
        FunctionMetadata::new("COALESCE", FunctionType::Conditional)
            .with_description("First non-NULL argument"),
        FunctionMetadata::new("ISNULL", FunctionType::Conditional)
            .with_description("Replace NULL with a value"),
        FunctionMetadata::new("NULLIF", FunctionType::Conditional)
            .with_description("NULL when both arguments are equal"),
        FunctionMetadata::new("IIF", FunctionType::Conditional)
            .with_description("Inline if-then-else"),
        FunctionMetadata::new("CHOOSE", FunctionType::Conditional),
        // String functions
        scalar("LEN", "int").with_description("Number of characters, trailing spaces excluded"),
        scalar("DATALENGTH", "int"),
        scalar("UPPER", "nvarchar"),
        scalar("LOWER", "nvarchar"),
        scalar("LTRIM", "nvarchar"),
        scalar("RTRIM", "nvarchar"),
        scalar("TRIM", "nvarchar"),
        scalar("SUBSTRING", "nvarchar"),
        scalar("LEFT", "nvarchar"),
        scalar("RIGHT", "nvarchar"),
        scalar("REPLACE", "nvarchar"),
        scalar("CONCAT", "nvarchar").with_description("Concatenate strings"),
        scalar("CONCAT_WS", "nvarchar"),
        scalar("CHARINDEX", "int"),
        scalar("PATINDEX", "int"),
        scalar("FORMAT", "nvarchar"),
        scalar("STUFF", "nvarchar"),
        scalar("REPLICATE", "nvarchar"),
        scalar("QUOTENAME", "nvarchar"),
        // Date/Time functions
        scalar("GETDATE", "datetime").with_description("Current date and time"),
        scalar("GETUTCDATE", "datetime"),
        scalar("SYSDATETIME", "datetime2"),
        scalar("SYSDATETIMEOFFSET", "datetimeoffset"),
        scalar("DATEADD", "datetime"),
        scalar("DATEDIFF", "int"),
        scalar("DATEDIFF_BIG", "bigint"),
        scalar("DATEPART", "int"),
        scalar("DATENAME", "nvarchar"),
        scalar("DATEFROMPARTS", "date"),
        scalar("EOMONTH", "date"),
        scalar("YEAR", "int"),
        scalar("MONTH", "int"),
        scalar("DAY", "int"),
        // Math functions
        scalar("ABS", "numeric").numeric_argument(),
        scalar("CEILING", "numeric").numeric_argument(),
        scalar("FLOOR", "numeric").numeric_argument(),
        scalar("ROUND", "numeric").numeric_argument(),
        scalar("POWER", "float").numeric_argument(),
        scalar("SQRT", "float").numeric_argument(),
        scalar("SIGN", "int").numeric_argument(),
        scalar("RAND", "float"),
        // System functions
        scalar("NEWID", "uniqueidentifier").with_description("New GUID"),
        scalar("SCOPE_IDENTITY", "numeric"),
        scalar("OBJECT_ID", "int"),
        scalar("DB_NAME", "nvarchar"),
        scalar("SUSER_SNAME", "nvarchar"),
        scalar("ISNUMERIC", "int"),
        scalar("ISDATE", "int"),
        // Table-valued functions
        FunctionMetadata::new("STRING_SPLIT", FunctionType::Table)
            .with_description("Split a string into rows of substrings"),
        FunctionMetadata::new("OPENJSON", FunctionType::Table),
        FunctionMetadata::new("OPENROWSET", FunctionType::Table),
        FunctionMetadata::new("OPENQUERY", FunctionType::Table),
        FunctionMetadata::new("GENERATE_SERIES", FunctionType::Table),
    ]
}
