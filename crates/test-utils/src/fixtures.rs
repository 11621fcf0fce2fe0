// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures and sample T-SQL buffers
//!
//! The table names match [`MockCatalogBuilder::with_standard_schema`](crate::MockCatalogBuilder::with_standard_schema).

/// Sample T-SQL buffers for testing
pub struct SqlFixtures;

impl SqlFixtures {
    // ===== Basic SELECT queries =====

    /// Simple SELECT with column list
    pub const fn simple_select() -> &'static str {
        "SELECT EmployeeID, FirstName, LastName FROM dbo.Employees"
    }

    /// SELECT with all columns
    pub const fn select_all() -> &'static str {
        "SELECT * FROM Employees"
    }

    /// Alias equal to another table's name
    pub const fn alias_shadowing() -> &'static str {
        "SELECT Departments.FirstName FROM Employees Departments"
    }

    /// Bracketed names with escaped `]]`
    pub const fn bracketed_names() -> &'static str {
        "SELECT [o].[OrderID] FROM [dbo].[Orders] AS [o] JOIN [Order]]Lines] l ON l.OrderID = o.OrderID"
    }

    // ===== JOIN queries =====

    /// INNER JOIN with aliases
    pub const fn inner_join() -> &'static str {
        "SELECT e.FirstName, d.DepartmentName
FROM Employees e
INNER JOIN Departments d ON e.DepartmentID = d.DepartmentID"
    }

    /// APPLY with a table-valued function
    pub const fn cross_apply() -> &'static str {
        "SELECT c.CustomerName, f.OrderDate
FROM Customers c
CROSS APPLY dbo.fn_OrdersSince('2024-01-01') f"
    }

    // ===== Subqueries =====

    /// Derived table with an alias
    pub const fn derived_table() -> &'static str {
        "SELECT t.CustomerID, t.Total
FROM (SELECT CustomerID, SUM(TotalAmount) AS Total FROM Orders GROUP BY CustomerID) t
WHERE t.Total > 1000"
    }

    /// Correlated subquery in the select list
    pub const fn correlated_subquery() -> &'static str {
        "SELECT c.CustomerName,
    (SELECT COUNT(*) FROM Orders o WHERE o.CustomerID = c.CustomerID) AS OrderCount
FROM Customers c"
    }

    // ===== CTE (Common Table Expressions) =====

    /// Chained CTEs
    pub const fn chained_ctes() -> &'static str {
        "WITH Active AS (
    SELECT EmployeeID, DepartmentID FROM Employees WHERE IsActive = 1
), PerDept (DepartmentID, Headcount) AS (
    SELECT DepartmentID, COUNT(*) FROM Active GROUP BY DepartmentID
)
SELECT d.DepartmentName, p.Headcount
FROM PerDept p
JOIN Departments d ON d.DepartmentID = p.DepartmentID"
    }

    /// Recursive CTE over the manager hierarchy
    pub const fn recursive_cte() -> &'static str {
        "WITH Chain AS (
    SELECT EmployeeID, ManagerID, 0 AS Level FROM Employees WHERE ManagerID IS NULL
    UNION ALL
    SELECT e.EmployeeID, e.ManagerID, c.Level + 1
    FROM Employees e JOIN Chain c ON e.ManagerID = c.EmployeeID
)
SELECT * FROM Chain"
    }

    // ===== DML =====

    /// INSERT with a column list and a SELECT source
    pub const fn insert_select() -> &'static str {
        "INSERT INTO Orders (CustomerID, OrderDate, TotalAmount)
SELECT CustomerID, GETDATE(), 0 FROM Customers"
    }

    /// UPDATE through a FROM-clause alias
    pub const fn update_from_alias() -> &'static str {
        "UPDATE e SET Salary = Salary * 1.1
FROM Employees e
JOIN Departments d ON d.DepartmentID = e.DepartmentID
WHERE d.Budget > 100000"
    }

    /// MERGE with OUTPUT
    pub const fn merge_output() -> &'static str {
        "MERGE INTO Customers AS tgt
USING (SELECT CustomerID, Email FROM Orders) AS src ON tgt.CustomerID = src.CustomerID
WHEN MATCHED THEN UPDATE SET Email = src.Email
WHEN NOT MATCHED THEN INSERT (CustomerID, Email) VALUES (src.CustomerID, src.Email)
OUTPUT inserted.CustomerID;"
    }

    // ===== Batches and temp tables =====

    /// `USE` and `GO` threading databases through batches
    pub const fn use_and_go() -> &'static str {
        "USE Sales;
SELECT * FROM Orders;
GO
USE [Archive];
SELECT * FROM OrdersHistory;"
    }

    /// Temp tables across a `GO` boundary
    pub const fn temp_tables_across_go() -> &'static str {
        "SELECT OrderID, TotalAmount INTO #big FROM Orders WHERE TotalAmount > 500
CREATE TABLE ##audit (Id INT IDENTITY PRIMARY KEY, Note NVARCHAR(200), CONSTRAINT ck CHECK (Id > 0))
SELECT * FROM #big
GO
SELECT * FROM ##audit
SELECT * FROM #big"
    }

    /// Comments and strings that hide SQL-looking text
    pub const fn comments_and_strings() -> &'static str {
        "-- SELECT * FROM Hidden
SELECT 'FROM Orders' AS Label, /* nested /* block */ comment */ OrderID
FROM Orders -- trailing
WHERE Status = N'it''s open'"
    }

    // ===== Error cases =====

    /// Two FROM clauses in one query
    pub const fn error_duplicate_from() -> &'static str {
        "SELECT * FROM Orders FROM Customers"
    }

    /// Derived table without an alias
    pub const fn error_derived_without_alias() -> &'static str {
        "SELECT * FROM (SELECT 1 AS x)"
    }

    /// CTE declared without a body
    pub const fn error_cte_without_body() -> &'static str {
        "WITH Empty AS SELECT 1"
    }
}
