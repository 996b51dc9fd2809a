//! Safety gate between LLM-authored SQL and a live database.
//!
//! Detection is plain substring and pattern matching over the query text, not
//! a parse. A safe query that mentions a forbidden word inside a string
//! literal (`WHERE body LIKE '%update%'`) is rejected; that trade is accepted.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Keywords that may never appear anywhere in the query, along with the
/// line-comment marker. Semicolons are handled by the statement count check.
const FORBIDDEN_KEYWORDS: [&str; 12] = [
    "DROP", "DELETE", "TRUNCATE", "ALTER", "CREATE", "GRANT", "REVOKE", "INSERT", "UPDATE",
    "EXEC", "EXECUTE", "--",
];

static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)'\s*OR\s*'1'\s*=\s*'1",
        r"(?i)'\s*OR\s*1\s*=\s*1",
        r"(?i)UNION\s+SELECT",
        r"(?i);\s*DROP",
        r"(?i)xp_cmdshell",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static IDENTIFIER_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.]").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Present exactly when `errors` is empty
    pub sanitized_sql: Option<String>,
}

pub struct QueryValidator;

impl QueryValidator {
    pub fn validate(sql: &str) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let trimmed = sql.trim();
        let normalized = WHITESPACE
            .replace_all(&trimmed.to_uppercase(), " ")
            .into_owned();

        for keyword in FORBIDDEN_KEYWORDS {
            if normalized.contains(keyword) {
                errors.push(format!("Forbidden keyword detected: {}", keyword));
            }
        }

        if !normalized.starts_with("SELECT") {
            errors.push("Query must start with SELECT".to_string());
        }

        if !normalized.contains("LIMIT") {
            warnings.push("No LIMIT clause - may return large result set".to_string());
        }

        if normalized.contains("FROM") && !normalized.contains("WHERE") {
            warnings.push("No WHERE clause - query will return all rows".to_string());
        }

        // A lone trailing semicolon terminates the statement; any other one chains a second.
        let semicolons = sql.matches(';').count();
        if semicolons > 1 || (semicolons == 1 && !trimmed.ends_with(';')) {
            errors.push("Multiple SQL statements not allowed".to_string());
        }

        if Self::contains_injection_pattern(sql) {
            errors.push("Potential SQL injection pattern detected".to_string());
        }

        let valid = errors.is_empty();
        ValidationResult {
            valid,
            sanitized_sql: valid.then(|| trimmed.to_string()),
            errors,
            warnings,
        }
    }

    fn contains_injection_pattern(sql: &str) -> bool {
        INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(sql))
    }

    /// Appends `LIMIT <default_limit>` to a query that has none.
    pub fn ensure_limit(sql: &str, default_limit: usize) -> String {
        if sql.to_uppercase().contains("LIMIT") {
            return sql.to_string();
        }

        let trimmed = sql.trim();
        let clean_sql = trimmed.strip_suffix(';').unwrap_or(trimmed);
        format!("{} LIMIT {}", clean_sql, default_limit)
    }

    /// Keeps only `[A-Za-z0-9_.]`. Meant for table/column names, never for values.
    pub fn sanitize_identifier(identifier: &str) -> String {
        IDENTIFIER_STRIP.replace_all(identifier, "").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(sql: &str) -> Vec<String> {
        QueryValidator::validate(sql).errors
    }

    #[test]
    fn plain_select_is_valid() {
        let result = QueryValidator::validate("  SELECT 1  ");
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.sanitized_sql.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn rejects_statement_modifying_keywords_in_any_case() {
        for keyword in [
            "drop", "Delete", "TRUNCATE", "alter", "create", "grant", "revoke", "insert",
            "update", "exec", "execute",
        ] {
            let sql = format!("SELECT * FROM claims WHERE id IN ({} x)", keyword);
            let result = QueryValidator::validate(&sql);
            assert!(!result.valid, "{} should be rejected", keyword);
            assert!(result.sanitized_sql.is_none());
            assert!(
                result
                    .errors
                    .contains(&format!("Forbidden keyword detected: {}", keyword.to_uppercase())),
                "missing error for {}: {:?}",
                keyword,
                result.errors
            );
        }
    }

    #[test]
    fn requires_select_first() {
        let result = QueryValidator::validate("UPDATE x SET y=1");
        assert!(!result.valid);
        assert!(result.errors.contains(&"Forbidden keyword detected: UPDATE".to_string()));
        assert!(result.errors.contains(&"Query must start with SELECT".to_string()));

        assert!(errors("WITH t AS (SELECT 1) SELECT * FROM t LIMIT 1")
            .contains(&"Query must start with SELECT".to_string()));
    }

    #[test]
    fn delete_reports_forbidden_keyword() {
        let errs = errors("DELETE FROM claims");
        assert!(errs.contains(&"Forbidden keyword detected: DELETE".to_string()));
    }

    #[test]
    fn rejects_stacked_statements() {
        let result = QueryValidator::validate("SELECT 1; SELECT 2");
        assert!(!result.valid);
        assert!(result.errors.contains(&"Multiple SQL statements not allowed".to_string()));

        assert!(!QueryValidator::validate("SELECT 1;;").valid);
    }

    #[test]
    fn tolerates_single_trailing_semicolon() {
        let result = QueryValidator::validate("SELECT 1;");
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.sanitized_sql.as_deref(), Some("SELECT 1;"));

        assert!(QueryValidator::validate("SELECT 1;   \n").valid);
    }

    #[test]
    fn rejects_comment_marker() {
        let errs = errors("SELECT * FROM claims -- WHERE status = 'PAID'");
        assert!(errs.contains(&"Forbidden keyword detected: --".to_string()));
    }

    #[test]
    fn rejects_injection_signatures() {
        assert!(!QueryValidator::validate("SELECT * FROM x WHERE '1'='1' OR '1'='1'").valid);
        assert!(!QueryValidator::validate("SELECT * FROM a UNION SELECT * FROM b").valid);
        assert!(!QueryValidator::validate("SELECT * FROM a union\n  select * FROM b").valid);
        assert!(!QueryValidator::validate("SELECT * FROM members WHERE name = '' or 1=1").valid);
        assert!(!QueryValidator::validate("SELECT XP_CMDSHELL('dir')").valid);

        let errs = errors("SELECT * FROM a UNION SELECT * FROM b");
        assert_eq!(errs, vec!["Potential SQL injection pattern detected".to_string()]);
    }

    #[test]
    fn substring_matching_over_rejects_literals() {
        let result = QueryValidator::validate("SELECT * FROM notes WHERE body LIKE '%update%' LIMIT 10");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Forbidden keyword detected: UPDATE".to_string()]);
    }

    #[test]
    fn warns_on_missing_limit_and_where() {
        let result = QueryValidator::validate("SELECT * FROM claims");
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec![
                "No LIMIT clause - may return large result set".to_string(),
                "No WHERE clause - query will return all rows".to_string(),
            ]
        );

        let result = QueryValidator::validate("SELECT * FROM claims WHERE status='DENIED' LIMIT 50");
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn sanitized_sql_keeps_original_casing_and_spacing() {
        let sql = "\n  select  id,\n\tstatus from claims where status = 'Denied' limit 5 ";
        let result = QueryValidator::validate(sql);
        assert!(result.valid);
        assert_eq!(result.sanitized_sql.as_deref(), Some(sql.trim()));
    }

    #[test]
    fn ensure_limit_appends_default() {
        assert_eq!(
            QueryValidator::ensure_limit("SELECT * FROM claims;", 100),
            "SELECT * FROM claims LIMIT 100"
        );
        assert_eq!(
            QueryValidator::ensure_limit(" SELECT * FROM claims ", 25),
            "SELECT * FROM claims LIMIT 25"
        );
        assert_eq!(
            QueryValidator::ensure_limit("SELECT * FROM claims limit 5", 100),
            "SELECT * FROM claims limit 5"
        );
    }

    #[test]
    fn ensure_limit_is_idempotent() {
        for sql in [
            "SELECT 1",
            "SELECT * FROM claims WHERE status = 'PAID';",
            "SELECT * FROM claims LIMIT 3",
        ] {
            let once = QueryValidator::ensure_limit(sql, 100);
            assert_eq!(QueryValidator::ensure_limit(&once, 100), once);
        }
    }

    #[test]
    fn sanitize_identifier_strips_everything_else() {
        assert_eq!(QueryValidator::sanitize_identifier("public.claims"), "public.claims");
        assert_eq!(
            QueryValidator::sanitize_identifier("claims\"; DROP TABLE x;--"),
            "claimsDROPTABLEx"
        );
        assert_eq!(QueryValidator::sanitize_identifier("member_id 2"), "member_id2");
    }
}
