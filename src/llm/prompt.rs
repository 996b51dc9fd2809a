/// System instruction shared by every backend.
pub fn build_system_prompt(schema_context: &str, examples: &[String]) -> String {
    let examples_block = if examples.is_empty() {
        String::new()
    } else {
        format!("\nEXAMPLES:\n{}\n", examples.join("\n\n"))
    };

    format!(
        r#"You are an expert PostgreSQL query generator for a healthcare claims management system.

SCHEMA CONTEXT:
{}

SAFETY RULES:
1. ONLY generate SELECT queries - NO INSERT, UPDATE, DELETE, DROP, or ALTER
2. Always include appropriate WHERE clauses to limit results
3. Use LIMIT clause (default 100) to prevent large result sets
4. Validate that referenced tables and columns exist in the schema
5. Use proper JOIN syntax for relationships
6. Handle NULL values appropriately
7. Return a single statement without comments or trailing semicolons

OUTPUT FORMAT:
Respond with valid JSON only (no markdown, no explanation outside JSON):
{{
  "sql": "SELECT ...",
  "explanation": "This query retrieves...",
  "confidence": 0.95,
  "warnings": ["Large result set possible"]
}}
{}
Generate accurate, safe PostgreSQL queries based on the user's natural language request."#,
        schema_context, examples_block
    )
}

/// User turn sent alongside the system prompt.
pub fn build_user_prompt(prompt: &str) -> String {
    format!(
        "Generate a PostgreSQL query for: {}\n\nRespond with valid JSON containing sql, explanation, confidence (0-1), and warnings array.",
        prompt
    )
}
