use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
}

impl ColumnSchema {
    fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            description: None,
            nullable: None,
        }
    }

    fn described(name: &str, data_type: &str, description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::new(name, data_type)
        }
    }

    /// `name (type)` with ` - description` appended when known
    pub fn to_context_line(&self) -> String {
        let nullable_str = if self.nullable == Some(false) { ", not null" } else { "" };
        let mut line = format!("  - {} ({}{})", self.name, self.data_type, nullable_str);
        if let Some(description) = &self.description {
            line.push_str(" - ");
            line.push_str(description);
        }
        line
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    #[serde(default)]
    pub expansion: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GlossaryTerm {
    pub fn meaning(&self) -> &str {
        self.expansion
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPattern {
    pub pattern: String,
    pub template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableList {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

/// Everything the LLM is told about the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub schema: TableList,
    #[serde(default)]
    pub glossary: Vec<GlossaryTerm>,
    #[serde(default)]
    pub prompt_patterns: Vec<PromptPattern>,
}

impl SchemaCatalog {
    /// The ClaimSight tables exposed through Hasura.
    pub fn claimsight() -> Self {
        let tables = vec![
            TableSchema {
                name: "members".to_string(),
                description: Some("Health plan members and patients".to_string()),
                columns: vec![
                    ColumnSchema::new("id", "uuid"),
                    ColumnSchema::new("first_name", "text"),
                    ColumnSchema::new("last_name", "text"),
                    ColumnSchema::described("dob", "date", "Date of birth"),
                    ColumnSchema::described(
                        "plan",
                        "text",
                        "Insurance plan type: PPO, HMO, EPO, POS, HDHP",
                    ),
                ],
            },
            TableSchema {
                name: "provider_records".to_string(),
                description: Some("Healthcare providers (doctors, hospitals, clinics)".to_string()),
                columns: vec![
                    ColumnSchema::new("id", "uuid"),
                    ColumnSchema::described("npi", "text", "National Provider Identifier"),
                    ColumnSchema::new("name", "text"),
                    ColumnSchema::described("specialty", "text", "Medical specialty"),
                ],
            },
            TableSchema {
                name: "claims".to_string(),
                description: Some("Medical claims for services rendered".to_string()),
                columns: vec![
                    ColumnSchema::new("id", "uuid"),
                    ColumnSchema::new("member_id", "uuid"),
                    ColumnSchema::new("provider_id", "uuid"),
                    ColumnSchema::described("dos", "date", "Date of service"),
                    ColumnSchema::described("cpt", "text", "Current Procedural Terminology code"),
                    ColumnSchema::described("charge_cents", "integer", "Amount charged in cents"),
                    ColumnSchema::described(
                        "allowed_cents",
                        "integer",
                        "Amount allowed by insurance in cents",
                    ),
                    ColumnSchema::described(
                        "status",
                        "text",
                        "Claim status: PAID, DENIED, PENDING",
                    ),
                    ColumnSchema::described("denial_reason", "text", "Reason for claim denial"),
                ],
            },
            TableSchema {
                name: "notes".to_string(),
                description: Some("Case management notes for members".to_string()),
                columns: vec![
                    ColumnSchema::new("id", "uuid"),
                    ColumnSchema::new("member_id", "uuid"),
                    ColumnSchema::new("created_at", "timestamptz"),
                    ColumnSchema::described("body", "text", "Note content"),
                ],
            },
        ];

        let glossary = vec![
            GlossaryTerm {
                term: "PA".to_string(),
                expansion: Some("Prior Authorization".to_string()),
                description: None,
            },
            GlossaryTerm {
                term: "step therapy".to_string(),
                expansion: None,
                description: Some(
                    "Insurance requirement to try lower-cost drugs first".to_string(),
                ),
            },
            GlossaryTerm {
                term: "allowed amount".to_string(),
                expansion: None,
                description: Some(
                    "Maximum amount insurance will pay for a service".to_string(),
                ),
            },
        ];

        let prompt_patterns = vec![PromptPattern {
            pattern: "top {n} denial reasons".to_string(),
            template: "SELECT denial_reason, COUNT(*) as count FROM claims WHERE status = 'DENIED' GROUP BY denial_reason ORDER BY count DESC LIMIT {n}".to_string(),
        }];

        Self {
            schema: TableList { tables },
            glossary,
            prompt_patterns,
        }
    }
}
