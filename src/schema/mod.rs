pub mod catalog;

use config::{Config, File};
use std::path::Path;
use tracing::{info, warn};

pub use catalog::SchemaCatalog;

/// Renders the table catalog into the text the LLM is grounded on.
pub struct SchemaContextBuilder {
    catalog: SchemaCatalog,
}

impl SchemaContextBuilder {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Loads the catalog from `path`, falling back to the built-in ClaimSight
    /// catalog when no path is given or the file can't be used.
    pub fn load(path: Option<&str>) -> Self {
        let Some(path) = path else {
            info!("No schema catalog configured, using built-in ClaimSight catalog");
            return Self::new(SchemaCatalog::claimsight());
        };

        match Self::read_catalog(Path::new(path)) {
            Ok(catalog) => {
                info!(
                    "Loaded schema catalog from {} ({} tables, {} glossary terms)",
                    path,
                    catalog.schema.tables.len(),
                    catalog.glossary.len()
                );
                Self::new(catalog)
            }
            Err(e) => {
                warn!("Could not load schema catalog {}: {}, using defaults", path, e);
                Self::new(SchemaCatalog::claimsight())
            }
        }
    }

    fn read_catalog(path: &Path) -> Result<SchemaCatalog, config::ConfigError> {
        let catalog: SchemaCatalog = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        if catalog.schema.tables.is_empty() {
            return Err(config::ConfigError::Message(
                "catalog declares no tables".to_string(),
            ));
        }
        Ok(catalog)
    }

    pub fn build_context(&self) -> String {
        let mut context = String::from("DATABASE SCHEMA:\n\n");

        for table in &self.catalog.schema.tables {
            context.push_str(&format!("TABLE: {}\n", table.name));
            if let Some(description) = &table.description {
                context.push_str(&format!("Description: {}\n", description));
            }
            context.push_str("Columns:\n");
            for column in &table.columns {
                context.push_str(&column.to_context_line());
                context.push('\n');
            }
            context.push('\n');
        }

        if !self.catalog.glossary.is_empty() {
            context.push_str("BUSINESS GLOSSARY:\n\n");
            for term in &self.catalog.glossary {
                context.push_str(&format!("{}: {}\n", term.term, term.meaning()));
            }
            context.push('\n');
        }

        context
    }

    pub fn examples(&self) -> Vec<String> {
        self.catalog
            .prompt_patterns
            .iter()
            .map(|p| format!("Prompt: \"{}\"\nSQL: {}", p.pattern, p.template))
            .collect()
    }
}

impl Default for SchemaContextBuilder {
    fn default() -> Self {
        Self::new(SchemaCatalog::claimsight())
    }
}
