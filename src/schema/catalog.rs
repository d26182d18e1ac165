//! Schema catalog: the registry of trait, enum and entity definitions
//!
//! Catalogs are built in code (see [`review_schema`](super::review_schema))
//! or loaded from a single JSON schema file. Loading is all-or-nothing: a
//! malformed file or a composition conflict is FATAL.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::resolver::ShapeResolver;
use super::types::{EntityDef, EnumDef, TraitDef};

/// On-disk layout of a schema file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    traits: Vec<TraitDef>,
    #[serde(default)]
    enums: Vec<EnumDef>,
    #[serde(default)]
    entities: Vec<EntityDef>,
}

/// In-memory registry of definitions, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    traits: BTreeMap<String, TraitDef>,
    enums: BTreeMap<String, EnumDef>,
    entities: BTreeMap<String, EntityDef>,
}

impl SchemaCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from definitions known to have distinct names.
    pub(super) fn from_definitions(
        traits: Vec<TraitDef>,
        enums: Vec<EnumDef>,
        entities: Vec<EntityDef>,
    ) -> Self {
        Self {
            traits: traits.into_iter().map(|d| (d.name.clone(), d)).collect(),
            enums: enums.into_iter().map(|d| (d.name.clone(), d)).collect(),
            entities: entities.into_iter().map(|d| (d.name.clone(), d)).collect(),
        }
    }

    /// Registers a trait.
    ///
    /// Registering an identical definition again is a no-op; a different
    /// definition under the same name is a conflict.
    pub fn register_trait(&mut self, def: TraitDef) -> SchemaResult<()> {
        match self.traits.get(&def.name) {
            Some(existing) if *existing == def => return Ok(()),
            Some(_) => {
                return Err(SchemaError::schema_conflict(
                    &def.name,
                    "trait",
                    "redefined with a different definition",
                ))
            }
            None => {}
        }
        self.traits.insert(def.name.clone(), def);
        Ok(())
    }

    /// Registers an enum. Same redefinition rule as traits.
    pub fn register_enum(&mut self, def: EnumDef) -> SchemaResult<()> {
        match self.enums.get(&def.name) {
            Some(existing) if *existing == def => return Ok(()),
            Some(_) => {
                return Err(SchemaError::schema_conflict(
                    &def.name,
                    "enum",
                    "redefined with a different definition",
                ))
            }
            None => {}
        }
        if def.variants.is_empty() {
            return Err(SchemaError::malformed_definition(
                &def.name,
                "enum must declare at least one variant",
            ));
        }
        self.enums.insert(def.name.clone(), def);
        Ok(())
    }

    /// Registers an entity. Same redefinition rule as traits.
    pub fn register_entity(&mut self, def: EntityDef) -> SchemaResult<()> {
        match self.entities.get(&def.name) {
            Some(existing) if *existing == def => return Ok(()),
            Some(_) => {
                return Err(SchemaError::schema_conflict(
                    &def.name,
                    "entity",
                    "redefined with a different definition",
                ))
            }
            None => {}
        }
        self.entities.insert(def.name.clone(), def);
        Ok(())
    }

    /// Gets a trait by name.
    pub fn trait_def(&self, name: &str) -> Option<&TraitDef> {
        self.traits.get(name)
    }

    /// Gets an enum by name.
    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Gets an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Entity names in sorted order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Returns the number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Loads a catalog from a JSON schema file.
    ///
    /// Every entity is resolved before the catalog is returned, so a
    /// successfully loaded catalog never fails shape resolution later.
    pub fn load_file(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let file: SchemaFile = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        let mut catalog = SchemaCatalog::new();
        for def in file.traits {
            catalog.register_trait(def)?;
        }
        for def in file.enums {
            catalog.register_enum(def)?;
        }
        for def in file.entities {
            catalog.register_entity(def)?;
        }

        ShapeResolver::new(&catalog).resolve_all()?;

        Ok(catalog)
    }

    /// Writes the catalog to `path` as pretty-printed JSON.
    pub fn save_file(&self, path: &Path) -> SchemaResult<()> {
        let file = SchemaFile {
            traits: self.traits.values().cloned().collect(),
            enums: self.enums.values().cloned().collect(),
            entities: self.entities.values().cloned().collect(),
        };

        let content = serde_json::to_string_pretty(&file).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to serialize schema: {}", e),
            )
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    SchemaError::malformed_schema(
                        parent.display().to_string(),
                        format!("Failed to create directory: {}", e),
                    )
                })?;
            }
        }

        fs::write(path, content).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to write file: {}", e),
            )
        })
    }
}
