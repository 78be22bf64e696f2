/// Per-table and aggregate generation contexts
///
/// A `TableContext` is everything the assembler and the template generator
/// need to know about one table. The `TemplateContext` aggregates the retained
/// tables and is extended one table at a time through `TemplateContextBuilder`.

use crate::reader::{ColumnDescription, ConnectionInfo, Engine, RelationshipEdges, TableName};
use crate::resolver::sql::Dialect;
use crate::schema::document::{
    Document, FieldDefinition, InputObjectTypeDefinition, InputValueDefinition, ObjectTypeDefinition,
};
use crate::schema::naming;
use crate::schema::relationships::{RelationField, RelationKind, ResolvedRelationships};
use crate::schema::type_mapping::{column_kind, column_type, non_null, ScalarKind};
use async_graphql::dynamic::TypeRef;
use indexmap::IndexMap;
use std::collections::HashSet;

/// One primary-key column
#[derive(Debug, Clone)]
pub struct KeyField {
    pub name: String,
    pub kind: ScalarKind,
    /// Nullable GraphQL type of the column
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct TableContext {
    pub table: TableName,
    pub type_name: String,
    pub entity: ObjectTypeDefinition,
    pub create_input: InputObjectTypeDefinition,
    pub update_input: InputObjectTypeDefinition,
    /// `None` when the table has no primary key
    pub keys_input: Option<InputObjectTypeDefinition>,
    /// Primary-key columns in key order
    pub key_fields: Vec<KeyField>,
    pub string_fields: Vec<String>,
    pub int_fields: Vec<String>,
    pub columns: Vec<ColumnDescription>,
    pub relations: Vec<RelationField>,
    /// Edges of this table and of every table read while resolving it
    pub relationships: IndexMap<TableName, RelationshipEdges>,
    /// Relation fields omitted because their name was already taken
    pub warnings: Vec<String>,
}

impl TableContext {
    pub fn build(
        engine: Engine,
        table: TableName,
        columns: Vec<ColumnDescription>,
        resolved: ResolvedRelationships,
    ) -> Self {
        let type_name = naming::type_name(&table);
        let mut entity = ObjectTypeDefinition::new(&type_name);
        let mut create_input = InputObjectTypeDefinition::new(format!("Create{}Input", type_name));
        let mut update_input = InputObjectTypeDefinition::new(format!("Update{}Input", type_name));
        let mut string_fields = Vec::new();
        let mut int_fields = Vec::new();

        let belongs_to: IndexMap<&str, usize> = resolved
            .fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match &f.kind {
                RelationKind::BelongsTo(edge) => Some((edge.local_column.as_str(), i)),
                _ => None,
            })
            .collect();
        let column_names: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();

        let mut keyed = Vec::new();
        let mut deferred = Vec::new();
        // Indices into `resolved.fields` that became entity fields
        let mut placed = Vec::new();
        let mut warnings = Vec::new();

        for column in &columns {
            let base = column_type(engine, column);
            let kind = column_kind(engine, column);

            let create_type = if column.primary_key || (!column.nullable && column.default.is_none()) {
                non_null(base.clone())
            } else {
                base.clone()
            };
            let update_type = if column.primary_key {
                non_null(base.clone())
            } else {
                base.clone()
            };
            create_input
                .fields
                .push(InputValueDefinition::new(&column.name, create_type));
            update_input
                .fields
                .push(InputValueDefinition::new(&column.name, update_type));

            if column.primary_key {
                keyed.push((column.key_ordinal, KeyField {
                    name: column.name.clone(),
                    kind,
                    ty: base.clone(),
                }));
            }

            if let Some(&index) = belongs_to.get(column.name.as_str()) {
                let relation = &resolved.fields[index];
                if column.primary_key {
                    // Key columns stay scalar; the object is added after the columns
                    deferred.push(index);
                } else if (relation.name != column.name && column_names.contains(relation.name.as_str()))
                    || entity.has_field(&relation.name)
                {
                    // The foreign-key column stays scalar instead
                    warnings.push(collision_warning(relation, &type_name));
                } else {
                    let target = naming::type_name(&relation.target);
                    entity
                        .fields
                        .push(FieldDefinition::new(&relation.name, TypeRef::named(target)));
                    placed.push(index);
                    continue;
                }
            }

            let entity_type = if column.primary_key || !column.nullable {
                non_null(base)
            } else {
                base
            };
            entity.fields.push(FieldDefinition::new(&column.name, entity_type));

            if !column.primary_key && !belongs_to.contains_key(column.name.as_str()) {
                match kind {
                    ScalarKind::Int => int_fields.push(column.name.clone()),
                    ScalarKind::String => string_fields.push(column.name.clone()),
                    _ => {}
                }
            }
        }

        for index in deferred {
            let relation = &resolved.fields[index];
            if entity.has_field(&relation.name) {
                warnings.push(collision_warning(relation, &type_name));
                continue;
            }
            let target = naming::type_name(&relation.target);
            entity
                .fields
                .push(FieldDefinition::new(&relation.name, TypeRef::named(target)));
            placed.push(index);
        }

        for (index, relation) in resolved.fields.iter().enumerate().filter(|(_, f)| f.is_list()) {
            if entity.has_field(&relation.name) {
                warnings.push(collision_warning(relation, &type_name));
                continue;
            }
            let target = naming::type_name(&relation.target);
            entity
                .fields
                .push(FieldDefinition::new(&relation.name, TypeRef::named_list(target)));
            placed.push(index);
        }

        // Key order follows the declared key, not the column order
        keyed.sort_by_key(|(ordinal, _)| ordinal.unwrap_or(u32::MAX));
        let key_fields: Vec<KeyField> = keyed.into_iter().map(|(_, k)| k).collect();

        let keys_input = (!key_fields.is_empty()).then(|| {
            let mut input = InputObjectTypeDefinition::new(format!("{}KeysInput", type_name));
            input.fields = key_fields
                .iter()
                .map(|k| InputValueDefinition::new(&k.name, k.ty.clone()))
                .collect();
            input
        });

        // Relation fields that never made it onto the entity are not joined either
        let relations = resolved
            .fields
            .into_iter()
            .enumerate()
            .filter(|(i, _)| placed.contains(i))
            .map(|(_, f)| f)
            .collect();

        Self {
            table,
            type_name,
            entity,
            create_input,
            update_input,
            keys_input,
            key_fields,
            string_fields,
            int_fields,
            columns,
            relations,
            relationships: resolved.edges,
            warnings,
        }
    }

    pub fn has_primary_key(&self) -> bool {
        !self.key_fields.is_empty()
    }

    /// `<T>Keys` object used as the connection's `nextToken`
    pub fn keys_type(&self) -> ObjectTypeDefinition {
        let mut keys = ObjectTypeDefinition::new(format!("{}Keys", self.type_name));
        keys.fields = self
            .key_fields
            .iter()
            .map(|k| FieldDefinition::new(&k.name, k.ty.clone()))
            .collect();
        keys
    }

    /// Drop relation fields whose target is not in `retained`, returning their names.
    ///
    /// A dropped single-valued relation gives its foreign-key column back to
    /// the entity as a scalar field.
    pub fn retain_relations(&mut self, retained: &HashSet<TableName>) -> Vec<String> {
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .relations
            .drain(..)
            .partition(|relation| retained.contains(&relation.target));
        self.relations = kept;

        for relation in &dropped {
            let Some(position) = self.entity.fields.iter().position(|f| f.name == relation.name) else {
                continue;
            };
            let restored = match &relation.kind {
                RelationKind::BelongsTo(edge) => self.scalar_field(&edge.local_column),
                _ => None,
            };
            match restored {
                Some(field) if !self.entity.has_field(&field.name) => self.entity.fields[position] = field,
                _ => {
                    self.entity.fields.remove(position);
                }
            }
        }

        dropped.into_iter().map(|r| r.name).collect()
    }

    /// Entity field for a plain column
    fn scalar_field(&self, column: &str) -> Option<FieldDefinition> {
        let description = self.column(column)?;
        // Update inputs carry the nullable base type of every non-key column
        let base = self.update_input.field(column)?.ty.clone();
        let ty = if description.nullable { base } else { non_null(base) };
        Some(FieldDefinition::new(column, ty))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn collision_warning(relation: &RelationField, type_name: &str) -> String {
    let message = format!(
        "Relation field '{}' on {} collides with an existing field and is omitted",
        relation.name, type_name
    );
    tracing::warn!("{}", message);
    message
}

/// Aggregate of every retained table, plus connectivity metadata
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub document: Document,
    pub tables: IndexMap<TableName, TableContext>,
    pub primary_keys: IndexMap<TableName, Vec<KeyField>>,
    pub string_fields: IndexMap<TableName, Vec<String>>,
    pub int_fields: IndexMap<TableName, Vec<String>>,
    pub relationships: IndexMap<TableName, RelationshipEdges>,
    /// Tables skipped and fields dropped during the run
    pub warnings: Vec<String>,
    pub dialect: Dialect,
    pub connection: Option<ConnectionInfo>,
    pub database_schema: String,
}

impl TemplateContext {
    pub fn builder(dialect: Dialect) -> TemplateContextBuilder {
        TemplateContextBuilder::new(dialect)
    }

    pub fn table(&self, table: &TableName) -> Option<&TableContext> {
        self.tables.get(table)
    }

    /// Attach connectivity metadata
    pub fn with_connection(mut self, connection: ConnectionInfo, database_schema: String) -> Self {
        self.connection = Some(connection);
        self.database_schema = database_schema;
        self
    }
}

/// Builds a `TemplateContext` one table at a time
pub struct TemplateContextBuilder {
    context: TemplateContext,
}

impl TemplateContextBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            context: TemplateContext {
                dialect,
                ..TemplateContext::default()
            },
        }
    }

    /// Add a finished table; edge sets already recorded by an earlier table are kept
    pub fn add_table(mut self, table: TableContext) -> Self {
        let name = table.table.clone();
        self.context
            .primary_keys
            .insert(name.clone(), table.key_fields.clone());
        self.context
            .string_fields
            .insert(name.clone(), table.string_fields.clone());
        self.context
            .int_fields
            .insert(name.clone(), table.int_fields.clone());
        for (edge_table, edges) in &table.relationships {
            self.context
                .relationships
                .entry(edge_table.clone())
                .or_insert_with(|| edges.clone());
        }
        self.context.tables.insert(name, table);
        self
    }

    pub fn warning(mut self, message: impl Into<String>) -> Self {
        self.context.warnings.push(message.into());
        self
    }

    pub fn warnings(mut self, messages: impl IntoIterator<Item = String>) -> Self {
        self.context.warnings.extend(messages);
        self
    }

    pub fn document(mut self, document: Document) -> Self {
        self.context.document = document;
        self
    }

    pub fn build(self) -> TemplateContext {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::RelationshipEdge;
    use crate::schema::relationships::classify;

    fn dog_columns() -> Vec<ColumnDescription> {
        vec![
            ColumnDescription::new("id", "integer").primary_key(1),
            ColumnDescription::new("name", "character varying"),
        ]
    }

    fn build(table: &str, columns: Vec<ColumnDescription>, own: RelationshipEdges) -> TableContext {
        let table = TableName::new(table);
        let fields = classify(&table, &own, |_| None);
        let mut edges = IndexMap::new();
        edges.insert(table.clone(), own);
        TableContext::build(
            Engine::Postgres,
            table,
            columns,
            ResolvedRelationships { fields, edges },
        )
    }

    fn printed_fields(fields: &[FieldDefinition]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn printed_inputs(fields: &[InputValueDefinition]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_simple_table_types() {
        let context = build("Dog", dog_columns(), RelationshipEdges::default());

        assert_eq!(context.type_name, "Dog");
        assert_eq!(printed_fields(&context.entity.fields), vec!["id: Int!", "name: String"]);
        assert_eq!(context.create_input.name, "CreateDogInput");
        assert_eq!(
            printed_inputs(&context.create_input.fields),
            vec!["id: Int!", "name: String"]
        );
        assert_eq!(
            printed_inputs(&context.update_input.fields),
            vec!["id: Int!", "name: String"]
        );
        assert_eq!(context.string_fields, vec!["name"]);
        assert!(context.int_fields.is_empty());

        let keys_input = context.keys_input.unwrap();
        assert_eq!(keys_input.name, "DogKeysInput");
        assert_eq!(printed_inputs(&keys_input.fields), vec!["id: Int"]);
    }

    #[test]
    fn test_create_input_defaults_make_columns_optional() {
        let columns = vec![
            ColumnDescription::new("id", "serial").primary_key(1).with_default("nextval('s')"),
            ColumnDescription::new("age", "integer").not_null().with_default("0"),
            ColumnDescription::new("name", "text").not_null(),
        ];
        let context = build("Dog", columns, RelationshipEdges::default());

        assert_eq!(
            printed_inputs(&context.create_input.fields),
            vec!["id: Int!", "age: Int", "name: String!"]
        );
        assert_eq!(
            printed_fields(&context.entity.fields),
            vec!["id: Int!", "age: Int!", "name: String!"]
        );
        assert_eq!(
            printed_inputs(&context.update_input.fields),
            vec!["id: Int!", "age: Int", "name: String"]
        );
        assert_eq!(context.int_fields, vec!["age"]);
    }

    #[test]
    fn test_foreign_key_column_becomes_object_field() {
        let mut own = RelationshipEdges::default();
        own.outgoing.insert(
            "dogId".to_string(),
            RelationshipEdge::new("dogId", TableName::new("Dog"), "id"),
        );
        let columns = vec![
            ColumnDescription::new("id", "integer").primary_key(1),
            ColumnDescription::new("dogId", "integer").not_null(),
            ColumnDescription::new("name", "text"),
        ];

        let context = build("Owner", columns, own);
        assert_eq!(
            printed_fields(&context.entity.fields),
            vec!["id: Int!", "dog: Dog", "name: String"]
        );
        // Inputs carry the raw key column
        assert_eq!(
            printed_inputs(&context.create_input.fields),
            vec!["id: Int!", "dogId: Int!", "name: String"]
        );
        assert!(context.int_fields.is_empty());
        assert_eq!(context.relations.len(), 1);
    }

    #[test]
    fn test_key_column_that_is_also_foreign_key() {
        let mut own = RelationshipEdges::default();
        own.outgoing.insert(
            "dogId".to_string(),
            RelationshipEdge::new("dogId", TableName::new("Dog"), "id"),
        );
        let columns = vec![ColumnDescription::new("dogId", "integer").primary_key(1)];

        let context = build("Passport", columns, own);
        assert_eq!(
            printed_fields(&context.entity.fields),
            vec!["dogId: Int!", "dog: Dog"]
        );
    }

    fn dog_reference() -> RelationshipEdges {
        let mut own = RelationshipEdges::default();
        own.outgoing.insert(
            "dogId".to_string(),
            RelationshipEdge::new("dogId", TableName::new("Dog"), "id"),
        );
        own
    }

    #[test]
    fn test_relation_colliding_with_earlier_column_keeps_key_column() {
        let columns = vec![
            ColumnDescription::new("id", "integer").primary_key(1),
            ColumnDescription::new("dog", "text"),
            ColumnDescription::new("dogId", "integer"),
        ];

        let context = build("Owner", columns, dog_reference());
        assert_eq!(
            printed_fields(&context.entity.fields),
            vec!["id: Int!", "dog: String", "dogId: Int"]
        );
        assert!(context.relations.is_empty());
        assert_eq!(context.warnings.len(), 1);
        assert!(context.warnings[0].contains("'dog' on Owner"));
    }

    #[test]
    fn test_relation_colliding_with_later_column_keeps_key_column() {
        let columns = vec![
            ColumnDescription::new("id", "integer").primary_key(1),
            ColumnDescription::new("dogId", "integer"),
            ColumnDescription::new("dog", "text"),
        ];

        let context = build("Owner", columns, dog_reference());
        assert_eq!(
            printed_fields(&context.entity.fields),
            vec!["id: Int!", "dogId: Int", "dog: String"]
        );
        assert!(context.relations.is_empty());
        assert_eq!(context.warnings.len(), 1);
    }

    #[test]
    fn test_list_relation_colliding_with_column_is_omitted() {
        let mut own = RelationshipEdges::default();
        own.incoming.insert(
            TableName::new("Owner"),
            RelationshipEdge::new("id", TableName::new("Owner"), "dogId"),
        );
        let columns = vec![
            ColumnDescription::new("id", "integer").primary_key(1),
            ColumnDescription::new("owners", "text"),
        ];

        let context = build("Dog", columns, own);
        assert_eq!(
            printed_fields(&context.entity.fields),
            vec!["id: Int!", "owners: String"]
        );
        assert!(context.relations.is_empty());
        assert_eq!(context.warnings.len(), 1);
    }

    #[test]
    fn test_composite_key_follows_key_order() {
        let columns = vec![
            ColumnDescription::new("owner_id", "integer").primary_key(2),
            ColumnDescription::new("since", "date"),
            ColumnDescription::new("dog_id", "uuid").primary_key(1),
        ];
        let context = build("Adoption", columns, RelationshipEdges::default());

        let names: Vec<_> = context.key_fields.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["dog_id", "owner_id"]);
        assert_eq!(context.key_fields[0].kind, ScalarKind::Id);
        assert_eq!(
            printed_inputs(&context.keys_input.unwrap().fields),
            vec!["dog_id: ID", "owner_id: Int"]
        );
    }

    #[test]
    fn test_table_without_key_has_no_keys_input() {
        let columns = vec![ColumnDescription::new("message", "text")];
        let context = build("AuditLog", columns, RelationshipEdges::default());
        assert!(!context.has_primary_key());
        assert!(context.keys_input.is_none());
    }

    #[test]
    fn test_retain_relations_drops_unknown_targets() {
        let mut own = RelationshipEdges::default();
        own.outgoing.insert(
            "logId".to_string(),
            RelationshipEdge::new("logId", TableName::new("AuditLog"), "id"),
        );
        let mut context = build(
            "Dog",
            vec![
                ColumnDescription::new("id", "integer").primary_key(1),
                ColumnDescription::new("logId", "integer"),
            ],
            own,
        );

        let retained: HashSet<TableName> = [TableName::new("Dog")].into_iter().collect();
        let dropped = context.retain_relations(&retained);
        assert_eq!(dropped, vec!["log"]);
        assert!(context.relations.is_empty());
        assert_eq!(printed_fields(&context.entity.fields), vec!["id: Int!", "logId: Int"]);
    }

    #[test]
    fn test_retain_relations_drops_list_fields() {
        let mut own = RelationshipEdges::default();
        own.incoming.insert(
            TableName::new("AuditLog"),
            RelationshipEdge::new("id", TableName::new("AuditLog"), "dogId"),
        );
        let mut context = build("Dog", dog_columns(), own);
        assert!(context.entity.has_field("audit_logs"));

        let retained: HashSet<TableName> = [TableName::new("Dog")].into_iter().collect();
        assert_eq!(context.retain_relations(&retained), vec!["audit_logs"]);
        assert_eq!(printed_fields(&context.entity.fields), vec!["id: Int!", "name: String"]);
    }

    #[test]
    fn test_builder_keeps_first_edge_set() {
        let first = build("Dog", dog_columns(), RelationshipEdges::default());
        let mut second = build("Cat", dog_columns(), RelationshipEdges::default());
        let mut changed = RelationshipEdges::default();
        changed.outgoing.insert(
            "x".to_string(),
            RelationshipEdge::new("x", TableName::new("Y"), "id"),
        );
        second.relationships.insert(TableName::new("Dog"), changed);

        let context = TemplateContext::builder(Dialect::Postgres)
            .add_table(first)
            .add_table(second)
            .warning("skipped")
            .build();

        assert!(context.relationships[&TableName::new("Dog")].is_empty());
        assert_eq!(context.tables.len(), 2);
        assert_eq!(context.primary_keys[&TableName::new("Cat")].len(), 1);
        assert_eq!(context.warnings, vec!["skipped"]);
    }
}
