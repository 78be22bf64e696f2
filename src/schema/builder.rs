/// Schema pipeline
///
/// `SchemaBuilder` drives the reader table by table and folds the results into
/// a `TemplateContext`. `SchemaAssembler` turns the finished table contexts
/// into one schema document.

use crate::error::{IntrospectionOp, RelgraphError, Result};
use crate::reader::{DatabaseReader, TableName};
use crate::resolver::Operation;
use crate::schema::context::{TableContext, TemplateContext};
use crate::schema::document::{
    Definition, Directive, Document, FieldDefinition, InputValueDefinition, ObjectTypeDefinition,
    SchemaDefinition,
};
use crate::schema::relationships::RelationshipResolver;
use crate::schema::type_mapping::non_null;
use async_graphql::dynamic::TypeRef;
use std::collections::HashSet;

/// Runs the introspection pipeline against one database
pub struct SchemaBuilder<'a> {
    reader: &'a dyn DatabaseReader,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(reader: &'a dyn DatabaseReader) -> Self {
        Self { reader }
    }

    /// Introspect every table and build the hydrated context.
    ///
    /// Tables are processed one at a time in catalog order. A table without a
    /// primary key is skipped with a warning; any catalog failure aborts the run.
    pub async fn build(&self) -> Result<TemplateContext> {
        let engine = self.reader.engine();
        let tables = self.reader.list_tables().await.map_err(|e| {
            RelgraphError::introspection(IntrospectionOp::ListTables, self.reader.database(), e)
        })?;

        tracing::info!(
            "Found {} table(s) in {} ({})",
            tables.len(),
            self.reader.database(),
            engine
        );

        let resolver = RelationshipResolver::new(self.reader);
        let mut contexts = Vec::new();
        let mut warnings = Vec::new();

        for table in tables {
            tracing::info!("Processing table {}", table);

            let columns = self.reader.describe_table(&table).await.map_err(|e| {
                RelgraphError::introspection(IntrospectionOp::DescribeTable, table.to_string(), e)
            })?;

            if !columns.iter().any(|c| c.primary_key) {
                let message = format!("Skipped table {}: no primary key", table);
                tracing::warn!("{}", message);
                warnings.push(message);
                continue;
            }

            let resolved = resolver.resolve(&table).await?;
            let context = TableContext::build(engine, table, columns, resolved);
            warnings.extend(context.warnings.iter().cloned());
            contexts.push(context);
        }

        // Relations may only point at tables that made it into the output
        let retained: HashSet<TableName> = contexts.iter().map(|c| c.table.clone()).collect();
        for context in &mut contexts {
            for field in context.retain_relations(&retained) {
                let message = format!(
                    "Dropped relation field '{}' on {}: target table was skipped",
                    field, context.type_name
                );
                tracing::warn!("{}", message);
                warnings.push(message);
            }
        }

        let document = SchemaAssembler::assemble(&contexts);
        let context = contexts
            .into_iter()
            .fold(TemplateContext::builder(engine.dialect()), |builder, table| {
                builder.add_table(table)
            })
            .warnings(warnings)
            .document(document)
            .build();

        Ok(self.reader.hydrate_context(context))
    }
}

/// Folds table contexts into a schema document
pub struct SchemaAssembler;

impl SchemaAssembler {
    pub fn assemble(tables: &[TableContext]) -> Document {
        let mut document = Document::default();
        let mut query = ObjectTypeDefinition::new("Query");
        let mut mutation = ObjectTypeDefinition::new("Mutation");
        let mut subscription = ObjectTypeDefinition::new("Subscription");

        for table in tables.iter().filter(|t| t.has_primary_key()) {
            let type_name = &table.type_name;
            let keys = table.keys_type();
            let keys_input = table.keys_input.clone();

            let mut connection = ObjectTypeDefinition::new(format!("{}Connection", type_name));
            connection.fields = vec![
                FieldDefinition::new("items", TypeRef::named_list(type_name.as_str())),
                FieldDefinition::new("limit", TypeRef::named(TypeRef::INT)),
                FieldDefinition::new("nextToken", TypeRef::named(keys.name.as_str())),
            ];

            let key_arguments: Vec<InputValueDefinition> = table
                .key_fields
                .iter()
                .map(|k| InputValueDefinition::new(&k.name, non_null(k.ty.clone())))
                .collect();
            let entity = TypeRef::named(type_name.as_str());

            mutation.fields.push(
                FieldDefinition::new(Operation::Delete.field_name(type_name), entity.clone())
                    .arguments(key_arguments.clone()),
            );
            for (operation, input) in [
                (Operation::Create, &table.create_input),
                (Operation::Update, &table.update_input),
            ] {
                let argument = operation.input_argument(type_name).unwrap_or_default();
                mutation.fields.push(
                    FieldDefinition::new(operation.field_name(type_name), entity.clone())
                        .argument(argument, TypeRef::named_nn(input.name.as_str())),
                );
            }

            query.fields.push(
                FieldDefinition::new(Operation::Get.field_name(type_name), entity.clone())
                    .arguments(key_arguments),
            );
            let mut list = FieldDefinition::new(
                Operation::List.field_name(type_name),
                TypeRef::named(connection.name.as_str()),
            )
            .argument("limit", TypeRef::named(TypeRef::INT));
            if let Some(keys_input) = &keys_input {
                list = list.argument("nextToken", TypeRef::named(keys_input.name.as_str()));
            }
            query.fields.push(
                list.argument("tokenFields", TypeRef::named_list(TypeRef::STRING))
                    .argument("tokenFieldTypes", TypeRef::named_list(TypeRef::STRING))
                    .argument("sortDirections", TypeRef::named_list(TypeRef::STRING))
                    .argument("filter", TypeRef::named(TypeRef::STRING)),
            );

            let create = Operation::Create.field_name(type_name);
            subscription.fields.push(
                FieldDefinition::new(format!("onCreate{}", type_name), entity)
                    .directive(Directive::new("aws_subscribe").string_list_argument("mutations", &[create.as_str()])),
            );

            document.push(Definition::Object(keys));
            document.push(Definition::Object(connection));
            document.push(Definition::InputObject(table.create_input.clone()));
            document.push(Definition::Object(table.entity.clone()));
            document.push(Definition::InputObject(table.update_input.clone()));
            if let Some(keys_input) = keys_input {
                document.push(Definition::InputObject(keys_input));
            }
        }

        let mut roots = SchemaDefinition::default();
        if !mutation.fields.is_empty() {
            roots.mutation = Some(mutation.name.clone());
            document.push(Definition::Object(mutation));
        }
        if !query.fields.is_empty() {
            roots.query = Some(query.name.clone());
            document.push(Definition::Object(query));
        }
        if !subscription.fields.is_empty() {
            roots.subscription = Some(subscription.name.clone());
            document.push(Definition::Object(subscription));
        }
        if roots.query.is_some() {
            document.push(Definition::Schema(roots));
        }

        document
    }
}
