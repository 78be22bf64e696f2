/// Query template generation
///
/// For every retained table the generator emits a request and a response
/// mapping template per root operation. Request templates carry statically
/// composed SQL (identifiers quoted per dialect) and pass every value through
/// the request's `variableMap`. Column names that only arrive at runtime are
/// validated inside the template before they are quoted.

pub mod artifacts;
pub mod pagination;
pub mod sql;
pub mod template;

pub use artifacts::{
    template_file_name, ArtifactSink, DirectorySink, MemorySink, ResolverResource, ResolverResources,
};

use crate::error::{RelgraphError, Result};
use crate::reader::TableName;
use crate::schema::naming;
use crate::schema::relationships::{RelationField, RelationKind};
use crate::schema::{TableContext, TemplateContext};
use pagination::DEFAULT_PAGE_LIMIT;
use sea_query::{
    Asterisk, Expr as SqlExpr, IntoColumnRef, JoinType, Query, QueryStatementBuilder,
    SelectStatement, SimpleExpr,
};
use sql::{column, ident, table_ref, Dialect};
use std::collections::HashSet;
use std::fmt;
use template::{
    call, error, for_each, if_else, if_then, list, literal, obj, qr, r, raw, ret, set, string, Expr,
    Template,
};

/// Request template format understood by the data source
pub const TEMPLATE_VERSION: &str = "2018-05-29";

/// Runtime column names must match this before they are quoted
const COLUMN_PATTERN: &str = "^[A-Za-z_][A-Za-z0-9_]*$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Get,
    List,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Get,
        Operation::List,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn root_type(self) -> &'static str {
        match self {
            Operation::Get | Operation::List => "Query",
            _ => "Mutation",
        }
    }

    /// Root field name for an entity type, e.g. `createDog` or `listDogs`
    pub fn field_name(self, type_name: &str) -> String {
        match self {
            Operation::Create => format!("create{}", type_name),
            Operation::Get => format!("get{}", type_name),
            Operation::List => naming::list_field_name(type_name),
            Operation::Update => format!("update{}", type_name),
            Operation::Delete => format!("delete{}", type_name),
        }
    }

    /// Name of the single input argument of create and update
    pub fn input_argument(self, type_name: &str) -> Option<String> {
        match self {
            Operation::Create => Some(format!("create{}Input", type_name)),
            Operation::Update => Some(format!("update{}Input", type_name)),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::Create => "Create",
            Operation::Get => "Get",
            Operation::List => "List",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        };
        f.write_str(label)
    }
}

/// Request and response templates of one root field
#[derive(Debug, Clone)]
pub struct OperationTemplates {
    pub operation: Operation,
    pub type_name: String,
    pub field_name: String,
    pub request: Template,
    pub response: Template,
}

impl OperationTemplates {
    pub fn request_file(&self) -> String {
        template_file_name(self.operation.root_type(), &self.field_name, true)
    }

    pub fn response_file(&self) -> String {
        template_file_name(self.operation.root_type(), &self.field_name, false)
    }
}

pub struct QueryTemplateGenerator<'a> {
    context: &'a TemplateContext,
    data_source_name: &'a str,
}

impl<'a> QueryTemplateGenerator<'a> {
    pub fn new(context: &'a TemplateContext, data_source_name: &'a str) -> Self {
        Self {
            context,
            data_source_name,
        }
    }

    fn dialect(&self) -> Dialect {
        self.context.dialect
    }

    /// Write every template into `sink` and publish the set.
    ///
    /// The first failed write aborts the run before `finish`, so a partial
    /// set is never published.
    pub fn generate(&self, sink: &mut dyn ArtifactSink) -> Result<ResolverResources> {
        let resources = self.write_templates(sink)?;
        sink.finish()?;
        Ok(resources)
    }

    /// Write every template into `sink` without publishing it
    pub fn write_templates(&self, sink: &mut dyn ArtifactSink) -> Result<ResolverResources> {
        let mut resources = ResolverResources::new();

        for table in self.context.tables.values() {
            tracing::info!("Generating templates for {}", table.table);

            for templates in self.table_templates(table)? {
                let request_file = templates.request_file();
                let response_file = templates.response_file();
                sink.write(&request_file, &templates.request.to_string())?;
                sink.write(&response_file, &templates.response.to_string())?;

                resources.insert(
                    ResolverResource::logical_id(&table.type_name, &templates.operation.to_string()),
                    ResolverResource {
                        type_name: templates.operation.root_type().to_string(),
                        field_name: templates.field_name,
                        data_source_name: self.data_source_name.to_string(),
                        request_mapping_template: request_file,
                        response_mapping_template: response_file,
                    },
                );
            }
        }

        Ok(resources)
    }

    pub fn table_templates(&self, table: &TableContext) -> Result<Vec<OperationTemplates>> {
        Operation::ALL
            .iter()
            .map(|&operation| self.operation(table, operation))
            .collect()
    }

    pub fn operation(&self, table: &TableContext, operation: Operation) -> Result<OperationTemplates> {
        if !table.has_primary_key() {
            return Err(RelgraphError::SchemaGeneration(format!(
                "{} has no primary key; no templates can be generated",
                table.table
            )));
        }

        let (request, response) = match operation {
            Operation::Create => (self.create_request(table)?, single_row_response(1)),
            Operation::Get => (self.get_request(table)?, self.get_response(table)),
            Operation::List => (self.list_request(table)?, self.list_response(table)),
            Operation::Update => (self.update_request(table)?, single_row_response(1)),
            Operation::Delete => (self.delete_request(table)?, single_row_response(0)),
        };

        Ok(OperationTemplates {
            operation,
            type_name: table.type_name.clone(),
            field_name: operation.field_name(&table.type_name),
            request,
            response,
        })
    }

    fn quoted_table(&self, table: &TableName) -> Result<String> {
        self.dialect().quote_qualified(table.schema.as_deref(), &table.name)
    }

    fn quote_literal(&self) -> Expr {
        literal(self.dialect().quote_char().to_string())
    }

    /// `"id" = :k0 AND ...` for statements completed at runtime
    fn key_predicate(&self, table: &TableContext) -> Result<String> {
        let dialect = self.dialect();
        let predicates = table
            .key_fields
            .iter()
            .enumerate()
            .map(|(i, key)| Ok(format!("{} = :k{}", dialect.quote(&key.name)?, i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(predicates.join(" AND "))
    }

    /// `column = :k<i>` per key column, optionally qualified by `alias`
    fn key_conditions(&self, table: &TableContext, alias: Option<&str>) -> Result<Vec<SimpleExpr>> {
        table
            .key_fields
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let target = match alias {
                    Some(alias) => column(alias, &key.name)?,
                    None => ident(&key.name)?.into_column_ref(),
                };
                Ok(SqlExpr::col(target).eq(SqlExpr::cust(format!(":k{}", i))))
            })
            .collect()
    }

    /// `SELECT * FROM <table> WHERE <key>`, the row a mutation touched
    fn key_select(&self, table: &TableContext) -> Result<String> {
        let mut select = Query::select();
        select.column(Asterisk).from(table_ref(&table.table)?);
        for condition in self.key_conditions(table, None)? {
            select.and_where(condition);
        }
        Ok(self.dialect().render(&select))
    }

    /// Bind each key value from `$input` as `:k<i>`
    fn key_bindings(&self, table: &TableContext) -> Vec<Expr> {
        let mut bindings = Vec::new();
        for (i, key) in table.key_fields.iter().enumerate() {
            let var = format!("k{}", i);
            bindings.push(set(&var, call("input.get", vec![literal(key.name.as_str())])));
            // String keys travel quoted, numeric keys as numbers
            let value = if key.kind.is_numeric() {
                r(&var)
            } else {
                string(format!("${{{}}}", var))
            };
            bindings.push(qr(call(
                "variables.put",
                vec![string(format!(":k{}", i)), value],
            )));
        }
        bindings
    }

    fn create_request(&self, table: &TableContext) -> Result<Template> {
        let argument = Operation::Create
            .input_argument(&table.type_name)
            .unwrap_or_default();
        let quoted = self.quoted_table(&table.table)?;
        let select = self.key_select(table)?;

        let mut template = Template::new();
        template.push(set("input", r(&format!("ctx.args.{}", argument))));
        template.push(set("variables", obj(vec![])));
        template.push(set("quote", self.quote_literal()));
        template.push(set("columnList", string("")));
        template.push(set("valueList", string("")));
        template.push(for_each(
            "entry",
            r("input.entrySet()"),
            vec![
                validate_column("entry.key"),
                if_then(
                    "$foreach.count > 1",
                    vec![
                        set("columnList", string("${columnList}, ")),
                        set("valueList", string("${valueList}, ")),
                    ],
                ),
                set("columnList", string("${columnList}${quote}${entry.key}${quote}")),
                set("valueList", string("${valueList}:v${foreach.count}")),
                qr(call(
                    "variables.put",
                    vec![string(":v${foreach.count}"), r("entry.value")],
                )),
            ],
        ));
        template.extend(self.key_bindings(table));
        template.push(set("table", literal(quoted)));
        template.push(set("select", literal(select)));
        template.push(set(
            "statements",
            list(vec![
                string("INSERT INTO ${table} (${columnList}) VALUES (${valueList})"),
                r("select"),
            ]),
        ));
        template.push(envelope());
        Ok(template)
    }

    fn update_request(&self, table: &TableContext) -> Result<Template> {
        let argument = Operation::Update
            .input_argument(&table.type_name)
            .unwrap_or_default();
        let quoted = self.quoted_table(&table.table)?;
        let predicate = self.key_predicate(table)?;
        let select = self.key_select(table)?;
        let keys = table
            .key_fields
            .iter()
            .map(|k| literal(k.name.as_str()))
            .collect();

        let mut template = Template::new();
        template.push(set("input", r(&format!("ctx.args.{}", argument))));
        template.push(set("variables", obj(vec![])));
        template.push(set("quote", self.quote_literal()));
        template.push(set("keys", list(keys)));
        template.push(set("assignments", string("")));
        template.push(for_each(
            "entry",
            r("input.entrySet()"),
            vec![if_then(
                "!$keys.contains($entry.key)",
                vec![
                    validate_column("entry.key"),
                    if_then(
                        "$assignments != \"\"",
                        vec![set("assignments", string("${assignments}, "))],
                    ),
                    set(
                        "assignments",
                        string("${assignments}${quote}${entry.key}${quote} = :v${foreach.count}"),
                    ),
                    qr(call(
                        "variables.put",
                        vec![string(":v${foreach.count}"), r("entry.value")],
                    )),
                ],
            )],
        ));
        template.push(if_then(
            "$assignments == \"\"",
            vec![error("No fields to update", "ValidationError")],
        ));
        template.extend(self.key_bindings(table));
        template.push(set("table", literal(quoted)));
        template.push(set("where", literal(predicate)));
        template.push(set("select", literal(select)));
        template.push(set(
            "statements",
            list(vec![
                string("UPDATE ${table} SET ${assignments} WHERE ${where}"),
                r("select"),
            ]),
        ));
        template.push(envelope());
        Ok(template)
    }

    fn delete_request(&self, table: &TableContext) -> Result<Template> {
        let select = self.key_select(table)?;
        let mut delete = Query::delete();
        delete.from_table(table_ref(&table.table)?);
        for condition in self.key_conditions(table, None)? {
            delete.and_where(condition);
        }
        let delete = self.dialect().render(&delete);

        let mut template = Template::new();
        template.push(set("input", r("ctx.args")));
        template.push(set("variables", obj(vec![])));
        template.extend(self.key_bindings(table));
        template.push(set("statements", list(vec![literal(select), literal(delete)])));
        template.push(envelope());
        Ok(template)
    }

    /// Alias of the root table in get and list statements
    fn root_alias(table: &TableContext) -> String {
        let alias = naming::relation_field_name(&table.table);
        let taken = table.relations.iter().any(|relation| {
            relation.name == alias
                || matches!(&relation.kind, RelationKind::ManyToMany { junction_alias, .. } if *junction_alias == alias)
        });
        if taken {
            format!("{}_root", alias)
        } else {
            alias
        }
    }

    /// `SELECT root.* FROM <table> AS root`
    fn root_select(&self, table: &TableContext, root: &str) -> Result<SelectStatement> {
        let mut select = Query::select();
        select
            .column((ident(root)?, Asterisk))
            .from_as(table_ref(&table.table)?, ident(root)?);
        Ok(select)
    }

    /// Root row plus one aggregated JSON array per relation field.
    ///
    /// Postgres joins every relation and groups by the primary key. MySQL
    /// aggregates each relation in its own correlated subquery, since its
    /// JSON aggregate cannot drop the duplicates that several joins produce.
    pub fn get_statement(&self, table: &TableContext) -> Result<String> {
        let dialect = self.dialect();
        let root = Self::root_alias(table);
        let mut select = self.root_select(table, &root)?;

        match dialect {
            Dialect::Postgres => self.join_relations(&mut select, table, &root)?,
            Dialect::MySql => self.correlate_relations(&mut select, table, &root)?,
        }

        for condition in self.key_conditions(table, Some(&root))? {
            select.and_where(condition);
        }
        if dialect == Dialect::Postgres && !table.relations.is_empty() {
            for key in &table.key_fields {
                select.group_by_col(column(&root, &key.name)?);
            }
        }

        Ok(dialect.render(&select))
    }

    /// One LEFT JOIN per relation edge, aggregated per root row
    fn join_relations(&self, select: &mut SelectStatement, table: &TableContext, root: &str) -> Result<()> {
        let mut joined: HashSet<String> = HashSet::new();
        joined.insert(root.to_string());

        for relation in &table.relations {
            let alias = relation.name.as_str();
            let join_column = match &relation.kind {
                RelationKind::BelongsTo(edge) => {
                    select.join_as(
                        JoinType::LeftJoin,
                        table_ref(&relation.target)?,
                        ident(alias)?,
                        SqlExpr::col(column(alias, &edge.foreign_column)?)
                            .equals(column(root, &edge.local_column)?),
                    );
                    edge.foreign_column.as_str()
                }
                RelationKind::HasMany(edge) => {
                    if joined.insert(relation.name.clone()) {
                        select.join_as(
                            JoinType::LeftJoin,
                            table_ref(&relation.target)?,
                            ident(alias)?,
                            SqlExpr::col(column(alias, &edge.foreign_column)?)
                                .equals(column(root, &edge.local_column)?),
                        );
                    }
                    edge.foreign_column.as_str()
                }
                RelationKind::ManyToMany {
                    junction,
                    junction_alias,
                    far,
                } => {
                    if joined.insert(junction_alias.clone()) {
                        select.join_as(
                            JoinType::LeftJoin,
                            table_ref(&junction.foreign_table)?,
                            ident(junction_alias)?,
                            SqlExpr::col(column(junction_alias, &junction.foreign_column)?)
                                .equals(column(root, &junction.local_column)?),
                        );
                    }
                    select.join_as(
                        JoinType::LeftJoin,
                        table_ref(&far.foreign_table)?,
                        ident(alias)?,
                        SqlExpr::col(column(alias, &far.foreign_column)?)
                            .equals(column(junction_alias, &far.local_column)?),
                    );
                    far.foreign_column.as_str()
                }
            };
            joined.insert(alias.to_string());

            select.expr_as(
                SqlExpr::cust(self.aggregate(relation, join_column)?),
                ident(alias)?,
            );
        }
        Ok(())
    }

    /// One correlated subquery per relation field, each yielding a JSON array
    fn correlate_relations(&self, select: &mut SelectStatement, table: &TableContext, root: &str) -> Result<()> {
        for relation in &table.relations {
            let alias = relation.name.as_str();
            let mut rows = Query::select();
            let join_column = match &relation.kind {
                RelationKind::BelongsTo(edge) | RelationKind::HasMany(edge) => {
                    rows.from_as(table_ref(&relation.target)?, ident(alias)?)
                        .and_where(
                            SqlExpr::col(column(alias, &edge.foreign_column)?)
                                .equals(column(root, &edge.local_column)?),
                        );
                    edge.foreign_column.as_str()
                }
                RelationKind::ManyToMany {
                    junction,
                    junction_alias,
                    far,
                } => {
                    rows.from_as(table_ref(&far.foreign_table)?, ident(alias)?)
                        .join_as(
                            JoinType::InnerJoin,
                            table_ref(&junction.foreign_table)?,
                            ident(junction_alias)?,
                            SqlExpr::col(column(alias, &far.foreign_column)?)
                                .equals(column(junction_alias, &far.local_column)?),
                        )
                        .and_where(
                            SqlExpr::col(column(junction_alias, &junction.foreign_column)?)
                                .equals(column(root, &junction.local_column)?),
                        );
                    far.foreign_column.as_str()
                }
            };
            rows.expr(SqlExpr::cust(self.aggregate(relation, join_column)?));

            select.expr_as(
                SimpleExpr::SubQuery(None, Box::new(rows.into_sub_query_statement())),
                ident(alias)?,
            );
        }
        Ok(())
    }

    fn aggregate(&self, relation: &RelationField, join_column: &str) -> Result<String> {
        let columns: Vec<String> = self
            .context
            .table(&relation.target)
            .map(|target| target.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        self.dialect()
            .aggregate_rows(&relation.name, join_column, &columns)
    }

    /// Select list and source of the list statement; paging clauses are appended at runtime
    pub fn list_select(&self, table: &TableContext) -> Result<String> {
        let root = Self::root_alias(table);
        let mut select = self.root_select(table, &root)?;
        self.correlate_relations(&mut select, table, &root)?;
        Ok(self.dialect().render(&select))
    }

    fn get_request(&self, table: &TableContext) -> Result<Template> {
        let mut template = Template::new();
        template.push(set("input", r("ctx.args")));
        template.push(set("variables", obj(vec![])));
        template.extend(self.key_bindings(table));
        template.push(set(
            "statements",
            list(vec![literal(self.get_statement(table)?)]),
        ));
        template.push(envelope());
        Ok(template)
    }

    fn get_response(&self, table: &TableContext) -> Template {
        let mut template = Template::new();
        template.extend(response_prelude());
        template.push(if_then(
            "$output.isEmpty() || $output[0].isEmpty()",
            vec![ret(None)],
        ));
        template.push(set("item", raw("$output[0][0]")));
        template.extend(parse_relations(table, "item"));
        template.push(call("util.toJson", vec![r("item")]));
        template
    }

    fn list_request(&self, table: &TableContext) -> Result<Template> {
        let default_types = table
            .key_fields
            .iter()
            .map(|k| string(k.kind.graphql_name()))
            .collect();

        let mut template = Template::new();
        template.push(set("variables", obj(vec![])));
        template.push(set("quote", self.quote_literal()));
        template.extend(list_defaults(table));
        template.push(set(
            "tokenFieldTypes",
            call("util.defaultIfNull", vec![r("ctx.args.tokenFieldTypes"), list(default_types)]),
        ));
        template.push(set(
            "sortDirections",
            call("util.defaultIfNull", vec![r("ctx.args.sortDirections"), list(vec![])]),
        ));
        template.push(if_then(
            "$sortDirections.isEmpty()",
            vec![for_each(
                "field",
                r("tokenFields"),
                vec![qr(call("sortDirections.add", vec![string("ASC")]))],
            )],
        ));
        template.push(if_then(
            "$tokenFieldTypes.size() != $tokenFields.size() || $sortDirections.size() != $tokenFields.size()",
            vec![error(
                "tokenFields, tokenFieldTypes and sortDirections must have the same length",
                "ValidationError",
            )],
        ));
        template.push(set("seek", string("")));
        template.push(set("group", string("")));
        template.push(set("order", string("")));
        template.push(for_each(
            "field",
            r("tokenFields"),
            vec![
                validate_column("field"),
                set("i", r("foreach.index")),
                set("direction", raw("$sortDirections[$i].toUpperCase()")),
                if_then(
                    "$direction != \"ASC\" && $direction != \"DESC\"",
                    vec![error("Invalid sort direction ${direction}", "ValidationError")],
                ),
                set("column", string("${quote}${field}${quote}")),
                if_then(
                    "$foreach.count > 1",
                    vec![
                        set("group", string("${group}, ")),
                        set("order", string("${order}, ")),
                    ],
                ),
                set("group", string("${group}${column}")),
                set("order", string("${order}${column} ${direction}")),
                if_then(
                    "$ctx.args.nextToken",
                    vec![
                        if_else(
                            "$direction == \"ASC\"",
                            vec![set("operator", string(">="))],
                            vec![set("operator", string("<="))],
                        ),
                        if_then(
                            "$seek != \"\"",
                            vec![set("seek", string("${seek} AND "))],
                        ),
                        set("seek", string("${seek}${column} ${operator} :t${i}")),
                        set("tokenValue", call("ctx.args.nextToken.get", vec![r("field")])),
                        set("tokenType", raw("$tokenFieldTypes[$i]")),
                        // Only numeric token types travel unquoted
                        if_else(
                            "$tokenType == \"Int\" || $tokenType == \"Float\"",
                            vec![qr(call(
                                "variables.put",
                                vec![string(":t${i}"), r("tokenValue")],
                            ))],
                            vec![qr(call(
                                "variables.put",
                                vec![string(":t${i}"), string("${tokenValue}")],
                            ))],
                        ),
                    ],
                ),
            ],
        ));
        template.push(set("where", string("")));
        template.push(if_then(
            "$seek != \"\"",
            vec![set("where", string(" WHERE ${seek}"))],
        ));
        template.push(if_then(
            "$ctx.args.filter",
            vec![if_else(
                "$where == \"\"",
                vec![set("where", string(" WHERE (${ctx.args.filter})"))],
                vec![set("where", string("${where} AND (${ctx.args.filter})"))],
            )],
        ));
        template.push(set("fetch", raw("$limit + 1")));
        template.push(set("select", literal(self.list_select(table)?)));
        template.push(set(
            "statements",
            list(vec![string(
                "${select}${where} GROUP BY ${group} ORDER BY ${order} LIMIT ${fetch}",
            )]),
        ));
        template.push(envelope());
        Ok(template)
    }

    fn list_response(&self, table: &TableContext) -> Template {
        let mut template = Template::new();
        template.extend(response_prelude());
        template.push(set("rows", raw("$output[0]")));
        template.extend(list_defaults(table));
        template.push(set("items", list(vec![])));
        template.push(set("result", obj(vec![("limit", r("limit"))])));
        template.push(for_each(
            "row",
            r("rows"),
            vec![if_else(
                "$foreach.count <= $limit",
                parse_relations(table, "row")
                    .into_iter()
                    .chain([qr(call("items.add", vec![r("row")]))])
                    .collect(),
                vec![
                    set("nextToken", obj(vec![])),
                    for_each(
                        "field",
                        r("tokenFields"),
                        vec![qr(call(
                            "nextToken.put",
                            vec![r("field"), call("row.get", vec![r("field")])],
                        ))],
                    ),
                    qr(call("result.put", vec![string("nextToken"), r("nextToken")])),
                ],
            )],
        ));
        template.push(qr(call("result.put", vec![string("items"), r("items")])));
        template.push(call("util.toJson", vec![r("result")]));
        template
    }
}

/// Replace each relation column of `$<var>` with its parsed JSON value
fn parse_relations(table: &TableContext, var: &str) -> Vec<Expr> {
    let mut parsed_fields = Vec::new();
    for relation in &table.relations {
        let key = string(relation.name.as_str());
        let parsed = call(
            "util.parseJson",
            vec![call(&format!("{}.get", var), vec![key.clone()])],
        );
        if relation.is_list() {
            parsed_fields.push(qr(call(&format!("{}.put", var), vec![key, parsed])));
        } else {
            // Single-valued relations arrive as an array of at most one row
            parsed_fields.push(set("related", parsed));
            parsed_fields.push(if_else(
                "$related.isEmpty()",
                vec![qr(call(&format!("{}.remove", var), vec![key.clone()]))],
                vec![qr(call(&format!("{}.put", var), vec![key, raw("$related[0]")]))],
            ));
        }
    }
    parsed_fields
}

/// `$util.error` unless `$<var>` is a plain column name
fn validate_column(var: &str) -> Expr {
    if_then(
        format!("!$util.matches('{}', ${})", COLUMN_PATTERN, var),
        vec![error(format!("Invalid column name ${{{}}}", var), "ValidationError")],
    )
}

fn envelope() -> Expr {
    obj(vec![
        ("version", string(TEMPLATE_VERSION)),
        ("statements", call("util.toJson", vec![r("statements")])),
        ("variableMap", call("util.toJson", vec![r("variables")])),
    ])
}

fn response_prelude() -> Vec<Expr> {
    vec![
        if_then(
            "$ctx.error",
            vec![call(
                "util.error",
                vec![r("ctx.error.message"), r("ctx.error.type")],
            )],
        ),
        set("output", call("util.rds.toJsonObject", vec![r("ctx.result")])),
    ]
}

/// First row of the `statement`-th result set, or null
fn single_row_response(statement: usize) -> Template {
    let mut template = Template::new();
    template.extend(response_prelude());
    template.push(if_then(
        format!(
            "$output.size() <= {} || $output[{}].isEmpty()",
            statement, statement
        ),
        vec![ret(None)],
    ));
    template.push(call(
        "util.toJson",
        vec![raw(format!("$output[{}][0]", statement))],
    ));
    template
}

/// `$limit` and `$tokenFields` with the table's defaults applied
fn list_defaults(table: &TableContext) -> Vec<Expr> {
    let key_names = table
        .key_fields
        .iter()
        .map(|k| string(k.name.as_str()))
        .collect();
    vec![
        set(
            "limit",
            call(
                "util.defaultIfNull",
                vec![r("ctx.args.limit"), Expr::Int(DEFAULT_PAGE_LIMIT as i64)],
            ),
        ),
        set(
            "tokenFields",
            call("util.defaultIfNull", vec![r("ctx.args.tokenFields"), list(key_names)]),
        ),
    ]
}
