/// Relationship resolution
///
/// Foreign-key direction alone decides cardinality. An edge this table holds
/// becomes a single related object; an edge pointing at this table becomes a
/// list. A referencing table with more than one outgoing edge is treated as a
/// junction, and each of its other targets becomes a `<far>_via_<junction>` list.

use crate::error::{IntrospectionOp, RelgraphError, Result};
use crate::reader::{DatabaseReader, RelationshipEdge, RelationshipEdges, TableName};
use crate::schema::naming;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Outgoing edge: this table holds the foreign key
    BelongsTo(RelationshipEdge),
    /// Incoming edge: the target table references this one
    HasMany(RelationshipEdge),
    /// Through a junction table
    ManyToMany {
        /// Incoming edge from the junction to this table
        junction: RelationshipEdge,
        /// Relation name of the junction, e.g. `dog_owners`
        junction_alias: String,
        /// Junction's outgoing edge to the far table
        far: RelationshipEdge,
    },
}

/// A relationship surfaced as a field on the entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationField {
    pub name: String,
    pub target: TableName,
    pub kind: RelationKind,
}

impl RelationField {
    pub fn is_list(&self) -> bool {
        !matches!(self.kind, RelationKind::BelongsTo(_))
    }
}

/// Relation fields of one table plus every edge set that was read to build them
#[derive(Debug, Clone, Default)]
pub struct ResolvedRelationships {
    pub fields: Vec<RelationField>,
    pub edges: IndexMap<TableName, RelationshipEdges>,
}

/// Classify `own` edges of `table` into relation fields.
///
/// `lookup` returns the edges of a referencing table, used for junction detection.
pub fn classify<'a, F>(table: &TableName, own: &RelationshipEdges, lookup: F) -> Vec<RelationField>
where
    F: Fn(&TableName) -> Option<&'a RelationshipEdges>,
{
    let mut fields = Vec::new();

    for (column, edge) in &own.outgoing {
        fields.push(RelationField {
            name: naming::belongs_to_field_name(column, &edge.foreign_table),
            target: edge.foreign_table.clone(),
            kind: RelationKind::BelongsTo(edge.clone()),
        });
    }

    for (referencing, edge) in &own.incoming {
        let junction_alias = naming::relation_field_name(referencing);
        fields.push(RelationField {
            name: junction_alias.clone(),
            target: referencing.clone(),
            kind: RelationKind::HasMany(edge.clone()),
        });

        let Some(junction_edges) = lookup(referencing) else {
            continue;
        };

        // A single outgoing edge is a plain parent link
        if junction_edges.outgoing.len() <= 1 {
            continue;
        }

        for far in junction_edges.outgoing.values() {
            if &far.foreign_table == table {
                continue;
            }
            fields.push(RelationField {
                name: format!(
                    "{}_via_{}",
                    naming::relation_field_name(&far.foreign_table),
                    junction_alias
                ),
                target: far.foreign_table.clone(),
                kind: RelationKind::ManyToMany {
                    junction: edge.clone(),
                    junction_alias: junction_alias.clone(),
                    far: far.clone(),
                },
            });
        }
    }

    fields
}

/// Reads foreign keys through a `DatabaseReader` and classifies them
pub struct RelationshipResolver<'a> {
    reader: &'a dyn DatabaseReader,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(reader: &'a dyn DatabaseReader) -> Self {
        Self { reader }
    }

    /// Resolve the relation fields of `table`.
    ///
    /// Every referencing table's edges are fetched again for junction detection,
    /// so the same table may be read several times in one run.
    pub async fn resolve(&self, table: &TableName) -> Result<ResolvedRelationships> {
        let own = self.fetch(table).await?;

        let mut edges = IndexMap::new();
        edges.insert(table.clone(), own.clone());

        for referencing in own.incoming.keys() {
            let referencing_edges = self.fetch(referencing).await?;
            edges.entry(referencing.clone()).or_insert(referencing_edges);
        }

        let fields = classify(table, &own, |t| edges.get(t));
        tracing::debug!("Resolved {} relation field(s) for {}", fields.len(), table);

        Ok(ResolvedRelationships { fields, edges })
    }

    async fn fetch(&self, table: &TableName) -> Result<RelationshipEdges> {
        self.reader
            .foreign_key_references(table)
            .await
            .map_err(|e| RelgraphError::introspection(IntrospectionOp::ForeignKeys, table.to_string(), e))
    }
}
