/// Integration tests for the introspection pipeline
///
/// These tests drive `SchemaBuilder` against an in-memory catalog and verify:
/// - Entity, input and root types for a single table
/// - One-to-many and many-to-many relation fields
/// - Primary-key gating and composite keys
/// - Structured introspection errors

mod common;

mod pipeline_tests {
    use super::common::{dog_columns, junction_catalog, parent_catalog, InMemoryCatalog};
    use relgraph::error::{IntrospectionOp, RelgraphError};
    use relgraph::reader::{ColumnDescription, Engine, TableName};
    use relgraph::schema::SchemaBuilder;

    fn sdl_field<'a>(sdl: &'a str, type_name: &str, field: &str) -> Option<&'a str> {
        let header = format!("type {} {{\n", type_name);
        let start = sdl.find(&header)? + header.len();
        let end = start + sdl[start..].find('}')?;
        sdl[start..end]
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(&format!("{}:", field)) || line.starts_with(&format!("{}(", field)))
    }

    #[tokio::test]
    async fn test_single_table_schema() {
        let _ = tracing_subscriber::fmt::try_init();

        let catalog = InMemoryCatalog::new(Engine::Postgres).table("Dog", dog_columns());
        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        let sdl = context.document.to_string();

        assert!(sdl.contains("type Dog {\n  id: Int!\n  name: String\n}\n"));
        assert!(sdl.contains("input CreateDogInput {\n  id: Int!\n  name: String\n}\n"));
        assert!(sdl.contains("input UpdateDogInput {\n  id: Int!\n  name: String\n}\n"));
        assert_eq!(sdl_field(&sdl, "Query", "getDog"), Some("getDog(id: Int!): Dog"));
        assert_eq!(
            sdl_field(&sdl, "Query", "listDogs"),
            Some("listDogs(limit: Int, nextToken: DogKeysInput, tokenFields: [String], tokenFieldTypes: [String], sortDirections: [String], filter: String): DogConnection")
        );
        assert_eq!(
            sdl_field(&sdl, "Mutation", "createDog"),
            Some("createDog(createDogInput: CreateDogInput!): Dog")
        );
        assert_eq!(
            sdl_field(&sdl, "Mutation", "updateDog"),
            Some("updateDog(updateDogInput: UpdateDogInput!): Dog")
        );
        assert_eq!(sdl_field(&sdl, "Mutation", "deleteDog"), Some("deleteDog(id: Int!): Dog"));
        assert_eq!(
            sdl_field(&sdl, "Subscription", "onCreateDog"),
            Some("onCreateDog: Dog @aws_subscribe(mutations: [\"createDog\"])")
        );

        assert!(async_graphql::parser::parse_schema(&sdl).is_ok());
        assert_eq!(context.connection.unwrap().database, "pets");
        assert_eq!(context.database_schema, "public");
    }

    #[tokio::test]
    async fn test_parent_and_children() {
        let catalog = parent_catalog();
        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        let sdl = context.document.to_string();

        assert_eq!(sdl_field(&sdl, "Owner", "dog"), Some("dog: Dog"));
        assert_eq!(sdl_field(&sdl, "Owner", "dogId"), None);
        assert_eq!(sdl_field(&sdl, "Dog", "owners"), Some("owners: [Owner]"));
        // A referencing table with a single edge is not a junction
        assert!(!sdl.contains("_via_"));

        // Inputs keep the raw key column
        let create = context.document.input_object("CreateOwnerInput").unwrap();
        assert!(create.field("dogId").is_some());

        let dog = context.table(&TableName::new("Dog")).unwrap();
        assert_eq!(dog.string_fields, vec!["name"]);
        assert_eq!(
            context.relationships[&TableName::new("Owner")].outgoing["dogId"].foreign_table,
            TableName::new("Dog")
        );
    }

    #[tokio::test]
    async fn test_junction_expansion() {
        let catalog = junction_catalog();
        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        let sdl = context.document.to_string();

        assert_eq!(
            sdl_field(&sdl, "Dog", "owners_via_dog_owners"),
            Some("owners_via_dog_owners: [Owner]")
        );
        assert_eq!(sdl_field(&sdl, "Dog", "dog_owners"), Some("dog_owners: [DogOwner]"));
        assert_eq!(
            sdl_field(&sdl, "Owner", "dogs_via_dog_owners"),
            Some("dogs_via_dog_owners: [Dog]")
        );

        // Key columns that are also foreign keys stay scalar
        assert_eq!(sdl_field(&sdl, "DogOwner", "dogId"), Some("dogId: Int!"));
        assert_eq!(sdl_field(&sdl, "DogOwner", "dog"), Some("dog: Dog"));
        assert_eq!(sdl_field(&sdl, "DogOwner", "owner"), Some("owner: Owner"));

        assert!(async_graphql::parser::parse_schema(&sdl).is_ok());
    }

    #[tokio::test]
    async fn test_junction_edges_are_read_once_per_path() {
        let catalog = junction_catalog();
        SchemaBuilder::new(&catalog).build().await.unwrap();

        // Once for Dog, once for Owner and once for itself
        assert_eq!(catalog.foreign_key_calls("DogOwner"), 3);
        assert_eq!(catalog.foreign_key_calls("Dog"), 1);
    }

    #[tokio::test]
    async fn test_table_without_primary_key_is_skipped() {
        let catalog = InMemoryCatalog::new(Engine::Postgres)
            .table("Dog", dog_columns())
            .table(
                "AuditLog",
                vec![
                    ColumnDescription::new("message", "text"),
                    ColumnDescription::new("dogId", "integer"),
                ],
            )
            .foreign_key("AuditLog", "dogId", "Dog", "id");

        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        let sdl = context.document.to_string();

        assert!(!sdl.contains("AuditLog"));
        assert!(context.table(&TableName::new("AuditLog")).is_none());
        assert!(sdl_field(&sdl, "Dog", "audit_logs").is_none());
        assert!(context
            .warnings
            .iter()
            .any(|w| w == "Skipped table AuditLog: no primary key"));
        assert!(context
            .warnings
            .iter()
            .any(|w| w.contains("'audit_logs' on Dog")));
        assert!(async_graphql::parser::parse_schema(&sdl).is_ok());
    }

    #[tokio::test]
    async fn test_relation_name_collision_is_reported() {
        let catalog = InMemoryCatalog::new(Engine::Postgres)
            .table("Dog", dog_columns())
            .table(
                "Owner",
                vec![
                    ColumnDescription::new("id", "integer").primary_key(1),
                    ColumnDescription::new("dog", "text"),
                    ColumnDescription::new("dogId", "integer"),
                ],
            )
            .foreign_key("Owner", "dogId", "Dog", "id");

        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        let sdl = context.document.to_string();

        assert_eq!(sdl_field(&sdl, "Owner", "dog"), Some("dog: String"));
        assert_eq!(sdl_field(&sdl, "Owner", "dogId"), Some("dogId: Int"));
        assert!(context.table(&TableName::new("Owner")).unwrap().relations.is_empty());
        assert!(context
            .warnings
            .iter()
            .any(|w| w.contains("'dog' on Owner collides")));
        assert!(async_graphql::parser::parse_schema(&sdl).is_ok());
    }

    #[tokio::test]
    async fn test_skipped_table_foreign_keys_are_not_read() {
        let catalog = InMemoryCatalog::new(Engine::Postgres)
            .table("AuditLog", vec![ColumnDescription::new("message", "text")]);

        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        assert!(context.document.is_empty());
        assert_eq!(catalog.foreign_key_calls("AuditLog"), 0);
    }

    #[tokio::test]
    async fn test_composite_key_fidelity() {
        let catalog = InMemoryCatalog::new(Engine::Postgres).table(
            "Adoption",
            vec![
                ColumnDescription::new("owner_id", "integer").primary_key(2),
                ColumnDescription::new("since", "date"),
                ColumnDescription::new("dog_id", "uuid").primary_key(1),
            ],
        );

        let context = SchemaBuilder::new(&catalog).build().await.unwrap();
        let sdl = context.document.to_string();

        assert!(sdl.contains("input AdoptionKeysInput {\n  dog_id: ID\n  owner_id: Int\n}\n"));
        assert!(sdl.contains("type AdoptionKeys {\n  dog_id: ID\n  owner_id: Int\n}\n"));
        assert_eq!(
            sdl_field(&sdl, "Query", "getAdoption"),
            Some("getAdoption(dog_id: ID!, owner_id: Int!): Adoption")
        );
        assert_eq!(sdl_field(&sdl, "Adoption", "since"), Some("since: AWSDate"));
        assert_eq!(context.primary_keys[&TableName::new("Adoption")].len(), 2);
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_empty_document() {
        let catalog = InMemoryCatalog::new(Engine::MySql);
        let context = SchemaBuilder::new(&catalog).build().await.unwrap();

        assert!(context.document.is_empty());
        assert!(context.tables.is_empty());
        assert!(context.connection.is_some());
    }

    #[tokio::test]
    async fn test_describe_failure_aborts_with_context() {
        let catalog = parent_catalog().failing_describe("Owner");
        let err = SchemaBuilder::new(&catalog).build().await.unwrap_err();

        match err {
            RelgraphError::Introspection {
                operation, table, ..
            } => {
                assert_eq!(operation, IntrospectionOp::DescribeTable);
                assert_eq!(table, "Owner");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_output_is_deterministic() {
        let first = SchemaBuilder::new(&junction_catalog()).build().await.unwrap();
        let second = SchemaBuilder::new(&junction_catalog()).build().await.unwrap();
        assert_eq!(first.document.to_string(), second.document.to_string());
    }
}
