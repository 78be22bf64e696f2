/// Schema document AST
///
/// A small owned tree of the definitions the generator emits, printed as SDL
/// through `Display`. Type references reuse `async_graphql::dynamic::TypeRef`.

use async_graphql::dynamic::TypeRef;
use std::fmt;

/// Ordered set of definitions
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone)]
pub enum Definition {
    Object(ObjectTypeDefinition),
    InputObject(InputObjectTypeDefinition),
    Schema(SchemaDefinition),
}

#[derive(Debug, Clone)]
pub struct ObjectTypeDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone)]
pub struct InputObjectTypeDefinition {
    pub name: String,
    pub fields: Vec<InputValueDefinition>,
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub arguments: Vec<InputValueDefinition>,
    pub ty: TypeRef,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone)]
pub struct InputValueDefinition {
    pub name: String,
    pub ty: TypeRef,
}

/// A directive with pre-printed argument values
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaDefinition {
    pub query: Option<String>,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
}

impl Document {
    pub fn push(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectTypeDefinition> {
        self.definitions.iter().find_map(|d| match d {
            Definition::Object(o) if o.name == name => Some(o),
            _ => None,
        })
    }

    pub fn input_object(&self, name: &str) -> Option<&InputObjectTypeDefinition> {
        self.definitions.iter().find_map(|d| match d {
            Definition::InputObject(o) if o.name == name => Some(o),
            _ => None,
        })
    }

    pub fn schema(&self) -> Option<&SchemaDefinition> {
        self.definitions.iter().find_map(|d| match d {
            Definition::Schema(s) => Some(s),
            _ => None,
        })
    }

    /// Names of object and input object types in definition order
    pub fn type_names(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                Definition::Object(o) => Some(o.name.as_str()),
                Definition::InputObject(o) => Some(o.name.as_str()),
                Definition::Schema(_) => None,
            })
            .collect()
    }
}

impl ObjectTypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

impl InputObjectTypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&InputValueDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            ty,
            directives: Vec::new(),
        }
    }

    pub fn argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.arguments.push(InputValueDefinition::new(name, ty));
        self
    }

    pub fn arguments(mut self, arguments: impl IntoIterator<Item = InputValueDefinition>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

impl InputValueDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Add an argument whose value is a list of string literals
    pub fn string_list_argument(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        let printed = values
            .iter()
            .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(", ");
        self.arguments.push((name.into(), format!("[{}]", printed)));
        self
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, definition) in self.definitions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", definition)?;
        }
        Ok(())
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Object(o) => write!(f, "{}", o),
            Definition::InputObject(o) => write!(f, "{}", o),
            Definition::Schema(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for ObjectTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "type {} {{", self.name)?;
        for field in &self.fields {
            writeln!(f, "  {}", field)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for InputObjectTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input {} {{", self.name)?;
        for field in &self.fields {
            writeln!(f, "  {}", field)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            let arguments = self
                .arguments
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "({})", arguments)?;
        }
        write!(f, ": {}", self.ty)?;
        for directive in &self.directives {
            write!(f, " {}", directive)?;
        }
        Ok(())
    }
}

impl fmt::Display for InputValueDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.arguments.is_empty() {
            let arguments = self
                .arguments
                .iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "({})", arguments)?;
        }
        Ok(())
    }
}

impl fmt::Display for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "schema {{")?;
        if let Some(query) = &self.query {
            writeln!(f, "  query: {}", query)?;
        }
        if let Some(mutation) = &self.mutation {
            writeln!(f, "  mutation: {}", mutation)?;
        }
        if let Some(subscription) = &self.subscription {
            writeln!(f, "  subscription: {}", subscription)?;
        }
        writeln!(f, "}}")
    }
}
