use crate::reader::TableName;

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("datum", "data"),
];

/// GraphQL type name for a table: `dog_owner` -> `DogOwner`, `sales.orders` -> `SalesOrders`
pub fn type_name(table: &TableName) -> String {
    segments(table).iter().map(|s| to_pascal_case(s)).collect()
}

/// Snake-cased, pluralized relation field name for a table: `DogOwner` -> `dog_owners`
pub fn relation_field_name(table: &TableName) -> String {
    let mut segments = segments(table);
    if let Some(last) = segments.pop() {
        segments.push(pluralize(&last));
    }
    segments
        .iter()
        .map(|s| to_snake_case(s))
        .collect::<Vec<_>>()
        .join("_")
}

/// Name of the list root field: `Dog` -> `listDogs`
pub fn list_field_name(type_name: &str) -> String {
    format!("list{}", pluralize(type_name))
}

/// Field name for the object referenced through a foreign-key column.
///
/// The key suffix is dropped (`dogId` -> `dog`, `owner_id` -> `owner`). A
/// column with nothing left after stripping falls back to the target's name.
pub fn belongs_to_field_name(column: &str, target: &TableName) -> String {
    let stripped = strip_key_suffix(column);
    if stripped.is_empty() {
        to_snake_case(&type_name(target))
    } else {
        to_snake_case(stripped)
    }
}

fn strip_key_suffix(column: &str) -> &str {
    for suffix in ["_id", "_ID", "Id", "ID"] {
        if let Some(stripped) = column.strip_suffix(suffix) {
            return stripped.trim_end_matches('_');
        }
    }
    if column.eq_ignore_ascii_case("id") {
        return "";
    }
    column
}

/// Table name split into its alphanumeric words, schema first
fn segments(table: &TableName) -> Vec<String> {
    let mut words = Vec::new();
    let parts = table.schema.iter().map(String::as_str).chain(std::iter::once(table.name.as_str()));
    for part in parts {
        words.extend(
            part.split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_string),
        );
    }
    words
}

/// Uppercase the first letter, keep the rest as written
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => {
                    let mut result = first.to_uppercase().collect::<String>();
                    result.push_str(chars.as_str());
                    result
                }
            }
        })
        .collect()
}

/// `DogOwner` -> `dog_owner`, `dogId` -> `dog_id`, `HTTPServer` -> `http_server`
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            continue;
        }

        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }

    result.trim_end_matches('_').to_string()
}

/// English plural of the last word in `word`, preserving its casing.
///
/// Words that already read as plural (`dogs`) are returned unchanged.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    for (singular, plural) in IRREGULAR_PLURALS {
        if lower.ends_with(singular) {
            let start = word.len() - singular.len();
            let head = &word[..start];
            let first_upper = word[start..].starts_with(|c: char| c.is_uppercase());
            let tail = if first_upper {
                to_pascal_case(plural)
            } else {
                plural.to_string()
            };
            return format!("{}{}", head, tail);
        }
    }

    if lower.ends_with('y') && word.len() > 1 {
        let before = lower.chars().rev().nth(1).unwrap_or('a');
        if !"aeiou".contains(before) {
            let base = &word[..word.len() - 1];
            return format!("{}ies", base);
        }
        return format!("{}s", word);
    }

    if lower.ends_with("is") && word.len() > 2 {
        let base = &word[..word.len() - 2];
        return format!("{}es", base);
    }

    if lower.ends_with("ss")
        || lower.ends_with("us")
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }

    if lower.ends_with('s') {
        return word.to_string();
    }

    format!("{}s", word)
}
