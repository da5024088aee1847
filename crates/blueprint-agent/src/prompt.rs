//! Intent extraction prompt

const INTENT_INSTRUCTIONS: &str = r#"You are a backend architect. Read the project description below and reply with a single JSON object describing the REST API to build. Reply with JSON only, no prose and no markdown.

The object has this shape:
{
  "projectType": "short kebab-case name for the kind of project, e.g. library-api",
  "database": "mongodb",
  "entities": [
    {
      "name": "Book",
      "fields": [
        {"name": "title", "type": "string", "constraints": ["required"]}
      ],
      "relations": [
        {"target": "Author", "kind": "manyToOne"}
      ]
    }
  ],
  "routes": [
    {"entity": "Book", "operations": ["list", "get", "create", "update", "delete"]}
  ],
  "features": []
}

Rules:
- Field types: string, number, boolean, date, objectId, array, mixed.
- Constraints: required, unique, index, trim, lowercase, uppercase, min:N, max:N, minlength:N, maxlength:N, default:VALUE, enum:A|B|C.
- Relation kinds: oneToOne, manyToOne, oneToMany, manyToMany. Every relation target must be one of the declared entities.
- Omit "routes" to expose the full CRUD surface for every entity.
- Features are optional: server, auth, docker, readme. Only include them when the description asks for them.
- Use "mongodb" as the database unless the description explicitly names another engine."#;

/// Prompt asking the provider for a structured intent
pub fn build_intent_prompt(description: &str) -> String {
    format!(
        "{}\n\nProject description:\n\"\"\"\n{}\n\"\"\"",
        INTENT_INSTRUCTIONS,
        description.trim()
    )
}
