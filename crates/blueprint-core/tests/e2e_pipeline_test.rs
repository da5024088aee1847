//! E2E Test: Generation Pipeline
//!
//! Runs provider text through normalization, resolution, materialization and
//! archiving against temporary output roots.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use blueprint_core::{
    normalize, read_manifest, Archiver, BlueprintError, IntentNormalizer, MalformedIntentError,
    Namespace, ProjectMaterializer, TemplateResolver, UnsupportedFeatureError,
};
use tempfile::TempDir;

const BOOK_INTENT: &str = r#"I'll generate that for you.

```json
{
  "projectType": "api",
  "entities": [
    {"name": "Book", "fields": [{"name": "title", "type": "string"}, {"name": "author", "type": "string"}]}
  ],
  "database": "mongodb"
}
```
"#;

struct Output {
    dir: TempDir,
    materializer: ProjectMaterializer,
    archiver: Archiver,
}

impl Output {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let materializer =
            ProjectMaterializer::new(dir.path().join("projects"), Arc::new(Namespace::new()));
        let archiver = Archiver::new(dir.path().join("archives"), Arc::new(Namespace::new()));
        Self {
            dir,
            materializer,
            archiver,
        }
    }

    fn is_empty(&self) -> bool {
        !self.dir.path().join("projects").exists() && !self.dir.path().join("archives").exists()
    }
}

fn dir_entries(path: &Path) -> usize {
    fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
}

/// E2E test: the Book scenario
///
/// This test validates:
/// 1. A fenced intent normalizes with the description override applied
/// 2. Exactly model, controller, route, db connector and manifest are emitted
/// 3. The archive manifest lists all five files with non-zero sizes
#[test]
fn e2e_book_scenario() {
    let out = Output::new();

    let intent = IntentNormalizer::new()
        .with_description("A simple book API")
        .normalize(BOOK_INTENT)
        .expect("intent should normalize");
    assert_eq!(intent.description(), "A simple book API");

    let tree = TemplateResolver::default().resolve(&intent).expect("intent should resolve");
    let paths: Vec<&str> = tree.paths().collect();
    assert_eq!(
        paths,
        vec![
            "package.json",
            "src/config/db.js",
            "src/controllers/book.controller.js",
            "src/models/book.model.js",
            "src/routes/book.routes.js",
        ]
    );

    let project = out
        .materializer
        .materialize(&tree, Some("book-api"), intent.project_type())
        .expect("project should materialize");
    assert_eq!(project.files.len(), 5);

    let model = fs::read_to_string(project.root_directory.join("src/models/book.model.js")).unwrap();
    assert!(model.contains("title: { type: String }"));
    assert!(model.contains("author: { type: String }"));
    assert!(model.contains("mongoose.model('Book', bookSchema)"));

    let routes = fs::read_to_string(project.root_directory.join("src/routes/book.routes.js")).unwrap();
    assert!(routes.contains("require('../controllers/book.controller')"));
    assert!(routes.contains("basePath: '/api/books'"));

    let manifest_json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.root_directory.join("package.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest_json["name"], "api");
    assert_eq!(manifest_json["description"], "A simple book API");
    assert!(manifest_json["dependencies"]["mongoose"].is_string());

    let artifact = out.archiver.archive(&project).expect("project should archive");
    assert_eq!(artifact.archive_name, "book-api.tar.gz");

    let manifest = read_manifest(&artifact.archive_path).unwrap();
    assert_eq!(manifest.project, "book-api");
    assert_eq!(manifest.files.len(), 5);
    for entry in &manifest.files {
        assert!(entry.size > 0, "{} should not be empty", entry.path);
    }
}

/// E2E test: unsupported database
///
/// Rejected before resolution; nothing is written.
#[test]
fn e2e_postgres_is_rejected_before_anything_is_written() {
    let out = Output::new();
    let raw = BOOK_INTENT.replace("\"mongodb\"", "\"postgres\"");

    match normalize(&raw) {
        Err(BlueprintError::UnsupportedFeature(UnsupportedFeatureError::Database(db))) => {
            assert_eq!(db, "postgres");
        }
        other => panic!("expected unsupported database, got {:?}", other),
    }
    assert!(out.is_empty());
}

/// E2E test: dangling relation fails at resolution
#[test]
fn e2e_dangling_relation_is_malformed() {
    let intent = normalize(
        r#"{"projectType": "library", "entities": [
            {"name": "Book", "relations": [{"target": "Publisher", "kind": "manyToOne"}]}]}"#,
    )
    .expect("dangling relations are caught by the resolver, not the normalizer");

    let err = TemplateResolver::default().resolve(&intent).unwrap_err();
    assert!(matches!(
        err,
        BlueprintError::MalformedIntent(MalformedIntentError::DanglingRelation { .. })
    ));
}

/// E2E test: relational intent with optional capabilities
///
/// Cross-file references must all point at emitted files.
#[test]
fn e2e_relations_and_features() {
    let out = Output::new();
    let intent = normalize(
        r#"{"projectType": "Library Service", "database": "mongo",
            "entities": [
                {"name": "book", "fields": [{"name": "title", "type": "string", "constraints": ["required"]}],
                 "relations": [{"target": "author"}, {"target": "genre", "kind": "manyToMany"}]},
                {"name": "author", "fields": ["name"]},
                {"name": "genre", "fields": ["label"]}
            ],
            "routes": [{"entity": "genre", "operations": ["list"]}],
            "features": ["server", "docker", "readme", "auth"]}"#,
    )
    .unwrap();

    let tree = TemplateResolver::default().resolve(&intent).unwrap();
    assert_eq!(tree.len(), 3 * 3 + 2 + 1 + 1 + 2 + 1);

    let book = &tree.get("src/models/book.model.js").unwrap().content;
    assert!(book.contains("require('./author.model');"));
    assert!(book.contains("require('./genre.model');"));
    assert!(book.contains("author: { type: mongoose.Schema.Types.ObjectId, ref: 'Author' }"));
    assert!(book.contains("genres: [{ type: mongoose.Schema.Types.ObjectId, ref: 'Genre' }]"));

    let genre_routes = &tree.get("src/routes/genre.routes.js").unwrap().content;
    assert!(genre_routes.contains("router.get('/', controller.list);"));
    assert!(!genre_routes.contains("router.post"));

    let app = &tree.get("src/app.js").unwrap().content;
    for entity in ["book", "author", "genre"] {
        assert!(app.contains(&format!("require('./routes/{}.routes')", entity)));
    }
    assert!(app.contains("require('./config/db')"));
    assert!(app.contains("require('./middleware/auth')"));
    assert!(tree.contains("src/middleware/auth.js"));

    let db = &tree.get("src/config/db.js").unwrap().content;
    assert!(db.contains("mongodb://127.0.0.1:27017/library_service"));

    let project = out
        .materializer
        .materialize(&tree, None, intent.project_type())
        .unwrap();
    assert!(project.name.starts_with("library-service-"));
    let artifact = out.archiver.archive(&project).unwrap();
    assert_eq!(artifact.manifest.files.len(), tree.len());
}

/// E2E test: a Dockerfile alone still gets the entry point it runs
#[test]
fn e2e_docker_only_project_is_runnable() {
    let out = Output::new();
    let intent = normalize(
        r#"{"projectType": "api", "entities": [{"name": "Book"}], "features": ["docker"]}"#,
    )
    .unwrap();
    let tree = TemplateResolver::default().resolve(&intent).unwrap();

    let dockerfile = &tree.get("Dockerfile").unwrap().content;
    assert!(dockerfile.contains(r#"CMD ["node", "src/app.js"]"#));

    let project = out.materializer.materialize(&tree, Some("boxed"), "api").unwrap();
    assert!(project.root_directory.join("src/app.js").is_file());
    assert!(project.files.iter().any(|f| f == "src/app.js"));
}

/// E2E test: concurrent requests with the same name
#[test]
fn e2e_concurrent_same_name_gets_distinct_outputs() {
    let out = Arc::new(Output::new());
    let tree = Arc::new(
        TemplateResolver::default()
            .resolve(&normalize(BOOK_INTENT).unwrap())
            .unwrap(),
    );
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let out = Arc::clone(&out);
            let tree = Arc::clone(&tree);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let project = out.materializer.materialize(&tree, Some("shared"), "api").unwrap();
                let artifact = out.archiver.archive(&project).unwrap();
                (project.name, artifact.archive_name)
            })
        })
        .collect();

    let mut projects = Vec::new();
    let mut archives = Vec::new();
    for handle in handles {
        let (project, archive) = handle.join().unwrap();
        projects.push(project);
        archives.push(archive);
    }

    projects.sort();
    projects.dedup();
    archives.sort();
    archives.dedup();
    assert_eq!(projects.len(), 8);
    assert_eq!(archives.len(), 8);
    assert!(projects.contains(&"shared".to_string()));
    assert_eq!(dir_entries(&out.dir.path().join("projects")), 8);
    assert_eq!(dir_entries(&out.dir.path().join("archives")), 8);
}
