//! TR-005: Recursive parent resolution.
//!
//! Fetches the parent chain depth-first, resolving each parent before the
//! child's patches are applied on top. Single-threaded. The chain of visited
//! URIs is tracked by normalized form, so a parent cycle fails instead of
//! recursing forever. Identical bytes at two different locations are two
//! different documents.

use super::error::ResolveError;
use super::overriding::merge;
use super::parser::{parse_schema_version, peek_schema_version, validate_devfile, SchemaValidator};
use super::source::{join_uri, normalize_uri, DocumentSource};
use super::types::Devfile;

/// Default limit on the number of parents above a document.
pub const DEFAULT_MAX_PARENT_DEPTH: usize = 32;

/// Resolution knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_parent_depth: usize,
    pub check_parent_version: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_parent_depth: DEFAULT_MAX_PARENT_DEPTH,
            check_parent_version: true,
        }
    }
}

impl ResolveOptions {
    pub fn with_max_parent_depth(mut self, depth: usize) -> Self {
        self.max_parent_depth = depth;
        self
    }

    pub fn with_check_parent_version(mut self, check: bool) -> Self {
        self.check_parent_version = check;
        self
    }
}

/// Visited documents, outermost first.
#[derive(Debug, Default)]
struct Chain {
    /// URIs as joined, for error reports
    uris: Vec<String>,
    /// `normalize_uri` of each entry in `uris`
    keys: Vec<String>,
}

impl Chain {
    fn start(location: &str) -> Self {
        Self {
            uris: vec![location.to_string()],
            keys: vec![normalize_uri(location)],
        }
    }

    fn contains(&self, uri: &str) -> bool {
        let key = normalize_uri(uri);
        self.keys.iter().any(|k| *k == key)
    }

    fn push(&mut self, uri: &str) {
        self.uris.push(uri.to_string());
        self.keys.push(normalize_uri(uri));
    }

    fn cycle(&self, uri: &str) -> ResolveError {
        let mut chain = self.uris.clone();
        chain.push(uri.to_string());
        ResolveError::ParentCycle { chain }
    }
}

/// Resolves parent references through a document source and schema validator.
pub struct Resolver<'a> {
    source: &'a dyn DocumentSource,
    validator: &'a dyn SchemaValidator,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn DocumentSource, validator: &'a dyn SchemaValidator) -> Self {
        Self {
            source,
            validator,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve a parsed document located at `location`.
    ///
    /// A document without a parent is returned unchanged. Otherwise the result
    /// has no parent and is checked with `validate_devfile`.
    pub fn resolve(&self, devfile: Devfile, location: &str) -> Result<Devfile, ResolveError> {
        self.resolve_top(devfile, location, Chain::start(location))
    }

    /// Parse raw bytes with the validator, then resolve.
    pub fn resolve_raw(&self, raw: &[u8], location: &str) -> Result<Devfile, ResolveError> {
        let parse_err = |source| ResolveError::Parse {
            uri: location.to_string(),
            source,
        };
        let version = peek_schema_version(raw).map_err(parse_err)?;
        let devfile = self.validator.validate(raw, &version).map_err(parse_err)?;
        self.resolve_top(devfile, location, Chain::start(location))
    }

    /// Fetch `location` from the source and resolve it.
    pub fn resolve_uri(&self, location: &str) -> Result<Devfile, ResolveError> {
        let raw = self
            .source
            .fetch(location)
            .map_err(|source| ResolveError::Fetch {
                uri: location.to_string(),
                source,
            })?;
        self.resolve_raw(&raw, location)
    }

    fn resolve_top(
        &self,
        devfile: Devfile,
        location: &str,
        mut chain: Chain,
    ) -> Result<Devfile, ResolveError> {
        if devfile.parent.is_none() {
            return Ok(devfile);
        }
        let resolved = self.resolve_with_chain(devfile, location, &mut chain)?;
        let errors = validate_devfile(&resolved);
        if !errors.is_empty() {
            return Err(ResolveError::Invalid { errors });
        }
        tracing::debug!(
            location,
            parents = chain.uris.len() - 1,
            components = resolved.components.len(),
            commands = resolved.commands.len(),
            "devfile resolved"
        );
        Ok(resolved)
    }

    fn resolve_with_chain(
        &self,
        devfile: Devfile,
        location: &str,
        chain: &mut Chain,
    ) -> Result<Devfile, ResolveError> {
        if devfile.parent.is_none() {
            return Ok(devfile);
        }
        let raw_uri = devfile
            .parent
            .as_ref()
            .and_then(|p| p.uri.as_deref())
            .filter(|u| !u.trim().is_empty())
            .ok_or(ResolveError::MissingParentUri)?;
        let uri = join_uri(location, raw_uri).map_err(|source| ResolveError::Fetch {
            uri: raw_uri.to_string(),
            source,
        })?;

        if chain.contains(&uri) {
            return Err(chain.cycle(&uri));
        }
        if chain.uris.len() > self.options.max_parent_depth {
            return Err(ResolveError::ParentTooDeep {
                max_depth: self.options.max_parent_depth,
            });
        }

        tracing::debug!(uri = %uri, depth = chain.uris.len(), "fetching parent");
        let raw = self.source.fetch(&uri).map_err(|source| ResolveError::Fetch {
            uri: uri.clone(),
            source,
        })?;
        tracing::debug!(uri = %uri, blake3 = %blake3::hash(&raw).to_hex(), "fetched parent");
        chain.push(&uri);

        let parse_err = |source| ResolveError::Parse {
            uri: uri.clone(),
            source,
        };
        let version = peek_schema_version(&raw).map_err(parse_err)?;
        let parent = self.validator.validate(&raw, &version).map_err(parse_err)?;

        if self.options.check_parent_version {
            self.check_version(&uri, &parent, &devfile, location)?;
        }

        let parent = self.resolve_with_chain(parent, &uri, chain)?;
        let (merged, stats) = merge(parent, &devfile)?;
        tracing::debug!(
            parent = %uri,
            overridden = stats.overridden,
            added = stats.added,
            "merged parent"
        );
        Ok(merged)
    }

    fn check_version(
        &self,
        uri: &str,
        parent: &Devfile,
        child: &Devfile,
        location: &str,
    ) -> Result<(), ResolveError> {
        let parent_version =
            parse_schema_version(&parent.schema_version).map_err(|source| ResolveError::Parse {
                uri: uri.to_string(),
                source,
            })?;
        let child_version =
            parse_schema_version(&child.schema_version).map_err(|source| ResolveError::Parse {
                uri: location.to_string(),
                source,
            })?;
        if parent_version > child_version {
            return Err(ResolveError::ParentVersionTooNew {
                uri: uri.to_string(),
                parent: parent.schema_version.clone(),
                child: child.schema_version.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SourceError;
    use crate::core::parser::{parse_devfile, YamlSchema};
    use crate::core::source::MemorySource;

    const BASE: &str = r#"
schemaVersion: 2.0.0
components:
  - name: tools
    container:
      image: ubi:8
      env:
        - {name: JAVA_HOME, value: /usr/lib/jvm}
commands:
  - id: build
    exec:
      component: tools
      commandLine: mvn package
      group: {kind: build, isDefault: true}
"#;

    const MIDDLE: &str = r#"
schemaVersion: 2.1.0
parent:
  uri: base.yaml
  components:
    - name: tools
      container:
        memoryLimit: 2Gi
commands:
  - id: run
    exec:
      component: tools
      commandLine: java -jar app.jar
      group: {kind: run}
"#;

    const CHILD: &str = r#"
schemaVersion: 2.2.0
metadata:
  name: spring
parent:
  uri: middle.yaml
  commands:
    - id: build
      exec:
        commandLine: mvn -DskipTests package
components:
  - name: db
    container:
      image: postgres:15
"#;

    fn chain_source() -> MemorySource {
        MemorySource::new()
            .with("base.yaml", BASE)
            .with("middle.yaml", MIDDLE)
    }

    fn child() -> Devfile {
        parse_devfile(CHILD.as_bytes()).unwrap()
    }

    #[test]
    fn test_tr005_resolve_two_levels() {
        let source = chain_source();
        let resolver = Resolver::new(&source, &YamlSchema);
        let resolved = resolver.resolve(child(), "devfile.yaml").unwrap();

        assert!(resolved.parent.is_none());
        assert_eq!(resolved.schema_version, "2.2.0");
        assert_eq!(resolved.metadata_name(), Some("spring"));
        let names: Vec<_> = resolved.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["tools", "db"]);
        let ids: Vec<_> = resolved.commands.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["build", "run"]);

        let tools = resolved.component("tools").unwrap().as_container().unwrap();
        assert_eq!(tools.memory_limit.as_deref(), Some("2Gi"));
        assert_eq!(tools.image.as_deref(), Some("ubi:8"));
        assert_eq!(tools.env.len(), 1);

        let build = resolved.command("build").unwrap().as_exec().unwrap();
        assert_eq!(build.command_line.as_deref(), Some("mvn -DskipTests package"));
        assert_eq!(build.component.as_deref(), Some("tools"));
    }

    #[test]
    fn test_tr005_no_parent_unchanged() {
        let source = MemorySource::new();
        let resolver = Resolver::new(&source, &YamlSchema);
        let doc = parse_devfile(BASE.as_bytes()).unwrap();
        assert_eq!(resolver.resolve(doc.clone(), "base.yaml").unwrap(), doc);
    }

    #[test]
    fn test_tr005_missing_parent_is_fetch_error() {
        let source = MemorySource::new();
        let resolver = Resolver::new(&source, &YamlSchema);
        match resolver.resolve(child(), "devfile.yaml") {
            Err(ResolveError::Fetch { uri, source }) => {
                assert_eq!(uri, "middle.yaml");
                assert!(matches!(source, SourceError::NotFound { .. }));
            }
            other => panic!("expected Fetch error, got {:?}", other),
        }
    }

    #[test]
    fn test_tr005_self_cycle() {
        let source = MemorySource::new().with(
            "loop.yaml",
            "schemaVersion: 2.2.0\nparent:\n  uri: loop.yaml\n",
        );
        let resolver = Resolver::new(&source, &YamlSchema);
        match resolver.resolve_uri("loop.yaml") {
            Err(ResolveError::ParentCycle { chain }) => {
                assert_eq!(chain, vec!["loop.yaml", "loop.yaml"]);
            }
            other => panic!("expected ParentCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_tr005_indirect_cycle() {
        let source = MemorySource::new()
            .with("a.yaml", "schemaVersion: 2.2.0\nparent:\n  uri: b.yaml\n")
            .with("b.yaml", "schemaVersion: 2.2.0\nparent:\n  uri: a.yaml\n");
        let resolver = Resolver::new(&source, &YamlSchema);
        let doc = parse_devfile(b"schemaVersion: 2.2.0\nparent:\n  uri: a.yaml\n").unwrap();
        match resolver.resolve(doc, "devfile.yaml") {
            Err(ResolveError::ParentCycle { chain }) => {
                assert_eq!(chain, vec!["devfile.yaml", "a.yaml", "b.yaml", "a.yaml"]);
            }
            other => panic!("expected ParentCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_tr005_cycle_through_copy() {
        let looping = "schemaVersion: 2.2.0\nparent:\n  uri: copy.yaml\n";
        let source = MemorySource::new()
            .with("orig.yaml", looping)
            .with("copy.yaml", looping);
        let resolver = Resolver::new(&source, &YamlSchema);
        match resolver.resolve_uri("orig.yaml") {
            Err(ResolveError::ParentCycle { chain }) => {
                assert_eq!(chain, vec!["orig.yaml", "copy.yaml", "copy.yaml"]);
            }
            other => panic!("expected ParentCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_tr005_cycle_through_dotted_path() {
        let source = MemorySource::new()
            .with("stacks/a.yaml", "schemaVersion: 2.2.0\nparent:\n  uri: ./sub/../b.yaml\n")
            .with("stacks/./sub/../b.yaml", "schemaVersion: 2.2.0\nparent:\n  uri: a.yaml\n");
        let resolver = Resolver::new(&source, &YamlSchema);
        match resolver.resolve_uri("stacks/a.yaml") {
            Err(ResolveError::ParentCycle { chain }) => {
                assert_eq!(
                    chain,
                    vec!["stacks/a.yaml", "stacks/./sub/../b.yaml", "stacks/./sub/../a.yaml"]
                );
            }
            other => panic!("expected ParentCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_tr005_identical_layers_are_not_a_cycle() {
        // Two stack layers with the same bytes at different depths.
        let layer = "schemaVersion: 2.2.0\nparent:\n  uri: ../devfile.yaml\n";
        let source = MemorySource::new()
            .with("s/x/devfile.yaml", layer)
            .with("s/x/../devfile.yaml", layer)
            .with("s/x/../../devfile.yaml", BASE);
        let resolver = Resolver::new(&source, &YamlSchema);
        let resolved = resolver.resolve_uri("s/x/devfile.yaml").unwrap();
        assert!(resolved.parent.is_none());
        assert!(resolved.component("tools").is_some());
        assert!(resolved.command("build").is_some());
    }

    #[test]
    fn test_tr005_depth_limit() {
        let source = chain_source();
        let resolver = Resolver::new(&source, &YamlSchema)
            .with_options(ResolveOptions::default().with_max_parent_depth(1));
        assert!(matches!(
            resolver.resolve(child(), "devfile.yaml"),
            Err(ResolveError::ParentTooDeep { max_depth: 1 })
        ));
    }

    #[test]
    fn test_tr005_parent_version_too_new() {
        let source = MemorySource::new().with("p.yaml", "schemaVersion: 2.2.0\n");
        let doc = parse_devfile(b"schemaVersion: 2.1.0\nparent:\n  uri: p.yaml\n").unwrap();

        let strict = Resolver::new(&source, &YamlSchema);
        assert!(matches!(
            strict.resolve(doc.clone(), "devfile.yaml"),
            Err(ResolveError::ParentVersionTooNew { .. })
        ));

        let lenient = Resolver::new(&source, &YamlSchema)
            .with_options(ResolveOptions::default().with_check_parent_version(false));
        assert!(lenient.resolve(doc, "devfile.yaml").is_ok());
    }

    #[test]
    fn test_tr005_missing_uri() {
        let source = MemorySource::new();
        let resolver = Resolver::new(&source, &YamlSchema);
        let doc = parse_devfile(b"schemaVersion: 2.2.0\nparent:\n  variables: {A: b}\n").unwrap();
        assert!(matches!(
            resolver.resolve(doc, "devfile.yaml"),
            Err(ResolveError::MissingParentUri)
        ));
    }

    #[test]
    fn test_tr005_invalid_result_rejected() {
        let source = MemorySource::new().with("p.yaml", BASE);
        let doc = parse_devfile(
            br#"
schemaVersion: 2.2.0
parent:
  uri: p.yaml
commands:
  - id: all
    composite:
      commands: [build, missing]
"#,
        )
        .unwrap();
        let resolver = Resolver::new(&source, &YamlSchema);
        match resolver.resolve(doc, "devfile.yaml") {
            Err(ResolveError::Invalid { errors }) => {
                assert!(errors.iter().any(|e| e.message.contains("'missing'")));
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_tr005_relative_to_parent_location() {
        use crate::core::source::FsSource;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::create_dir_all(dir.path().join("stacks")).unwrap();
        std::fs::write(dir.path().join("stacks/base.yaml"), BASE).unwrap();
        let child = dir.path().join("app/devfile.yaml");
        std::fs::write(
            &child,
            "schemaVersion: 2.2.0\nparent:\n  uri: ../stacks/base.yaml\n",
        )
        .unwrap();

        let resolver = Resolver::new(&FsSource, &YamlSchema);
        let resolved = resolver.resolve_uri(child.to_str().unwrap()).unwrap();
        assert!(resolved.component("tools").is_some());
        assert!(resolved.command("build").is_some());
    }
}
