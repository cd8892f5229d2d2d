//! Query engine implementation
//!
//! Read-only operations over the catalog:
//! - Package, function and argument listings with substring filters
//! - Counts and per-function / per-argument statistics
//! - Metadata lookup by package or qualified function name

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::entity::{Function, Package, SEP, split_qualified};
use crate::metadata::{self, Argument};
use crate::storage::CatalogStore;
use crate::{Error, Result};

/// Bare names, or full rows when detail was requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Names(Vec<String>),
    Detailed(Vec<T>),
}

impl<T> Listing<T> {
    pub fn len(&self) -> usize {
        match self {
            Listing::Names(names) => names.len(),
            Listing::Detailed(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One argument of one stored function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentRow {
    pub package: String,
    pub function: String,
    pub name: String,
    #[serde(flatten)]
    pub argument: Argument,
}

impl ArgumentRow {
    /// `package::function::argument`
    pub fn qualified_name(&self) -> String {
        format!("{}{}{}{}{}", self.package, SEP, self.function, SEP, self.name)
    }
}

/// Filters for `list_arguments`; every field is optional
#[derive(Debug, Clone, Default)]
pub struct ArgumentFilter {
    /// Substring of the argument name or summary
    pub term: Option<String>,
    pub package: Option<String>,
    pub function: Option<String>,
    /// Inferred scalar type, matched exactly
    pub schema_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub packages: usize,
    pub functions: usize,
    pub dsn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionStat {
    pub package: String,
    pub name: String,
    pub args: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentStat {
    pub name: String,
    /// Distinct functions declaring an argument of this name
    pub functions: usize,
}

/// Query engine over a catalog store
pub struct CatalogQuery<'a> {
    store: &'a CatalogStore,
}

impl<'a> CatalogQuery<'a> {
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    /// Packages whose name, dist or extra contains `term`, ordered by name
    pub fn list_packages(&self, term: Option<&str>, detail: bool) -> Result<Listing<Package>> {
        let packages = self.store.find_packages(term)?;
        Ok(if detail {
            Listing::Detailed(packages)
        } else {
            Listing::Names(packages.into_iter().map(|p| p.name).collect())
        })
    }

    /// Functions ordered by `(package, name)`; names come back qualified
    pub fn list_functions(
        &self,
        term: Option<&str>,
        package: Option<&str>,
        detail: bool,
    ) -> Result<Listing<Function>> {
        let functions = self.store.find_functions(term, package)?;
        Ok(if detail {
            Listing::Detailed(functions)
        } else {
            Listing::Names(functions.iter().map(Function::qualified_name).collect())
        })
    }

    /// Arguments of every matching function, each function's arguments sorted by name
    pub fn list_arguments(
        &self,
        filter: &ArgumentFilter,
        detail: bool,
    ) -> Result<Listing<ArgumentRow>> {
        let mut rows = Vec::new();
        for function in self.store.find_functions(None, filter.package.as_deref())? {
            if filter.function.as_deref().is_some_and(|f| f != function.name) {
                continue;
            }
            for (name, argument) in function_arguments(&function) {
                if !matches_term(filter.term.as_deref(), &name, argument.summary.as_deref()) {
                    continue;
                }
                if let Some(wanted) = filter.schema_type.as_deref() {
                    if argument.schema_type.as_deref() != Some(wanted) {
                        continue;
                    }
                }
                rows.push(ArgumentRow {
                    package: function.package.clone(),
                    function: function.name.clone(),
                    name,
                    argument,
                });
            }
        }

        Ok(if detail {
            Listing::Detailed(rows)
        } else {
            Listing::Names(rows.iter().map(ArgumentRow::qualified_name).collect())
        })
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            packages: self.store.count_packages()?,
            functions: self.store.count_functions()?,
            dsn: self.store.dsn().to_string(),
        })
    }

    /// Argument count per function, ordered by `(package, name)`
    pub fn function_stats(&self) -> Result<Vec<FunctionStat>> {
        let functions = self.store.find_functions(None, None)?;
        Ok(functions
            .iter()
            .map(|f| FunctionStat {
                package: f.package.clone(),
                name: f.name.clone(),
                args: function_arguments(f).len(),
            })
            .collect())
    }

    /// Number of distinct functions declaring each argument name, sorted by name
    pub fn argument_stats(&self) -> Result<Vec<ArgumentStat>> {
        let mut declared: BTreeMap<String, HashSet<(String, String)>> = BTreeMap::new();
        for function in self.store.find_functions(None, None)? {
            for name in function_arguments(&function).into_keys() {
                declared
                    .entry(name)
                    .or_default()
                    .insert((function.package.clone(), function.name.clone()));
            }
        }
        Ok(declared
            .into_iter()
            .map(|(name, functions)| ArgumentStat {
                name,
                functions: functions.len(),
            })
            .collect())
    }

    /// Metadata of a function (`Pkg::func`) or, failing that, a package.
    ///
    /// A qualified name is tried as a function first; only when no such
    /// function is stored is the whole input looked up as a package.
    pub fn get_metadata(&self, name: &str) -> Result<Value> {
        if let Some((package, function)) = split_qualified(name) {
            if let Some(row) = self.store.get_function(package, function)? {
                return stored_metadata(row.metadata.as_deref());
            }
        }
        match self.store.get_package(name)? {
            Some(row) => stored_metadata(row.metadata.as_deref()),
            None => Err(Error::NotFound(name.to_string())),
        }
    }
}

fn matches_term(term: Option<&str>, name: &str, summary: Option<&str>) -> bool {
    match term {
        None => true,
        Some(t) => name.contains(t) || summary.is_some_and(|s| s.contains(t)),
    }
}

fn stored_metadata(blob: Option<&str>) -> Result<Value> {
    match blob {
        Some(blob) => metadata::parse(blob),
        None => Ok(Value::Object(Default::default())),
    }
}

/// Arguments of a stored function; an unreadable blob counts as none
fn function_arguments(function: &Function) -> BTreeMap<String, Argument> {
    let Some(blob) = function.metadata.as_deref() else {
        return BTreeMap::new();
    };
    match metadata::parse(blob) {
        Ok(meta) => metadata::arguments(&meta),
        Err(e) => {
            warn!(function = %function.qualified_name(), error = %e, "unreadable metadata");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn function(package: &str, name: &str, summary: Option<&str>, meta: Value) -> Function {
        let function = Function::new(package, name).with_metadata(meta.to_string());
        match summary {
            Some(s) => function.with_summary(s),
            None => function,
        }
    }

    fn seeded() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_package(&Package::new("Demo::Foo").with_dist("Demo-Dist"))
            .unwrap();
        store
            .upsert_package(&Package::new("Demo::Bar").with_extra("legacy"))
            .unwrap();
        store
            .upsert_function(&function(
                "Demo::Foo",
                "greet",
                Some("Say hello"),
                json!({
                    "summary": "Say hello",
                    "args": {
                        "name": {
                            "summary": "Who to greet",
                            "schema": "str*",
                            "req": true,
                            "pos": 0
                        },
                        "count": { "schema": ["int", { "min": 1 }] }
                    }
                }),
            ))
            .unwrap();
        store
            .upsert_function(&function(
                "Demo::Bar",
                "wave",
                None,
                json!({ "args": { "count": { "schema": "int" } } }),
            ))
            .unwrap();
        store
            .upsert_function(&Function::new("Demo::Bar", "idle"))
            .unwrap();
        store
    }

    #[test]
    fn test_list_packages() {
        let store = seeded();
        let query = CatalogQuery::new(&store);

        let all = query.list_packages(None, false).unwrap();
        assert_eq!(all, Listing::Names(vec!["Demo::Bar".into(), "Demo::Foo".into()]));

        // dist and extra are searched too, case-sensitively
        let by_dist = query.list_packages(Some("Dist"), false).unwrap();
        assert_eq!(by_dist, Listing::Names(vec!["Demo::Foo".into()]));
        assert!(query.list_packages(Some("dist"), false).unwrap().is_empty());
        assert_eq!(query.list_packages(Some("legacy"), false).unwrap().len(), 1);

        match query.list_packages(Some("Foo"), true).unwrap() {
            Listing::Detailed(rows) => assert_eq!(rows[0].dist.as_deref(), Some("Demo-Dist")),
            other => panic!("expected detail rows, got {:?}", other),
        }
    }

    #[test]
    fn test_list_functions() {
        let store = seeded();
        let query = CatalogQuery::new(&store);

        assert_eq!(
            query.list_functions(None, None, false).unwrap(),
            Listing::Names(vec![
                "Demo::Bar::idle".into(),
                "Demo::Bar::wave".into(),
                "Demo::Foo::greet".into(),
            ])
        );
        assert_eq!(
            query.list_functions(None, Some("Demo::Foo"), false).unwrap(),
            Listing::Names(vec!["Demo::Foo::greet".into()])
        );
        assert_eq!(query.list_functions(Some("hello"), None, false).unwrap().len(), 1);
    }

    #[test]
    fn test_argument_projection() {
        let store = seeded();
        let query = CatalogQuery::new(&store);
        let filter = ArgumentFilter {
            package: Some("Demo::Foo".into()),
            ..Default::default()
        };

        let Listing::Detailed(rows) = query.list_arguments(&filter, true).unwrap() else {
            panic!("expected detail rows");
        };
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["count", "name"]);
        assert_eq!(rows[0].argument.schema_type.as_deref(), Some("int"));
        assert!(!rows[0].argument.req);
        assert_eq!(rows[1].argument.schema_type.as_deref(), Some("str"));
        assert!(rows[1].argument.req);
        assert_eq!(rows[1].argument.pos, Some(0));
    }

    #[test]
    fn test_argument_filters() {
        let store = seeded();
        let query = CatalogQuery::new(&store);

        let ints = ArgumentFilter {
            schema_type: Some("int".into()),
            ..Default::default()
        };
        assert_eq!(
            query.list_arguments(&ints, false).unwrap(),
            Listing::Names(vec!["Demo::Bar::wave::count".into(), "Demo::Foo::greet::count".into()])
        );

        let by_summary = ArgumentFilter {
            term: Some("greet".into()),
            ..Default::default()
        };
        assert_eq!(
            query.list_arguments(&by_summary, false).unwrap(),
            Listing::Names(vec!["Demo::Foo::greet::name".into()])
        );

        let by_function = ArgumentFilter {
            function: Some("wave".into()),
            ..Default::default()
        };
        assert_eq!(query.list_arguments(&by_function, false).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let store = seeded();
        let query = CatalogQuery::new(&store);

        let stats = query.stats().unwrap();
        assert_eq!((stats.packages, stats.functions), (2, 3));
        assert_eq!(stats.dsn, ":memory:");

        let per_function: Vec<(String, usize)> = query
            .function_stats()
            .unwrap()
            .into_iter()
            .map(|s| (s.name, s.args))
            .collect();
        assert_eq!(
            per_function,
            vec![("idle".into(), 0), ("wave".into(), 1), ("greet".into(), 2)]
        );

        let per_argument = query.argument_stats().unwrap();
        assert_eq!(
            per_argument,
            vec![
                ArgumentStat { name: "count".into(), functions: 2 },
                ArgumentStat { name: "name".into(), functions: 1 },
            ]
        );
    }

    #[test]
    fn test_get_metadata_disambiguation() {
        let store = seeded();
        let query = CatalogQuery::new(&store);

        let greet = query.get_metadata("Demo::Foo::greet").unwrap();
        assert_eq!(greet["summary"], "Say hello");

        // No function `Foo` in `Demo`, so this falls back to the package
        store
            .upsert_package(&Package::new("Demo::Foo").with_metadata(r#"{"summary":"Does foo"}"#))
            .unwrap();
        assert_eq!(query.get_metadata("Demo::Foo").unwrap()["summary"], "Does foo");

        assert_eq!(query.get_metadata("Demo::Bar").unwrap(), json!({}));
        assert!(matches!(query.get_metadata("Nope"), Err(Error::NotFound(_))));
        assert!(matches!(query.get_metadata("Demo::Nope::x"), Err(Error::NotFound(_))));
    }
}
