use tabled::{settings::Style, Table, Tabled};

use crate::entity::{Function, Package};
use crate::query::{ArgumentRow, ArgumentStat, FunctionStat};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct PackageLine {
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Dist")]
    dist: String,
    #[tabled(rename = "Extra")]
    extra: String,
    #[tabled(rename = "Mtime")]
    mtime: String,
}

#[derive(Tabled)]
struct FunctionLine {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Function")]
    name: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Dist")]
    dist: String,
}

#[derive(Tabled)]
struct ArgumentLine {
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Argument")]
    name: String,
    #[tabled(rename = "Type")]
    schema_type: String,
    #[tabled(rename = "Req")]
    req: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Greedy")]
    greedy: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

#[derive(Tabled)]
struct FunctionStatLine {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Function")]
    name: String,
    #[tabled(rename = "Args")]
    args: usize,
}

#[derive(Tabled)]
struct ArgumentStatLine {
    #[tabled(rename = "Argument")]
    name: String,
    #[tabled(rename = "Functions")]
    functions: usize,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        render(&self.rows)
    }
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn flag(value: bool) -> String {
    if value { "yes".to_string() } else { String::new() }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

pub fn packages_table(packages: &[Package]) -> String {
    let rows: Vec<PackageLine> = packages
        .iter()
        .map(|p| PackageLine {
            name: p.name.clone(),
            summary: text(&p.summary),
            dist: text(&p.dist),
            extra: text(&p.extra),
            mtime: p.mtime.map(|t| t.to_string()).unwrap_or_default(),
        })
        .collect();
    render(&rows)
}

pub fn functions_table(functions: &[Function]) -> String {
    let rows: Vec<FunctionLine> = functions
        .iter()
        .map(|f| FunctionLine {
            package: f.package.clone(),
            name: f.name.clone(),
            summary: text(&f.summary),
            dist: text(&f.dist),
        })
        .collect();
    render(&rows)
}

pub fn arguments_table(arguments: &[ArgumentRow]) -> String {
    let rows: Vec<ArgumentLine> = arguments
        .iter()
        .map(|a| ArgumentLine {
            function: format!("{}::{}", a.package, a.function),
            name: a.name.clone(),
            schema_type: text(&a.argument.schema_type),
            req: flag(a.argument.req),
            pos: a.argument.pos.map(|p| p.to_string()).unwrap_or_default(),
            greedy: flag(a.argument.greedy),
            summary: text(&a.argument.summary),
        })
        .collect();
    render(&rows)
}

pub fn function_stats_table(stats: &[FunctionStat]) -> String {
    let rows: Vec<FunctionStatLine> = stats
        .iter()
        .map(|s| FunctionStatLine {
            package: s.package.clone(),
            name: s.name.clone(),
            args: s.args,
        })
        .collect();
    render(&rows)
}

pub fn argument_stats_table(stats: &[ArgumentStat]) -> String {
    let rows: Vec<ArgumentStatLine> = stats
        .iter()
        .map(|s| ArgumentStatLine {
            name: s.name.clone(),
            functions: s.functions,
        })
        .collect();
    render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(packages_table(&[]).is_empty());
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_package_table_columns() {
        let table = packages_table(&[Package::new("Demo::Foo").with_summary("Does foo")]);
        assert!(table.contains("Package"));
        assert!(table.contains("Demo::Foo"));
        assert!(table.contains("Does foo"));
    }

    #[test]
    fn test_stats_table() {
        let table = stats_table(&[("Packages", "2"), ("Functions", "3")]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Functions"));
    }
}
