//! Method extraction and size/complexity metrics using tree-sitter.

use crate::grammar::Grammar;
use histmine_core::{Error, FileAnalysis, Language, Method, Result, SourceAnalyzer};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use tree_sitter::Node;

/// Analyzes Rust, Python, TypeScript/JavaScript, Go and Java sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodAnalyzer;

impl MethodAnalyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    fn grammar(filename: &str) -> Option<&'static Grammar> {
        Grammar::for_language(Language::from_path(filename))
    }
}

impl SourceAnalyzer for MethodAnalyzer {
    fn supports(&self, filename: &str) -> bool {
        Self::grammar(filename).is_some()
    }

    fn analyze(&self, filename: &str, source: &str) -> Result<FileAnalysis> {
        let grammar = Self::grammar(filename)
            .ok_or_else(|| Error::Analysis(format!("Unsupported language: {}", filename)))?;

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&grammar.ts_language())
            .map_err(|e| Error::Analysis(e.to_string()))?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            Error::Analysis(format!("Failed to parse {}", grammar.language.as_str()))
        })?;

        let mut scan = FileScan::new(grammar, source.as_bytes());
        scan.visit(tree.root_node());

        let methods: Vec<Method> = scan
            .functions
            .iter()
            .map(|node| scan.method(*node, filename))
            .collect();
        debug!(filename, methods = methods.len(), "Analyzed source file");

        Ok(FileAnalysis {
            nloc: scan.code_lines.len(),
            complexity: methods.iter().map(|m| m.complexity).sum(),
            token_count: scan.token_count,
            methods,
        })
    }
}

/// Whole-file pass: code lines, tokens, call sites and function nodes.
struct FileScan<'t> {
    grammar: &'static Grammar,
    source: &'t [u8],
    code_lines: BTreeSet<usize>,
    token_count: usize,
    callees: Vec<String>,
    functions: Vec<Node<'t>>,
}

/// Figures of one function body, nested functions excluded.
#[derive(Default)]
struct BodyStats {
    decisions: usize,
    tokens: usize,
    callees: Vec<String>,
}

impl<'t> FileScan<'t> {
    fn new(grammar: &'static Grammar, source: &'t [u8]) -> Self {
        Self {
            grammar,
            source,
            code_lines: BTreeSet::new(),
            token_count: 0,
            callees: Vec::new(),
            functions: Vec::new(),
        }
    }

    fn text(&self, node: Node<'t>) -> &'t str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn visit(&mut self, node: Node<'t>) {
        let kind = node.kind();
        if self.grammar.is_comment(kind) {
            return;
        }
        if self.grammar.is_function(kind) {
            self.functions.push(node);
        }
        if let Some(callee) = self.callee(node) {
            self.callees.push(callee);
        }
        if node.child_count() == 0 {
            if node.start_byte() < node.end_byte() {
                self.token_count += 1;
                let (first, last) = rows(node);
                self.code_lines.extend(first..=last);
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    /// Unqualified callee name of a call site.
    fn callee(&self, node: Node<'t>) -> Option<String> {
        let field = self.grammar.callee_field(node.kind())?;
        let target = node.child_by_field_name(field)?;
        let name = short_name(self.text(target));
        (!name.is_empty()).then(|| name.to_string())
    }

    fn body_stats(&self, node: Node<'t>, root: bool, stats: &mut BodyStats) {
        let kind = node.kind();
        if self.grammar.is_comment(kind) || (!root && self.grammar.is_function(kind)) {
            return;
        }
        if self.grammar.is_decision(kind) {
            stats.decisions += 1;
        }
        if let Some(callee) = self.callee(node) {
            stats.callees.push(callee);
        }
        if node.child_count() == 0 {
            if node.start_byte() < node.end_byte() {
                stats.tokens += 1;
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.body_stats(child, false, stats);
        }
    }

    fn method(&self, node: Node<'t>, filename: &str) -> Method {
        let mut stats = BodyStats::default();
        self.body_stats(node, true, &mut stats);

        let short = self.function_name(node);
        let name = self.qualified_name(node, &short);
        let (first, last) = rows(node);
        let nloc = self.code_lines.range(first..=last).count();
        let distinct: HashSet<&String> = stats.callees.iter().collect();

        let mut method = Method::new(name, self.parameters(node))
            .with_line_range(first + 1, last + 1)
            .with_metrics(nloc, 1 + stats.decisions);
        method.filename = filename.to_string();
        method.token_count = stats.tokens;
        method.fan_in = self.callees.iter().filter(|c| **c == short).count();
        method.fan_out = stats.callees.len();
        method.general_fan_out = distinct.len();
        method.top_nesting_level = self.nesting_level(node);
        method
    }

    fn function_name(&self, node: Node<'t>) -> String {
        if let Some(name) = node.child_by_field_name("name") {
            return self.text(name).to_string();
        }
        // Anonymous functions take the name they are bound to.
        let bound = node.parent().and_then(|parent| {
            let field = match parent.kind() {
                "variable_declarator" | "public_field_definition" | "field_definition" => "name",
                "pair" => "key",
                "assignment_expression" => "left",
                _ => return None,
            };
            parent.child_by_field_name(field)
        });
        match bound {
            Some(name) => self.text(name).to_string(),
            None => "(anonymous)".to_string(),
        }
    }

    fn container_name(&self, node: Node<'t>) -> Option<String> {
        let field = match node.kind() {
            "impl_item" => "type",
            _ => "name",
        };
        let name = self.text(node.child_by_field_name(field)?);
        Some(strip_generics(name).to_string())
    }

    /// Receiver type of a Go method, pointer and type parameters removed.
    fn receiver_type(&self, node: Node<'t>) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let declaration = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = self.text(declaration.child_by_field_name("type")?);
        let ty = ty.trim_start_matches('*');
        Some(ty.split('[').next().unwrap_or(ty).to_string())
    }

    fn qualified_name(&self, node: Node<'t>, short: &str) -> String {
        let mut scopes = Vec::new();
        let mut current = node.parent();
        while let Some(ancestor) = current {
            if self.grammar.is_container(ancestor.kind()) {
                if let Some(name) = self.container_name(ancestor) {
                    scopes.push(name);
                }
            }
            current = ancestor.parent();
        }
        scopes.reverse();
        if let Some(receiver) = self.receiver_type(node) {
            scopes.push(receiver);
        }

        scopes.push(short.to_string());
        scopes.join(self.grammar.separator)
    }

    fn nesting_level(&self, node: Node<'t>) -> usize {
        let mut level = 0;
        let mut current = node.parent();
        while let Some(ancestor) = current {
            let kind = ancestor.kind();
            if self.grammar.is_container(kind) || self.grammar.is_function(kind) {
                level += 1;
            }
            current = ancestor.parent();
        }
        level
    }

    fn parameters(&self, node: Node<'t>) -> Vec<String> {
        let list = match node.child_by_field_name("parameters") {
            Some(list) => list,
            None => {
                // Single bare arrow-function parameter.
                return node
                    .child_by_field_name("parameter")
                    .map(|p| vec![self.text(p).to_string()])
                    .unwrap_or_default();
            }
        };

        let mut params = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if self.grammar.is_comment(param.kind()) {
                continue;
            }
            if param.kind() == "parameter_declaration" && self.grammar.language == Language::Go {
                params.extend(self.go_parameters(param));
            } else {
                params.push(self.text(param).trim().to_string());
            }
        }
        params
    }

    /// `a, b int` declares two parameters.
    fn go_parameters(&self, declaration: Node<'t>) -> Vec<String> {
        let ty = declaration
            .child_by_field_name("type")
            .map(|t| self.text(t))
            .unwrap_or("");
        let mut cursor = declaration.walk();
        let names: Vec<String> = declaration
            .children_by_field_name("name", &mut cursor)
            .map(|n| format!("{} {}", self.text(n), ty))
            .collect();
        if names.is_empty() {
            vec![ty.to_string()]
        } else {
            names
        }
    }
}

/// Rows a node covers, 0-indexed and inclusive.
fn rows(node: Node<'_>) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let last = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };
    (start.row, last)
}

fn strip_generics(name: &str) -> &str {
    name.split('<').next().unwrap_or(name).trim()
}

/// Last path segment of a callee expression: `self.helper` -> `helper`.
fn short_name(callee: &str) -> &str {
    let base = strip_generics(callee).trim_end_matches(':');
    base.rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(base)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(filename: &str, source: &str) -> FileAnalysis {
        MethodAnalyzer::new().analyze(filename, source).unwrap()
    }

    fn method<'a>(analysis: &'a FileAnalysis, name: &str) -> &'a Method {
        analysis
            .methods
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("no method {name} in {:?}", analysis.methods))
    }

    #[test]
    fn test_supports() {
        let analyzer = MethodAnalyzer::new();
        for file in ["a.rs", "b.py", "c.ts", "d.tsx", "e.js", "f.go", "g.java"] {
            assert!(analyzer.supports(file), "{file}");
        }
        assert!(!analyzer.supports("README.md"));
        assert!(!analyzer.supports("Makefile"));
        assert!(matches!(
            analyzer.analyze("notes.txt", "text"),
            Err(Error::Analysis(_))
        ));
    }

    #[test]
    fn test_rust_methods() {
        let source = r#"
struct Counter {
    total: u32,
}

impl Counter {
    // Adds `n` when both conditions hold.
    pub fn add(&mut self, n: u32) {
        if n > 0 && self.total < 100 {
            self.total += n;
        }
    }

    fn reset(&mut self) {
        self.total = 0;
    }
}

fn run() {
    let mut c = Counter { total: 0 };
    c.add(1);
    c.add(2);
    c.reset();
}
"#;
        let analysis = analyze("src/counter.rs", source);
        assert_eq!(analysis.methods.len(), 3);

        let add = method(&analysis, "Counter::add");
        assert_eq!(add.parameters, vec!["&mut self", "n: u32"]);
        assert_eq!(add.long_name, "Counter::add(&mut self, n: u32)");
        assert_eq!(add.complexity, 3);
        assert_eq!(add.start_line, 8);
        assert_eq!(add.end_line, 12);
        assert_eq!(add.nloc, 5);
        assert_eq!(add.fan_in, 2);
        assert_eq!(add.top_nesting_level, 1);
        assert_eq!(add.filename, "src/counter.rs");

        let run = method(&analysis, "run");
        assert_eq!(run.complexity, 1);
        assert_eq!(run.fan_out, 3);
        assert_eq!(run.general_fan_out, 2);
        assert_eq!(run.top_nesting_level, 0);

        assert_eq!(analysis.complexity, 5);
        assert_eq!(analysis.nloc, source.lines().filter(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with("//")
        }).count());
    }

    #[test]
    fn test_python_methods() {
        let source = "\
class Shape:
    def area(self, scale):
        # scaled area
        if scale > 1 and self.big:
            return 2
        elif scale < 0:
            return 0

        def helper():
            if True:
                pass
        return helper()


def top(a, b=2, *rest):
    return a
";
        let analysis = analyze("shapes.py", source);
        let area = method(&analysis, "Shape.area");
        assert_eq!(area.parameters, vec!["self", "scale"]);
        assert_eq!(area.complexity, 4);
        assert_eq!(area.start_line, 2);
        assert_eq!(area.end_line, 12);
        assert_eq!(area.nloc, 9);

        let helper = method(&analysis, "Shape.helper");
        assert_eq!(helper.complexity, 2);
        assert_eq!(helper.fan_in, 1);
        assert_eq!(helper.top_nesting_level, 2);

        let top = method(&analysis, "top");
        assert_eq!(top.parameters, vec!["a", "b=2", "*rest"]);
        assert_eq!(top.top_nesting_level, 0);
    }

    #[test]
    fn test_typescript_functions() {
        let source = r#"
class Greeter {
  greet(name: string): string {
    return name ? `hi ${name}` : "hi";
  }
}

const double = (x: number) => x * 2;
const inc = x => x + 1;

function main() {
  for (const v of [1, 2]) {
    console.log(double(v) || inc(v));
  }
}
"#;
        let analysis = analyze("app.ts", source);
        let greet = method(&analysis, "Greeter.greet");
        assert_eq!(greet.parameters, vec!["name: string"]);
        assert_eq!(greet.complexity, 2);

        assert_eq!(method(&analysis, "double").parameters, vec!["x: number"]);
        assert_eq!(method(&analysis, "inc").parameters, vec!["x"]);

        let main = method(&analysis, "main");
        assert_eq!(main.complexity, 3);
        assert_eq!(main.fan_out, 3);
        assert_eq!(method(&analysis, "double").fan_in, 1);
    }

    #[test]
    fn test_tsx_uses_tsx_grammar() {
        let source = "export function App() {\n  return <div className=\"a\">{ok && <span/>}</div>;\n}\n";
        let analysis = analyze("App.tsx", source);
        let app = method(&analysis, "App");
        assert_eq!(app.complexity, 2);
    }

    #[test]
    fn test_go_methods() {
        let source = r#"package main

type Server struct{}

func (s *Server) Start(host, port string, retries int) error {
	for i := 0; i < retries; i++ {
		if connect(host, port) {
			return nil
		}
	}
	return fmt.Errorf("failed")
}

func connect(host, port string) bool {
	return host != "" && port != ""
}
"#;
        let analysis = analyze("server.go", source);
        let start = method(&analysis, "Server.Start");
        assert_eq!(
            start.parameters,
            vec!["host string", "port string", "retries int"]
        );
        assert_eq!(start.complexity, 3);
        assert_eq!(start.general_fan_out, 2);

        let connect = method(&analysis, "connect");
        assert_eq!(connect.complexity, 2);
        assert_eq!(connect.fan_in, 1);
    }

    #[test]
    fn test_java_methods() {
        let source = r#"
public class Calc {
    public Calc() {}

    /* sums positive values */
    public int sum(int[] xs, int floor) {
        int total = 0;
        for (int x : xs) {
            if (x > floor) {
                total += x;
            }
        }
        return total;
    }
}
"#;
        let analysis = analyze("Calc.java", source);
        assert_eq!(analysis.methods.len(), 2);
        let sum = method(&analysis, "Calc.sum");
        assert_eq!(sum.parameters, vec!["int[] xs", "int floor"]);
        assert_eq!(sum.complexity, 3);
        assert_eq!(sum.nloc, 9);
        assert!(sum.is_low_risk(histmine_core::DmmProperty::UnitSize));
        assert!(sum.is_low_risk(histmine_core::DmmProperty::UnitInterfacing));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("self.helper"), "helper");
        assert_eq!(short_name("Vec::new"), "new");
        assert_eq!(short_name("parse::<u32>"), "parse");
        assert_eq!(short_name("fmt.Println"), "Println");
        assert_eq!(short_name("run"), "run");
    }
}
