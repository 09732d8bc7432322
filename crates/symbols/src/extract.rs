//! Symbol extraction. Tree-sitter grammars cover Rust, Python, and
//! JavaScript; a line-regex extractor handles TypeScript and any file the
//! parser rejects.

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Node, Parser};

use crate::{Symbol, SymbolKind};

pub fn supports_language(language: &str) -> bool {
    matches!(language, "rust" | "python" | "javascript" | "typescript")
}

pub fn extract(file_path: &str, source: &str, language: &str) -> Vec<Symbol> {
    let parsed = match language {
        "rust" => parse_with(&tree_sitter_rust::LANGUAGE.into(), file_path, source, extract_rust),
        "python" => parse_with(
            &tree_sitter_python::LANGUAGE.into(),
            file_path,
            source,
            extract_python,
        ),
        "javascript" => parse_with(
            &tree_sitter_javascript::LANGUAGE.into(),
            file_path,
            source,
            extract_javascript,
        ),
        _ => None,
    };
    match parsed {
        Some(symbols) => symbols,
        None => extract_fallback(file_path, source, language),
    }
}

fn parse_with(
    language: &tree_sitter::Language,
    file_path: &str,
    source: &str,
    visit: fn(&mut Vec<Symbol>, Node<'_>, &str, &str),
) -> Option<Vec<Symbol>> {
    let mut parser = Parser::new();
    parser.set_language(language).ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    let mut symbols = Vec::new();
    visit(&mut symbols, root, source, file_path);
    Some(symbols)
}

fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

fn field_text<'s>(node: Node<'_>, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

fn make_symbol(
    node: Node<'_>,
    name: &str,
    kind: SymbolKind,
    file_path: &str,
    parent: Option<&str>,
    signature: Option<String>,
    docstring: Option<String>,
) -> Symbol {
    Symbol {
        name: name.to_string(),
        kind,
        file_path: file_path.to_string(),
        line: node.start_position().row + 1,
        column: node.start_position().column,
        parent: parent.map(|p| p.to_string()),
        signature,
        docstring,
    }
}

// --- Rust -------------------------------------------------------------------

fn extract_rust(out: &mut Vec<Symbol>, root: Node<'_>, source: &str, file_path: &str) {
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        rust_item(out, node, source, file_path, None);
    }
}

fn rust_item(
    out: &mut Vec<Symbol>,
    node: Node<'_>,
    source: &str,
    file_path: &str,
    parent: Option<&str>,
) {
    match node.kind() {
        "function_item" => {
            if let Some(name) = field_text(node, "name", source) {
                let kind = if parent.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let signature = field_text(node, "parameters", source).map(|s| s.to_string());
                out.push(make_symbol(node, name, kind, file_path, parent, signature, None));
            }
        }
        "struct_item" | "enum_item" | "trait_item" | "union_item" => {
            if let Some(name) = field_text(node, "name", source) {
                out.push(make_symbol(
                    node,
                    name,
                    SymbolKind::Class,
                    file_path,
                    None,
                    None,
                    None,
                ));
            }
        }
        "const_item" | "static_item" => {
            if let Some(name) = field_text(node, "name", source) {
                out.push(make_symbol(
                    node,
                    name,
                    SymbolKind::Variable,
                    file_path,
                    None,
                    None,
                    None,
                ));
            }
        }
        "impl_item" => {
            let impl_type = field_text(node, "type", source).map(|t| t.to_string());
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.named_children(&mut cursor) {
                    rust_item(out, child, source, file_path, impl_type.as_deref());
                }
            }
        }
        "mod_item" => {
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.named_children(&mut cursor) {
                    rust_item(out, child, source, file_path, None);
                }
            }
        }
        _ => {}
    }
}

// --- Python -----------------------------------------------------------------

fn extract_python(out: &mut Vec<Symbol>, root: Node<'_>, source: &str, file_path: &str) {
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        python_item(out, node, source, file_path, None);
    }
}

fn python_item(
    out: &mut Vec<Symbol>,
    node: Node<'_>,
    source: &str,
    file_path: &str,
    parent: Option<&str>,
) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(inner) = node.child_by_field_name("definition") {
                python_item(out, inner, source, file_path, parent);
            }
        }
        "function_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                let kind = if parent.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let signature = field_text(node, "parameters", source).map(|s| s.to_string());
                let docstring = python_docstring(node, source);
                out.push(make_symbol(
                    node, name, kind, file_path, parent, signature, docstring,
                ));
            }
        }
        "class_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                let docstring = python_docstring(node, source);
                out.push(make_symbol(
                    node,
                    name,
                    SymbolKind::Class,
                    file_path,
                    None,
                    None,
                    docstring,
                ));
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        python_item(out, child, source, file_path, Some(name));
                    }
                }
            }
        }
        "expression_statement" if parent.is_none() => {
            // Top-level NAME = ... assignments.
            if let Some(assignment) = node.named_child(0).filter(|c| c.kind() == "assignment") {
                if let Some(left) = assignment.child_by_field_name("left") {
                    if left.kind() == "identifier" {
                        out.push(make_symbol(
                            node,
                            node_text(left, source),
                            SymbolKind::Variable,
                            file_path,
                            None,
                            None,
                            None,
                        ));
                    }
                }
            }
        }
        _ => {}
    }
}

/// First statement of the body, when it is a bare string literal.
fn python_docstring(node: Node<'_>, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let inner = first.named_child(0)?;
    if inner.kind() != "string" {
        return None;
    }
    let raw = node_text(inner, source);
    let trimmed = raw
        .trim_start_matches("\"\"\"")
        .trim_end_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("'''")
        .trim();
    Some(truncate(trimmed, 200))
}

// --- JavaScript -------------------------------------------------------------

fn extract_javascript(out: &mut Vec<Symbol>, root: Node<'_>, source: &str, file_path: &str) {
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        javascript_item(out, node, source, file_path);
    }
}

fn javascript_item(out: &mut Vec<Symbol>, node: Node<'_>, source: &str, file_path: &str) {
    match node.kind() {
        "export_statement" => {
            if let Some(decl) = node.child_by_field_name("declaration") {
                javascript_item(out, decl, source, file_path);
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let signature = field_text(node, "parameters", source).map(|s| s.to_string());
                out.push(make_symbol(
                    node,
                    name,
                    SymbolKind::Function,
                    file_path,
                    None,
                    signature,
                    None,
                ));
            }
        }
        "class_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let class_name = name.to_string();
                out.push(make_symbol(
                    node,
                    name,
                    SymbolKind::Class,
                    file_path,
                    None,
                    None,
                    None,
                ));
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        if child.kind() == "method_definition" {
                            if let Some(method) = field_text(child, "name", source) {
                                let signature =
                                    field_text(child, "parameters", source).map(|s| s.to_string());
                                out.push(make_symbol(
                                    child,
                                    method,
                                    SymbolKind::Method,
                                    file_path,
                                    Some(&class_name),
                                    signature,
                                    None,
                                ));
                            }
                        }
                    }
                }
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "variable_declarator" {
                    if let Some(name) = field_text(child, "name", source) {
                        out.push(make_symbol(
                            child,
                            name,
                            SymbolKind::Variable,
                            file_path,
                            None,
                            None,
                            None,
                        ));
                    }
                }
            }
        }
        _ => {}
    }
}

// --- Regex fallback ---------------------------------------------------------

static FALLBACK_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:export\s+)?(?:async\s+)?(?:fn|def|function)\s+(\w+)",
    )
    .expect("fallback regex must compile")
});

static FALLBACK_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub\s+)?(?:export\s+)?(?:class|struct|enum|trait|interface)\s+(\w+)")
        .expect("fallback regex must compile")
});

/// Heuristic extractor used when parsing fails or no grammar exists. Captures
/// top-level function and class declarations with indentation deciding
/// method-ness.
fn extract_fallback(file_path: &str, source: &str, _language: &str) -> Vec<Symbol> {
    let mut out = Vec::new();
    let mut current_class: Option<String> = None;

    for (idx, line) in source.lines().enumerate() {
        if let Some(caps) = FALLBACK_CLASS.captures(line) {
            let name = caps[1].to_string();
            out.push(Symbol {
                name: name.clone(),
                kind: SymbolKind::Class,
                file_path: file_path.to_string(),
                line: idx + 1,
                column: 0,
                parent: None,
                signature: None,
                docstring: None,
            });
            current_class = Some(name);
            continue;
        }
        if let Some(caps) = FALLBACK_FUNCTION.captures(line) {
            let indented = line.starts_with(' ') || line.starts_with('\t');
            let (kind, parent) = if indented {
                (SymbolKind::Method, current_class.clone())
            } else {
                current_class = None;
                (SymbolKind::Function, None)
            };
            out.push(Symbol {
                name: caps[1].to_string(),
                kind,
                file_path: file_path.to_string(),
                line: idx + 1,
                column: 0,
                parent,
                signature: None,
                docstring: None,
            });
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
