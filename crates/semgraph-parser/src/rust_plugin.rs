//! Tree-sitter-backed Rust extractor (spec.md §4.3 step 2). Grounded in
//! the teacher's `languages/rust.rs` AST walk: same node kinds
//! (`function_item`, `struct_item`, `enum_item`, `trait_item`,
//! `impl_item`, `call_expression`, `method_call_expression`), trimmed to
//! what this spec's entity/edge model needs — no metadata-attribute bag,
//! since `Entity`/`Edge` are typed structs here rather than a generic
//! `CodeNode`.
//!
//! Scope simplification (documented in `DESIGN.md`): call edges resolve
//! only to callees declared in the same file, by simple name. A full
//! cross-file symbol resolver is the job of a real SCIP indexer, which is
//! out of scope for this workspace.

use tree_sitter::{Node, Parser, Tree};

use semgraph_core::{EdgeKind, EntityKind, Result, CodeGraphError};

use crate::plugin::{ParsedEdge, ParsedEntity, PluginOutput, TreeSitterPlugin};

pub struct RustTreeSitterPlugin;

impl RustTreeSitterPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustTreeSitterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSitterPlugin for RustTreeSitterPlugin {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn parse_file(&self, file_path: &str, content: &str) -> Result<PluginOutput> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| CodeGraphError::Extraction(format!("loading rust grammar: {e}")))?;

        let tree: Tree = parser
            .parse(content, None)
            .ok_or_else(|| CodeGraphError::Extraction(format!("tree-sitter failed to parse {file_path}")))?;

        let mut collector = Collector::new(content, file_path);
        let mut cursor = tree.walk();
        collector.walk(&mut cursor, WalkCtx::default());
        Ok(collector.output)
    }
}

#[derive(Default, Clone)]
struct WalkCtx {
    module_path: Vec<String>,
    current_impl_for: Option<String>,
    current_fn_local_id: Option<String>,
}

struct Collector<'a> {
    content: &'a str,
    file_path: &'a str,
    output: PluginOutput,
}

impl<'a> Collector<'a> {
    fn new(content: &'a str, file_path: &'a str) -> Self {
        Self {
            content,
            file_path,
            output: PluginOutput::default(),
        }
    }

    fn node_text(&self, node: &Node) -> String {
        node.utf8_text(self.content.as_bytes()).unwrap_or("").to_string()
    }

    fn identifier_child(&self, node: Node) -> Option<String> {
        let mut c = node.walk();
        if c.goto_first_child() {
            loop {
                let n = c.node();
                if n.kind() == "identifier" || n.kind() == "type_identifier" {
                    return Some(self.node_text(&n));
                }
                if !c.goto_next_sibling() {
                    break;
                }
            }
        }
        None
    }

    fn is_exported(&self, node: Node) -> bool {
        let mut c = node.walk();
        if c.goto_first_child() {
            loop {
                if c.node().kind() == "visibility_modifier" {
                    return true;
                }
                if !c.goto_next_sibling() {
                    break;
                }
            }
        }
        false
    }

    fn qname(&self, module_path: &[String], name: &str) -> String {
        if module_path.is_empty() {
            format!("{}::{}", self.file_path, name)
        } else {
            format!("{}::{}::{}", self.file_path, module_path.join("::"), name)
        }
    }

    fn location(&self, node: &Node) -> (u32, u32) {
        (node.start_position().row as u32 + 1, node.end_position().row as u32 + 1)
    }

    fn push_entity(&mut self, local_id: String, kind: EntityKind, name: String, node: &Node, parent: Option<String>) {
        let (start, end) = self.location(node);
        self.output.entities.push(ParsedEntity {
            local_id,
            kind,
            name,
            file_path: self.file_path.to_string(),
            start_line: start,
            end_line: end,
            language: "rust".to_string(),
            signature: Some(self.signature_line(node)),
            exported: self.is_exported(*node),
            doc: self.leading_doc_comment(node),
            parent_name: parent,
            quarantine_reason: None,
            body: self.node_text(node),
        });
    }

    fn signature_line(&self, node: &Node) -> String {
        self.node_text(node).lines().next().unwrap_or("").trim().to_string()
    }

    fn leading_doc_comment(&self, node: &Node) -> Option<String> {
        let mut prev = node.prev_sibling();
        let mut lines = Vec::new();
        while let Some(n) = prev {
            if n.kind() == "line_comment" {
                let text = self.node_text(&n);
                if let Some(stripped) = text.strip_prefix("///") {
                    lines.push(stripped.trim().to_string());
                    prev = n.prev_sibling();
                    continue;
                }
            }
            break;
        }
        if lines.is_empty() {
            None
        } else {
            lines.reverse();
            Some(lines.join("\n"))
        }
    }

    fn walk(&mut self, cursor: &mut tree_sitter::TreeCursor, mut ctx: WalkCtx) {
        let node = cursor.node();

        match node.kind() {
            "mod_item" => {
                if let Some(name) = self.identifier_child(node) {
                    let local_id = self.qname(&ctx.module_path, &name);
                    self.push_entity(local_id, EntityKind::Module, name.clone(), &node, None);
                    let has_body = node.child_by_field_name("body").is_some();
                    if has_body {
                        ctx.module_path.push(name);
                    }
                    self.recurse(cursor, &ctx);
                    return;
                }
            }

            "struct_item" => {
                if let Some(name) = self.identifier_child(node) {
                    let local_id = self.qname(&ctx.module_path, &name);
                    self.push_entity(local_id, EntityKind::Struct, name, &node, None);
                }
            }

            "enum_item" => {
                if let Some(name) = self.identifier_child(node) {
                    let local_id = self.qname(&ctx.module_path, &name);
                    self.push_entity(local_id, EntityKind::Enum, name, &node, None);
                }
            }

            "trait_item" => {
                if let Some(name) = self.identifier_child(node) {
                    let local_id = self.qname(&ctx.module_path, &name);
                    self.push_entity(local_id, EntityKind::Interface, name, &node, None);
                }
            }

            "impl_item" => {
                let for_type = node.child_by_field_name("type").map(|n| self.node_text(&n));
                let mut next_ctx = ctx.clone();
                next_ctx.current_impl_for = for_type;
                self.recurse(cursor, &next_ctx);
                return;
            }

            "function_item" => {
                if let Some(name) = self.identifier_child(node) {
                    let local_id = self.qname(&ctx.module_path, &name);
                    let parent = ctx.current_impl_for.clone();
                    let kind = if parent.is_some() { EntityKind::Method } else { EntityKind::Function };
                    self.push_entity(local_id.clone(), kind, name, &node, parent);
                    let mut next_ctx = ctx.clone();
                    next_ctx.current_fn_local_id = Some(local_id);
                    self.recurse(cursor, &next_ctx);
                    return;
                }
            }

            "call_expression" => {
                if let Some(from) = ctx.current_fn_local_id.clone() {
                    if let Some(callee) = self.call_target(node) {
                        self.output.edges.push(ParsedEdge {
                            from_local_id: from,
                            to_local_id: self.qname(&ctx.module_path, &callee),
                            kind: EdgeKind::Calls,
                        });
                    }
                }
            }

            "method_call_expression" => {
                if let Some(from) = ctx.current_fn_local_id.clone() {
                    if let Some(field) = node.child_by_field_name("name") {
                        let method = self.node_text(&field);
                        self.output.edges.push(ParsedEdge {
                            from_local_id: from,
                            to_local_id: self.qname(&ctx.module_path, &method),
                            kind: EdgeKind::Calls,
                        });
                    }
                }
            }

            "use_declaration" => {
                if let Some(name) = self.identifier_child(node) {
                    let local_id = format!("{}::use::{}::{}", self.file_path, ctx.module_path.join("::"), name);
                    self.push_entity(local_id, EntityKind::Module, name, &node, None);
                }
            }

            _ => {}
        }

        self.recurse(cursor, &ctx);
    }

    fn recurse(&mut self, cursor: &mut tree_sitter::TreeCursor, ctx: &WalkCtx) {
        if cursor.goto_first_child() {
            loop {
                self.walk(cursor, ctx.clone());
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    fn call_target(&self, node: Node) -> Option<String> {
        let function_node = node.child_by_field_name("function")?;
        match function_node.kind() {
            "identifier" => Some(self.node_text(&function_node)),
            "field_expression" => {
                let field = function_node.child_by_field_name("field")?;
                Some(self.node_text(&field))
            }
            "scoped_identifier" => {
                let name = function_node.child_by_field_name("name")?;
                Some(self.node_text(&name))
            }
            _ => None,
        }
    }
}
