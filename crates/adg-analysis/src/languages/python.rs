// ABOUTME: Python IR collector: classes, functions, and imports from a parsed tree.
// ABOUTME: Methods land both on their class and in the flat function list.

use crate::guard::GuardState;
use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Result, SourceFile};
use tree_sitter::{Node, Tree, TreeCursor};

pub struct PythonExtractor;

impl PythonExtractor {
    pub fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut collector = PythonCollector::new(source);
        let mut cursor = tree.walk();
        collector.walk(&mut cursor, 0, PyContext::default(), guard)?;
        Ok(collector.into_ir())
    }
}

impl super::IrExtractor for PythonExtractor {
    fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        PythonExtractor::extract(tree, source, guard)
    }
}

/// Index of the class whose body we are directly inside, if any. The owner
/// survives the `decorated_definition` wrapper and the body `block` but is
/// dropped on any other nesting, so a def inside an `if` at class level is
/// a function but not a method.
#[derive(Default, Clone)]
struct PyContext {
    owner_class: Option<usize>,
}

struct PythonCollector<'a> {
    source: &'a SourceFile,
    ir: FileIr,
}

impl<'a> PythonCollector<'a> {
    fn new(source: &'a SourceFile) -> Self {
        Self {
            source,
            ir: FileIr::new(&source.path, source.language),
        }
    }

    fn into_ir(self) -> FileIr {
        self.ir
    }

    fn walk(
        &mut self,
        cursor: &mut TreeCursor,
        depth: u32,
        ctx: PyContext,
        guard: &mut GuardState,
    ) -> Result<()> {
        guard.enter(depth)?;
        guard.visit()?;
        let node = cursor.node();

        let mut child_ctx = PyContext::default();
        match node.kind() {
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut entity = ClassEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_bases(self.class_bases(&node))
                    .with_decorators(self.leading_decorators(&node));
                    entity.attributes = self.class_attributes(&node);
                    self.ir.classes.push(entity);
                    child_ctx.owner_class = Some(self.ir.classes.len() - 1);
                }
            }
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.node_text(&name_node);
                    if let Some(class_idx) = ctx.owner_class {
                        self.ir.classes[class_idx].methods.push(name.clone());
                    }
                    let mut entity = FunctionEntity::new(name, &self.source.path, start_line(&node))
                        .with_params(self.parameters(&node))
                        .with_async(is_async_def(&node));
                    entity.return_type = node
                        .child_by_field_name("return_type")
                        .map(|n| self.node_text(&n));
                    entity.decorators = self.leading_decorators(&node);
                    self.ir.functions.push(entity);
                }
            }
            "block" | "decorated_definition" => {
                child_ctx.owner_class = ctx.owner_class;
            }
            "import_statement" => self.record_plain_import(&node),
            "import_from_statement" => self.record_from_import(&node),
            "future_import_statement" => self.record_future_import(&node),
            _ => {}
        }

        if cursor.goto_first_child() {
            loop {
                self.walk(cursor, depth + 1, child_ctx.clone(), guard)?;
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
        Ok(())
    }

    fn class_bases(&self, node: &Node) -> Vec<String> {
        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            for i in 0..superclasses.named_child_count() {
                if let Some(base) = superclasses.named_child(i) {
                    // Keyword arguments such as `metaclass=...` are not bases.
                    if base.kind() != "keyword_argument" {
                        bases.push(self.node_text(&base));
                    }
                }
            }
        }
        bases
    }

    /// Assignments directly in the class body, annotated or not.
    fn class_attributes(&self, node: &Node) -> Vec<String> {
        let mut attributes = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return attributes;
        };
        for i in 0..body.named_child_count() {
            let Some(statement) = body.named_child(i) else {
                continue;
            };
            if statement.kind() != "expression_statement" {
                continue;
            }
            let Some(expression) = statement.named_child(0) else {
                continue;
            };
            if expression.kind() != "assignment" {
                continue;
            }
            if let Some(left) = expression.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    attributes.push(self.node_text(&left));
                }
            }
        }
        attributes
    }

    /// Decorators attached through the wrapping `decorated_definition`, with
    /// the `@` dropped. Call decorators keep their argument text.
    fn leading_decorators(&self, node: &Node) -> Vec<String> {
        let mut decorators = Vec::new();
        let Some(parent) = node.parent() else {
            return decorators;
        };
        if parent.kind() != "decorated_definition" {
            return decorators;
        }
        for i in 0..parent.named_child_count() {
            if let Some(child) = parent.named_child(i) {
                if child.kind() == "decorator" {
                    if let Some(expression) = child.named_child(0) {
                        decorators.push(self.node_text(&expression));
                    }
                }
            }
        }
        decorators
    }

    /// Positional parameter names. Collection stops at `*` or `*args`, so
    /// keyword-only parameters and `**kwargs` are not recorded.
    fn parameters(&self, node: &Node) -> Vec<String> {
        let mut params = Vec::new();
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return params;
        };
        for i in 0..parameters.named_child_count() {
            let Some(param) = parameters.named_child(i) else {
                continue;
            };
            match param.kind() {
                "identifier" => params.push(self.node_text(&param)),
                "typed_parameter" => {
                    if let Some(pattern) = param.named_child(0) {
                        params.push(self.node_text(&pattern));
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        params.push(self.node_text(&name));
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => break,
                "positional_separator" => continue,
                _ => params.push(self.node_text(&param)),
            }
        }
        params
    }

    fn record_plain_import(&mut self, node: &Node) {
        let line_file = &self.source.path;
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            match child.kind() {
                "dotted_name" => {
                    let module = self.node_text(&child);
                    self.ir.imports.push(ImportEdge::new(line_file, module));
                }
                "aliased_import" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let module = self.node_text(&name);
                        self.ir.imports.push(ImportEdge::new(line_file, module));
                    }
                }
                _ => {}
            }
        }
    }

    fn record_from_import(&mut self, node: &Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        let module = self.node_text(&module_node);
        let mut symbols = Vec::new();
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if child == module_node {
                continue;
            }
            match child.kind() {
                "dotted_name" => symbols.push(self.node_text(&child)),
                "aliased_import" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        symbols.push(self.node_text(&name));
                    }
                }
                "wildcard_import" => symbols.push("*".to_string()),
                _ => {}
            }
        }
        self.ir
            .imports
            .push(ImportEdge::new(&self.source.path, module).with_symbols(symbols));
    }

    fn record_future_import(&mut self, node: &Node) {
        let mut symbols = Vec::new();
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if child.kind() == "dotted_name" {
                    symbols.push(self.node_text(&child));
                }
            }
        }
        self.ir
            .imports
            .push(ImportEdge::new(&self.source.path, "__future__").with_symbols(symbols));
    }

    fn node_text(&self, node: &Node) -> String {
        node.utf8_text(self.source.content.as_bytes())
            .unwrap_or("")
            .to_string()
    }
}

fn start_line(node: &Node) -> u32 {
    (node.start_position().row + 1) as u32
}

fn is_async_def(node: &Node) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "async" {
                return true;
            }
        }
    }
    false
}
