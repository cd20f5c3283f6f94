// ABOUTME: Shared JavaScript/TypeScript IR collector.
// ABOUTME: One walk covers ES classes, TS interfaces and enums, and both import styles.

use crate::guard::GuardState;
use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Result, SourceFile};
use tree_sitter::{Node, Tree, TreeCursor};

pub struct EcmaExtractor;

impl EcmaExtractor {
    pub fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut collector = EcmaCollector::new(source);
        let mut cursor = tree.walk();
        collector.walk(&mut cursor, 0, EcmaContext::default(), guard)?;
        Ok(collector.into_ir())
    }
}

impl super::IrExtractor for EcmaExtractor {
    fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        EcmaExtractor::extract(tree, source, guard)
    }
}

/// Index of the class whose body we are directly inside. Propagates only
/// through `class_body`, so functions nested in method bodies stay plain.
#[derive(Default, Clone)]
struct EcmaContext {
    owner_class: Option<usize>,
}

struct EcmaCollector<'a> {
    source: &'a SourceFile,
    ir: FileIr,
}

impl<'a> EcmaCollector<'a> {
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
        ctx: EcmaContext,
        guard: &mut GuardState,
    ) -> Result<()> {
        guard.enter(depth)?;
        guard.visit()?;
        let node = cursor.node();

        let mut child_ctx = EcmaContext::default();
        match node.kind() {
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let entity = ClassEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_bases(self.heritage(&node))
                    .with_decorators(self.decorators(&node));
                    self.ir.classes.push(entity);
                    child_ctx.owner_class = Some(self.ir.classes.len() - 1);
                }
            }
            "class_body" => {
                child_ctx.owner_class = ctx.owner_class;
            }
            "method_definition" | "abstract_method_signature" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.node_text(&name_node);
                    if let Some(class_idx) = ctx.owner_class {
                        self.ir.classes[class_idx].methods.push(name.clone());
                    }
                    let mut entity = FunctionEntity::new(name, &self.source.path, start_line(&node))
                        .with_params(self.parameters(&node))
                        .with_async(has_async_keyword(&node));
                    entity.return_type = self.return_type(&node);
                    entity.decorators = self.decorators(&node);
                    self.ir.functions.push(entity);
                }
            }
            "field_definition" | "public_field_definition" => {
                if let Some(class_idx) = ctx.owner_class {
                    // The name field differs between the two grammars.
                    let name_node = node
                        .child_by_field_name("property")
                        .or_else(|| node.child_by_field_name("name"));
                    if let Some(property) = name_node {
                        let text = self.node_text(&property);
                        self.ir.classes[class_idx].attributes.push(text);
                    }
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut entity = FunctionEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_params(self.parameters(&node))
                    .with_async(has_async_keyword(&node));
                    entity.return_type = self.return_type(&node);
                    self.ir.functions.push(entity);
                }
            }
            "variable_declarator" => {
                self.record_declarator(&node);
            }
            "interface_declaration" => {
                self.record_interface(&node);
            }
            "enum_declaration" => {
                self.record_enum(&node);
            }
            "import_statement" => {
                self.record_es_import(&node);
            }
            "call_expression" => {
                self.record_require(&node);
            }
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

    /// `const f = async () => {}` and friends become named functions.
    fn record_declarator(&mut self, node: &Node) {
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        if !matches!(
            value.kind(),
            "arrow_function" | "function_expression" | "function" | "generator_function"
        ) {
            return;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() != "identifier" {
            return;
        }
        let mut entity = FunctionEntity::new(
            self.node_text(&name_node),
            &self.source.path,
            start_line(node),
        )
        .with_params(self.parameters(&value))
        .with_async(has_async_keyword(&value));
        entity.return_type = self.return_type(&value);
        self.ir.functions.push(entity);
    }

    fn record_interface(&mut self, node: &Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut entity = ClassEntity::new(
            self.node_text(&name_node),
            &self.source.path,
            start_line(node),
        );
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if child.kind() == "extends_type_clause" {
                    for j in 0..child.named_child_count() {
                        if let Some(base) = child.named_child(j) {
                            entity.bases.push(self.node_text(&base));
                        }
                    }
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            for i in 0..body.named_child_count() {
                let Some(member) = body.named_child(i) else {
                    continue;
                };
                match member.kind() {
                    "property_signature" => {
                        if let Some(name) = member.child_by_field_name("name") {
                            entity.attributes.push(self.node_text(&name));
                        }
                    }
                    "method_signature" => {
                        if let Some(name) = member.child_by_field_name("name") {
                            entity.methods.push(self.node_text(&name));
                        }
                    }
                    _ => {}
                }
            }
        }
        self.ir.classes.push(entity);
    }

    fn record_enum(&mut self, node: &Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut entity = ClassEntity::new(
            self.node_text(&name_node),
            &self.source.path,
            start_line(node),
        );
        if let Some(body) = node.child_by_field_name("body") {
            for i in 0..body.named_child_count() {
                let Some(member) = body.named_child(i) else {
                    continue;
                };
                match member.kind() {
                    "property_identifier" => entity.attributes.push(self.node_text(&member)),
                    "enum_assignment" => {
                        if let Some(name) = member.child_by_field_name("name") {
                            entity.attributes.push(self.node_text(&name));
                        }
                    }
                    _ => {}
                }
            }
        }
        self.ir.classes.push(entity);
    }

    fn record_es_import(&mut self, node: &Node) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let module = trim_string_literal(&self.node_text(&source_node));
        let mut symbols = Vec::new();
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if child.kind() != "import_clause" {
                continue;
            }
            for j in 0..child.named_child_count() {
                let Some(part) = child.named_child(j) else {
                    continue;
                };
                match part.kind() {
                    "identifier" => symbols.push(self.node_text(&part)),
                    "namespace_import" => symbols.push("*".to_string()),
                    "named_imports" => {
                        for k in 0..part.named_child_count() {
                            if let Some(specifier) = part.named_child(k) {
                                if specifier.kind() == "import_specifier" {
                                    if let Some(name) = specifier.child_by_field_name("name") {
                                        symbols.push(self.node_text(&name));
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        self.ir
            .imports
            .push(ImportEdge::new(&self.source.path, module).with_symbols(symbols));
    }

    fn record_require(&mut self, node: &Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        if self.node_text(&function) != "require" {
            return;
        }
        let Some(arguments) = node.child_by_field_name("arguments") else {
            return;
        };
        let Some(argument) = arguments.named_child(0) else {
            return;
        };
        if argument.kind() != "string" {
            return;
        }
        let module = trim_string_literal(&self.node_text(&argument));
        self.ir
            .imports
            .push(ImportEdge::new(&self.source.path, module));
    }

    /// Base names from `extends`/`implements`, type arguments dropped.
    fn heritage(&self, node: &Node) -> Vec<String> {
        let mut bases = Vec::new();
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if child.kind() != "class_heritage" {
                continue;
            }
            for j in 0..child.named_child_count() {
                let Some(clause) = child.named_child(j) else {
                    continue;
                };
                match clause.kind() {
                    "extends_clause" | "implements_clause" => {
                        for k in 0..clause.named_child_count() {
                            if let Some(base) = clause.named_child(k) {
                                if base.kind() != "type_arguments" {
                                    bases.push(self.node_text(&base));
                                }
                            }
                        }
                    }
                    "type_arguments" => {}
                    _ => bases.push(self.node_text(&clause)),
                }
            }
        }
        bases
    }

    /// Decorator nodes either precede the declaration as siblings or are
    /// embedded as leading children, depending on grammar. Both are scanned.
    fn decorators(&self, node: &Node) -> Vec<String> {
        let mut decorators = Vec::new();
        let mut current = node.prev_sibling();
        while let Some(sibling) = current {
            match sibling.kind() {
                "decorator" => decorators.push(strip_at(&self.node_text(&sibling))),
                "comment" => {}
                _ => break,
            }
            current = sibling.prev_sibling();
        }
        decorators.reverse();
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if child.kind() == "decorator" {
                    decorators.push(strip_at(&self.node_text(&child)));
                }
            }
        }
        decorators
    }

    fn parameters(&self, node: &Node) -> Vec<String> {
        let mut params = Vec::new();
        let Some(parameters) = node.child_by_field_name("parameters") else {
            // An arrow function with a single bare parameter has no list.
            if let Some(parameter) = node.child_by_field_name("parameter") {
                params.push(self.node_text(&parameter));
            }
            return params;
        };
        for i in 0..parameters.named_child_count() {
            let Some(param) = parameters.named_child(i) else {
                continue;
            };
            match param.kind() {
                "identifier" => params.push(self.node_text(&param)),
                "required_parameter" | "optional_parameter" => {
                    let name = param
                        .child_by_field_name("pattern")
                        .map(|p| self.node_text(&p))
                        .unwrap_or_else(|| self.node_text(&param));
                    params.push(name);
                }
                "assignment_pattern" => {
                    if let Some(left) = param.child_by_field_name("left") {
                        params.push(self.node_text(&left));
                    }
                }
                _ => params.push(self.node_text(&param)),
            }
        }
        params
    }

    fn return_type(&self, node: &Node) -> Option<String> {
        let annotation = node.child_by_field_name("return_type")?;
        let text = self.node_text(&annotation);
        let trimmed = text.trim_start_matches(':').trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
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

fn has_async_keyword(node: &Node) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "async" {
                return true;
            }
        }
    }
    false
}

fn trim_string_literal(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn strip_at(text: &str) -> String {
    text.trim_start_matches('@').to_string()
}
