// ABOUTME: Rust IR collector mapping items to the shared class/function/import shape.
// ABOUTME: Impl blocks fold their methods and trait names into the declaring type.

use crate::guard::GuardState;
use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Result, SourceFile};
use tree_sitter::{Node, Tree, TreeCursor};

pub struct RustExtractor;

impl RustExtractor {
    pub fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut collector = RustCollector::new(source);
        let mut cursor = tree.walk();
        collector.walk(&mut cursor, 0, RsContext::default(), guard)?;
        Ok(collector.into_ir())
    }
}

impl super::IrExtractor for RustExtractor {
    fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        RustExtractor::extract(tree, source, guard)
    }
}

/// Name of the type or trait whose body we are inside. Functions seen with
/// an owner become methods of that entity as well as standalone functions.
#[derive(Default, Clone)]
struct RsContext {
    owner_type: Option<String>,
}

struct RustCollector<'a> {
    source: &'a SourceFile,
    ir: FileIr,
    // (owner, method) and (owner, base) pairs resolved after the walk, so an
    // impl block may precede the type it extends.
    pending_methods: Vec<(String, String)>,
    pending_bases: Vec<(String, String)>,
}

impl<'a> RustCollector<'a> {
    fn new(source: &'a SourceFile) -> Self {
        Self {
            source,
            ir: FileIr::new(&source.path, source.language),
            pending_methods: Vec::new(),
            pending_bases: Vec::new(),
        }
    }

    fn into_ir(mut self) -> FileIr {
        for (owner, method) in self.pending_methods.drain(..) {
            if let Some(class) = self.ir.classes.iter_mut().find(|c| c.name == owner) {
                class.methods.push(method);
            }
        }
        for (owner, base) in self.pending_bases.drain(..) {
            if let Some(class) = self.ir.classes.iter_mut().find(|c| c.name == owner) {
                if !class.bases.contains(&base) {
                    class.bases.push(base);
                }
            }
        }
        self.ir
    }

    fn walk(
        &mut self,
        cursor: &mut TreeCursor,
        depth: u32,
        ctx: RsContext,
        guard: &mut GuardState,
    ) -> Result<()> {
        guard.enter(depth)?;
        guard.visit()?;
        let node = cursor.node();

        let mut child_ctx = RsContext::default();
        match node.kind() {
            "struct_item" | "union_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut entity = ClassEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_decorators(self.leading_attributes(&node));
                    entity.attributes = self.struct_fields(&node);
                    self.ir.classes.push(entity);
                }
            }
            "enum_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut entity = ClassEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_decorators(self.leading_attributes(&node));
                    entity.attributes = self.enum_variants(&node);
                    self.ir.classes.push(entity);
                }
            }
            "trait_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.node_text(&name_node);
                    let entity =
                        ClassEntity::new(name.clone(), &self.source.path, start_line(&node))
                            .with_decorators(self.leading_attributes(&node));
                    self.ir.classes.push(entity);
                    child_ctx.owner_type = Some(name);
                }
            }
            "impl_item" => {
                if let Some(type_node) = node.child_by_field_name("type") {
                    let owner = self.base_type_name(&type_node);
                    if let Some(trait_node) = node.child_by_field_name("trait") {
                        let trait_name = self.base_type_name(&trait_node);
                        self.pending_bases.push((owner.clone(), trait_name));
                    }
                    child_ctx.owner_type = Some(owner);
                }
            }
            "declaration_list" => {
                child_ctx.owner_type = ctx.owner_type;
            }
            "function_item" | "function_signature_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.node_text(&name_node);
                    if let Some(owner) = ctx.owner_type {
                        self.pending_methods.push((owner, name.clone()));
                    }
                    let mut entity = FunctionEntity::new(name, &self.source.path, start_line(&node))
                        .with_params(self.parameters(&node))
                        .with_async(has_async_modifier(&node));
                    entity.return_type = node
                        .child_by_field_name("return_type")
                        .map(|n| self.node_text(&n));
                    entity.decorators = self.leading_attributes(&node);
                    self.ir.functions.push(entity);
                }
            }
            "use_declaration" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    self.record_use(&argument);
                }
            }
            "extern_crate_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let module = self.node_text(&name_node);
                    self.ir
                        .imports
                        .push(ImportEdge::new(&self.source.path, module));
                }
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

    fn struct_fields(&self, node: &Node) -> Vec<String> {
        let mut fields = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "field_declaration_list" {
                for i in 0..body.named_child_count() {
                    if let Some(field) = body.named_child(i) {
                        if field.kind() == "field_declaration" {
                            if let Some(name) = field.child_by_field_name("name") {
                                fields.push(self.node_text(&name));
                            }
                        }
                    }
                }
            }
        }
        fields
    }

    fn enum_variants(&self, node: &Node) -> Vec<String> {
        let mut variants = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for i in 0..body.named_child_count() {
                if let Some(variant) = body.named_child(i) {
                    if variant.kind() == "enum_variant" {
                        if let Some(name) = variant.child_by_field_name("name") {
                            variants.push(self.node_text(&name));
                        }
                    }
                }
            }
        }
        variants
    }

    /// Attribute items directly above the node, doc comments skipped, in
    /// source order and without the `#[...]` framing.
    fn leading_attributes(&self, node: &Node) -> Vec<String> {
        let mut attributes = Vec::new();
        let mut current = node.prev_sibling();
        while let Some(sibling) = current {
            match sibling.kind() {
                "attribute_item" => {
                    if let Some(inner) = sibling.named_child(0) {
                        attributes.push(self.node_text(&inner));
                    }
                }
                "line_comment" | "block_comment" => {}
                _ => break,
            }
            current = sibling.prev_sibling();
        }
        attributes.reverse();
        attributes
    }

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
                "self_parameter" => params.push("self".to_string()),
                "parameter" => {
                    if let Some(pattern) = param.child_by_field_name("pattern") {
                        params.push(self.node_text(&pattern));
                    }
                }
                _ => {}
            }
        }
        params
    }

    /// `Foo` from `Foo`, `Foo<T>`, or `&Foo`; used for impl targets and
    /// trait names so bases stay comparable across generic instantiations.
    fn base_type_name(&self, node: &Node) -> String {
        match node.kind() {
            "generic_type" => node
                .child_by_field_name("type")
                .map(|n| self.node_text(&n))
                .unwrap_or_else(|| self.node_text(node)),
            "reference_type" => node
                .child_by_field_name("type")
                .map(|n| self.base_type_name(&n))
                .unwrap_or_else(|| self.node_text(node)),
            _ => self.node_text(node),
        }
    }

    fn record_use(&mut self, node: &Node) {
        match node.kind() {
            "scoped_use_list" => {
                let module = node
                    .child_by_field_name("path")
                    .map(|p| self.node_text(&p))
                    .unwrap_or_default();
                let mut symbols = Vec::new();
                if let Some(list) = node.child_by_field_name("list") {
                    for i in 0..list.named_child_count() {
                        if let Some(item) = list.named_child(i) {
                            symbols.push(self.node_text(&item));
                        }
                    }
                }
                self.ir
                    .imports
                    .push(ImportEdge::new(&self.source.path, module).with_symbols(symbols));
            }
            "use_list" => {
                for i in 0..node.named_child_count() {
                    if let Some(item) = node.named_child(i) {
                        self.record_use(&item);
                    }
                }
            }
            "use_as_clause" => {
                if let Some(path) = node.child_by_field_name("path") {
                    let module = self.node_text(&path);
                    self.ir
                        .imports
                        .push(ImportEdge::new(&self.source.path, module));
                }
            }
            "use_wildcard" => {
                let module = node
                    .named_child(0)
                    .map(|p| self.node_text(&p))
                    .unwrap_or_default();
                self.ir.imports.push(
                    ImportEdge::new(&self.source.path, module)
                        .with_symbols(vec!["*".to_string()]),
                );
            }
            _ => {
                let module = self.node_text(node);
                self.ir
                    .imports
                    .push(ImportEdge::new(&self.source.path, module));
            }
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

fn has_async_modifier(node: &Node) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "async" {
                return true;
            }
            if child.kind() == "function_modifiers" {
                for j in 0..child.child_count() {
                    if let Some(modifier) = child.child(j) {
                        if modifier.kind() == "async" {
                            return true;
                        }
                    }
                }
            }
        }
    }
    false
}
